//! Link-graph derivation for graph views.

use crate::model::document::ElementKind;
use crate::model::note::{Note, NoteId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One note in the graph, sized by its degree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: NoteId,
    pub title: String,
    pub radius: f64,
}

/// An undirected edge between two notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: NoteId,
    pub target: NoteId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphEdge>,
}

const BASE_RADIUS: f64 = 3.0;
const RADIUS_PER_LINK: f64 = 0.5;
const MAX_RADIUS: f64 = 10.0;

/// Builds the undirected link graph over the collection. Each rendered note
/// link contributes presence of an edge, not multiplicity; self-loops and
/// repeated links collapse. Node order follows the input collection, edges
/// are keyed by the lower-id endpoint.
pub fn compute_graph_data(notes: &[Note]) -> GraphData {
    let known: BTreeSet<&str> = notes.iter().map(|note| note.id.as_str()).collect();
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for note in notes {
        for (_, node) in note.content.walk() {
            let Some(element) = node.as_element() else {
                continue;
            };
            let ElementKind::NoteLink { note_id, .. } = &element.kind else {
                continue;
            };
            if element.rendered_text().is_empty()
                || note_id == &note.id
                || !known.contains(note_id.as_str())
            {
                continue;
            }
            adjacency
                .entry(note.id.as_str())
                .or_default()
                .insert(note_id.as_str());
            adjacency
                .entry(note_id.as_str())
                .or_default()
                .insert(note.id.as_str());
        }
    }

    let nodes = notes
        .iter()
        .map(|note| {
            let degree = adjacency
                .get(note.id.as_str())
                .map(BTreeSet::len)
                .unwrap_or(0);
            GraphNode {
                id: note.id.clone(),
                title: note.title.clone(),
                radius: (BASE_RADIUS + RADIUS_PER_LINK * degree as f64).min(MAX_RADIUS),
            }
        })
        .collect();

    let mut links = Vec::new();
    for (source, targets) in &adjacency {
        for target in targets {
            if source < target {
                links.push(GraphEdge {
                    source: (*source).to_string(),
                    target: (*target).to_string(),
                });
            }
        }
    }

    GraphData { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::{Document, Element, ElementKind, Node, Text};
    use crate::model::note::Note;

    fn note_linking(id: &str, title: &str, targets: &[(&str, &str)]) -> Note {
        let mut children: Vec<Node> = vec![Node::text("see ")];
        for (target_id, target_title) in targets {
            children.push(Node::Element(Element::new(
                ElementKind::NoteLink {
                    note_id: target_id.to_string(),
                    note_title: target_title.to_string(),
                    custom_text: None,
                },
                vec![Node::Text(Text::default())],
            )));
        }
        let mut note = Note::new(title, "tester");
        note.id = id.to_string();
        note.content = Document::new(vec![Node::element(ElementKind::Paragraph, children)]);
        note
    }

    #[test]
    fn duplicate_and_reverse_links_collapse_to_one_edge() {
        let a = note_linking("a", "Alpha", &[("b", "Beta"), ("b", "Beta")]);
        let b = note_linking("b", "Beta", &[("a", "Alpha")]);

        let graph = compute_graph_data(&[a, b]);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].source, "a");
        assert_eq!(graph.links[0].target, "b");
    }

    #[test]
    fn self_links_do_not_create_edges() {
        let a = note_linking("a", "Alpha", &[("a", "Alpha")]);
        let graph = compute_graph_data(&[a]);
        assert!(graph.links.is_empty());
        assert_eq!(graph.nodes[0].radius, 3.0);
    }

    #[test]
    fn radius_grows_with_degree_and_caps() {
        let hub_targets: Vec<(String, String)> = (0..20)
            .map(|n| (format!("n{n}"), format!("Note {n}")))
            .collect();
        let borrowed: Vec<(&str, &str)> = hub_targets
            .iter()
            .map(|(id, title)| (id.as_str(), title.as_str()))
            .collect();
        let mut notes = vec![note_linking("hub", "Hub", &borrowed)];
        for (id, title) in &hub_targets {
            notes.push(note_linking(id, title, &[]));
        }

        let graph = compute_graph_data(&notes);
        let hub = graph.nodes.iter().find(|node| node.id == "hub").expect("hub");
        assert_eq!(hub.radius, 10.0);
        let leaf = graph.nodes.iter().find(|node| node.id == "n0").expect("leaf");
        assert_eq!(leaf.radius, 3.5);
    }
}
