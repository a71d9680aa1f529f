//! Document tree: nodes, classification predicates and path navigation.
//!
//! # Responsibility
//! - Represent one note's content as an ordered tree of elements and text
//!   leaves.
//! - Provide bounds-checked path/point navigation for the editing layer.
//! - Serialize to the nested JSON shape consumed by the web UI and the
//!   record store.
//!
//! # Invariants
//! - `NodeId` values are assigned once and never regenerated; list
//!   containers intentionally carry no id.
//! - Inline elements only ever hold text leaf children.
//! - Mark booleans are present in serialized form only when `true`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an element node.
///
/// Carried as a string because block ids are embedded in serialized
/// documents and in user-typed `((id))` shorthand.
pub type NodeId = String;

/// Path from the document root to a node: a sequence of child indices.
pub type Path = Vec<usize>;

/// A position inside a text leaf: leaf path plus byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Generates a fresh element id.
pub fn new_node_id() -> NodeId {
    Uuid::new_v4().to_string()
}

/// Boolean formatting marks on a text leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Bold,
    Italic,
    Code,
    Underline,
    Strikethrough,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Text leaf: a string plus mark flags, always childless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn has_mark(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Code => self.code,
            Mark::Underline => self.underline,
            Mark::Strikethrough => self.strikethrough,
        }
    }

    pub fn set_mark(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Code => self.code = on,
            Mark::Underline => self.underline = on,
            Mark::Strikethrough => self.strikethrough = on,
        }
    }

    pub fn has_any_mark(&self) -> bool {
        self.bold || self.italic || self.code || self.underline || self.strikethrough
    }

    pub fn clear_marks(&mut self) {
        self.bold = false;
        self.italic = false;
        self.code = false;
        self.underline = false;
        self.strikethrough = false;
    }

    /// Returns marks as a comparable tuple, used when merging sibling leaves.
    pub fn mark_key(&self) -> (bool, bool, bool, bool, bool) {
        (
            self.bold,
            self.italic,
            self.code,
            self.underline,
            self.strikethrough,
        )
    }
}

/// Element kind with type-specific payload fields.
///
/// Serialized internally tagged as `type` using the wire names the web UI
/// already stores (`heading-one`, `note-link`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementKind {
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading-one")]
    HeadingOne,
    #[serde(rename = "heading-two")]
    HeadingTwo,
    #[serde(rename = "heading-three")]
    HeadingThree,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "bulleted-list")]
    BulletedList,
    #[serde(rename = "numbered-list")]
    NumberedList,
    #[serde(rename = "block-quote")]
    Blockquote,
    #[serde(rename = "code-block")]
    CodeBlock,
    #[serde(rename = "thematic-break")]
    ThematicBreak,
    #[serde(rename = "image", rename_all = "camelCase")]
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    #[serde(rename = "link")]
    ExternalLink { url: String },
    #[serde(rename = "note-link", rename_all = "camelCase")]
    NoteLink {
        note_id: String,
        note_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_text: Option<String>,
    },
    #[serde(rename = "block-reference", rename_all = "camelCase")]
    BlockReference { block_id: NodeId },
    #[serde(rename = "tag")]
    Tag { name: String },
}

impl ElementKind {
    /// Inline elements render within a line of text.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::ExternalLink { .. }
                | Self::NoteLink { .. }
                | Self::Tag { .. }
                | Self::BlockReference { .. }
        )
    }

    /// Void elements are opaque for cursor purposes.
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Self::NoteLink { .. }
                | Self::Tag { .. }
                | Self::ThematicBreak
                | Self::Image { .. }
                | Self::BlockReference { .. }
        )
    }

    /// List containers hold list items and carry no id.
    pub fn is_list_container(&self) -> bool {
        matches!(self, Self::BulletedList | Self::NumberedList)
    }

    /// Blocks are the addressable unit for block references.
    pub fn is_block(&self) -> bool {
        !self.is_inline() && !self.is_list_container()
    }

    /// Stable name used in logging, never shown to users.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::HeadingOne => "heading-one",
            Self::HeadingTwo => "heading-two",
            Self::HeadingThree => "heading-three",
            Self::ListItem => "list-item",
            Self::BulletedList => "bulleted-list",
            Self::NumberedList => "numbered-list",
            Self::Blockquote => "block-quote",
            Self::CodeBlock => "code-block",
            Self::ThematicBreak => "thematic-break",
            Self::Image { .. } => "image",
            Self::ExternalLink { .. } => "link",
            Self::NoteLink { .. } => "note-link",
            Self::BlockReference { .. } => "block-reference",
            Self::Tag { .. } => "tag",
        }
    }
}

/// Element node: typed, optionally identified, with ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element with a fresh id (or none for list containers).
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        let id = if kind.is_list_container() {
            None
        } else {
            Some(new_node_id())
        };
        Self { id, kind, children }
    }

    /// Creates an element with a caller-provided id.
    pub fn with_id(id: impl Into<NodeId>, kind: ElementKind, children: Vec<Node>) -> Self {
        Self {
            id: Some(id.into()),
            kind,
            children,
        }
    }

    /// Empty paragraph with a fresh id, the default editing target.
    pub fn empty_paragraph() -> Self {
        Self::new(ElementKind::Paragraph, vec![Node::Text(Text::default())])
    }

    /// Text this element contributes to a rendered line.
    ///
    /// Void inline elements render a display string rather than their
    /// children: note links show custom text or the target title, tags show
    /// their name, block references mirror the target block and stand in
    /// with the target id at model level.
    pub fn rendered_text(&self) -> String {
        match &self.kind {
            ElementKind::NoteLink {
                note_title,
                custom_text,
                ..
            } => custom_text.clone().unwrap_or_else(|| note_title.clone()),
            ElementKind::Tag { name } => name.clone(),
            ElementKind::BlockReference { block_id } => block_id.clone(),
            _ => {
                let mut out = String::new();
                for child in &self.children {
                    collect_text(child, &mut out);
                }
                out
            }
        }
    }
}

/// One node in the tree: an element or a text leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Self::Element(Element::new(kind, children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Text::plain(text))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Self::Element(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Self::Element(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Flattened visible text of this subtree.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(leaf) => out.push_str(&leaf.text),
        Node::Element(element) => {
            if element.kind.is_inline() && element.kind.is_void() {
                out.push_str(&element.rendered_text());
            } else {
                for child in &element.children {
                    collect_text(child, out);
                }
            }
        }
    }
}

/// One note's content: the ordered top-level node sequence.
///
/// Serializes transparently as a JSON array so the persisted `content`
/// column is the nested form the web UI stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Default content for a freshly created note.
    pub fn empty() -> Self {
        Self {
            children: vec![Node::Element(Element::empty_paragraph())],
        }
    }

    /// Bounds-checked lookup of the node at `path`.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.children.get(first)?;
        for &index in rest {
            node = node.as_element()?.children.get(index)?;
        }
        Some(node)
    }

    /// Bounds-checked mutable lookup of the node at `path`.
    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(first)?;
        for &index in rest {
            node = node.as_element_mut()?.children.get_mut(index)?;
        }
        Some(node)
    }

    /// The sibling vector containing the node at `path`.
    ///
    /// For a top-level path this is the document's own child list.
    pub fn siblings_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        let (parent, _) = path.split_last().map(|(last, rest)| (rest, last))?;
        if parent.is_empty() {
            return Some(&mut self.children);
        }
        self.node_at_mut(parent)
            .and_then(Node::as_element_mut)
            .map(|element| &mut element.children)
    }

    /// Depth-first preorder walk yielding `(path, node)` pairs.
    pub fn walk(&self) -> DocumentWalk<'_> {
        let mut stack = Vec::with_capacity(self.children.len());
        for (index, node) in self.children.iter().enumerate().rev() {
            stack.push((vec![index], node));
        }
        DocumentWalk { stack }
    }

    /// Nearest ancestor of `path` (inclusive) that is a block element.
    pub fn enclosing_block(&self, path: &[usize]) -> Option<(Path, &Element)> {
        for cut in (1..=path.len()).rev() {
            let prefix = &path[..cut];
            if let Some(Node::Element(element)) = self.node_at(prefix) {
                if element.kind.is_block() {
                    return Some((prefix.to_vec(), element));
                }
            }
        }
        None
    }

    /// All element ids present in this tree.
    pub fn collect_ids(&self) -> Vec<NodeId> {
        self.walk()
            .filter_map(|(_, node)| node.as_element())
            .filter_map(|element| element.id.clone())
            .collect()
    }
}

/// Iterator state for [`Document::walk`].
pub struct DocumentWalk<'a> {
    stack: Vec<(Path, &'a Node)>,
}

impl<'a> Iterator for DocumentWalk<'a> {
    type Item = (Path, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        if let Node::Element(element) = node {
            for (index, child) in element.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(index);
                self.stack.push((child_path, child));
            }
        }
        Some((path, node))
    }
}
