//! Converts pasted HTML into document nodes.
//!
//! The converter is a single-pass tokenizer over tags and text, keeping a
//! stack of open constructs. Unknown tags are transparent; `script` and
//! `style` subtrees are dropped entirely.

use super::{Behavior, Outcome, PasteData};
use crate::editor::Editor;
use crate::model::document::{Element, ElementKind, Mark, Node, Text};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<[^>]+>|[^<]+").expect("valid html token regex")
});
static TAG_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</?\s*([A-Za-z][A-Za-z0-9]*)").expect("valid tag name regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|(\S+))"#)
        .expect("valid attribute regex")
});

pub struct HtmlImport;

impl Behavior for HtmlImport {
    fn name(&self) -> &'static str {
        "html_import"
    }

    fn on_insert_data(&self, editor: &mut Editor, data: &PasteData) -> Outcome {
        // Dropped files and the editor's own serialization outrank HTML.
        if data.fragment_json.is_some() || !data.files.is_empty() {
            return Outcome::Pass;
        }
        let Some(html) = data.html.as_deref() else {
            return Outcome::Pass;
        };
        let blocks = parse_html(html);
        if blocks.is_empty() {
            return Outcome::Pass;
        }
        editor.insert_block_fragment(blocks);
        Outcome::Handled
    }
}

/// What an open tag contributes until its close tag arrives.
enum Open {
    Block(Element),
    Mark(Mark),
    Link(Element),
    Skip,
}

struct HtmlConverter {
    blocks: Vec<Node>,
    stack: Vec<(String, Open)>,
}

/// Parses an HTML fragment into top-level block nodes.
pub(crate) fn parse_html(html: &str) -> Vec<Node> {
    let mut converter = HtmlConverter {
        blocks: Vec::new(),
        stack: Vec::new(),
    };
    for token in TOKEN_RE.find_iter(html) {
        let token = token.as_str();
        if token.starts_with("<!--") {
            continue;
        }
        if token.starts_with('<') {
            converter.handle_tag(token);
        } else {
            converter.handle_text(token);
        }
    }
    // Unclosed tags at end of input flush as if closed.
    while let Some((name, _)) = converter.stack.last() {
        let name = name.clone();
        converter.close_tag(&name);
    }
    converter.blocks
}

impl HtmlConverter {
    fn handle_tag(&mut self, token: &str) {
        let Some(name) = TAG_NAME_RE
            .captures(token)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
        else {
            return;
        };
        if token.starts_with("</") {
            self.close_tag(&name);
            return;
        }

        match name.as_str() {
            "hr" => self.emit_block(Element::new(ElementKind::ThematicBreak, Vec::new())),
            "img" => {
                if let Some(url) = attribute(token, "src") {
                    let caption = attribute(token, "alt").filter(|alt| !alt.is_empty());
                    self.emit_block(Element::new(
                        ElementKind::Image { url, caption },
                        vec![Node::Text(Text::default())],
                    ));
                }
            }
            "br" => self.push_text("\n"),
            _ => {
                if let Some(open) = self.open_for(&name, token) {
                    self.stack.push((name, open));
                }
            }
        }
    }

    fn open_for(&self, name: &str, token: &str) -> Option<Open> {
        let block_kind = match name {
            "p" | "div" => Some(ElementKind::Paragraph),
            "h1" => Some(ElementKind::HeadingOne),
            "h2" => Some(ElementKind::HeadingTwo),
            "h3" | "h4" | "h5" | "h6" => Some(ElementKind::HeadingThree),
            "li" => Some(ElementKind::ListItem),
            "ul" => Some(ElementKind::BulletedList),
            "ol" => Some(ElementKind::NumberedList),
            "blockquote" => Some(ElementKind::Blockquote),
            "pre" => Some(ElementKind::CodeBlock),
            _ => None,
        };
        if let Some(kind) = block_kind {
            return Some(Open::Block(Element::new(kind, Vec::new())));
        }
        let mark = match name {
            "strong" | "b" => Some(Mark::Bold),
            "em" | "i" => Some(Mark::Italic),
            "code" => Some(Mark::Code),
            "u" => Some(Mark::Underline),
            "s" | "del" | "strike" => Some(Mark::Strikethrough),
            _ => None,
        };
        if let Some(mark) = mark {
            return Some(Open::Mark(mark));
        }
        match name {
            "a" => {
                let url = attribute(token, "href").unwrap_or_default();
                Some(Open::Link(Element::new(
                    ElementKind::ExternalLink { url },
                    Vec::new(),
                )))
            }
            "script" | "style" | "head" => Some(Open::Skip),
            // Unknown tags are transparent containers.
            _ => None,
        }
    }

    fn close_tag(&mut self, name: &str) {
        let Some(position) = self
            .stack
            .iter()
            .rposition(|(open_name, _)| open_name == name)
        else {
            return;
        };
        // Implicitly close anything the matching open tag still contains.
        while self.stack.len() > position + 1 {
            let (inner, _) = self.stack.last().expect("non-empty stack");
            let inner = inner.clone();
            self.close_tag(&inner);
        }
        let (_, open) = self.stack.pop().expect("non-empty stack");
        match open {
            Open::Block(element) => self.emit_block(element),
            Open::Link(element) => {
                if !element.children.is_empty() {
                    self.push_node(Node::Element(element));
                }
            }
            Open::Mark(_) | Open::Skip => {}
        }
    }

    fn handle_text(&mut self, raw: &str) {
        if self
            .stack
            .iter()
            .any(|(_, open)| matches!(open, Open::Skip))
        {
            return;
        }
        // Indentation between tags is markup formatting, not content.
        if raw.contains('\n') && raw.trim().is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        self.push_text(&decoded);
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut leaf = Text::plain(text);
        for (_, open) in &self.stack {
            if let Open::Mark(mark) = open {
                leaf.set_mark(*mark, true);
            }
        }
        self.push_node(Node::Text(leaf));
    }

    fn push_node(&mut self, node: Node) {
        for (_, open) in self.stack.iter_mut().rev() {
            match open {
                Open::Block(element) | Open::Link(element) => {
                    element.children.push(node);
                    return;
                }
                Open::Mark(_) => {}
                Open::Skip => return,
            }
        }
        // Bare content outside any block gets its own paragraph.
        match node {
            Node::Element(element) if !matches!(element.kind, ElementKind::ExternalLink { .. }) => {
                self.blocks.push(Node::Element(element));
            }
            other => self
                .blocks
                .push(Node::element(ElementKind::Paragraph, vec![other])),
        }
    }

    fn emit_block(&mut self, element: Element) {
        self.push_node(Node::Element(element));
    }
}

fn attribute(token: &str, name: &str) -> Option<String> {
    for caps in ATTR_RE.captures_iter(token) {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string());
        return value.map(|v| decode_entities(&v));
    }
    None
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
