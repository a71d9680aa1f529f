//! Markdown-style autoformatting while typing.
//!
//! Patterns only fire when the match ends immediately before the cursor and
//! the typed character is the one completing the delimiter; the matched
//! syntax is deleted and replaced by the formatted mark or element.

use super::{Behavior, Outcome};
use crate::editor::ops::NodePatch;
use crate::editor::Editor;
use crate::model::document::{Element, ElementKind, Mark, Node, Point, Text};
use once_cell::sync::Lazy;
use regex::Regex;

struct MarkRule {
    trigger: char,
    pattern: &'static Lazy<Regex>,
    mark: Mark,
}

static BOLD_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^*])(\*\*([^*]+)\*\*)$").expect("valid bold regex"));
static BOLD_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^_])(__([^_]+)__)$").expect("valid bold regex"));
static ITALIC_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^*])(\*([^*]+)\*)$").expect("valid italic regex"));
static ITALIC_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^_])(_([^_]+)_)$").expect("valid italic regex"));
static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^`])(`([^`]+)`)$").expect("valid code regex"));
static STRIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^~])(~~([^~]+)~~)$").expect("valid strike regex"));
static BLOCK_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\(\(([^()\s]+)\)\))$").expect("valid block ref regex"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(#([A-Za-z0-9][A-Za-z0-9_-]*))$").expect("valid tag regex"));

/// Bold before italic so `**x**` never half-matches as italic.
static MARK_RULES: &[MarkRule] = &[
    MarkRule {
        trigger: '*',
        pattern: &BOLD_STAR_RE,
        mark: Mark::Bold,
    },
    MarkRule {
        trigger: '_',
        pattern: &BOLD_UNDER_RE,
        mark: Mark::Bold,
    },
    MarkRule {
        trigger: '*',
        pattern: &ITALIC_STAR_RE,
        mark: Mark::Italic,
    },
    MarkRule {
        trigger: '_',
        pattern: &ITALIC_UNDER_RE,
        mark: Mark::Italic,
    },
    MarkRule {
        trigger: '`',
        pattern: &CODE_RE,
        mark: Mark::Code,
    },
    MarkRule {
        trigger: '~',
        pattern: &STRIKE_RE,
        mark: Mark::Strikethrough,
    },
];

pub struct Autoformat;

impl Behavior for Autoformat {
    fn name(&self) -> &'static str {
        "autoformat"
    }

    fn on_insert_text(&self, editor: &mut Editor, text: &str) -> Outcome {
        // Only single typed characters can complete a pattern; bulk input
        // (IME commits, paste) passes through untouched.
        let mut chars = text.chars();
        let Some(typed) = chars.next() else {
            return Outcome::Pass;
        };
        if chars.next().is_some() {
            return Outcome::Pass;
        }
        let Some((point, before)) = editor.text_before_cursor() else {
            return Outcome::Pass;
        };

        if typed == ' ' {
            if apply_block_shorthand(editor, &point, &before) {
                return Outcome::Handled;
            }
            if apply_tag(editor, &point, &before) {
                return Outcome::Handled;
            }
            return Outcome::Pass;
        }

        let mut candidate = before.clone();
        candidate.push(typed);

        for rule in MARK_RULES {
            if rule.trigger != typed {
                continue;
            }
            let Some(caps) = rule.pattern.captures(&candidate) else {
                continue;
            };
            let (Some(region), Some(content)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let start = region.start();
            if start >= point.offset {
                continue;
            }
            if editor
                .apply_delete_text(&point.path, start, point.offset - start)
                .is_err()
            {
                return Outcome::Pass;
            }
            if let Some(selection) = editor.selection.as_mut() {
                selection.offset = start;
            }
            let mut leaf = Text::plain(content.as_str());
            leaf.set_mark(rule.mark, true);
            editor.insert_leaf(leaf);
            return Outcome::Handled;
        }

        if typed == ')' {
            if let Some(caps) = BLOCK_REF_RE.captures(&candidate) {
                if let (Some(region), Some(block_id)) = (caps.get(1), caps.get(2)) {
                    let start = region.start();
                    if start < point.offset
                        && editor
                            .apply_delete_text(&point.path, start, point.offset - start)
                            .is_ok()
                    {
                        if let Some(selection) = editor.selection.as_mut() {
                            selection.offset = start;
                        }
                        editor.insert_inline(Element::new(
                            ElementKind::BlockReference {
                                block_id: block_id.as_str().to_string(),
                            },
                            vec![Node::Text(Text::default())],
                        ));
                        return Outcome::Handled;
                    }
                }
            }
        }

        Outcome::Pass
    }
}

/// `# `, `> `, `* ` and `1. ` markers typed at the start of a paragraph.
fn apply_block_shorthand(editor: &mut Editor, point: &Point, before: &str) -> bool {
    let Some((block_path, block)) = editor.doc.enclosing_block(&point.path) else {
        return false;
    };
    if block.kind != ElementKind::Paragraph {
        return false;
    }
    // The marker must be the only text between block start and cursor.
    if !point.path[block_path.len()..].iter().all(|&index| index == 0) {
        return false;
    }

    let heading = match before {
        "#" => Some(ElementKind::HeadingOne),
        "##" => Some(ElementKind::HeadingTwo),
        "###" => Some(ElementKind::HeadingThree),
        ">" => Some(ElementKind::Blockquote),
        _ => None,
    };
    if let Some(kind) = heading {
        if editor
            .apply_set_properties(&block_path, NodePatch::Kind(kind))
            .is_err()
        {
            return false;
        }
        let _ = editor.apply_delete_text(&point.path, 0, before.len());
        editor.selection = Some(Point::new(point.path.clone(), 0));
        return true;
    }

    let container = match before {
        "*" | "-" => Some(ElementKind::BulletedList),
        "1." => Some(ElementKind::NumberedList),
        _ => None,
    };
    if let Some(container_kind) = container {
        let Some((&block_index, parent)) = block_path.split_last() else {
            return false;
        };
        if editor
            .apply_set_properties(&block_path, NodePatch::Kind(ElementKind::ListItem))
            .is_err()
        {
            return false;
        }
        if editor
            .apply_wrap(parent, block_index, block_index, container_kind)
            .is_err()
        {
            return false;
        }
        let mut leaf_path = parent.to_vec();
        leaf_path.push(block_index);
        leaf_path.push(0);
        leaf_path.extend_from_slice(&point.path[block_path.len()..]);
        let _ = editor.apply_delete_text(&leaf_path, 0, before.len());
        editor.selection = Some(Point::new(leaf_path, 0));
        return true;
    }

    false
}

/// `#name ` becomes an inline tag element followed by the typed space.
fn apply_tag(editor: &mut Editor, point: &Point, before: &str) -> bool {
    let Some(caps) = TAG_RE.captures(before) else {
        return false;
    };
    let (Some(region), Some(name)) = (caps.get(1), caps.get(2)) else {
        return false;
    };
    let start = region.start();
    if editor
        .apply_delete_text(&point.path, start, point.offset - start)
        .is_err()
    {
        return false;
    }
    if let Some(selection) = editor.selection.as_mut() {
        selection.offset = start;
    }
    editor.insert_inline(Element::new(
        ElementKind::Tag {
            name: name.as_str().to_string(),
        },
        vec![Node::Text(Text::default())],
    ));
    editor.base_insert_text(" ");
    true
}
