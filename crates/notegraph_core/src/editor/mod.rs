//! Editing pipeline: dispatcher, base operations and selection state.
//!
//! # Responsibility
//! - Own one note's in-memory document plus the collapsed cursor.
//! - Dispatch high-level edits through the ordered behavior chain, falling
//!   through to base implementations when every behavior declines.
//! - Run normalization to a fixed point before any entry point returns.
//!
//! # Invariants
//! - Later-registered behaviors execute their override first.
//! - An invalid edit target degrades to a logged no-op; nothing in a normal
//!   edit sequence surfaces an error to the caller.

pub mod behaviors;
pub mod normalize;
pub mod ops;

use crate::model::document::{Document, Element, ElementKind, Node, Path, Point, Text};
use crate::service::media::ImageUploader;
use behaviors::{default_chain, Behavior, Outcome, PasteData};
use log::warn;
use ops::{EditError, EditResult};
use std::rc::Rc;

/// In-memory editor instance for one note.
pub struct Editor {
    pub doc: Document,
    pub selection: Option<Point>,
    chain: Rc<[Rc<dyn Behavior>]>,
    dirty: Vec<Path>,
    uploader: Option<Rc<dyn ImageUploader>>,
}

impl Editor {
    /// Creates an editor with the standard behavior chain.
    ///
    /// The incoming document is normalized immediately so behaviors never
    /// see an invalid tree, even for content loaded from the store.
    pub fn new(mut doc: Document) -> Self {
        normalize::normalize_document(&mut doc);
        Self {
            doc,
            selection: None,
            chain: default_chain(),
            dirty: Vec::new(),
            uploader: None,
        }
    }

    /// Creates an editor with a caller-provided behavior chain. Used by
    /// tests exercising individual behaviors in isolation.
    pub fn with_behaviors(mut doc: Document, chain: Vec<Rc<dyn Behavior>>) -> Self {
        normalize::normalize_document(&mut doc);
        Self {
            doc,
            selection: None,
            chain: chain.into(),
            dirty: Vec::new(),
            uploader: None,
        }
    }

    /// Routes dropped image files through `uploader`. Without one, file
    /// drops degrade to a logged no-op.
    pub fn set_uploader(&mut self, uploader: Rc<dyn ImageUploader>) {
        self.uploader = Some(uploader);
    }

    pub(crate) fn uploader(&self) -> Option<Rc<dyn ImageUploader>> {
        self.uploader.clone()
    }

    /// Collapses the cursor to `point`.
    pub fn select(&mut self, point: Point) {
        self.selection = Some(point);
    }

    /// Inline classification, composed across the chain.
    pub fn is_inline(&self, kind: &ElementKind) -> bool {
        for behavior in self.chain.iter().rev() {
            if let Some(answer) = behavior.is_inline(kind) {
                return answer;
            }
        }
        kind.is_inline()
    }

    /// Void classification, composed across the chain.
    pub fn is_void(&self, kind: &ElementKind) -> bool {
        for behavior in self.chain.iter().rev() {
            if let Some(answer) = behavior.is_void(kind) {
                return answer;
            }
        }
        kind.is_void()
    }

    /// Types `text` at the cursor.
    pub fn insert_text(&mut self, text: &str) {
        let chain = Rc::clone(&self.chain);
        for behavior in chain.iter().rev() {
            if matches!(behavior.on_insert_text(self, text), Outcome::Handled) {
                self.finish_edit();
                return;
            }
        }
        self.base_insert_text(text);
        self.finish_edit();
    }

    /// Presses enter at the cursor.
    pub fn insert_break(&mut self) {
        let chain = Rc::clone(&self.chain);
        for behavior in chain.iter().rev() {
            if matches!(behavior.on_insert_break(self), Outcome::Handled) {
                self.finish_edit();
                return;
            }
        }
        self.base_insert_break();
        self.finish_edit();
    }

    /// Presses backspace at the cursor.
    pub fn delete_backward(&mut self) {
        let chain = Rc::clone(&self.chain);
        for behavior in chain.iter().rev() {
            if matches!(behavior.on_delete_backward(self), Outcome::Handled) {
                self.finish_edit();
                return;
            }
        }
        self.base_delete_backward();
        self.finish_edit();
    }

    /// Pastes clipboard content at the cursor.
    pub fn insert_data(&mut self, data: &PasteData) {
        let chain = Rc::clone(&self.chain);
        for behavior in chain.iter().rev() {
            if matches!(behavior.on_insert_data(self, data), Outcome::Handled) {
                self.finish_edit();
                return;
            }
        }
        self.base_insert_data(data);
        self.finish_edit();
    }

    // ---- base implementations -------------------------------------------

    pub(crate) fn base_insert_text(&mut self, text: &str) {
        let Some(point) = self.selection.clone() else {
            return;
        };
        match ops::insert_text(&mut self.doc, &point, text) {
            Ok(()) => {
                self.mark_dirty(&point.path);
                if let Some(selection) = self.selection.as_mut() {
                    selection.offset += text.len();
                }
            }
            Err(err) => self.log_noop("insert_text", &err),
        }
    }

    pub(crate) fn base_insert_break(&mut self) {
        let Some(point) = self.selection.clone() else {
            return;
        };
        match ops::split_node(&mut self.doc, &point) {
            Ok(new_block) => {
                self.mark_dirty(&new_block);
                self.selection = first_leaf_point(&self.doc, &new_block);
            }
            Err(err) => self.log_noop("insert_break", &err),
        }
    }

    pub(crate) fn base_delete_backward(&mut self) {
        let Some(point) = self.selection.clone() else {
            return;
        };
        if point.offset > 0 {
            let Some(leaf) = self.doc.node_at(&point.path).and_then(Node::as_text) else {
                return;
            };
            let removed = leaf.text[..point.offset]
                .chars()
                .next_back()
                .map_or(0, char::len_utf8);
            if removed == 0 {
                return;
            }
            let start = point.offset - removed;
            match ops::delete_text(&mut self.doc, &point.path, start, removed) {
                Ok(()) => {
                    self.mark_dirty(&point.path);
                    if let Some(selection) = self.selection.as_mut() {
                        selection.offset = start;
                    }
                }
                Err(err) => self.log_noop("delete_backward", &err),
            }
            return;
        }

        // At a leaf start: merge with the previous leaf, or the previous
        // block when the cursor sits at the block boundary.
        if let Some((last, _)) = point.path.split_last() {
            if *last > 0 {
                let mut previous = point.path.clone();
                if let Some(index) = previous.last_mut() {
                    *index -= 1;
                }
                match self.doc.node_at(&previous) {
                    Some(Node::Text(leaf)) => {
                        let offset = leaf.text.len();
                        match ops::merge_node(&mut self.doc, &point.path) {
                            Ok(()) => {
                                self.mark_dirty(&previous);
                                self.selection = Some(Point::new(previous, offset));
                            }
                            Err(err) => self.log_noop("delete_backward", &err),
                        }
                        return;
                    }
                    Some(Node::Element(element)) if element.kind.is_void() => {
                        // Backspacing into a void inline removes it whole;
                        // the cursor's leaf shifts one slot left.
                        if self.apply_remove_node(&previous).is_ok() {
                            self.selection = Some(Point::new(previous, 0));
                        }
                        return;
                    }
                    _ => {}
                }
            }
        }

        let Some((block_path, _)) = self.doc.enclosing_block(&point.path) else {
            return;
        };
        let Some((&block_index, _)) = block_path.split_last() else {
            return;
        };
        if block_index == 0 {
            return;
        }
        let mut previous_block = block_path.clone();
        if let Some(index) = previous_block.last_mut() {
            *index -= 1;
        }
        let landing = last_leaf_point(&self.doc, &previous_block);
        match ops::merge_node(&mut self.doc, &block_path) {
            Ok(()) => {
                self.mark_dirty(&previous_block);
                self.selection = landing;
            }
            Err(err) => self.log_noop("delete_backward", &err),
        }
    }

    pub(crate) fn base_insert_data(&mut self, data: &PasteData) {
        // The editor's own serialization is preferred verbatim.
        if let Some(json) = data.fragment_json.as_deref() {
            match serde_json::from_str::<Vec<Node>>(json) {
                Ok(nodes) => {
                    self.insert_block_fragment(nodes);
                    return;
                }
                Err(err) => {
                    warn!(
                        "event=paste module=editor status=error error_code=bad_fragment error={err}"
                    );
                }
            }
        }
        if let Some(text) = data.text.as_deref() {
            let mut first = true;
            for line in text.split('\n') {
                if !first {
                    self.base_insert_break();
                }
                first = false;
                if !line.is_empty() {
                    self.base_insert_text(line);
                }
            }
        }
    }

    /// Inserts pasted block nodes after the cursor's enclosing block.
    pub(crate) fn insert_block_fragment(&mut self, nodes: Vec<Node>) {
        let anchor = self
            .selection
            .as_ref()
            .and_then(|point| self.doc.enclosing_block(&point.path))
            .map(|(path, _)| path);
        let mut at = match anchor {
            Some(mut path) => {
                if let Some(index) = path.last_mut() {
                    *index += 1;
                }
                path
            }
            None => vec![self.doc.children.len()],
        };
        for node in nodes {
            if self.apply_insert_node(&at, node).is_err() {
                return;
            }
            if let Some(index) = at.last_mut() {
                *index += 1;
            }
        }
        if let Some(last) = at.last_mut() {
            *last = last.saturating_sub(1);
        }
        self.selection = last_leaf_point(&self.doc, &at);
    }

    /// Splits the current leaf and inserts an inline element at the cursor,
    /// leaving the cursor in the leaf that follows it.
    pub(crate) fn insert_inline(&mut self, element: Element) {
        self.insert_at_cursor(Node::Element(element));
    }

    /// Splits the current leaf and inserts a marked leaf at the cursor.
    pub(crate) fn insert_leaf(&mut self, leaf: Text) {
        self.insert_at_cursor(Node::Text(leaf));
    }

    fn insert_at_cursor(&mut self, node: Node) {
        let Some(point) = self.selection.clone() else {
            return;
        };
        let Some(leaf) = self.doc.node_at_mut(&point.path).and_then(Node::as_text_mut) else {
            self.log_noop("insert_at_cursor", &EditError::NotAText(point.path.clone()));
            return;
        };
        if !leaf.text.is_char_boundary(point.offset) {
            return;
        }
        let tail_text = leaf.text.split_off(point.offset);
        let mut tail = leaf.clone();
        tail.text = tail_text;

        let mut inline_path = point.path.clone();
        if let Some(index) = inline_path.last_mut() {
            *index += 1;
        }
        let mut tail_path = inline_path.clone();
        if let Some(index) = tail_path.last_mut() {
            *index += 1;
        }
        if self.apply_insert_node(&inline_path, node).is_err() {
            return;
        }
        let _ = self.apply_insert_node(&tail_path, Node::Text(tail));
        self.selection = Some(Point::new(tail_path, 0));
    }

    // ---- bounds-checked op wrappers with dirty tracking -----------------

    pub(crate) fn apply_insert_node(&mut self, path: &[usize], node: Node) -> EditResult<()> {
        let result = ops::insert_node(&mut self.doc, path, node);
        self.after_op("insert_node", path, result)
    }

    pub(crate) fn apply_remove_node(&mut self, path: &[usize]) -> EditResult<()> {
        let result = ops::remove_node(&mut self.doc, path).map(|_| ());
        self.after_op("remove_node", path, result)
    }

    pub(crate) fn apply_set_properties(
        &mut self,
        path: &[usize],
        patch: ops::NodePatch,
    ) -> EditResult<()> {
        let result = ops::set_node_properties(&mut self.doc, path, patch);
        self.after_op("set_properties", path, result)
    }

    pub(crate) fn apply_wrap(
        &mut self,
        parent: &[usize],
        start: usize,
        end: usize,
        kind: ElementKind,
    ) -> EditResult<()> {
        let result = ops::wrap_nodes(&mut self.doc, parent, start, end, kind);
        self.after_op("wrap_nodes", parent, result)
    }

    pub(crate) fn apply_unwrap(&mut self, path: &[usize]) -> EditResult<()> {
        let result = ops::unwrap_node(&mut self.doc, path);
        self.after_op("unwrap_node", path, result)
    }

    pub(crate) fn apply_delete_text(
        &mut self,
        path: &[usize],
        offset: usize,
        len: usize,
    ) -> EditResult<()> {
        let result = ops::delete_text(&mut self.doc, path, offset, len);
        self.after_op("delete_text", path, result)
    }

    fn after_op(&mut self, op: &'static str, path: &[usize], result: EditResult<()>) -> EditResult<()> {
        match &result {
            Ok(()) => self.mark_dirty(path),
            Err(err) => self.log_noop(op, err),
        }
        result
    }

    pub(crate) fn mark_dirty(&mut self, path: &[usize]) {
        self.dirty.push(path.to_vec());
    }

    fn log_noop(&self, op: &str, err: &EditError) {
        warn!("event=edit_noop module=editor status=ok op={op} error={err}");
    }

    /// Normalizes dirty regions and drops a selection that no longer
    /// resolves to a text leaf.
    fn finish_edit(&mut self) {
        let seeds: Vec<Path> = std::mem::take(&mut self.dirty);
        normalize::normalize_from(&mut self.doc, seeds);
        if let Some(point) = self.selection.clone() {
            let still_valid = self
                .doc
                .node_at(&point.path)
                .and_then(Node::as_text)
                .is_some_and(|leaf| point.offset <= leaf.text.len());
            if !still_valid {
                self.selection = None;
            }
        }
    }

    // ---- selection geometry ---------------------------------------------

    /// Leaf text strictly before the cursor, with the cursor point.
    pub(crate) fn text_before_cursor(&self) -> Option<(Point, String)> {
        let point = self.selection.clone()?;
        let leaf = self.doc.node_at(&point.path).and_then(Node::as_text)?;
        if point.offset > leaf.text.len() || !leaf.text.is_char_boundary(point.offset) {
            return None;
        }
        Some((point.clone(), leaf.text[..point.offset].to_string()))
    }

    /// Whether the cursor sits at the very start of its enclosing block.
    pub(crate) fn at_block_start(&self, point: &Point) -> bool {
        if point.offset != 0 {
            return false;
        }
        let Some((block_path, _)) = self.doc.enclosing_block(&point.path) else {
            return false;
        };
        point.path[block_path.len()..].iter().all(|&index| index == 0)
    }

    /// Whether the cursor sits at the very end of its enclosing block.
    pub(crate) fn at_block_end(&self, point: &Point) -> bool {
        let Some(leaf) = self.doc.node_at(&point.path).and_then(Node::as_text) else {
            return false;
        };
        if point.offset != leaf.text.len() {
            return false;
        }
        let Some((block_path, _)) = self.doc.enclosing_block(&point.path) else {
            return false;
        };
        let mut cursor = block_path.clone();
        for &index in &point.path[block_path.len()..] {
            let sibling_count = self
                .doc
                .node_at(&cursor)
                .and_then(Node::as_element)
                .map_or(0, |element| element.children.len());
            if index + 1 != sibling_count {
                return false;
            }
            cursor.push(index);
        }
        true
    }
}

/// First text-leaf point inside the subtree at `path`.
pub fn first_leaf_point(doc: &Document, path: &[usize]) -> Option<Point> {
    let mut current = path.to_vec();
    loop {
        match doc.node_at(&current)? {
            Node::Text(_) => return Some(Point::new(current, 0)),
            Node::Element(element) => {
                if element.children.is_empty() {
                    return None;
                }
                current.push(0);
            }
        }
    }
}

/// Last text-leaf point inside the subtree at `path`, at its end offset.
pub fn last_leaf_point(doc: &Document, path: &[usize]) -> Option<Point> {
    let mut current = path.to_vec();
    loop {
        match doc.node_at(&current)? {
            Node::Text(leaf) => return Some(Point::new(current, leaf.text.len())),
            Node::Element(element) => {
                if element.children.is_empty() {
                    return None;
                }
                current.push(element.children.len() - 1);
            }
        }
    }
}
