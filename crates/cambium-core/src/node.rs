//! Read-only views over subtrees.
//!
//! A [`Node`] pairs a subtree with the absolute position where it starts,
//! since subtrees themselves only know their extent. Nodes are cheap to
//! copy and borrow from the tree they came from.
//!
//! The node API shows the visible tree: hidden tokens kept in the child
//! vectors for layout purposes are skipped by child accessors, except
//! when addressed explicitly through a field.

use std::fmt::Write as _;

use crate::grammar::{FieldId, Grammar, Symbol};
use crate::points::{Length, Point, Range};
use crate::subtree::{Child, Subtree};
use crate::tree::Tree;

/// One node of a syntax tree.
#[derive(Clone, Copy)]
pub struct Node<'tree> {
    tree: &'tree Tree,
    subtree: &'tree Subtree,
    /// Absolute start of the subtree's padding.
    position: Length,
    alias: Option<Symbol>,
}

impl<'tree> Node<'tree> {
    pub(crate) fn new(
        tree: &'tree Tree,
        subtree: &'tree Subtree,
        position: Length,
        alias: Option<Symbol>,
    ) -> Node<'tree> {
        Node {
            tree,
            subtree,
            position,
            alias,
        }
    }

    /// The grammar the node's tree was parsed with.
    pub fn grammar(&self) -> &'tree Grammar {
        self.tree.grammar()
    }

    pub(crate) fn subtree(&self) -> &'tree Subtree {
        self.subtree
    }

    pub(crate) fn position(&self) -> Length {
        self.position
    }

    pub(crate) fn alias(&self) -> Option<Symbol> {
        self.alias
    }

    /// Stable identity of the underlying subtree within its tree.
    pub fn id(&self) -> usize {
        self.subtree.data_ptr() as usize
    }

    // ==== kind and classification ====

    /// The symbol this node presents as, aliases applied.
    pub fn kind_id(&self) -> Symbol {
        self.alias.unwrap_or_else(|| self.subtree.kind())
    }

    pub fn kind(&self) -> &'tree str {
        self.grammar().symbol_name(self.kind_id())
    }

    /// Named nodes correspond to grammar rules; anonymous ones to
    /// literal tokens.
    pub fn is_named(&self) -> bool {
        self.grammar().symbol_is_named(self.kind_id())
    }

    pub fn is_visible(&self) -> bool {
        self.grammar().symbol_is_visible(self.kind_id())
    }

    pub fn is_extra(&self) -> bool {
        self.subtree.is_extra()
    }

    /// True for `ERROR` nodes grouping input the parser could not place.
    pub fn is_error(&self) -> bool {
        self.subtree.is_error()
    }

    /// True when this node or any descendant is an error or missing.
    pub fn has_error(&self) -> bool {
        self.subtree.has_error()
    }

    /// True for zero-width tokens invented during error recovery.
    pub fn is_missing(&self) -> bool {
        self.subtree.is_missing()
    }

    /// True when an edit touched this node since its tree was parsed.
    pub fn has_changes(&self) -> bool {
        self.subtree.has_changes()
    }

    // ==== positions ====

    pub fn start_byte(&self) -> usize {
        (self.position + self.subtree.padding()).bytes
    }

    pub fn end_byte(&self) -> usize {
        (self.position + self.subtree.total()).bytes
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_byte()..self.end_byte()
    }

    pub fn start_position(&self) -> Point {
        (self.position + self.subtree.padding()).extent
    }

    pub fn end_position(&self) -> Point {
        (self.position + self.subtree.total()).extent
    }

    pub fn range(&self) -> Range {
        Range::between(
            self.position + self.subtree.padding(),
            self.position + self.subtree.total(),
        )
    }

    /// The node's text, given the document it was parsed from.
    pub fn utf8_text<'a>(&self, source: &'a [u8]) -> Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(&source[self.start_byte()..self.end_byte()])
    }

    // ==== children ====

    /// Number of visible children.
    pub fn child_count(&self) -> usize {
        self.visible_slots().count()
    }

    pub fn named_child_count(&self) -> usize {
        self.visible_slots()
            .filter(|(_, node)| node.is_named())
            .count()
    }

    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        self.visible_slots().nth(index).map(|(_, node)| node)
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.named_children().nth(index)
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'tree>> + 'tree {
        self.visible_slots().map(|(_, node)| node)
    }

    pub fn named_children(&self) -> impl Iterator<Item = Node<'tree>> + 'tree {
        self.visible_slots()
            .map(|(_, node)| node)
            .filter(Node::is_named)
    }

    /// The field name of the visible child at `index`, if any.
    pub fn field_name_for_child(&self, index: usize) -> Option<&'tree str> {
        let (child, _) = self.visible_slots().nth(index)?;
        Some(self.grammar().field_name(child.field()?))
    }

    /// The first child carrying the field, visible or not.
    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'tree>> {
        self.slots()
            .find(|(child, _)| child.field() == Some(field))
            .map(|(child, position)| self.slot_node(child, position))
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'tree>> {
        self.child_by_field_id(self.grammar().field_id(name)?)
    }

    /// All children carrying the field, in order.
    pub fn children_by_field_id(
        &self,
        field: FieldId,
    ) -> impl Iterator<Item = Node<'tree>> + 'tree {
        let this = *self;
        self.slots()
            .filter(move |(child, _)| child.field() == Some(field))
            .map(move |(child, position)| this.slot_node(child, position))
    }

    // ==== navigation ====

    /// The closest visible ancestor. Costs a descent from the root.
    pub fn parent(&self) -> Option<Node<'tree>> {
        let root = self.tree.root_node();
        if *self == root {
            return None;
        }
        find_parent(root, self)
    }

    pub fn next_sibling(&self) -> Option<Node<'tree>> {
        self.sibling(1, |_| true)
    }

    pub fn prev_sibling(&self) -> Option<Node<'tree>> {
        self.sibling(-1, |_| true)
    }

    pub fn next_named_sibling(&self) -> Option<Node<'tree>> {
        self.sibling(1, Node::is_named)
    }

    pub fn prev_named_sibling(&self) -> Option<Node<'tree>> {
        self.sibling(-1, Node::is_named)
    }

    fn sibling(&self, step: isize, keep: impl Fn(&Node<'tree>) -> bool) -> Option<Node<'tree>> {
        let parent = self.parent()?;
        let siblings: Vec<Node<'tree>> = parent
            .slots()
            .map(|(child, position)| parent.slot_node(child, position))
            .collect();
        let index = siblings.iter().position(|node| node == self)?;
        let mut cursor = index as isize + step;
        while cursor >= 0 && (cursor as usize) < siblings.len() {
            let candidate = siblings[cursor as usize];
            if candidate.is_visible() && keep(&candidate) {
                return Some(candidate);
            }
            cursor += step;
        }
        None
    }

    /// The smallest visible node spanning the byte range.
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        if start < self.start_byte() || end > self.end_byte() || start > end {
            return None;
        }
        let mut current = *self;
        'descend: loop {
            for (_, node) in current.visible_slots() {
                if node.start_byte() <= start && end <= node.end_byte() {
                    current = node;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// The smallest named node spanning the byte range.
    pub fn named_descendant_for_byte_range(
        &self,
        start: usize,
        end: usize,
    ) -> Option<Node<'tree>> {
        let mut best = self.descendant_for_byte_range(start, end)?;
        while !best.is_named() {
            best = best.parent()?;
        }
        Some(best)
    }

    pub fn walk(&self) -> crate::cursor::TreeCursor<'tree> {
        crate::cursor::TreeCursor::with_root(self.tree, *self)
    }

    // ==== rendering ====

    /// Renders the named structure as an s-expression, with field labels
    /// and `MISSING` markers.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out, None);
        out
    }

    fn write_sexp(&self, out: &mut String, field: Option<&str>) {
        if let Some(name) = field {
            write!(out, "{name}: ").unwrap();
        }
        if self.is_missing() {
            if self.is_named() {
                write!(out, "(MISSING {})", self.kind()).unwrap();
            } else {
                write!(out, "(MISSING \"{}\")", self.kind()).unwrap();
            }
            return;
        }
        write!(out, "({}", self.kind()).unwrap();
        for (child, position) in self.slots() {
            let node = self.slot_node(child, position);
            if node.is_visible() && (node.is_named() || node.is_missing()) {
                out.push(' ');
                let field = child.field().map(|id| self.grammar().field_name(id));
                node.write_sexp(out, field);
            }
        }
        out.push(')');
    }

    // ==== slot iteration ====

    pub(crate) fn slot_node(&self, child: &'tree Child, position: Length) -> Node<'tree> {
        Node::new(self.tree, child.subtree(), position, child.alias())
    }

    /// All child slots with their absolute positions, hidden ones
    /// included.
    fn slots(&self) -> impl Iterator<Item = (&'tree Child, Length)> + 'tree {
        let mut position = self.position;
        self.subtree.children().iter().map(move |child| {
            let this = position;
            position = position + child.subtree().total();
            (child, this)
        })
    }

    fn visible_slots(&self) -> impl Iterator<Item = (&'tree Child, Node<'tree>)> + 'tree {
        let this = *self;
        self.slots().filter_map(move |(child, position)| {
            let node = this.slot_node(child, position);
            node.is_visible().then_some((child, node))
        })
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.subtree.ptr_eq(other.subtree)
            && self.position == other.position
            && self.alias == other.alias
    }
}

impl Eq for Node<'_> {}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{Node {} {} - {}}}",
            self.kind(),
            self.start_position(),
            self.end_position()
        )
    }
}

/// Locates the visible node whose child slot holds `target`.
fn find_parent<'tree>(current: Node<'tree>, target: &Node<'tree>) -> Option<Node<'tree>> {
    let target_end = (target.position + target.subtree.total()).bytes;
    let mut position = current.position;
    for child in current.subtree.children() {
        let end = position + child.subtree().total();
        let node = current.slot_node(child, position);
        if node == *target {
            return Some(current);
        }
        if position.bytes <= target.position.bytes
            && target_end <= end.bytes
            && child.subtree().child_count() > 0
        {
            if let Some(found) = find_parent(node, target) {
                return Some(found);
            }
        }
        position = end;
    }
    None
}
