//! Immutable, reference-counted syntax subtrees.
//!
//! A [`Subtree`] is a shared handle: cloning one copies a pointer, and a
//! reparse reuses whole subtrees of the previous tree by cloning handles
//! into the new one. All layout is relative (see [`crate::points`]), so a
//! reused subtree never needs rewriting when everything after an edit
//! shifts.
//!
//! Children hold every token the node covers: visible nodes, extras,
//! errors, and hidden terminal leaves like delimiters. Hidden nonterminals
//! are spliced out by the parser when it builds the parent, so they never
//! appear here. Visibility filtering for the public API happens at the
//! node layer, which has the grammar at hand.

use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::grammar::{FieldId, StateId, Symbol};
use crate::points::Length;

/// Bit flags carried by every subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubtreeFlags(u8);

impl SubtreeFlags {
    pub const EMPTY: SubtreeFlags = SubtreeFlags(0);
    /// An edit touched this subtree; it cannot be reused by a reparse.
    pub const HAS_CHANGES: SubtreeFlags = SubtreeFlags(0x01);
    /// An error or missing node exists somewhere below.
    pub const HAS_ERROR: SubtreeFlags = SubtreeFlags(0x02);
    /// This node is an `ERROR` wrapper.
    pub const IS_ERROR: SubtreeFlags = SubtreeFlags(0x04);
    /// A zero-width token inserted during recovery.
    pub const IS_MISSING: SubtreeFlags = SubtreeFlags(0x08);
    /// Attached as an extra rather than consumed by a production.
    pub const IS_EXTRA: SubtreeFlags = SubtreeFlags(0x10);
    /// Built while the parse was ambiguous; unsafe to reuse.
    pub const FRAGILE: SubtreeFlags = SubtreeFlags(0x20);
    /// Contains a token produced by an external scanner.
    pub const EXTERNAL: SubtreeFlags = SubtreeFlags(0x40);

    /// Flags that propagate from children into parents.
    const INHERITED: SubtreeFlags = SubtreeFlags(
        Self::HAS_CHANGES.0 | Self::HAS_ERROR.0 | Self::FRAGILE.0 | Self::EXTERNAL.0,
    );

    #[inline]
    pub fn contains(self, other: SubtreeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: SubtreeFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: SubtreeFlags) {
        self.0 &= !other.0;
    }

    /// The subset of `self` that a parent inherits.
    #[inline]
    fn inherited(self) -> SubtreeFlags {
        SubtreeFlags(self.0 & Self::INHERITED.0)
    }
}

impl BitOr for SubtreeFlags {
    type Output = SubtreeFlags;

    #[inline]
    fn bitor(self, rhs: SubtreeFlags) -> SubtreeFlags {
        SubtreeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SubtreeFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: SubtreeFlags) {
        self.0 |= rhs.0;
    }
}

/// A child slot: the subtree plus the decorations the consuming production
/// attached to it.
#[derive(Clone, Debug)]
pub struct Child {
    pub(crate) field: Option<FieldId>,
    pub(crate) alias: Option<Symbol>,
    pub(crate) subtree: Subtree,
}

impl Child {
    pub fn new(subtree: Subtree, field: Option<FieldId>, alias: Option<Symbol>) -> Child {
        Child {
            field,
            alias,
            subtree,
        }
    }

    #[inline]
    pub fn subtree(&self) -> &Subtree {
        &self.subtree
    }

    #[inline]
    pub fn field(&self) -> Option<FieldId> {
        self.field
    }

    #[inline]
    pub fn alias(&self) -> Option<Symbol> {
        self.alias
    }

    /// Fills in `field` if the slot does not already carry one. Used when a
    /// hidden rule's children are spliced into the consuming production.
    pub fn or_field(mut self, field: Option<FieldId>) -> Child {
        if self.field.is_none() {
            self.field = field;
        }
        self
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SubtreeData {
    pub(crate) kind: Symbol,
    /// Extent of the skipped text before this subtree's first token.
    pub(crate) padding: Length,
    /// Extent from the first token to the end of the last one.
    pub(crate) size: Length,
    /// Parse state the head was in before this subtree's first token.
    pub(crate) parse_state: StateId,
    /// How far past the end the lexer read while producing this subtree.
    pub(crate) lookahead_bytes: u32,
    pub(crate) error_cost: u32,
    pub(crate) flags: SubtreeFlags,
    pub(crate) children: Vec<Child>,
}

/// A shared, immutable syntax subtree.
#[derive(Clone, Debug)]
pub struct Subtree(Arc<SubtreeData>);

impl Subtree {
    /// A token produced by the lexer or an external scanner.
    pub fn leaf(
        kind: Symbol,
        padding: Length,
        size: Length,
        parse_state: StateId,
        lookahead_bytes: u32,
        flags: SubtreeFlags,
    ) -> Subtree {
        Subtree(Arc::new(SubtreeData {
            kind,
            padding,
            size,
            parse_state,
            lookahead_bytes,
            error_cost: 0,
            flags,
            children: Vec::new(),
        }))
    }

    /// A zero-width placeholder inserted during error recovery.
    pub fn missing(kind: Symbol, parse_state: StateId, cost: u32) -> Subtree {
        Subtree(Arc::new(SubtreeData {
            kind,
            padding: Length::ZERO,
            size: Length::ZERO,
            parse_state,
            lookahead_bytes: 0,
            error_cost: cost,
            flags: SubtreeFlags::IS_MISSING | SubtreeFlags::HAS_ERROR,
            children: Vec::new(),
        }))
    }

    /// An interior node. Layout, cost, lookahead, and inherited flags are
    /// derived from the children; `flags` adds anything beyond that.
    pub fn node(
        kind: Symbol,
        parse_state: StateId,
        flags: SubtreeFlags,
        children: Vec<Child>,
    ) -> Subtree {
        let mut padding = Length::ZERO;
        let mut size = Length::ZERO;
        let mut error_cost = 0;
        let mut combined = flags;
        let mut prefix_bytes = 0usize;
        let mut farthest_byte = 0usize;
        for (i, child) in children.iter().enumerate() {
            let sub = &child.subtree;
            if i == 0 {
                padding = sub.padding();
                size = sub.size();
            } else {
                size += sub.total();
            }
            error_cost += sub.error_cost();
            combined |= sub.flags().inherited();
            let total_bytes = sub.total().bytes;
            farthest_byte = farthest_byte
                .max(prefix_bytes + total_bytes + sub.lookahead_bytes() as usize);
            prefix_bytes += total_bytes;
        }
        let lookahead_bytes = (farthest_byte - prefix_bytes) as u32;
        Subtree(Arc::new(SubtreeData {
            kind,
            padding,
            size,
            parse_state,
            lookahead_bytes,
            error_cost,
            flags: combined,
            children,
        }))
    }

    /// An `ERROR` node wrapping the given children. `penalty` is added on
    /// top of the children's own costs.
    pub fn error(parse_state: StateId, penalty: u32, children: Vec<Child>) -> Subtree {
        let mut tree = Subtree::node(
            Symbol::ERROR,
            parse_state,
            SubtreeFlags::IS_ERROR | SubtreeFlags::HAS_ERROR,
            children,
        );
        Arc::make_mut(&mut tree.0).error_cost += penalty;
        tree
    }

    /// Finalizes a root: folds the leading padding and any trailing text
    /// into the node's own span so that it covers the entire input.
    pub fn into_root(mut self, trailing: Length) -> Subtree {
        let data = Arc::make_mut(&mut self.0);
        data.size = data.padding + data.size + trailing;
        data.padding = Length::ZERO;
        self
    }

    #[inline]
    pub fn kind(&self) -> Symbol {
        self.0.kind
    }

    /// Extent of the skipped text before the first token.
    #[inline]
    pub fn padding(&self) -> Length {
        self.0.padding
    }

    /// Extent of the tokens themselves, interior padding included.
    #[inline]
    pub fn size(&self) -> Length {
        self.0.size
    }

    /// Full extent: `padding + size`.
    #[inline]
    pub fn total(&self) -> Length {
        self.0.padding + self.0.size
    }

    #[inline]
    pub fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    #[inline]
    pub fn lookahead_bytes(&self) -> u32 {
        self.0.lookahead_bytes
    }

    #[inline]
    pub fn error_cost(&self) -> u32 {
        self.0.error_cost
    }

    #[inline]
    pub fn flags(&self) -> SubtreeFlags {
        self.0.flags
    }

    #[inline]
    pub fn has_changes(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::HAS_CHANGES)
    }

    #[inline]
    pub fn has_error(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::HAS_ERROR)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::IS_ERROR)
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::IS_MISSING)
    }

    #[inline]
    pub fn is_extra(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::IS_EXTRA)
    }

    #[inline]
    pub fn is_fragile(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::FRAGILE)
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.0.flags.contains(SubtreeFlags::EXTERNAL)
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.0.children.len()
    }

    #[inline]
    pub fn children(&self) -> &[Child] {
        &self.0.children
    }

    #[inline]
    pub fn child(&self, i: usize) -> Option<&Subtree> {
        self.0.children.get(i).map(|c| &c.subtree)
    }

    /// Consumes the handle and yields the child slots, cloning them only
    /// when the allocation is shared.
    pub fn into_children(self) -> Vec<Child> {
        match Arc::try_unwrap(self.0) {
            Ok(data) => data.children,
            Err(arc) => arc.children.clone(),
        }
    }

    /// True if both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Subtree) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn data_ptr(&self) -> *const SubtreeData {
        Arc::as_ptr(&self.0)
    }

    /// Copy-on-write access for edit bookkeeping.
    pub(crate) fn make_mut(&mut self) -> &mut SubtreeData {
        Arc::make_mut(&mut self.0)
    }

    #[inline]
    pub(crate) fn data(&self) -> &SubtreeData {
        &self.0
    }
}
