//! Parsed syntax trees and edit bookkeeping.

use std::sync::Arc;

use crate::changed_ranges;
use crate::cursor::TreeCursor;
use crate::grammar::Grammar;
use crate::node::Node;
use crate::points::{InputEdit, Length, Range};
use crate::subtree::{Subtree, SubtreeFlags};

/// A complete parse of one document.
///
/// Trees are cheap to clone; the clones share subtrees. A tree that has
/// been edited still describes the document structure as of its parse, but
/// with all positions shifted to post-edit coordinates and the touched
/// regions flagged so the next parse knows what it cannot reuse.
#[derive(Clone)]
pub struct Tree {
    grammar: Arc<Grammar>,
    root: Subtree,
}

impl Tree {
    pub fn new(grammar: Arc<Grammar>, root: Subtree) -> Tree {
        Tree { grammar, root }
    }

    #[inline]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// The root node. Spans the entire input, leading and trailing
    /// whitespace included.
    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, &self.root, Length::ZERO, None)
    }

    #[inline]
    pub fn root_subtree(&self) -> &Subtree {
        &self.root
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self)
    }

    /// Shifts the tree to post-edit coordinates and flags everything the
    /// replacement touched.
    ///
    /// Positions are stored relative, so only the spine of nodes that
    /// intersect the replaced span is rewritten; siblings after it move
    /// for free. A node also counts as touched when the edit falls inside
    /// the lookahead window past its end, since its tokens were lexed
    /// from bytes that no longer exist.
    pub fn edit(&mut self, edit: &InputEdit) {
        apply_edit(&mut self.root, edit.start(), edit.old_end(), edit.new_end());
    }

    /// The ranges whose interpretation differs between this tree and
    /// `other`, typically the tree produced by reparsing after edits.
    pub fn changed_ranges(&self, other: &Tree) -> Vec<Range> {
        changed_ranges::between(&self.root, &other.root)
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("grammar", &self.grammar.name())
            .field("root", &self.root_node().to_sexp())
            .finish()
    }
}

/// Rewrites one subtree for an edit given in its local coordinates, where
/// zero is the start of the subtree's padding.
fn apply_edit(subtree: &mut Subtree, start: Length, old_end: Length, new_end: Length) {
    let total = subtree.total();
    if start.bytes > total.bytes + subtree.lookahead_bytes() as usize {
        return;
    }

    let data = subtree.make_mut();
    data.flags.insert(SubtreeFlags::HAS_CHANGES);

    let padding = data.padding;
    if old_end.bytes <= padding.bytes {
        // Entirely within the padding. Insertions at the boundary land
        // here too, growing the padding rather than the first token.
        data.padding = new_end + (padding - old_end);
    } else if start.bytes < padding.bytes {
        // Starts in the padding and eats into the content.
        let consumed = old_end - padding;
        data.size = if consumed.bytes >= data.size.bytes {
            Length::ZERO
        } else {
            data.size - consumed
        };
        data.padding = new_end;
    } else if start.bytes <= total.bytes {
        // Starts within the content. The replacement text, however large,
        // stays inside this subtree.
        let kept_prefix = start - padding;
        let inserted = new_end - start;
        let kept_suffix = if old_end.bytes <= total.bytes {
            total - old_end
        } else {
            Length::ZERO
        };
        data.size = kept_prefix + inserted + kept_suffix;
    } else {
        // Past the end, inside the lookahead window: the layout stands,
        // but the tokens were lexed from bytes that changed.
    }

    let mut left = Length::ZERO;
    let mut absorbed = false;
    for i in 0..data.children.len() {
        let child_total = data.children[i].subtree.total();
        let child_lookahead = data.children[i].subtree.lookahead_bytes() as usize;
        let right = left + child_total;

        // Ends (lookahead included) before the edit: untouched.
        if right.bytes + child_lookahead < start.bytes {
            left = right;
            continue;
        }
        // Starts after the replaced span: shifts for free. A pure
        // insertion exactly at this child's start still belongs to it.
        if left.bytes > old_end.bytes || (left.bytes == old_end.bytes && old_end.bytes > start.bytes)
        {
            break;
        }

        let child_start = if start.bytes > left.bytes {
            start - left
        } else {
            Length::ZERO
        };
        let mut child_old_end = if old_end.bytes > right.bytes {
            child_total
        } else if old_end.bytes > left.bytes {
            old_end - left
        } else {
            Length::ZERO
        };
        // When the edit begins past this child and only its lookahead is
        // affected, the clamped span would invert; pin it to the start.
        if child_old_end.bytes < child_start.bytes {
            child_old_end = child_start;
        }
        // The first child whose span reaches past the edit start takes
        // the whole replacement text; later children only lose what the
        // replaced span covered of them.
        let child_new_end = if !absorbed && right.bytes > start.bytes {
            absorbed = true;
            new_end - left
        } else {
            child_start
        };

        apply_edit(
            &mut data.children[i].subtree,
            child_start,
            child_old_end,
            child_new_end,
        );
        left = right;
    }
}
