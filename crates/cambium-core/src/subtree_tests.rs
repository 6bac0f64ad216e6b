use crate::grammar::Symbol;
use crate::points::{Length, Point};
use crate::subtree::{Child, Subtree, SubtreeFlags};

fn len(bytes: usize, row: usize, column: usize) -> Length {
    Length::new(bytes, Point::new(row, column))
}

fn plain(subtree: Subtree) -> Child {
    Child::new(subtree, None, None)
}

fn sym(raw: u16) -> Symbol {
    Symbol(raw)
}

#[test]
fn leaf_layout() {
    let leaf = Subtree::leaf(sym(3), len(2, 0, 2), len(3, 0, 3), 7, 1, SubtreeFlags::EMPTY);
    assert_eq!(leaf.padding().bytes, 2);
    assert_eq!(leaf.size().bytes, 3);
    assert_eq!(leaf.total(), len(5, 0, 5));
    assert_eq!(leaf.parse_state(), 7);
    assert_eq!(leaf.lookahead_bytes(), 1);
    assert_eq!(leaf.error_cost(), 0);
    assert_eq!(leaf.child_count(), 0);
    assert!(!leaf.has_error());
}

#[test]
fn node_layout_from_children() {
    let a = Subtree::leaf(sym(3), len(2, 0, 2), len(3, 0, 3), 1, 0, SubtreeFlags::EMPTY);
    let b = Subtree::leaf(sym(4), len(1, 0, 1), len(4, 0, 4), 2, 0, SubtreeFlags::EMPTY);
    let node = Subtree::node(sym(5), 1, SubtreeFlags::EMPTY, vec![plain(a), plain(b)]);

    // Padding comes from the first child; everything after the first
    // token is size.
    assert_eq!(node.padding(), len(2, 0, 2));
    assert_eq!(node.size(), len(8, 0, 8));
    assert_eq!(node.total(), len(10, 0, 10));
    assert_eq!(node.child_count(), 2);
}

#[test]
fn node_with_no_children_is_zero_width() {
    let node = Subtree::node(sym(5), 3, SubtreeFlags::EMPTY, vec![]);
    assert!(node.total().is_zero());
    assert_eq!(node.lookahead_bytes(), 0);
}

#[test]
fn lookahead_reaches_farthest_consulted_byte() {
    // First token was recognized by peeking 4 bytes past its end, well
    // into (and past) its sibling.
    let a = Subtree::leaf(sym(3), Length::ZERO, len(5, 0, 5), 1, 4, SubtreeFlags::EMPTY);
    let b = Subtree::leaf(sym(4), Length::ZERO, len(3, 0, 3), 2, 0, SubtreeFlags::EMPTY);
    let node = Subtree::node(sym(5), 1, SubtreeFlags::EMPTY, vec![plain(a), plain(b)]);
    assert_eq!(node.total().bytes, 8);
    assert_eq!(node.lookahead_bytes(), 1);

    let a = Subtree::leaf(sym(3), Length::ZERO, len(5, 0, 5), 1, 4, SubtreeFlags::EMPTY);
    let b = Subtree::leaf(sym(4), Length::ZERO, len(3, 0, 3), 2, 2, SubtreeFlags::EMPTY);
    let node = Subtree::node(sym(5), 1, SubtreeFlags::EMPTY, vec![plain(a), plain(b)]);
    assert_eq!(node.lookahead_bytes(), 2);
}

#[test]
fn inherited_flags_propagate_to_parent() {
    let changed = Subtree::leaf(
        sym(3),
        Length::ZERO,
        len(1, 0, 1),
        1,
        0,
        SubtreeFlags::HAS_CHANGES | SubtreeFlags::FRAGILE,
    );
    let node = Subtree::node(sym(5), 1, SubtreeFlags::EMPTY, vec![plain(changed)]);
    assert!(node.has_changes());
    assert!(node.is_fragile());
    assert!(!node.has_error());
}

#[test]
fn structural_flags_stay_local() {
    let extra = Subtree::leaf(
        sym(3),
        Length::ZERO,
        len(1, 0, 1),
        1,
        0,
        SubtreeFlags::IS_EXTRA,
    );
    let missing = Subtree::missing(sym(4), 1, 110);
    let node = Subtree::node(sym(5), 1, SubtreeFlags::EMPTY, vec![plain(extra), plain(missing)]);
    assert!(!node.is_extra());
    assert!(!node.is_missing());
    // The missing child still poisons the parent through HAS_ERROR.
    assert!(node.has_error());
    assert_eq!(node.error_cost(), 110);
}

#[test]
fn missing_token_is_zero_width() {
    let missing = Subtree::missing(sym(4), 9, 110);
    assert!(missing.total().is_zero());
    assert!(missing.is_missing());
    assert!(missing.has_error());
    assert!(!missing.is_error());
    assert_eq!(missing.error_cost(), 110);
    assert_eq!(missing.parse_state(), 9);
}

#[test]
fn error_node_accumulates_cost() {
    let a = Subtree::leaf(sym(3), Length::ZERO, len(2, 0, 2), 1, 0, SubtreeFlags::EMPTY);
    let missing = Subtree::missing(sym(4), 1, 110);
    let error = Subtree::error(1, 500, vec![plain(a), plain(missing)]);
    assert_eq!(error.kind(), Symbol::ERROR);
    assert!(error.is_error());
    assert!(error.has_error());
    assert_eq!(error.error_cost(), 610);
    assert_eq!(error.total().bytes, 2);
}

#[test]
fn into_root_spans_entire_input() {
    let a = Subtree::leaf(sym(3), len(2, 0, 2), len(3, 0, 3), 1, 0, SubtreeFlags::EMPTY);
    let node = Subtree::node(sym(5), 1, SubtreeFlags::EMPTY, vec![plain(a)]);
    let root = node.into_root(len(4, 1, 0));
    assert_eq!(root.padding(), Length::ZERO);
    assert_eq!(root.size(), len(9, 1, 0));
    assert_eq!(root.total(), len(9, 1, 0));
    // The child keeps its own layout.
    assert_eq!(root.child(0).unwrap().padding().bytes, 2);
}

#[test]
fn clones_share_the_allocation() {
    let leaf = Subtree::leaf(sym(3), Length::ZERO, len(1, 0, 1), 1, 0, SubtreeFlags::EMPTY);
    let copy = leaf.clone();
    assert!(leaf.ptr_eq(&copy));

    let other = Subtree::leaf(sym(3), Length::ZERO, len(1, 0, 1), 1, 0, SubtreeFlags::EMPTY);
    assert!(!leaf.ptr_eq(&other));
}

#[test]
fn flag_set_operations() {
    let mut flags = SubtreeFlags::EMPTY;
    assert!(!flags.contains(SubtreeFlags::HAS_CHANGES));
    flags.insert(SubtreeFlags::HAS_CHANGES);
    flags.insert(SubtreeFlags::IS_EXTRA);
    assert!(flags.contains(SubtreeFlags::HAS_CHANGES));
    assert!(flags.contains(SubtreeFlags::IS_EXTRA));
    flags.remove(SubtreeFlags::HAS_CHANGES);
    assert!(!flags.contains(SubtreeFlags::HAS_CHANGES));
    assert!(flags.contains(SubtreeFlags::IS_EXTRA));
}
