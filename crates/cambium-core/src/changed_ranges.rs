//! Structural diff between an edited tree and its reparse.
//!
//! Both trees must describe the same document: the old tree with its
//! edits applied, the new tree fresh from the parser. The diff walks the
//! two in lock step and reports, in new-document coordinates, the spans
//! whose syntactic interpretation differs. Reused subtrees short-circuit
//! on pointer identity, so the walk touches only what the reparse
//! rebuilt. Text replaced by an edit that parses to the same shape, a
//! renamed identifier say, yields no ranges.

use crate::grammar::Symbol;
use crate::points::{Length, Range};
use crate::subtree::Subtree;

pub(crate) fn between(old: &Subtree, new: &Subtree) -> Vec<Range> {
    let mut out = Vec::new();
    diff(old, None, new, None, Length::ZERO, &mut out);
    merge(out)
}

fn diff(
    old: &Subtree,
    old_alias: Option<Symbol>,
    new: &Subtree,
    new_alias: Option<Symbol>,
    new_pos: Length,
    out: &mut Vec<Range>,
) {
    if old.ptr_eq(new) {
        return;
    }
    if old_alias.unwrap_or_else(|| old.kind()) != new_alias.unwrap_or_else(|| new.kind()) {
        push_span(new, new_pos, out);
        return;
    }
    let old_children = old.children();
    let new_children = new.children();
    if old_children.is_empty() || new_children.is_empty() {
        if old_children.len() != new_children.len()
            || old.total().bytes != new.total().bytes
            || old.padding().bytes != new.padding().bytes
        {
            push_span(new, new_pos, out);
        }
        return;
    }

    // Align children by kind, falling back to span order when the two
    // sides disagree. Offsets are local to each parent, so a shifted but
    // otherwise identical tail compares clean.
    let mut i = 0;
    let mut j = 0;
    let mut old_off = Length::ZERO;
    let mut new_off = Length::ZERO;
    while i < old_children.len() && j < new_children.len() {
        let old_child = &old_children[i];
        let new_child = &new_children[j];
        let old_end = old_off + old_child.subtree().total();
        let new_end = new_off + new_child.subtree().total();
        let old_kind = old_child
            .alias()
            .unwrap_or_else(|| old_child.subtree().kind());
        let new_kind = new_child
            .alias()
            .unwrap_or_else(|| new_child.subtree().kind());

        if old_kind == new_kind {
            if !old_child.subtree().ptr_eq(new_child.subtree()) {
                diff(
                    old_child.subtree(),
                    old_child.alias(),
                    new_child.subtree(),
                    new_child.alias(),
                    new_pos + new_off,
                    out,
                );
            }
            i += 1;
            j += 1;
            old_off = old_end;
            new_off = new_end;
        } else if new_end.bytes <= old_end.bytes {
            push_span(new_child.subtree(), new_pos + new_off, out);
            j += 1;
            new_off = new_end;
        } else {
            i += 1;
            old_off = old_end;
        }
    }
    while j < new_children.len() {
        let new_child = &new_children[j];
        push_span(new_child.subtree(), new_pos + new_off, out);
        new_off = new_off + new_child.subtree().total();
        j += 1;
    }
    // Old children without a counterpart are deletions; the surrounding
    // structure already accounts for them.
}

fn push_span(subtree: &Subtree, position: Length, out: &mut Vec<Range>) {
    out.push(Range::between(
        position + subtree.padding(),
        position + subtree.total(),
    ));
}

fn merge(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|r| (r.start_byte, r.end_byte));
    let mut out: Vec<Range> = Vec::new();
    for range in ranges {
        if let Some(last) = out.last_mut() {
            if range.start_byte <= last.end_byte {
                if range.end_byte > last.end_byte {
                    last.end_byte = range.end_byte;
                    last.end_point = range.end_point;
                }
                continue;
            }
        }
        out.push(range);
    }
    out
}
