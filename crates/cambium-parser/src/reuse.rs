//! Subtree reuse during incremental parsing.
//!
//! The cursor walks the edited previous tree left to right, offering at
//! each request the largest subtree that starts exactly at the given
//! position. The engine peeks without consuming: shifting simply moves its
//! own position past the subtree and the next request realigns. Rejecting
//! a candidate descends into it so the engine can retry with its children.

use cambium_core::{Length, Subtree};

pub(crate) struct ReuseCursor {
    frames: Vec<Frame>,
}

struct Frame {
    node: Subtree,
    index: usize,
    /// Absolute start of `node.children()[index]`, padding included.
    start: Length,
}

impl ReuseCursor {
    pub fn new(root: Subtree) -> ReuseCursor {
        // The walk starts inside the root, making top-level children the
        // first candidates. The root itself is never offered; it has to
        // be rebuilt anyway to absorb growth at either end.
        ReuseCursor {
            frames: vec![Frame {
                node: root,
                index: 0,
                start: Length::ZERO,
            }],
        }
    }

    /// The largest not-yet-rejected subtree starting exactly at
    /// `position`, if one exists.
    pub fn candidate(&mut self, position: Length) -> Option<&Subtree> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return None;
            };
            if frame.index >= frame.node.child_count() {
                self.frames.pop();
                if let Some(parent) = self.frames.last_mut() {
                    let total = parent.node.children()[parent.index].subtree().total();
                    parent.start += total;
                    parent.index += 1;
                }
                continue;
            }
            let start = frame.start;
            let subtree = frame.node.children()[frame.index].subtree();
            let end = start + subtree.total();
            if end.bytes <= position.bytes {
                frame.start = end;
                frame.index += 1;
                continue;
            }
            if start.bytes == position.bytes {
                break;
            }
            if start.bytes > position.bytes {
                // Rejections already moved the walk past this position;
                // nothing can align until the parse catches up.
                return None;
            }
            // The position falls strictly inside this child. Error
            // groupings are opaque: their members came out of recovery
            // lexing and carry no reusable context.
            if subtree.child_count() > 0 && !subtree.is_error() {
                let node = subtree.clone();
                self.frames.push(Frame {
                    node,
                    index: 0,
                    start,
                });
                continue;
            }
            // A leaf straddles the position; nothing aligns here.
            return None;
        }
        let frame = self.frames.last()?;
        Some(frame.node.children()[frame.index].subtree())
    }

    /// Discards the current candidate and tries its children next. On a
    /// leaf or an error grouping the cursor moves past it entirely.
    pub fn reject(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if frame.index >= frame.node.child_count() {
            return;
        }
        let start = frame.start;
        let subtree = frame.node.children()[frame.index].subtree();
        if subtree.child_count() > 0 && !subtree.is_error() {
            let node = subtree.clone();
            self.frames.push(Frame {
                node,
                index: 0,
                start,
            });
        } else {
            let total = subtree.total();
            frame.start = start + total;
            frame.index += 1;
        }
    }
}
