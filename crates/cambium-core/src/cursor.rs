//! Stateful traversal over the visible tree.
//!
//! A cursor keeps the path from its root node, so moving to a child,
//! sibling or parent is cheap where the node API would re-descend from
//! the tree root each time.

use crate::grammar::FieldId;
use crate::node::Node;
use crate::points::Point;
use crate::tree::Tree;

pub struct TreeCursor<'tree> {
    tree: &'tree Tree,
    root: Node<'tree>,
    stack: Vec<Frame<'tree>>,
}

#[derive(Clone, Copy)]
struct Frame<'tree> {
    node: Node<'tree>,
    /// Slot index in the parent's raw child vector, hidden slots counted.
    raw_index: usize,
    field: Option<FieldId>,
}

impl<'tree> TreeCursor<'tree> {
    pub(crate) fn new(tree: &'tree Tree) -> TreeCursor<'tree> {
        TreeCursor {
            tree,
            root: tree.root_node(),
            stack: Vec::new(),
        }
    }

    pub(crate) fn with_root(tree: &'tree Tree, root: Node<'tree>) -> TreeCursor<'tree> {
        TreeCursor {
            tree,
            root,
            stack: Vec::new(),
        }
    }

    /// The node the cursor is on.
    pub fn node(&self) -> Node<'tree> {
        match self.stack.last() {
            Some(frame) => frame.node,
            None => self.root,
        }
    }

    /// The field of the current node in its parent, if any.
    pub fn field_id(&self) -> Option<FieldId> {
        self.stack.last().and_then(|frame| frame.field)
    }

    pub fn field_name(&self) -> Option<&'tree str> {
        Some(self.tree.grammar().field_name(self.field_id()?))
    }

    /// Depth below the cursor's root node.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Moves to the first visible child. Stays put and returns false on
    /// leaves.
    pub fn goto_first_child(&mut self) -> bool {
        let parent = self.node();
        let mut position = parent.position();
        for (raw_index, child) in parent.subtree().children().iter().enumerate() {
            let node = parent.slot_node(child, position);
            if node.is_visible() {
                self.stack.push(Frame {
                    node,
                    raw_index,
                    field: child.field(),
                });
                return true;
            }
            position = position + child.subtree().total();
        }
        false
    }

    /// Moves to the next visible sibling, if any.
    pub fn goto_next_sibling(&mut self) -> bool {
        let Some(frame) = self.stack.last().copied() else {
            return false;
        };
        let parent = self.parent_node();
        let mut position = frame.node.position() + frame.node.subtree().total();
        let slots = parent.subtree().children();
        for (offset, child) in slots[frame.raw_index + 1..].iter().enumerate() {
            let node = parent.slot_node(child, position);
            if node.is_visible() {
                let top = self.stack.len() - 1;
                self.stack[top] = Frame {
                    node,
                    raw_index: frame.raw_index + 1 + offset,
                    field: child.field(),
                };
                return true;
            }
            position = position + child.subtree().total();
        }
        false
    }

    /// Moves to the parent. Returns false at the cursor's root.
    pub fn goto_parent(&mut self) -> bool {
        self.stack.pop().is_some()
    }

    /// Moves to the first visible child extending past `byte`, returning
    /// its index among the visible children.
    pub fn goto_first_child_for_byte(&mut self, byte: usize) -> Option<usize> {
        let parent = self.node();
        let mut position = parent.position();
        let mut visible_index = 0;
        for (raw_index, child) in parent.subtree().children().iter().enumerate() {
            let node = parent.slot_node(child, position);
            position = position + child.subtree().total();
            if !node.is_visible() {
                continue;
            }
            if node.end_byte() > byte {
                self.stack.push(Frame {
                    node,
                    raw_index,
                    field: child.field(),
                });
                return Some(visible_index);
            }
            visible_index += 1;
        }
        None
    }

    /// Moves to the first visible child extending past `point`, returning
    /// its index among the visible children.
    pub fn goto_first_child_for_point(&mut self, point: Point) -> Option<usize> {
        let parent = self.node();
        let mut position = parent.position();
        let mut visible_index = 0;
        for (raw_index, child) in parent.subtree().children().iter().enumerate() {
            let node = parent.slot_node(child, position);
            position = position + child.subtree().total();
            if !node.is_visible() {
                continue;
            }
            if node.end_position() > point {
                self.stack.push(Frame {
                    node,
                    raw_index,
                    field: child.field(),
                });
                return Some(visible_index);
            }
            visible_index += 1;
        }
        None
    }

    /// Re-targets the cursor at `node`, clearing the path.
    pub fn reset(&mut self, node: Node<'tree>) {
        self.root = node;
        self.stack.clear();
    }

    fn parent_node(&self) -> Node<'tree> {
        if self.stack.len() >= 2 {
            self.stack[self.stack.len() - 2].node
        } else {
            self.root
        }
    }
}
