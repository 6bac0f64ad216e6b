//! The graph-structured stack.
//!
//! Each parse head owns an `Arc` chain of entries. Forking a head is a
//! pointer copy, and the shared tail keeps the cost of a fork proportional
//! to the divergence rather than the stack depth.

use std::sync::Arc;

use cambium_core::Child;
use cambium_core::grammar::StateId;

struct StackEntry {
    state: StateId,
    /// `None` only on the bottom sentinel.
    slot: Option<Child>,
    /// Extras and error groupings sit on the stack without counting
    /// toward production arity.
    countable: bool,
    prev: Option<Arc<StackEntry>>,
}

#[derive(Clone)]
pub(crate) struct Stack {
    top: Arc<StackEntry>,
}

impl Stack {
    pub fn new(start: StateId) -> Stack {
        Stack {
            top: Arc::new(StackEntry {
                state: start,
                slot: None,
                countable: false,
                prev: None,
            }),
        }
    }

    #[inline]
    pub fn state(&self) -> StateId {
        self.top.state
    }

    pub fn push(&mut self, state: StateId, slot: Child, countable: bool) {
        let prev = Some(Arc::clone(&self.top));
        self.top = Arc::new(StackEntry {
            state,
            slot: Some(slot),
            countable,
            prev,
        });
    }

    /// The topmost slot, if any.
    pub fn top(&self) -> Option<(&Child, bool)> {
        self.top.slot.as_ref().map(|slot| (slot, self.top.countable))
    }

    /// Pops the topmost slot.
    pub fn pop_slot(&mut self) -> Option<(Child, bool)> {
        let slot = self.top.slot.clone()?;
        let countable = self.top.countable;
        if let Some(prev) = self.top.prev.clone() {
            self.top = prev;
        }
        Some((slot, countable))
    }

    /// Pops entries until `count` countable slots have come off, returning
    /// them in push order. Extras interleaved with the popped span come
    /// along; anything below the last countable entry stays.
    pub fn pop(&mut self, count: usize) -> Vec<(Child, bool)> {
        let mut popped = Vec::new();
        let mut remaining = count;
        while remaining > 0 {
            let Some(slot) = self.top.slot.clone() else {
                break;
            };
            let countable = self.top.countable;
            if countable {
                remaining -= 1;
            }
            popped.push((slot, countable));
            if let Some(prev) = self.top.prev.clone() {
                self.top = prev;
            }
        }
        popped.reverse();
        popped
    }

    /// Pops everything down to the bottom sentinel, in push order.
    pub fn drain(&mut self) -> Vec<(Child, bool)> {
        let mut popped = Vec::new();
        while let Some(entry) = self.pop_slot() {
            popped.push(entry);
        }
        popped.reverse();
        popped
    }
}
