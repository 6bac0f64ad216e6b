#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for Cambium: compiled grammars and persistent
//! syntax trees.
//!
//! Two layers:
//! - **Grammar**: JSON grammar definitions compiled to LR parse tables
//!   and a lexer DFA, with a binary snapshot format for reuse.
//! - **Trees**: immutable, structurally shared subtrees behind cheap
//!   handles, plus the node and cursor views the rest of the system
//!   reads them through.
//!
//! Parsing itself lives in `cambium-parser`; this crate only defines
//! what parsers produce and consume.

pub mod grammar;

mod changed_ranges;
mod cursor;
mod node;
mod points;
mod subtree;
mod tree;

#[cfg(test)]
mod node_tests;
#[cfg(test)]
mod subtree_tests;

pub use cursor::TreeCursor;
pub use node::Node;
pub use points::{InputEdit, Length, Point, Range};
pub use subtree::{Child, Subtree, SubtreeFlags};
pub use tree::Tree;
