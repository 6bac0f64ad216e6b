//! Parser infrastructure for the pattern language.
//!
//! # Architecture
//!
//! This parser produces a lossless concrete syntax tree (CST) via Rowan's
//! green tree builder. Key design decisions borrowed from rust-analyzer and
//! rnix-parser:
//!
//! - Zero-copy lexing: tokens carry spans, text sliced only when building
//!   tree nodes
//! - Trivia buffering: whitespace/comments collected, then attached as
//!   leading trivia
//! - Checkpoint-based wrapping: retroactively wrap nodes for quantifiers
//!   `*+?` and capture suffixes `@name`
//! - Explicit recovery sets: per-production sets determine when to bail vs
//!   consume diagnostics
//!
//! # Recovery Strategy
//!
//! The parser is resilient and always produces a tree. Recovery follows
//! these rules:
//!
//! 1. Unknown tokens get wrapped in `SyntaxKind::Error` nodes and consumed
//! 2. Missing expected tokens emit a diagnostic but don't consume (parent
//!    may handle)
//! 3. Recovery sets define synchronization points per production
//! 4. On recursion limit, remaining input goes into a single Error node

pub mod ast;
pub mod cst;
pub mod lexer;

mod core;
mod grammar;

#[cfg(test)]
mod lexer_tests;

pub use cst::{SyntaxKind, SyntaxNode, SyntaxToken};

pub use ast::{
    Alt, Anchor, Capture, Expr, Field, Group, NegatedField, Pred, PredArg, Quantifier, Root, Str,
    Tree, Wildcard,
};

pub use core::Parser;

use crate::diagnostics::Diagnostics;
use lexer::lex;

/// Parse result containing the green tree.
///
/// The tree is always complete; diagnostics are returned separately.
/// Error nodes in the tree represent recovery points.
#[derive(Debug, Clone)]
pub struct Parse {
    cst: rowan::GreenNode,
}

impl Parse {
    pub fn as_cst(&self) -> &rowan::GreenNode {
        &self.cst
    }

    /// Creates a typed view over the immutable green tree.
    /// This is cheap; SyntaxNode is a thin wrapper with parent pointers.
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.cst.clone())
    }
}

/// Main entry point. Always produces a tree; syntax problems surface as
/// diagnostics.
pub fn parse(source: &str) -> (Parse, Diagnostics) {
    let mut parser = Parser::new(source, lex(source));
    parser.parse_root();
    let (cst, diagnostics) = parser.finish();
    (Parse { cst }, diagnostics)
}
