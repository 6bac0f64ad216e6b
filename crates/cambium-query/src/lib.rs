#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Pattern matching over Cambium syntax trees.
//!
//! Queries are s-expression patterns in the tree-sitter style, compiled
//! once against a grammar and then run over any tree parsed with that
//! grammar.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cambium_core::grammar::Grammar;
//! use cambium_parser::Parser;
//! use cambium_query::{Query, QueryCursor};
//!
//! let grammar = Arc::new(Grammar::from_json(r#"{
//!     "name": "mini",
//!     "rules": {
//!         "module": { "type": "REPEAT", "content": { "type": "SYMBOL", "name": "definition" } },
//!         "definition": { "type": "SEQ", "members": [
//!             { "type": "FIELD", "name": "name", "content": { "type": "SYMBOL", "name": "identifier" } },
//!             { "type": "STRING", "value": "=" },
//!             { "type": "SYMBOL", "name": "number" }
//!         ]},
//!         "identifier": { "type": "PATTERN", "value": "[a-z]+" },
//!         "number": { "type": "PATTERN", "value": "[0-9]+" }
//!     },
//!     "extras": [ { "type": "PATTERN", "value": "\\s+" } ]
//! }"#).unwrap());
//!
//! let mut parser = Parser::new();
//! parser.set_grammar(Arc::clone(&grammar));
//! let source = "x = 1\ny = 2\n";
//! let tree = parser.parse(source, None).unwrap();
//!
//! let query = Query::new(grammar, "(definition name: (identifier) @def)").unwrap();
//! let mut cursor = QueryCursor::new();
//! let names: Vec<&str> = cursor
//!     .matches(&query, tree.root_node(), source.as_bytes())
//!     .map(|m| m.captures[0].node.utf8_text(source.as_bytes()).unwrap())
//!     .collect();
//! assert_eq!(names, ["x", "y"]);
//! ```

pub mod diagnostics;
pub mod parser;

mod compile;
mod exec;

#[cfg(test)]
mod compile_tests;

pub use compile::Query;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use exec::{QueryCapture, QueryCaptures, QueryCursor, QueryMatch, QueryMatches};

/// What a pattern document got wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// A node kind that the grammar does not define.
    NodeKind,
    /// A field name that the grammar does not define.
    Field,
    /// A predicate referencing a capture the pattern never binds.
    Capture,
    /// An unknown or malformed predicate.
    Predicate,
    /// The pattern document itself does not parse.
    Syntax,
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            QueryErrorKind::NodeKind => "invalid node kind",
            QueryErrorKind::Field => "invalid field",
            QueryErrorKind::Capture => "invalid capture",
            QueryErrorKind::Predicate => "invalid predicate",
            QueryErrorKind::Syntax => "malformed pattern",
        };
        f.write_str(text)
    }
}

/// Compilation failure, positioned within the pattern document.
///
/// `kind`, `offset` and `message` describe the first problem found;
/// `offset` is a byte offset into the pattern source. The full set of
/// problems is kept for rendering.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} at offset {offset}: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub offset: usize,
    pub message: String,
    diagnostics: Diagnostics,
}

impl QueryError {
    pub(crate) fn from_diagnostics(diagnostics: Diagnostics) -> Option<QueryError> {
        let first = diagnostics.first()?;
        let kind = first.kind.category();
        let offset = u32::from(first.range.start()) as usize;
        let message = first.message.clone();
        Some(QueryError { kind, offset, message, diagnostics })
    }

    /// Every problem found in the document.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Render all problems as annotated snippets of the pattern source.
    pub fn render(&self, pattern_source: &str) -> String {
        self.diagnostics.render(pattern_source)
    }
}
