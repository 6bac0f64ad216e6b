#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Incremental parsing and pattern queries over Cambium grammars.
//!
//! This crate bundles the Cambium workspace behind one dependency:
//!
//! - compiled [`Grammar`] tables and the persistent [`Tree`] / [`Node`] /
//!   [`TreeCursor`] views from `cambium-core`,
//! - the incremental GLR [`Parser`] from `cambium-parser`,
//! - the s-expression pattern [`Query`] engine from `cambium-query`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cambium_lib::{Grammar, Parser, Query, QueryCursor};
//!
//! let grammar = Arc::new(Grammar::from_json(r#"{
//!     "name": "mini",
//!     "rules": {
//!         "module": { "type": "REPEAT", "content": { "type": "SYMBOL", "name": "definition" } },
//!         "definition": { "type": "SEQ", "members": [
//!             { "type": "FIELD", "name": "name", "content": { "type": "SYMBOL", "name": "identifier" } },
//!             { "type": "STRING", "value": "=" },
//!             { "type": "FIELD", "name": "body", "content": { "type": "SYMBOL", "name": "number" } }
//!         ]},
//!         "identifier": { "type": "PATTERN", "value": "[a-z]+" },
//!         "number": { "type": "PATTERN", "value": "[0-9]+" }
//!     },
//!     "extras": [ { "type": "PATTERN", "value": "\\s+" } ]
//! }"#)?);
//!
//! let mut parser = Parser::new();
//! parser.set_grammar(Arc::clone(&grammar));
//! let source = "answer = 42";
//! let tree = parser.parse(source, None)?;
//! assert_eq!(
//!     tree.root_node().to_sexp(),
//!     "(module (definition name: (identifier) body: (number)))"
//! );
//!
//! let query = Query::new(grammar, "(definition name: (identifier) @name)")?;
//! let mut cursor = QueryCursor::new();
//! let names: Vec<&str> = cursor
//!     .matches(&query, tree.root_node(), source.as_bytes())
//!     .map(|m| m.captures[0].node.utf8_text(source.as_bytes()).unwrap())
//!     .collect();
//! assert_eq!(names, ["answer"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Editing goes through [`Tree::edit`] with an [`InputEdit`], after which
//! the tree can be handed back to [`Parser::parse`] to reuse everything
//! the edit did not touch. [`Tree::changed_ranges`] reports what actually
//! changed between the old tree and its reparse.

pub use cambium_core::grammar::{Grammar, GrammarError, GrammarSpec};
pub use cambium_core::{InputEdit, Node, Point, Range, Tree, TreeCursor};
pub use cambium_parser::{
    ChunkedInput, ExternalScanner, InputEncoding, NoopTracer, ParseError, ParseLimits,
    ParseTracer, Parser, PrintTracer, ScanCursor, TextInput, Verbosity,
};
pub use cambium_query::{
    Query, QueryCapture, QueryCaptures, QueryCursor, QueryError, QueryErrorKind, QueryMatch,
    QueryMatches,
};
