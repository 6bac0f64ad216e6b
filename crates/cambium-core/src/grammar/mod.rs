//! Grammar descriptors and compiled parse tables.
//!
//! Two layers:
//! - **Descriptor layer** ([`GrammarSpec`], [`Rule`]): 1:1 with tree-sitter's
//!   grammar.json, deserialized via serde.
//! - **Compiled layer** ([`Grammar`]): interned symbols, fixed-arity
//!   productions, LR states with conflict resolution baked in, and a
//!   multi-pattern lexer DFA. This is what the parser runtime consumes.
//!
//! Compiled grammars serialize to a compact checksummed snapshot so that
//! table construction can be paid once per language rather than once per
//! process.

mod build;
mod json;
mod rules;
mod snapshot;
mod tables;

#[cfg(test)]
mod build_tests;
#[cfg(test)]
mod json_tests;
#[cfg(test)]
mod snapshot_tests;

pub use rules::{Associativity, GrammarSpec, Precedence, PrecedenceEntry, Rule};
pub use tables::{
    FieldId, Grammar, LexTable, ParseState, ProdId, Production, StateId, Step, Symbol, SymbolKind,
    SymbolSet, TerminalDef,
};

/// Error while loading or compiling a grammar.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),

    #[error("binary decode error: {0}")]
    Binary(#[source] postcard::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("grammar has no rules")]
    NoRules,

    #[error("rule `{rule}` references undefined symbol `{name}`")]
    UndefinedSymbol { rule: String, name: String },

    #[error("named precedence `{0}` does not appear in any precedence ordering")]
    UndefinedPrecedence(String),

    #[error("invalid token pattern /{pattern}/: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("`word` must name a token rule, but `{0}` is not one")]
    InvalidWord(String),

    #[error("grammar requires {0} symbols (max 65535)")]
    TooManySymbols(usize),

    #[error("grammar requires {0} fields (max 65535)")]
    TooManyFields(usize),

    #[error("unsupported grammar feature: {0}")]
    Unsupported(&'static str),

    #[error("snapshot header is malformed or truncated")]
    SnapshotHeader,

    #[error("snapshot checksum mismatch")]
    SnapshotChecksum,

    #[error("unsupported snapshot version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
}
