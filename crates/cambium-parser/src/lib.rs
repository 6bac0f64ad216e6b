#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! The incremental GLR parser for Cambium grammars.
//!
//! [`Parser`] turns source text plus a compiled grammar from
//! `cambium-core` into a syntax [`Tree`](cambium_core::Tree). The engine
//! underneath is a generalized LR loop: conflicted states fork parse
//! heads, the heads race, and the cheapest finished parse wins. Feeding
//! back an edited previous tree reuses its unchanged subtrees, which is
//! what makes reparsing after a small edit cheap.
//!
//! Text arrives through [`TextInput`], either UTF-8 or UTF-16LE; invalid
//! sequences decode as U+FFFD without stopping the parse. Tokens whose
//! shape a DFA cannot express can be produced by an [`ExternalScanner`].

mod engine;
mod external;
mod input;
mod lexer;
mod parser;
mod reuse;
mod stack;
mod trace;

#[cfg(test)]
mod input_tests;

pub use engine::ParseLimits;
pub use external::{ExternalScanner, ScanCursor};
pub use input::{ChunkedInput, InputEncoding, TextInput};
pub use parser::{ParseError, Parser};
pub use trace::{NoopTracer, ParseTracer, PrintTracer, Verbosity};
