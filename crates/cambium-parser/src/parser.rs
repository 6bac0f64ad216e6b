//! The public parsing facade.

use std::sync::Arc;

use cambium_core::Tree;
use cambium_core::grammar::Grammar;
use thiserror::Error;

use crate::engine::{Engine, ParseLimits};
use crate::external::ExternalScanner;
use crate::input::{InputEncoding, InputReader, TextInput};
use crate::reuse::ReuseCursor;
use crate::trace::{NoopTracer, ParseTracer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no grammar set")]
    NoGrammar,
}

/// A reusable parser. Holds a grammar, an optional external scanner, and
/// the engine's limits; each [`Parser::parse`] call produces an immutable
/// [`Tree`].
///
/// Passing the previous tree (after recording edits on it with
/// [`Tree::edit`]) makes the parse incremental: unchanged subtrees are
/// carried over instead of re-lexed.
#[derive(Default)]
pub struct Parser {
    grammar: Option<Arc<Grammar>>,
    scanner: Option<Box<dyn ExternalScanner>>,
    limits: ParseLimits,
}

impl Parser {
    pub fn new() -> Parser {
        Parser::default()
    }

    pub fn set_grammar(&mut self, grammar: Arc<Grammar>) {
        self.grammar = Some(grammar);
    }

    pub fn grammar(&self) -> Option<&Arc<Grammar>> {
        self.grammar.as_ref()
    }

    /// Installs a scanner for the grammar's external tokens. The scanner
    /// is consulted before the built-in lexer whenever the current state
    /// admits an external terminal.
    pub fn set_external_scanner(&mut self, scanner: Box<dyn ExternalScanner>) {
        self.scanner = Some(scanner);
    }

    pub fn set_limits(&mut self, limits: ParseLimits) {
        self.limits = limits;
    }

    /// Parses a UTF-8 string, reusing `old_tree` where possible.
    pub fn parse(&mut self, source: &str, old_tree: Option<&Tree>) -> Result<Tree, ParseError> {
        let mut tracer = NoopTracer;
        self.parse_traced(source, old_tree, &mut tracer)
    }

    /// Like [`Parser::parse`], reporting every engine step to `tracer`.
    pub fn parse_traced<T: ParseTracer>(
        &mut self,
        source: &str,
        old_tree: Option<&Tree>,
        tracer: &mut T,
    ) -> Result<Tree, ParseError> {
        let mut input = source;
        self.parse_with_traced(&mut input, InputEncoding::Utf8, old_tree, tracer)
    }

    /// Parses from an arbitrary [`TextInput`] in the given encoding.
    pub fn parse_with(
        &mut self,
        input: &mut dyn TextInput,
        encoding: InputEncoding,
        old_tree: Option<&Tree>,
    ) -> Result<Tree, ParseError> {
        let mut tracer = NoopTracer;
        self.parse_with_traced(input, encoding, old_tree, &mut tracer)
    }

    pub fn parse_with_traced<T: ParseTracer>(
        &mut self,
        input: &mut dyn TextInput,
        encoding: InputEncoding,
        old_tree: Option<&Tree>,
        tracer: &mut T,
    ) -> Result<Tree, ParseError> {
        let grammar = self.grammar.clone().ok_or(ParseError::NoGrammar)?;
        // A tree from a different grammar has nothing safe to offer.
        let reuse = old_tree
            .filter(|tree| Arc::ptr_eq(tree.grammar(), &grammar))
            .map(|tree| ReuseCursor::new(tree.root_subtree().clone()));
        let reader = InputReader::new(input, encoding);
        let engine = Engine::new(
            &grammar,
            reader,
            self.scanner.as_deref_mut().map(|s| s as &mut dyn ExternalScanner),
            reuse,
            self.limits,
            tracer,
        );
        let root = engine.run();
        Ok(Tree::new(grammar, root))
    }
}
