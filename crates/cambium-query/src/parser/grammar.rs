//! Productions for the pattern language.
//!
//! The grammar follows tree-sitter query syntax: node patterns, literals,
//! wildcards, fields, captures, quantifiers, anchors, alternations, groups
//! and predicate applications.

use rowan::Checkpoint;

use super::core::Parser;
use super::cst::SyntaxKind;
use super::cst::token_sets::{ALT_RECOVERY, EXPR_FIRST, NODE_RECOVERY, QUANTIFIERS, ROOT_FIRST};
use crate::diagnostics::DiagnosticKind;

impl Parser<'_> {
    pub(crate) fn parse_root(&mut self) {
        self.start_node(SyntaxKind::Root);

        loop {
            // `current()` reports the Error sentinel only at end of input.
            let kind = self.current();
            if kind == SyntaxKind::Error {
                break;
            }
            if ROOT_FIRST.contains(kind) {
                self.parse_expr();
                continue;
            }
            if kind == SyntaxKind::At {
                self.error_and_bump(DiagnosticKind::CaptureWithoutTarget);
                continue;
            }
            self.error_and_bump_msg(
                DiagnosticKind::ExpectedPattern,
                "expected a pattern like `(kind)`, `\"literal\"`, `[...]` or `_`",
            );
        }

        self.eat_trivia();
        self.finish_node();
    }

    /// Core recursive descent. Dispatches on lookahead, then checks for a
    /// quantifier/capture suffix.
    pub(crate) fn parse_expr(&mut self) {
        self.parse_expr_inner(true)
    }

    /// Parse a pattern without applying the quantifier/capture suffix.
    /// Used for field values so that `field: (x)*` parses as
    /// `(field: (x))*`.
    fn parse_expr_no_suffix(&mut self) {
        self.parse_expr_inner(false)
    }

    fn parse_expr_inner(&mut self, with_suffix: bool) {
        if !self.enter_recursion() {
            self.start_node(SyntaxKind::Error);
            while !self.eof() {
                self.bump();
            }
            self.finish_node();
            return;
        }

        let checkpoint = self.checkpoint();

        match self.current() {
            SyntaxKind::ParenOpen => self.parse_paren(),
            SyntaxKind::BracketOpen => self.parse_alt(),
            SyntaxKind::Underscore => self.parse_wildcard(),
            SyntaxKind::DoubleQuote => self.parse_str(),
            SyntaxKind::Dot => self.parse_anchor(),
            SyntaxKind::Negation => self.parse_negated_field(),
            SyntaxKind::Id => self.parse_field_or_error(),
            _ => {
                self.error_and_bump_msg(DiagnosticKind::UnexpectedToken, "not a valid pattern");
            }
        }

        if with_suffix {
            self.try_parse_quantifier(checkpoint);
            self.try_parse_captures(checkpoint);
        }

        self.exit_recursion();
    }

    /// `(kind ...)` | `(_ ...)` | `((a) (b))` group | `(#pred? ...)`
    ///
    /// The token after `(` decides: a kind name or `_` opens a node
    /// pattern, a predicate name opens a predicate, anything else is a
    /// group of sibling patterns.
    fn parse_paren(&mut self) {
        let checkpoint = self.checkpoint();
        self.push_delimiter();
        self.bump(); // consume '('

        match self.current() {
            SyntaxKind::ParenClose => {
                self.start_node_at(checkpoint, SyntaxKind::Group);
                self.error(DiagnosticKind::EmptyParens);
                self.pop_delimiter();
                self.bump(); // consume ')'
                self.finish_node();
            }
            // LL(2): `(name:` starts a group holding a field, not a node
            // pattern of kind `name`.
            SyntaxKind::Id if self.next_is(SyntaxKind::Colon) => {
                self.start_node_at(checkpoint, SyntaxKind::Group);
                self.parse_children(DiagnosticKind::UnclosedNode, "group started here");
                self.pop_delimiter();
                self.expect(SyntaxKind::ParenClose, "closing `)` for group");
                self.finish_node();
            }
            SyntaxKind::Id | SyntaxKind::Underscore => {
                self.start_node_at(checkpoint, SyntaxKind::Tree);
                self.bump(); // kind name or `_`
                self.parse_children(DiagnosticKind::UnclosedNode, "node pattern started here");
                self.pop_delimiter();
                self.expect(SyntaxKind::ParenClose, "closing `)` for node pattern");
                self.finish_node();
            }
            SyntaxKind::PredName => {
                self.start_node_at(checkpoint, SyntaxKind::Pred);
                self.bump(); // predicate name
                self.parse_pred_args();
                self.pop_delimiter();
                self.expect(SyntaxKind::ParenClose, "closing `)` for predicate");
                self.finish_node();
            }
            _ => {
                self.start_node_at(checkpoint, SyntaxKind::Group);
                self.parse_children(DiagnosticKind::UnclosedNode, "group started here");
                self.pop_delimiter();
                self.expect(SyntaxKind::ParenClose, "closing `)` for group");
                self.finish_node();
            }
        }
    }

    fn parse_children(&mut self, unclosed: DiagnosticKind, opened_msg: &str) {
        loop {
            let kind = self.current();
            if kind == SyntaxKind::Error {
                let open = self.delimiter_stack.last().copied().unwrap_or_else(|| {
                    panic!("parse_children: caller must push a delimiter first")
                });
                self.error_unclosed_delimiter(unclosed, "expected `)`", opened_msg, open.span);
                break;
            }
            if kind == SyntaxKind::ParenClose {
                break;
            }
            if EXPR_FIRST.contains(kind) {
                self.parse_expr();
                continue;
            }
            if kind == SyntaxKind::At {
                self.error_and_bump(DiagnosticKind::CaptureWithoutTarget);
                continue;
            }
            if NODE_RECOVERY.contains(kind) {
                break;
            }
            self.error_and_bump_msg(
                DiagnosticKind::UnexpectedToken,
                "not valid inside a node pattern",
            );
        }
    }

    /// Alternation: `[(a) (b) "c"]`
    fn parse_alt(&mut self) {
        self.start_node(SyntaxKind::Alt);
        self.push_delimiter();
        self.expect(SyntaxKind::BracketOpen, "opening `[` for alternation");

        loop {
            let kind = self.current();
            if kind == SyntaxKind::Error {
                let open = self.delimiter_stack.last().copied().unwrap_or_else(|| {
                    panic!("parse_alt: delimiter pushed above")
                });
                self.error_unclosed_delimiter(
                    DiagnosticKind::UnclosedAlternation,
                    "expected `]`",
                    "alternation started here",
                    open.span,
                );
                break;
            }
            if kind == SyntaxKind::BracketClose {
                break;
            }
            if EXPR_FIRST.contains(kind) {
                self.parse_expr();
                continue;
            }
            if kind == SyntaxKind::At {
                self.error_and_bump(DiagnosticKind::CaptureWithoutTarget);
                continue;
            }
            if ALT_RECOVERY.contains(kind) {
                break;
            }
            self.error_and_bump_msg(
                DiagnosticKind::UnexpectedToken,
                "not valid inside an alternation",
            );
        }

        self.pop_delimiter();
        self.expect(SyntaxKind::BracketClose, "closing `]` for alternation");
        self.finish_node();
    }

    fn parse_wildcard(&mut self) {
        self.start_node(SyntaxKind::Wildcard);
        self.expect(SyntaxKind::Underscore, "`_` wildcard");
        self.finish_node();
    }

    /// `"if"` | `"+"`
    fn parse_str(&mut self) {
        self.start_node(SyntaxKind::Str);
        let open = self.current();
        self.bump(); // opening quote

        if self.currently_is(SyntaxKind::StrVal) {
            self.bump(); // content
        }

        let closing = self.current();
        assert_eq!(
            closing, open,
            "parse_str: expected closing {:?} but found {:?} \
             (lexer only produces quote tokens from complete strings)",
            open, closing
        );
        self.bump();
        self.finish_node();
    }

    /// `.` anchor
    fn parse_anchor(&mut self) {
        self.start_node(SyntaxKind::Anchor);
        self.expect(SyntaxKind::Dot, "`.` anchor");
        self.finish_node();
    }

    /// Negated field assertion: `!field` (field must be absent)
    fn parse_negated_field(&mut self) {
        self.start_node(SyntaxKind::NegatedField);
        self.expect(SyntaxKind::Negation, "`!` for negated field");

        if self.currently_is(SyntaxKind::Id) {
            self.bump();
        } else {
            self.error(DiagnosticKind::ExpectedFieldName);
        }
        self.finish_node();
    }

    /// Disambiguate `field: pattern` from a bare identifier via LL(2).
    fn parse_field_or_error(&mut self) {
        if self.next_is(SyntaxKind::Colon) {
            self.parse_field();
            return;
        }

        // Bare identifiers are not patterns; node kinds need parentheses.
        self.error_and_bump_msg(
            DiagnosticKind::BareIdentifier,
            "wrap node kinds in parentheses: `(identifier)`",
        );
    }

    /// Field constraint: `field_name: pattern`
    fn parse_field(&mut self) {
        self.start_node(SyntaxKind::Field);

        self.bump(); // field name
        self.expect(SyntaxKind::Colon, "`:` after field name");

        if self.currently_is_one_of(EXPR_FIRST) {
            self.parse_expr_no_suffix();
        } else {
            self.error_msg(DiagnosticKind::ExpectedPattern, "expected a pattern after `field:`");
        }

        self.finish_node();
    }

    /// Predicate arguments: captures, string literals and bare words.
    fn parse_pred_args(&mut self) {
        loop {
            match self.current() {
                SyntaxKind::Error => {
                    let open = self.delimiter_stack.last().copied().unwrap_or_else(|| {
                        panic!("parse_pred_args: delimiter pushed by parse_paren")
                    });
                    self.error_unclosed_delimiter(
                        DiagnosticKind::UnclosedPredicate,
                        "expected `)`",
                        "predicate started here",
                        open.span,
                    );
                    break;
                }
                SyntaxKind::ParenClose => break,
                SyntaxKind::At => {
                    self.start_node(SyntaxKind::Capture);
                    self.bump();
                    if self.currently_is(SyntaxKind::Id) {
                        self.bump();
                    } else {
                        self.error(DiagnosticKind::ExpectedCaptureName);
                    }
                    self.finish_node();
                }
                SyntaxKind::DoubleQuote => self.parse_str(),
                SyntaxKind::Id => self.bump(),
                _ => {
                    self.error_and_bump_msg(
                        DiagnosticKind::UnexpectedToken,
                        "not a valid predicate argument",
                    );
                }
            }
        }
    }

    /// If the current token is a quantifier, wrap the preceding pattern
    /// using the checkpoint.
    fn try_parse_quantifier(&mut self, checkpoint: Checkpoint) {
        if self.currently_is_one_of(QUANTIFIERS) {
            self.start_node_at(checkpoint, SyntaxKind::Quantifier);
            self.bump();
            self.finish_node();
        }
    }

    /// Captures stack: `(a) @x @y` binds both names to the same pattern.
    fn try_parse_captures(&mut self, checkpoint: Checkpoint) {
        while self.currently_is(SyntaxKind::At) {
            self.start_node_at(checkpoint, SyntaxKind::Capture);
            self.drain_trivia();
            self.bump(); // `@`
            if self.currently_is(SyntaxKind::Id) {
                self.bump();
            } else {
                self.error(DiagnosticKind::ExpectedCaptureName);
            }
            self.finish_node();
        }
    }
}
