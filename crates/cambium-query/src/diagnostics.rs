//! Diagnostics collected while parsing and compiling a pattern document.
//!
//! The parser is resilient and keeps going after an error, so several
//! diagnostics can accumulate for one document. Compilation fails on the
//! first of them; the rest are still available for rendering.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use rowan::TextRange;

use crate::QueryErrorKind;

/// Everything the parser and compiler can complain about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    // Parse errors.
    UnclosedNode,
    UnclosedAlternation,
    UnclosedPredicate,
    ExpectedPattern,
    ExpectedCaptureName,
    ExpectedFieldName,
    EmptyParens,
    BareIdentifier,
    CaptureWithoutTarget,
    UnexpectedToken,

    // Compile errors.
    UnknownNodeKind,
    UnknownField,
    UndefinedCapture,
    UnknownPredicate,
    MalformedPredicate,
    PredicateOutsidePattern,
    MisplacedField,
    MisplacedAnchor,
    MisplacedNegatedField,
}

impl DiagnosticKind {
    pub fn default_message(self) -> &'static str {
        match self {
            Self::UnclosedNode => "unclosed node pattern",
            Self::UnclosedAlternation => "unclosed alternation",
            Self::UnclosedPredicate => "unclosed predicate",
            Self::ExpectedPattern => "expected a pattern",
            Self::ExpectedCaptureName => "expected a capture name after `@`",
            Self::ExpectedFieldName => "expected a field name after `!`",
            Self::EmptyParens => "empty `()` is not a pattern",
            Self::BareIdentifier => "bare identifier is not a pattern",
            Self::CaptureWithoutTarget => "`@` capture must follow a pattern",
            Self::UnexpectedToken => "unexpected token",
            Self::UnknownNodeKind => "unknown node kind",
            Self::UnknownField => "unknown field name",
            Self::UndefinedCapture => "predicate refers to an undefined capture",
            Self::UnknownPredicate => "unknown predicate",
            Self::MalformedPredicate => "malformed predicate",
            Self::PredicateOutsidePattern => "predicate outside of a pattern",
            Self::MisplacedField => "field constraint is only valid on a child pattern",
            Self::MisplacedAnchor => "anchor is only valid between child patterns",
            Self::MisplacedNegatedField => "negated field is only valid inside a node pattern",
        }
    }

    /// The public error category this kind reports under.
    pub fn category(self) -> QueryErrorKind {
        match self {
            Self::UnknownNodeKind => QueryErrorKind::NodeKind,
            Self::UnknownField => QueryErrorKind::Field,
            Self::UndefinedCapture => QueryErrorKind::Capture,
            Self::UnknownPredicate
            | Self::MalformedPredicate
            | Self::PredicateOutsidePattern => QueryErrorKind::Predicate,
            _ => QueryErrorKind::Syntax,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub range: TextRange,
    pub message: String,
    pub related: Vec<RelatedInfo>,
}

#[derive(Debug, Clone)]
pub struct RelatedInfo {
    pub range: TextRange,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Create a diagnostic with the given kind and span.
    ///
    /// Uses the kind's default message. Call `.message()` on the builder to
    /// override.
    pub fn report(&mut self, kind: DiagnosticKind, range: TextRange) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic {
                kind,
                range,
                message: kind.default_message().to_string(),
                related: Vec::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.messages.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn render(&self, source: &str) -> String {
        self.render_colored(source, false)
    }

    pub fn render_colored(&self, source: &str, colored: bool) -> String {
        let mut out = String::new();
        let renderer = if colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.messages.iter().enumerate() {
            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(adjust_range(diag.range, source.len()))
                    .label(&diag.message),
            );
            for related in &diag.related {
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(adjust_range(related.range, source.len()))
                        .label(&related.message),
                );
            }

            let report: Vec<Group> = vec![Level::ERROR.primary_title(&diag.message).element(snippet)];
            if i > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{}", renderer.render(&report));
        }

        out
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message.message = msg.into();
        self
    }

    pub fn related_to(mut self, msg: impl Into<String>, range: TextRange) -> Self {
        self.message.related.push(RelatedInfo {
            range,
            message: msg.into(),
        });
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}

/// Zero-width spans render as a caret on the following character.
fn adjust_range(range: TextRange, limit: usize) -> std::ops::Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();

    if start == end {
        return start..(start + 1).min(limit);
    }

    start..end
}
