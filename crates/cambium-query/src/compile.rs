//! Pattern compilation: typed AST to matcher trees validated against a
//! grammar.
//!
//! Compilation resolves node kinds, field names and capture names once, so
//! execution never touches strings. Predicates compile their regexes to
//! dense DFAs up front.

use std::sync::Arc;

use cambium_core::grammar::{FieldId, Grammar, Symbol};
use regex_automata::dfa::{StartKind, dense};
use regex_automata::util::syntax;

use crate::QueryError;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{self, Capture, Expr, Pred, PredArg, Root, Str, SyntaxKind, SyntaxNode};

/// A compiled pattern document.
///
/// Immutable once built; share it across threads and run it over any tree
/// parsed with the same grammar.
#[derive(Debug)]
pub struct Query {
    pub(crate) grammar: Arc<Grammar>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) captures: Vec<String>,
}

/// One top-level pattern within a document.
#[derive(Debug)]
pub(crate) struct Pattern {
    pub root: Step,
    pub predicates: Vec<Predicate>,
    pub start_byte: usize,
}

/// A matcher plus the captures and quantifier attached to it.
#[derive(Debug)]
pub(crate) struct Step {
    pub matcher: Matcher,
    /// Capture indices bound to this element, innermost first.
    pub captures: Vec<u16>,
    pub quant: Quant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quant {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug)]
pub(crate) enum Matcher {
    /// `(kind ...)`, `"literal"`, `(_ ...)` or `_`.
    Node {
        filter: KindFilter,
        children: Vec<ChildStep>,
        negated: Vec<FieldId>,
        trailing_anchor: bool,
    },
    /// `[...]`: any branch may match.
    Alt(Vec<Step>),
    /// `(...)` group: a run of adjacent siblings.
    Siblings {
        entries: Vec<ChildStep>,
        trailing_anchor: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KindFilter {
    /// Exact symbol, named or anonymous.
    Kind(Symbol),
    /// `_` inside parens: any named node.
    AnyNamed,
    /// Bare `_`: any node at all.
    Any,
}

/// A child position in a node or group pattern.
#[derive(Debug)]
pub(crate) struct ChildStep {
    pub step: Step,
    pub field: Option<FieldId>,
    /// `.` immediately before this child.
    pub anchor_before: bool,
}

#[derive(Debug)]
pub(crate) enum Predicate {
    /// `#eq?` / `#not-eq?`
    TextEq {
        capture: u16,
        negated: bool,
        operand: Operand,
    },
    /// `#match?` / `#not-match?`
    Match {
        capture: u16,
        negated: bool,
        dfa: dense::DFA<Vec<u32>>,
    },
    /// `#any-of?` / `#not-any-of?`
    AnyOf {
        capture: u16,
        negated: bool,
        values: Vec<String>,
    },
}

#[derive(Debug)]
pub(crate) enum Operand {
    Literal(String),
    Capture(u16),
}

impl Query {
    /// Compile a pattern document against a grammar.
    ///
    /// Reports the first problem found: unknown node kinds, unknown
    /// fields, unbound capture references, bad predicates, or syntax
    /// errors in the document itself.
    pub fn new(grammar: Arc<Grammar>, source: &str) -> Result<Query, QueryError> {
        let (parse, parse_diagnostics) = parser::parse(source);
        if let Some(err) = QueryError::from_diagnostics(parse_diagnostics) {
            return Err(err);
        }

        let root = Root::cast(parse.syntax()).expect("parse_root always produces a Root");

        let mut compiler = Compiler {
            grammar: &grammar,
            diagnostics: Diagnostics::new(),
            captures: Vec::new(),
            pattern_captures: Vec::new(),
        };
        let patterns = compiler.compile_root(&root);

        if let Some(err) = QueryError::from_diagnostics(compiler.diagnostics) {
            return Err(err);
        }

        let captures = compiler.captures;

        Ok(Query {
            grammar,
            patterns,
            captures,
        })
    }

    /// The grammar this query was compiled against.
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Number of top-level patterns in the document.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// All capture names, in first-appearance order. Capture indices in
    /// match results index into this slice.
    pub fn capture_names(&self) -> &[String] {
        &self.captures
    }

    pub fn capture_index_for_name(&self, name: &str) -> Option<u32> {
        self.captures.iter().position(|n| n == name).map(|i| i as u32)
    }

    /// Byte offset of a pattern within the document it was compiled from.
    pub fn start_byte_for_pattern(&self, pattern_index: usize) -> Option<usize> {
        self.patterns.get(pattern_index).map(|p| p.start_byte)
    }
}

struct Compiler<'a> {
    grammar: &'a Grammar,
    diagnostics: Diagnostics,
    /// Capture names across the whole document, in first-appearance order.
    captures: Vec<String>,
    /// Captures bound by the pattern currently being compiled; predicates
    /// may only reference these.
    pattern_captures: Vec<u16>,
}

impl Compiler<'_> {
    fn compile_root(&mut self, root: &Root) -> Vec<Pattern> {
        for pred in root.preds() {
            self.report(DiagnosticKind::PredicateOutsidePattern, pred.as_cst());
        }

        let mut patterns = Vec::new();
        for expr in root.exprs() {
            self.pattern_captures.clear();
            let start_byte = u32::from(expr.as_cst().text_range().start()) as usize;

            // Predicates anywhere inside the pattern apply to the whole
            // pattern, so they compile after the body: a predicate may
            // reference a capture bound later in the same pattern.
            let mut raw_preds = Vec::new();
            let Some(step) = self.compile_step(&expr, &mut raw_preds) else {
                continue;
            };

            let mut predicates = Vec::new();
            for pred in &raw_preds {
                if let Some(compiled) = self.compile_pred(pred) {
                    predicates.push(compiled);
                }
            }

            patterns.push(Pattern {
                root: step,
                predicates,
                start_byte,
            });
        }
        patterns
    }

    /// Compile an element in a position where fields are not allowed
    /// (top level, alternation branches).
    fn compile_step(&mut self, expr: &Expr, preds: &mut Vec<Pred>) -> Option<Step> {
        let (step, field) = self.compile_element(expr, preds)?;
        if field.is_some() {
            self.report(DiagnosticKind::MisplacedField, expr.as_cst());
            return None;
        }
        Some(step)
    }

    /// Compile an element, peeling capture/quantifier/field wrappers.
    /// Returns the step plus the field constraint if one was attached.
    fn compile_element(
        &mut self,
        expr: &Expr,
        preds: &mut Vec<Pred>,
    ) -> Option<(Step, Option<FieldId>)> {
        match expr {
            Expr::Capture(capture) => {
                let inner = capture.target()?;
                let (mut step, field) = self.compile_element(&inner, preds)?;
                if let Some(name_token) = capture.name() {
                    let index = self.intern_capture(name_token.text());
                    step.captures.push(index);
                }
                Some((step, field))
            }
            Expr::Quantifier(quantifier) => {
                let inner = quantifier.inner()?;
                let (mut step, field) = self.compile_element(&inner, preds)?;
                step.quant = match quantifier.operator().map(|t| t.kind()) {
                    Some(SyntaxKind::Star) => Quant::ZeroOrMore,
                    Some(SyntaxKind::Plus) => Quant::OneOrMore,
                    Some(SyntaxKind::Question) => Quant::ZeroOrOne,
                    _ => step.quant,
                };
                Some((step, field))
            }
            Expr::Field(field) => {
                let name_token = field.name()?;
                let name = name_token.text();
                let Some(field_id) = self.grammar.field_id(name) else {
                    self.diagnostics
                        .report(DiagnosticKind::UnknownField, name_token.text_range())
                        .message(format!(
                            "grammar `{}` has no field `{}`",
                            self.grammar.name(),
                            name
                        ))
                        .emit();
                    return None;
                };
                let value = field.value()?;
                let (step, inner_field) = self.compile_element(&value, preds)?;
                if inner_field.is_some() {
                    self.report(DiagnosticKind::MisplacedField, value.as_cst());
                }
                Some((step, Some(field_id)))
            }
            _ => {
                let step = self.compile_step_base(expr, preds)?;
                Some((step, None))
            }
        }
    }

    fn compile_step_base(&mut self, expr: &Expr, preds: &mut Vec<Pred>) -> Option<Step> {
        match expr {
            Expr::Tree(tree) => {
                let kind_token = tree.node_type()?;
                let filter = if kind_token.kind() == SyntaxKind::Underscore {
                    KindFilter::AnyNamed
                } else {
                    let name = kind_token.text();
                    match self.grammar.symbol_for_name(name, true) {
                        Some(symbol) => KindFilter::Kind(symbol),
                        None => {
                            self.diagnostics
                                .report(DiagnosticKind::UnknownNodeKind, kind_token.text_range())
                                .message(format!(
                                    "grammar `{}` has no node kind `{}`",
                                    self.grammar.name(),
                                    name
                                ))
                                .emit();
                            return None;
                        }
                    }
                };

                let (children, negated, trailing_anchor) =
                    self.compile_child_list(tree.children(), preds, true);
                for pred in tree.preds() {
                    preds.push(pred);
                }

                Some(node_step(filter, children, negated, trailing_anchor))
            }
            Expr::Str(string) => {
                let text = string
                    .value()
                    .map(|t| unescape(t.text()))
                    .unwrap_or_default();
                let Some(symbol) = self.grammar.symbol_for_name(&text, false) else {
                    self.diagnostics
                        .report(DiagnosticKind::UnknownNodeKind, string.as_cst().text_range())
                        .message(format!(
                            "grammar `{}` has no token `{}`",
                            self.grammar.name(),
                            text
                        ))
                        .emit();
                    return None;
                };
                Some(node_step(
                    KindFilter::Kind(symbol),
                    Vec::new(),
                    Vec::new(),
                    false,
                ))
            }
            Expr::Wildcard(_) => Some(node_step(KindFilter::Any, Vec::new(), Vec::new(), false)),
            Expr::Group(group) => {
                let (entries, _, trailing_anchor) =
                    self.compile_child_list(group.exprs(), preds, false);
                for pred in group.preds() {
                    preds.push(pred);
                }
                Some(Step {
                    matcher: Matcher::Siblings {
                        entries,
                        trailing_anchor,
                    },
                    captures: Vec::new(),
                    quant: Quant::One,
                })
            }
            Expr::Alt(alt) => {
                let mut branches = Vec::new();
                for branch in alt.exprs() {
                    if let Some(step) = self.compile_step(&branch, preds) {
                        branches.push(step);
                    }
                }
                if branches.is_empty() {
                    self.report_msg(
                        DiagnosticKind::ExpectedPattern,
                        expr.as_cst(),
                        "alternation needs at least one branch",
                    );
                    return None;
                }
                Some(Step {
                    matcher: Matcher::Alt(branches),
                    captures: Vec::new(),
                    quant: Quant::One,
                })
            }
            Expr::Anchor(_) => {
                self.report(DiagnosticKind::MisplacedAnchor, expr.as_cst());
                None
            }
            Expr::NegatedField(_) => {
                self.report(DiagnosticKind::MisplacedNegatedField, expr.as_cst());
                None
            }
            Expr::Capture(_) | Expr::Quantifier(_) | Expr::Field(_) => {
                unreachable!("wrappers are peeled by compile_element")
            }
        }
    }

    /// Compile the children of a node or group pattern. Anchors attach to
    /// the following child (or become the trailing anchor); negated fields
    /// collect separately and are only allowed inside node patterns.
    fn compile_child_list(
        &mut self,
        exprs: impl Iterator<Item = Expr>,
        preds: &mut Vec<Pred>,
        allow_negated: bool,
    ) -> (Vec<ChildStep>, Vec<FieldId>, bool) {
        let mut entries = Vec::new();
        let mut negated = Vec::new();
        let mut pending_anchor = false;

        for expr in exprs {
            match &expr {
                Expr::Anchor(_) => {
                    pending_anchor = true;
                    continue;
                }
                Expr::NegatedField(negated_field) => {
                    if !allow_negated {
                        self.report(DiagnosticKind::MisplacedNegatedField, expr.as_cst());
                        continue;
                    }
                    let Some(name_token) = negated_field.name() else {
                        continue;
                    };
                    match self.grammar.field_id(name_token.text()) {
                        Some(id) => negated.push(id),
                        None => {
                            self.diagnostics
                                .report(DiagnosticKind::UnknownField, name_token.text_range())
                                .message(format!(
                                    "grammar `{}` has no field `{}`",
                                    self.grammar.name(),
                                    name_token.text()
                                ))
                                .emit();
                        }
                    }
                    continue;
                }
                _ => {}
            }

            let Some((step, field)) = self.compile_element(&expr, preds) else {
                continue;
            };
            entries.push(ChildStep {
                step,
                field,
                anchor_before: std::mem::take(&mut pending_anchor),
            });
        }

        (entries, negated, pending_anchor)
    }

    // ==== predicates ====

    fn compile_pred(&mut self, pred: &Pred) -> Option<Predicate> {
        let name_token = pred.name()?;
        let name = name_token.text();
        let args: Vec<PredArg> = pred.args().collect();

        match name {
            "#eq?" | "#not-eq?" => {
                let negated = name == "#not-eq?";
                let capture = self.capture_first_arg(&args, pred)?;
                let operand = match args.get(1) {
                    Some(PredArg::Capture(other)) => {
                        Operand::Capture(self.resolve_capture_ref(other)?)
                    }
                    Some(PredArg::Str(s)) => Operand::Literal(self.str_value(s)),
                    Some(PredArg::Ident(t)) => Operand::Literal(t.text().to_string()),
                    None => {
                        self.report_msg(
                            DiagnosticKind::MalformedPredicate,
                            pred.as_cst(),
                            format!("`{name}` expects a capture and a value"),
                        );
                        return None;
                    }
                };
                if args.len() > 2 {
                    self.report_msg(
                        DiagnosticKind::MalformedPredicate,
                        pred.as_cst(),
                        format!("`{name}` takes exactly two arguments"),
                    );
                    return None;
                }
                Some(Predicate::TextEq {
                    capture,
                    negated,
                    operand,
                })
            }
            "#match?" | "#not-match?" => {
                let negated = name == "#not-match?";
                let capture = self.capture_first_arg(&args, pred)?;
                let Some(PredArg::Str(regex_arg)) = args.get(1) else {
                    self.report_msg(
                        DiagnosticKind::MalformedPredicate,
                        pred.as_cst(),
                        format!("`{name}` expects a capture and a regex string"),
                    );
                    return None;
                };
                let regex = self.str_value(regex_arg);
                let dfa = match dense::DFA::builder()
                    .configure(dense::DFA::config().start_kind(StartKind::Unanchored))
                    .syntax(syntax::Config::new().unicode(true).utf8(true))
                    .build(&regex)
                {
                    Ok(dfa) => dfa,
                    Err(e) => {
                        self.report_msg(
                            DiagnosticKind::MalformedPredicate,
                            regex_arg.as_cst(),
                            format!("invalid regex: {e}"),
                        );
                        return None;
                    }
                };
                Some(Predicate::Match {
                    capture,
                    negated,
                    dfa,
                })
            }
            "#any-of?" | "#not-any-of?" => {
                let negated = name == "#not-any-of?";
                let capture = self.capture_first_arg(&args, pred)?;
                let mut values = Vec::new();
                for arg in &args[1..] {
                    match arg {
                        PredArg::Str(s) => values.push(self.str_value(s)),
                        _ => {
                            self.report_msg(
                                DiagnosticKind::MalformedPredicate,
                                pred.as_cst(),
                                format!("`{name}` values must be string literals"),
                            );
                            return None;
                        }
                    }
                }
                if values.is_empty() {
                    self.report_msg(
                        DiagnosticKind::MalformedPredicate,
                        pred.as_cst(),
                        format!("`{name}` expects at least one value"),
                    );
                    return None;
                }
                Some(Predicate::AnyOf {
                    capture,
                    negated,
                    values,
                })
            }
            _ => {
                self.diagnostics
                    .report(DiagnosticKind::UnknownPredicate, name_token.text_range())
                    .message(format!("unknown predicate `{name}`"))
                    .emit();
                None
            }
        }
    }

    fn capture_first_arg(&mut self, args: &[PredArg], pred: &Pred) -> Option<u16> {
        match args.first() {
            Some(PredArg::Capture(capture)) => self.resolve_capture_ref(capture),
            _ => {
                self.report_msg(
                    DiagnosticKind::MalformedPredicate,
                    pred.as_cst(),
                    "first argument must be a capture",
                );
                None
            }
        }
    }

    /// A predicate may only reference captures bound in its own pattern.
    fn resolve_capture_ref(&mut self, capture: &Capture) -> Option<u16> {
        let name_token = capture.name()?;
        let name = name_token.text();
        let index = self
            .captures
            .iter()
            .position(|n| n == name)
            .map(|i| i as u16);
        match index {
            Some(i) if self.pattern_captures.contains(&i) => Some(i),
            _ => {
                self.diagnostics
                    .report(DiagnosticKind::UndefinedCapture, name_token.text_range())
                    .message(format!("capture `@{name}` is not bound in this pattern"))
                    .emit();
                None
            }
        }
    }

    fn str_value(&self, string: &Str) -> String {
        string
            .value()
            .map(|t| unescape(t.text()))
            .unwrap_or_default()
    }

    fn intern_capture(&mut self, name: &str) -> u16 {
        let index = match self.captures.iter().position(|n| n == name) {
            Some(i) => i as u16,
            None => {
                self.captures.push(name.to_string());
                (self.captures.len() - 1) as u16
            }
        };
        if !self.pattern_captures.contains(&index) {
            self.pattern_captures.push(index);
        }
        index
    }

    fn report(&mut self, kind: DiagnosticKind, node: &SyntaxNode) {
        self.diagnostics.report(kind, node.text_range()).emit();
    }

    fn report_msg(&mut self, kind: DiagnosticKind, node: &SyntaxNode, message: impl Into<String>) {
        self.diagnostics
            .report(kind, node.text_range())
            .message(message)
            .emit();
    }
}

fn node_step(
    filter: KindFilter,
    children: Vec<ChildStep>,
    negated: Vec<FieldId>,
    trailing_anchor: bool,
) -> Step {
    Step {
        matcher: Matcher::Node {
            filter,
            children,
            negated,
            trailing_anchor,
        },
        captures: Vec::new(),
        quant: Quant::One,
    }
}

/// Process string escapes the way the pattern language defines them:
/// `\n`, `\r`, `\t`, `\0` become control characters; for anything else
/// the backslash drops and the character stays.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
