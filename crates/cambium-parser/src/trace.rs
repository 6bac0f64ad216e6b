//! Parse tracing.
//!
//! The engine is generic over a [`ParseTracer`], so the no-op tracer
//! compiles down to nothing while [`PrintTracer`] collects a readable
//! transcript of every decision for debugging grammars and recovery.

use cambium_core::Length;
use cambium_core::grammar::{Grammar, StateId, Symbol};

/// Observer for engine events. Methods receive raw engine data; formatting
/// and filtering are the tracer's business.
pub trait ParseTracer {
    fn token_scanned(&mut self, grammar: &Grammar, kind: Symbol, start: Length, end: Length);
    fn subtree_reused(&mut self, grammar: &Grammar, kind: Symbol, start: Length, end: Length);
    fn shifted(&mut self, grammar: &Grammar, kind: Symbol, state: StateId, head: usize);
    fn reduced(
        &mut self,
        grammar: &Grammar,
        lhs: Symbol,
        child_count: usize,
        state: StateId,
        head: usize,
    );
    fn forked(&mut self, from: usize, to: usize, live: usize);
    fn dropped(&mut self, head: usize, reason: &'static str);
    fn missing_inserted(&mut self, grammar: &Grammar, kind: Symbol, head: usize);
    fn skipped(&mut self, grammar: &Grammar, kind: Symbol, start: Length, end: Length, head: usize);
    fn accepted(&mut self, grammar: &Grammar, error_cost: u32);
}

/// Tracer that ignores everything.
pub struct NoopTracer;

impl ParseTracer for NoopTracer {
    #[inline(always)]
    fn token_scanned(&mut self, _: &Grammar, _: Symbol, _: Length, _: Length) {}

    #[inline(always)]
    fn subtree_reused(&mut self, _: &Grammar, _: Symbol, _: Length, _: Length) {}

    #[inline(always)]
    fn shifted(&mut self, _: &Grammar, _: Symbol, _: StateId, _: usize) {}

    #[inline(always)]
    fn reduced(&mut self, _: &Grammar, _: Symbol, _: usize, _: StateId, _: usize) {}

    #[inline(always)]
    fn forked(&mut self, _: usize, _: usize, _: usize) {}

    #[inline(always)]
    fn dropped(&mut self, _: usize, _: &'static str) {}

    #[inline(always)]
    fn missing_inserted(&mut self, _: &Grammar, _: Symbol, _: usize) {}

    #[inline(always)]
    fn skipped(&mut self, _: &Grammar, _: Symbol, _: Length, _: Length, _: usize) {}

    #[inline(always)]
    fn accepted(&mut self, _: &Grammar, _: u32) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Shifts, reductions, recovery and the final accept.
    #[default]
    Default,
    /// Also every scanned token, reuse hit, fork and drop.
    Verbose,
}

/// Tracer that renders events into lines of text.
#[derive(Default)]
pub struct PrintTracer {
    verbosity: Verbosity,
    lines: Vec<String>,
}

impl PrintTracer {
    pub fn new() -> PrintTracer {
        PrintTracer::default()
    }

    pub fn verbose(mut self) -> PrintTracer {
        self.verbosity = Verbosity::Verbose;
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn verbose_enabled(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }
}

impl ParseTracer for PrintTracer {
    fn token_scanned(&mut self, grammar: &Grammar, kind: Symbol, start: Length, end: Length) {
        if self.verbose_enabled() {
            self.lines.push(format!(
                "scan   {} {}..{}",
                grammar.symbol_name(kind),
                start.bytes,
                end.bytes
            ));
        }
    }

    fn subtree_reused(&mut self, grammar: &Grammar, kind: Symbol, start: Length, end: Length) {
        if self.verbose_enabled() {
            self.lines.push(format!(
                "reuse  {} {}..{}",
                grammar.symbol_name(kind),
                start.bytes,
                end.bytes
            ));
        }
    }

    fn shifted(&mut self, grammar: &Grammar, kind: Symbol, state: StateId, head: usize) {
        self.lines.push(format!(
            "shift  {} -> s{state} (head {head})",
            grammar.symbol_name(kind)
        ));
    }

    fn reduced(
        &mut self,
        grammar: &Grammar,
        lhs: Symbol,
        child_count: usize,
        state: StateId,
        head: usize,
    ) {
        self.lines.push(format!(
            "reduce {} x{child_count} -> s{state} (head {head})",
            grammar.symbol_name(lhs)
        ));
    }

    fn forked(&mut self, from: usize, to: usize, live: usize) {
        if self.verbose_enabled() {
            self.lines
                .push(format!("fork   head {from} -> head {to} ({live} live)"));
        }
    }

    fn dropped(&mut self, head: usize, reason: &'static str) {
        if self.verbose_enabled() {
            self.lines.push(format!("drop   head {head} ({reason})"));
        }
    }

    fn missing_inserted(&mut self, grammar: &Grammar, kind: Symbol, head: usize) {
        self.lines.push(format!(
            "insert MISSING {} (head {head})",
            grammar.symbol_name(kind)
        ));
    }

    fn skipped(&mut self, grammar: &Grammar, kind: Symbol, start: Length, end: Length, head: usize) {
        self.lines.push(format!(
            "skip   {} {}..{} (head {head})",
            grammar.symbol_name(kind),
            start.bytes,
            end.bytes
        ));
    }

    fn accepted(&mut self, _grammar: &Grammar, error_cost: u32) {
        self.lines.push(format!("accept cost {error_cost}"));
    }
}
