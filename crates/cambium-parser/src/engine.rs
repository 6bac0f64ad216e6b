//! The GLR parse loop.
//!
//! The engine drives a small set of parse heads over the token stream.
//! Each head follows the LR tables; a state offering several actions on
//! the same lookahead forks the head, and heads that converge on the same
//! state and position are merged by cost. Error recovery first tries
//! inserting a zero-width `MISSING` token, then skips input into an
//! `ERROR` grouping, so a tree covering the entire input always comes
//! back no matter how malformed the source is.

use std::cmp::Reverse;

use cambium_core::grammar::{Grammar, ProdId, Symbol, SymbolKind, SymbolSet};
use cambium_core::{Child, Length, Subtree, SubtreeFlags};

use crate::external::{ExternalScanner, ScanCursor};
use crate::input::InputReader;
use crate::lexer::{ScannedToken, scan_token};
use crate::reuse::ReuseCursor;
use crate::stack::Stack;
use crate::trace::ParseTracer;

/// Cost of a zero-width token inserted during recovery.
const MISSING_TOKEN_COST: u32 = 110;
/// Flat cost of opening an `ERROR` grouping.
const ERROR_ENTER_COST: u32 = 500;
/// Incremental cost per token skipped into an `ERROR` grouping.
const ERROR_TOKEN_COST: u32 = 10;

/// Caps on the engine's appetite. The defaults are generous; lowering
/// them trades parse quality on pathological input for bounded work.
#[derive(Clone, Copy, Debug)]
pub struct ParseLimits {
    max_heads: usize,
    reduction_fuel: u32,
}

impl Default for ParseLimits {
    fn default() -> ParseLimits {
        ParseLimits {
            max_heads: 8,
            reduction_fuel: 256,
        }
    }
}

impl ParseLimits {
    pub fn new() -> ParseLimits {
        ParseLimits::default()
    }

    /// Most parse heads alive at once. Further forks are dropped.
    pub fn with_max_heads(mut self, max_heads: usize) -> ParseLimits {
        self.max_heads = max_heads.max(1);
        self
    }

    /// Reductions a head may perform between consuming tokens.
    pub fn with_reduction_fuel(mut self, fuel: u32) -> ParseLimits {
        self.reduction_fuel = fuel.max(1);
        self
    }
}

#[derive(Clone)]
struct Lookahead {
    source: TokenSource,
    /// Terminal driving table decisions: the token's own kind, or the
    /// first leaf's kind when the lookahead is a reused interior node.
    reduce_key: Symbol,
    /// State whose valid-terminal set produced this token.
    lexed_state: cambium_core::grammar::StateId,
    /// Lexed with the all-terminals recovery set rather than the state's
    /// own valid set. Such leaves must never be reused.
    recovery: bool,
}

#[derive(Clone)]
enum TokenSource {
    Fresh(ScannedToken),
    Reused(Subtree),
}

impl Lookahead {
    fn kind(&self) -> Symbol {
        match &self.source {
            TokenSource::Fresh(t) => t.kind,
            TokenSource::Reused(s) => s.kind(),
        }
    }
}

#[derive(Clone)]
struct Head {
    stack: Stack,
    /// End of consumed input; the next token's padding starts here.
    position: Length,
    token: Option<Lookahead>,
    error_cost: u32,
    dynamic_precedence: i64,
    /// Reductions left before the head must consume input.
    fuel: u32,
    dead: bool,
}

struct Accepted {
    root: Subtree,
    cost: u32,
    precedence: i64,
}

#[derive(Clone, Copy)]
enum Action {
    Reduce(ProdId),
    Shift,
    Accept,
}

pub(crate) struct Engine<'a, T: ParseTracer> {
    grammar: &'a Grammar,
    reader: InputReader<'a>,
    scanner: Option<&'a mut dyn ExternalScanner>,
    tracer: &'a mut T,
    limits: ParseLimits,
    heads: Vec<Head>,
    reuse: Option<ReuseCursor>,
    accepted: Option<Accepted>,
    /// Every internal terminal; recovery relexes with this set so that
    /// skipped text still breaks into real tokens.
    recovery_valid: SymbolSet,
}

impl<'a, T: ParseTracer> Engine<'a, T> {
    pub fn new(
        grammar: &'a Grammar,
        reader: InputReader<'a>,
        scanner: Option<&'a mut dyn ExternalScanner>,
        reuse: Option<ReuseCursor>,
        limits: ParseLimits,
        tracer: &'a mut T,
    ) -> Engine<'a, T> {
        let recovery_valid = grammar
            .terminal_defs()
            .iter()
            .map(|def| def.symbol())
            .collect();
        Engine {
            grammar,
            reader,
            scanner,
            tracer,
            limits,
            heads: Vec::new(),
            reuse,
            accepted: None,
            recovery_valid,
        }
    }

    pub fn run(mut self) -> Subtree {
        let start = self.grammar.start_state();
        self.heads.push(Head {
            stack: Stack::new(start),
            position: Length::ZERO,
            token: None,
            error_cost: 0,
            dynamic_precedence: 0,
            fuel: self.limits.reduction_fuel,
            dead: false,
        });
        while let Some(h) = self.next_head() {
            self.advance(h);
            self.prune();
        }
        match self.accepted {
            Some(found) => found.root,
            None => {
                // Unreachable with consistent tables; still hand back a
                // tree rather than failing.
                Subtree::node(
                    self.grammar.root_symbol(),
                    start,
                    SubtreeFlags::EMPTY,
                    Vec::new(),
                )
                .into_root(Length::ZERO)
            }
        }
    }

    /// The live head that is farthest behind in the input.
    fn next_head(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, head) in self.heads.iter().enumerate() {
            if head.dead {
                continue;
            }
            let key = head.position.bytes;
            if best.map_or(true, |(b, _)| key < b) {
                best = Some((key, i));
            }
        }
        best.map(|(_, i)| i)
    }

    fn live_heads(&self) -> usize {
        self.heads.iter().filter(|head| !head.dead).count()
    }

    /// Performs one round of actions for head `h`, forking as needed.
    fn advance(&mut self, h: usize) {
        self.ensure_token(h);
        let grammar = self.grammar;
        let state_id = self.heads[h].stack.state();
        let Some(token) = self.heads[h].token.clone() else {
            return;
        };
        let kind = token.kind();
        let key = token.reduce_key;
        let state = grammar.parse_state(state_id);
        let mut actions: Vec<Action> = state
            .reductions(key)
            .iter()
            .map(|prod| Action::Reduce(*prod))
            .collect();
        if state.transition(kind).is_some() {
            actions.push(Action::Shift);
        }
        if kind == Symbol::END && state.accepts_end() {
            actions.push(Action::Accept);
        }
        if actions.is_empty() {
            if grammar.is_extra(kind) {
                self.push_extra(h);
            } else {
                self.recover(h);
            }
            return;
        }
        if self.heads[h].fuel == 0 {
            // Out of reductions between shifts. Keep only actions that
            // consume input; a head left with nothing recovers or dies.
            actions.retain(|action| !matches!(action, Action::Reduce(_)));
            if actions.is_empty() {
                if self.live_heads() > 1 {
                    self.heads[h].dead = true;
                    self.tracer.dropped(h, "reduction fuel exhausted");
                } else {
                    self.recover(h);
                }
                return;
            }
        }
        let mut targets = vec![(h, actions[0])];
        for action in actions.iter().skip(1) {
            if self.heads.len() >= self.limits.max_heads {
                break;
            }
            let fork = self.heads[h].clone();
            self.heads.push(fork);
            let to = self.heads.len() - 1;
            self.tracer.forked(h, to, self.live_heads());
            targets.push((to, *action));
        }
        for (idx, action) in targets {
            match action {
                Action::Reduce(prod) => self.reduce(idx, prod),
                Action::Shift => self.shift(idx),
                Action::Accept => self.accept(idx),
            }
        }
    }

    /// Makes sure head `h` holds a lookahead, re-lexing when reductions
    /// moved it to a state whose valid set differs from the one the token
    /// was scanned under.
    fn ensure_token(&mut self, h: usize) {
        let grammar = self.grammar;
        if let Some(token) = &self.heads[h].token {
            let state_id = self.heads[h].stack.state();
            if token.lexed_state != state_id {
                let stale = match &token.source {
                    TokenSource::Fresh(t) => {
                        t.kind != Symbol::END
                            && grammar.parse_state(token.lexed_state).valid_terminals()
                                != grammar.parse_state(state_id).valid_terminals()
                    }
                    TokenSource::Reused(_) => false,
                };
                if stale {
                    self.heads[h].token = None;
                }
            }
        }
        if self.heads[h].token.is_none() {
            let token = self.next_token(h);
            self.heads[h].token = Some(token);
        }
    }

    fn next_token(&mut self, h: usize) -> Lookahead {
        let grammar = self.grammar;
        let (position, state_id) = {
            let head = &self.heads[h];
            (head.position, head.stack.state())
        };
        if self.live_heads() == 1 {
            let mut found: Option<Subtree> = None;
            if let Some(cursor) = self.reuse.as_mut() {
                let current_valid = grammar.parse_state(state_id).valid_terminals();
                while let Some(candidate) = cursor.candidate(position) {
                    // A node's parse state is its first leaf's lexing
                    // state; equal valid sets mean a fresh scan here would
                    // produce that same leading token.
                    let usable = !candidate.has_changes()
                        && !candidate.has_error()
                        && !candidate.is_fragile()
                        && !candidate.is_external()
                        && candidate.total().bytes > 0
                        && grammar.parse_state(candidate.parse_state()).valid_terminals()
                            == current_valid;
                    if usable {
                        found = Some(candidate.clone());
                        break;
                    }
                    cursor.reject();
                }
            }
            if let Some(subtree) = found {
                let reduce_key = first_leaf_kind(&subtree);
                self.tracer.subtree_reused(
                    grammar,
                    subtree.kind(),
                    position,
                    position + subtree.total(),
                );
                return Lookahead {
                    reduce_key,
                    lexed_state: state_id,
                    recovery: false,
                    source: TokenSource::Reused(subtree),
                };
            }
        }
        let state = grammar.parse_state(state_id);
        if !grammar.externals().is_empty() && self.scanner.is_some() {
            let valid_externals: SymbolSet = grammar
                .externals()
                .iter()
                .copied()
                .filter(|symbol| state.valid_terminals().contains(*symbol))
                .collect();
            if !valid_externals.is_empty() {
                if let Some(scanner) = self.scanner.as_mut() {
                    let mut cursor = ScanCursor::new(&mut self.reader, position);
                    if let Some(symbol) = scanner.scan(&mut cursor, &valid_externals) {
                        if valid_externals.contains(symbol) {
                            let scanned = cursor.finish(symbol);
                            let token_start = position + scanned.padding;
                            self.tracer.token_scanned(
                                grammar,
                                scanned.kind,
                                token_start,
                                token_start + scanned.size,
                            );
                            return Lookahead {
                                reduce_key: scanned.kind,
                                lexed_state: state_id,
                                recovery: false,
                                source: TokenSource::Fresh(scanned),
                            };
                        }
                    }
                }
            }
        }
        let scanned = scan_token(grammar, &mut self.reader, position, state.valid_terminals());
        let token_start = position + scanned.padding;
        self.tracer.token_scanned(
            grammar,
            scanned.kind,
            token_start,
            token_start + scanned.size,
        );
        Lookahead {
            reduce_key: scanned.kind,
            lexed_state: state_id,
            recovery: false,
            source: TokenSource::Fresh(scanned),
        }
    }

    fn reduce(&mut self, h: usize, prod_id: ProdId) {
        let grammar = self.grammar;
        let prod = grammar.production(prod_id);
        let fragile = self.live_heads() > 1;
        let head = &mut self.heads[h];
        head.fuel = head.fuel.saturating_sub(1);
        let popped = head.stack.pop(prod.steps.len());
        let mut children: Vec<Child> = Vec::with_capacity(popped.len());
        let mut steps = prod.steps.iter();
        for (child, countable) in popped {
            if !countable {
                children.push(child);
                continue;
            }
            let (field, alias) = match steps.next() {
                Some(step) => (step.field, step.alias),
                None => (None, None),
            };
            let subtree = child.subtree().clone();
            let kind = subtree.kind();
            // Hidden rules dissolve into the consuming production; their
            // children inherit the step's field unless they carry one.
            let hidden = alias.is_none()
                && !grammar.symbol_is_visible(kind)
                && matches!(
                    grammar.symbol_kind(kind),
                    SymbolKind::NonTerminal | SymbolKind::Auxiliary
                )
                && !subtree.is_error()
                && !subtree.is_missing();
            if hidden {
                for inner in subtree.into_children() {
                    children.push(inner.or_field(field));
                }
            } else {
                children.push(Child::new(subtree, field, alias));
            }
        }
        let parse_state = children
            .first()
            .map(|child| child.subtree().parse_state())
            .unwrap_or_else(|| head.stack.state());
        let mut flags = SubtreeFlags::EMPTY;
        if fragile {
            flags |= SubtreeFlags::FRAGILE;
        }
        let node = Subtree::node(prod.lhs, parse_state, flags, children);
        let below = head.stack.state();
        let Some(target) = grammar.parse_state(below).transition(prod.lhs) else {
            head.dead = true;
            self.tracer.dropped(h, "no goto after reduce");
            return;
        };
        head.dynamic_precedence += prod.dynamic_precedence as i64;
        head.stack.push(target, Child::new(node, None, None), true);
        self.tracer
            .reduced(grammar, prod.lhs, prod.steps.len(), target, h);
    }

    fn shift(&mut self, h: usize) {
        let grammar = self.grammar;
        let head = &mut self.heads[h];
        let Some(token) = head.token.take() else {
            return;
        };
        let state_id = head.stack.state();
        // Leaves record the state whose valid set lexed them, which is what
        // a later parse compares against when deciding on reuse.
        let lexed_state = token.lexed_state;
        let subtree = match token.source {
            TokenSource::Fresh(t) => {
                let mut flags = SubtreeFlags::EMPTY;
                if t.external {
                    flags |= SubtreeFlags::EXTERNAL;
                }
                if token.recovery {
                    flags |= SubtreeFlags::FRAGILE;
                }
                Subtree::leaf(t.kind, t.padding, t.size, lexed_state, t.lookahead_bytes, flags)
            }
            TokenSource::Reused(s) => s,
        };
        let kind = subtree.kind();
        let Some(target) = grammar.parse_state(state_id).transition(kind) else {
            head.dead = true;
            self.tracer.dropped(h, "shift without transition");
            return;
        };
        let total = subtree.total();
        head.stack.push(target, Child::new(subtree, None, None), true);
        head.position += total;
        if total.bytes > 0 {
            head.fuel = self.limits.reduction_fuel;
        } else {
            head.fuel = head.fuel.saturating_sub(1);
        }
        self.tracer.shifted(grammar, kind, target, h);
    }

    /// Pushes an extra token onto the stack without a state change.
    fn push_extra(&mut self, h: usize) {
        let grammar = self.grammar;
        let Some(token) = self.heads[h].token.take() else {
            return;
        };
        let state_id = self.heads[h].stack.state();
        let lexed_state = token.lexed_state;
        let subtree = match token.source {
            TokenSource::Fresh(t) => {
                let mut flags = SubtreeFlags::IS_EXTRA;
                if t.external {
                    flags |= SubtreeFlags::EXTERNAL;
                }
                if token.recovery {
                    flags |= SubtreeFlags::FRAGILE;
                }
                Subtree::leaf(t.kind, t.padding, t.size, lexed_state, t.lookahead_bytes, flags)
            }
            TokenSource::Reused(s) => {
                if !s.is_extra() {
                    if let Some(cursor) = self.reuse.as_mut() {
                        cursor.reject();
                    }
                    return;
                }
                s
            }
        };
        let kind = subtree.kind();
        let total = subtree.total();
        let head = &mut self.heads[h];
        if total.bytes == 0 {
            head.fuel = head.fuel.saturating_sub(1);
            if head.fuel == 0 {
                head.dead = true;
            }
            return;
        }
        head.stack.push(state_id, Child::new(subtree, None, None), false);
        head.position += total;
        head.fuel = self.limits.reduction_fuel;
        self.tracer.shifted(grammar, kind, state_id, h);
    }

    fn accept(&mut self, h: usize) {
        let grammar = self.grammar;
        let trailing = self.trailing(h);
        let drained = self.heads[h].stack.drain();
        let mut children: Vec<Child> = Vec::with_capacity(drained.len());
        for (child, _) in drained {
            let sub = child.subtree();
            if sub.kind() == grammar.root_symbol() && !sub.is_error() && child.alias().is_none() {
                for inner in sub.clone().into_children() {
                    children.push(inner);
                }
            } else {
                children.push(child);
            }
        }
        let root = Subtree::node(
            grammar.root_symbol(),
            grammar.start_state(),
            SubtreeFlags::EMPTY,
            children,
        )
        .into_root(trailing);
        self.record_accept(h, root);
    }

    /// Recovery entry point: the head has no action on its lookahead.
    fn recover(&mut self, h: usize) {
        let grammar = self.grammar;
        if self.live_heads() > 1 {
            self.heads[h].dead = true;
            self.tracer.dropped(h, "stuck while other heads live");
            return;
        }
        // A reused lookahead nothing can act on: retry its pieces before
        // real recovery.
        if matches!(
            self.heads[h].token.as_ref().map(|t| &t.source),
            Some(TokenSource::Reused(_))
        ) {
            if let Some(cursor) = self.reuse.as_mut() {
                cursor.reject();
            }
            self.heads[h].token = None;
            return;
        }
        let state_id = self.heads[h].stack.state();
        // Context lexing may have refused text the grammar does know. Relex
        // with every terminal admissible so recovery decides on the real
        // next token instead of a one-codepoint fragment.
        if matches!(
            self.heads[h].token.as_ref().map(|t| &t.source),
            Some(TokenSource::Fresh(t)) if t.kind == Symbol::ERROR
        ) {
            let position = self.heads[h].position;
            let rescanned = scan_token(grammar, &mut self.reader, position, &self.recovery_valid);
            if rescanned.kind != Symbol::END && rescanned.kind != Symbol::ERROR {
                self.heads[h].token = Some(Lookahead {
                    reduce_key: rescanned.kind,
                    lexed_state: state_id,
                    recovery: true,
                    source: TokenSource::Fresh(rescanned),
                });
            }
        }
        let key = match self.heads[h].token.as_ref() {
            Some(token) => token.reduce_key,
            None => return,
        };
        if self.heads[h].fuel > 0 {
            // Try inserting one zero-width MISSING token that lets the
            // real lookahead act afterwards.
            let state = grammar.parse_state(state_id);
            for candidate in state.valid_terminals().iter() {
                let Some(target) = state.transition(candidate) else {
                    continue;
                };
                if grammar.parse_state(target).handles(key) {
                    let missing = Subtree::missing(candidate, state_id, MISSING_TOKEN_COST);
                    let head = &mut self.heads[h];
                    head.stack.push(target, Child::new(missing, None, None), true);
                    head.error_cost += MISSING_TOKEN_COST;
                    head.fuel -= 1;
                    self.tracer.missing_inserted(grammar, candidate, h);
                    return;
                }
            }
        }
        if key == Symbol::END {
            self.force_finish(h);
        } else {
            self.skip_token(h);
        }
    }

    /// Wraps the lookahead into the `ERROR` grouping on top of the stack,
    /// starting one if needed, and moves past it.
    fn skip_token(&mut self, h: usize) {
        let grammar = self.grammar;
        let Some(token) = self.heads[h].token.take() else {
            return;
        };
        let lexed_state = token.lexed_state;
        let TokenSource::Fresh(mut t) = token.source else {
            return;
        };
        if t.kind == Symbol::ERROR {
            // The state's own valid set refused this text. Relex with every
            // terminal admissible so the grouping holds a real token when
            // one exists, not a one-codepoint fragment.
            let position = self.heads[h].position;
            let rescanned = scan_token(grammar, &mut self.reader, position, &self.recovery_valid);
            if rescanned.kind != Symbol::END {
                t = rescanned;
            }
        }
        let state_id = self.heads[h].stack.state();
        let mut flags = SubtreeFlags::EMPTY;
        if t.external {
            flags |= SubtreeFlags::EXTERNAL;
        }
        let leaf = Subtree::leaf(t.kind, t.padding, t.size, lexed_state, t.lookahead_bytes, flags);
        let total = leaf.total();
        let start = self.heads[h].position + t.padding;
        let end = start + t.size;
        let extend = matches!(
            self.heads[h].stack.top(),
            Some((slot, false)) if slot.subtree().is_error()
        );
        let head = &mut self.heads[h];
        if extend {
            let Some((slot, _)) = head.stack.pop_slot() else {
                return;
            };
            let container = slot.subtree().clone();
            let container_state = container.parse_state();
            let mut members = container.into_children();
            members.push(Child::new(leaf, None, None));
            let penalty = ERROR_ENTER_COST + ERROR_TOKEN_COST * members.len() as u32;
            let error = Subtree::error(container_state, penalty, members);
            head.stack.push(state_id, Child::new(error, None, None), false);
            head.error_cost += ERROR_TOKEN_COST;
        } else {
            let penalty = ERROR_ENTER_COST + ERROR_TOKEN_COST;
            let error = Subtree::error(state_id, penalty, vec![Child::new(leaf, None, None)]);
            head.stack.push(state_id, Child::new(error, None, None), false);
            head.error_cost += penalty;
        }
        head.position += total;
        head.fuel = self.limits.reduction_fuel;
        self.tracer.skipped(grammar, t.kind, start, end, h);
    }

    /// End of input with no way to accept: bundle what the stack holds
    /// under the root, wrapping loose fragments in `ERROR` groupings.
    fn force_finish(&mut self, h: usize) {
        let grammar = self.grammar;
        let trailing = self.trailing(h);
        let drained = self.heads[h].stack.drain();
        let mut children: Vec<Child> = Vec::new();
        let mut pending: Vec<Child> = Vec::new();
        for (child, _) in drained {
            let sub = child.subtree();
            if sub.kind() == grammar.root_symbol() && !sub.is_error() && child.alias().is_none() {
                flush_errors(&mut children, &mut pending);
                for inner in sub.clone().into_children() {
                    children.push(inner);
                }
            } else if sub.is_extra() || sub.is_error() {
                flush_errors(&mut children, &mut pending);
                children.push(child);
            } else {
                pending.push(child);
            }
        }
        flush_errors(&mut children, &mut pending);
        let root = Subtree::node(
            grammar.root_symbol(),
            grammar.start_state(),
            SubtreeFlags::EMPTY,
            children,
        )
        .into_root(trailing);
        self.record_accept(h, root);
    }

    /// Padding of the pending END token: the whitespace after the last
    /// real token.
    fn trailing(&self, h: usize) -> Length {
        match self.heads[h].token.as_ref().map(|t| &t.source) {
            Some(TokenSource::Fresh(t)) if t.kind == Symbol::END => t.padding,
            _ => Length::ZERO,
        }
    }

    fn record_accept(&mut self, h: usize, root: Subtree) {
        let cost = root.error_cost();
        let precedence = self.heads[h].dynamic_precedence;
        self.tracer.accepted(self.grammar, cost);
        let better = match &self.accepted {
            None => true,
            Some(prev) => cost < prev.cost || (cost == prev.cost && precedence > prev.precedence),
        };
        if better {
            self.accepted = Some(Accepted {
                root,
                cost,
                precedence,
            });
        }
        self.heads[h].dead = true;
    }

    /// Drops heads that can no longer win and merges converged ones.
    fn prune(&mut self) {
        if let Some(best) = &self.accepted {
            let cost = best.cost;
            let doomed: Vec<usize> = self
                .heads
                .iter()
                .enumerate()
                .filter(|(_, head)| !head.dead && head.error_cost > cost)
                .map(|(i, _)| i)
                .collect();
            for i in doomed {
                self.heads[i].dead = true;
                self.tracer.dropped(i, "worse than an accepted parse");
            }
        }
        let n = self.heads.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.heads[i], &self.heads[j]);
                if a.dead || b.dead || a.token.is_some() || b.token.is_some() {
                    continue;
                }
                if a.stack.state() != b.stack.state() || a.position.bytes != b.position.bytes {
                    continue;
                }
                let keep_first = (a.error_cost, Reverse(a.dynamic_precedence))
                    <= (b.error_cost, Reverse(b.dynamic_precedence));
                let drop_idx = if keep_first { j } else { i };
                self.heads[drop_idx].dead = true;
                self.tracer.dropped(drop_idx, "merged with an equal head");
            }
        }
        self.heads.retain(|head| !head.dead);
    }
}

fn first_leaf_kind(subtree: &Subtree) -> Symbol {
    let mut current = subtree;
    while let Some(child) = current.child(0) {
        current = child;
    }
    current.kind()
}

fn flush_errors(children: &mut Vec<Child>, pending: &mut Vec<Child>) {
    if pending.is_empty() {
        return;
    }
    let state = pending
        .first()
        .map(|child| child.subtree().parse_state())
        .unwrap_or(0);
    let members = std::mem::take(pending);
    children.push(Child::new(
        Subtree::error(state, ERROR_ENTER_COST, members),
        None,
        None,
    ));
}
