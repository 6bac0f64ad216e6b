//! Compiled grammar tables.
//!
//! Everything the parser runtime needs at parse time: interned symbols and
//! fields, fixed-arity productions, LR states, and the lexer DFA. Rule
//! combinators from the descriptor layer are gone by this point; repeats
//! have been lowered to auxiliary left-recursive symbols and choices have
//! been multiplied out into separate productions.

use std::collections::HashMap;
use std::num::NonZeroU16;

use regex_automata::dfa::dense;
use regex_automata::util::primitives::{PatternID, StateID};
use serde::{Deserialize, Serialize};

use super::rules::Associativity;

/// Interned node kind. Index into the grammar's symbol table.
///
/// Two ids are reserved in every grammar: [`Symbol::END`] for end of input
/// and [`Symbol::ERROR`] for error nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub(crate) u16);

impl Symbol {
    /// End of input. Never appears in a tree.
    pub const END: Symbol = Symbol(0);
    /// Error node kind.
    pub const ERROR: Symbol = Symbol(1);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }
}

/// Interned field name. Ids start at 1 so that `Option<FieldId>` is free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub(crate) NonZeroU16);

impl FieldId {
    #[inline]
    pub fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self.0.get()
    }

    pub fn from_raw(raw: u16) -> Option<FieldId> {
        NonZeroU16::new(raw).map(FieldId)
    }
}

/// What role a symbol plays in the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    /// End of input sentinel.
    End,
    /// The error node.
    Error,
    /// A token lexed by the built-in lexer.
    Terminal,
    /// A token produced by an external scanner.
    External,
    /// A rule with productions.
    NonTerminal,
    /// A synthesized repeat helper. Never visible, never in a tree.
    Auxiliary,
    /// A name introduced only by `alias`, never parsed itself.
    Alias,
}

/// Per-symbol metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub(crate) name: String,
    pub(crate) kind: SymbolKind,
    pub(crate) named: bool,
    pub(crate) visible: bool,
}

/// Index of an LR parse state.
pub type StateId = u32;

/// Index of a production in the grammar.
pub type ProdId = u32;

/// One step of a production: the symbol to match plus the decoration the
/// resulting child carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub symbol: Symbol,
    pub field: Option<FieldId>,
    pub alias: Option<Symbol>,
    /// Precedence in effect for shifting this symbol's tokens.
    pub precedence: Option<i32>,
}

/// A fixed-arity production. Reducing pops exactly `steps.len()` countable
/// stack entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub lhs: Symbol,
    pub steps: Vec<Step>,
    pub precedence: Option<i32>,
    pub associativity: Option<Associativity>,
    pub dynamic_precedence: i32,
}

/// One LR state: transitions on shifted symbols, reductions keyed by
/// lookahead terminal, and the terminals the lexer should try here.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParseState {
    /// Sorted by symbol. Covers terminal shifts and nonterminal gotos alike.
    pub(crate) transitions: Vec<(Symbol, StateId)>,
    /// Sorted by lookahead terminal. Multiple productions mean a fork.
    pub(crate) reductions: Vec<(Symbol, Vec<ProdId>)>,
    /// End of input is accepted here.
    pub(crate) accepts_end: bool,
    /// Terminals with a shift or reduce action in this state.
    pub(crate) valid_terminals: SymbolSet,
}

impl ParseState {
    /// Target state after shifting `symbol` (terminal or nonterminal).
    #[inline]
    pub fn transition(&self, symbol: Symbol) -> Option<StateId> {
        self.transitions
            .binary_search_by_key(&symbol, |(s, _)| *s)
            .ok()
            .map(|i| self.transitions[i].1)
    }

    /// Productions to reduce when `lookahead` is next.
    pub fn reductions(&self, lookahead: Symbol) -> &[ProdId] {
        self.reductions
            .binary_search_by_key(&lookahead, |(s, _)| *s)
            .map(|i| self.reductions[i].1.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn accepts_end(&self) -> bool {
        self.accepts_end
    }

    #[inline]
    pub fn valid_terminals(&self) -> &SymbolSet {
        &self.valid_terminals
    }

    /// True if this state has any action on `terminal`.
    #[inline]
    pub fn handles(&self, terminal: Symbol) -> bool {
        self.valid_terminals.contains(terminal)
            || (terminal == Symbol::END && self.accepts_end)
    }
}

/// A bitset over symbol ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSet {
    bits: Vec<u64>,
}

impl SymbolSet {
    pub fn new() -> Self {
        SymbolSet::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        let (word, bit) = (symbol.index() / 64, symbol.index() % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1 << bit;
    }

    #[inline]
    pub fn contains(&self, symbol: Symbol) -> bool {
        let (word, bit) = (symbol.index() / 64, symbol.index() % 64);
        self.bits.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Unions `other` into `self`. Returns true if anything was added.
    pub fn union_with(&mut self, other: &SymbolSet) -> bool {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        let mut changed = false;
        for (dst, src) in self.bits.iter_mut().zip(&other.bits) {
            let merged = *dst | *src;
            changed |= merged != *dst;
            *dst = merged;
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.bits.iter().enumerate().flat_map(|(word, bits)| {
            (0..64)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| Symbol((word * 64 + bit) as u16))
        })
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = SymbolSet::new();
        for sym in iter {
            set.insert(sym);
        }
        set
    }
}

/// How a terminal is lexed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerminalDef {
    pub(crate) symbol: Symbol,
    /// Anchored regex source fed to the DFA builder.
    pub(crate) pattern: String,
    /// Literal strings beat patterns of the same match length.
    pub(crate) is_literal: bool,
}

impl TerminalDef {
    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        self.is_literal
    }
}

/// The compiled lexer: one anchored multi-pattern DFA over UTF-8 bytes.
///
/// Pattern ids index the grammar's terminal definitions. Rebuilt from those
/// definitions when a grammar is loaded from a snapshot; never serialized.
#[derive(Debug)]
pub struct LexTable {
    pub(crate) dfa: dense::DFA<Vec<u32>>,
    pub(crate) start: StateID,
    /// PatternID index -> terminal symbol.
    pub(crate) pattern_symbols: Vec<Symbol>,
}

impl LexTable {
    #[inline]
    pub fn dfa(&self) -> &dense::DFA<Vec<u32>> {
        &self.dfa
    }

    /// The anchored start state.
    #[inline]
    pub fn start_state(&self) -> StateID {
        self.start
    }

    /// Terminal symbol for a matched pattern.
    #[inline]
    pub fn symbol_for_pattern(&self, pattern: PatternID) -> Symbol {
        self.pattern_symbols[pattern.as_usize()]
    }
}

/// A compiled grammar: everything needed to parse and to interpret trees.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) name: String,
    pub(crate) symbols: Vec<SymbolInfo>,
    pub(crate) fields: Vec<String>,
    pub(crate) productions: Vec<Production>,
    pub(crate) states: Vec<ParseState>,
    pub(crate) terminals: Vec<TerminalDef>,
    /// Extras that produce nodes (e.g. comments).
    pub(crate) extras: Vec<Symbol>,
    /// Anonymous extras absorbed as padding (e.g. whitespace).
    pub(crate) skips: Vec<Symbol>,
    pub(crate) externals: Vec<Symbol>,
    pub(crate) supertypes: Vec<Symbol>,
    pub(crate) word: Option<Symbol>,
    pub(crate) root: Symbol,
    pub(crate) lex: LexTable,
    /// Name -> symbol maps, split by namedness so `&str` lookups stay cheap.
    pub(crate) named_lookup: HashMap<String, Symbol>,
    pub(crate) anon_lookup: HashMap<String, Symbol>,
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root symbol: the first declared rule.
    #[inline]
    pub fn root_symbol(&self) -> Symbol {
        self.root
    }

    /// The initial parse state.
    #[inline]
    pub fn start_state(&self) -> StateId {
        0
    }

    /// Total number of node kinds, including hidden and builtin ones.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        &self.symbols[symbol.index()].name
    }

    pub fn symbol_is_named(&self, symbol: Symbol) -> bool {
        self.symbols[symbol.index()].named
    }

    pub fn symbol_is_visible(&self, symbol: Symbol) -> bool {
        self.symbols[symbol.index()].visible
    }

    pub fn symbol_kind(&self, symbol: Symbol) -> SymbolKind {
        self.symbols[symbol.index()].kind
    }

    /// Look up a kind by name. `named` distinguishes the rule `"if"` could
    /// define from the anonymous literal `"if"`.
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<Symbol> {
        if named {
            self.named_lookup.get(name).copied()
        } else {
            self.anon_lookup.get(name).copied()
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_name(&self, field: FieldId) -> &str {
        &self.fields[field.index()]
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f == name)
            .and_then(|i| FieldId::from_raw(i as u16 + 1))
    }

    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.extras.contains(&symbol)
    }

    pub fn extras(&self) -> &[Symbol] {
        &self.extras
    }

    /// Terminals consumed as padding rather than as nodes.
    pub fn is_skip(&self, symbol: Symbol) -> bool {
        self.skips.contains(&symbol)
    }

    pub fn externals(&self) -> &[Symbol] {
        &self.externals
    }

    pub fn supertypes(&self) -> &[Symbol] {
        &self.supertypes
    }

    pub fn word_symbol(&self) -> Option<Symbol> {
        self.word
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn parse_state(&self, state: StateId) -> &ParseState {
        &self.states[state as usize]
    }

    #[inline]
    pub fn production(&self, prod: ProdId) -> &Production {
        &self.productions[prod as usize]
    }

    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    #[inline]
    pub fn lex_table(&self) -> &LexTable {
        &self.lex
    }

    pub fn terminal_defs(&self) -> &[TerminalDef] {
        &self.terminals
    }

    pub(crate) fn build_lookups(
        symbols: &[SymbolInfo],
    ) -> (HashMap<String, Symbol>, HashMap<String, Symbol>) {
        let mut named = HashMap::new();
        let mut anon = HashMap::new();
        for (i, info) in symbols.iter().enumerate() {
            // End and repeat helpers are not addressable by name.
            if matches!(info.kind, SymbolKind::End | SymbolKind::Auxiliary) {
                continue;
            }
            // First definition wins so that lookups favor real rules over
            // later alias entries with the same spelling.
            let map = if info.named { &mut named } else { &mut anon };
            map.entry(info.name.clone()).or_insert(Symbol(i as u16));
        }
        (named, anon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_set_insert_and_iterate() {
        let mut set = SymbolSet::new();
        set.insert(Symbol(3));
        set.insert(Symbol(64));
        set.insert(Symbol(200));
        assert!(set.contains(Symbol(3)));
        assert!(set.contains(Symbol(64)));
        assert!(set.contains(Symbol(200)));
        assert!(!set.contains(Symbol(4)));
        assert!(!set.contains(Symbol(1000)));
        let collected: Vec<_> = set.iter().collect();
        assert_eq!(collected, vec![Symbol(3), Symbol(64), Symbol(200)]);
    }

    #[test]
    fn field_id_is_one_based() {
        let field = FieldId::from_raw(1).unwrap();
        assert_eq!(field.index(), 0);
        assert!(FieldId::from_raw(0).is_none());
    }
}
