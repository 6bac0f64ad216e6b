//! Grammar compilation: descriptor to parse tables.
//!
//! Lowering happens in stages:
//! 1. Symbols are interned: externals first, then token rules and
//!    nonterminals in declaration order, then anything discovered on demand
//!    (anonymous tokens, repeat helpers, alias names).
//! 2. Rule bodies flatten into fixed-arity productions. Choices multiply
//!    out, repeats become hidden left-recursive helper symbols, and
//!    field/alias/precedence wrappers become step decorations.
//! 3. SLR(1) tables: LR(0) item sets with reductions gated by follow sets.
//!    Shift/reduce conflicts resolve by declared precedence and
//!    associativity, then in favor of shifting; unresolved conflicts stay
//!    in the tables and fork the parse stack at runtime.
//! 4. Token patterns compile into one anchored multi-pattern DFA.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::num::NonZeroU16;

use regex_automata::Anchored;
use regex_automata::MatchKind;
use regex_automata::dfa::{Automaton, StartKind, dense};
use regex_automata::util::start;
use regex_automata::util::syntax;

use super::GrammarError;
use super::rules::{Associativity, GrammarSpec, Precedence, PrecedenceEntry, Rule};
use super::tables::{
    FieldId, Grammar, LexTable, ParseState, ProdId, Production, StateId, Step, Symbol, SymbolInfo,
    SymbolKind, SymbolSet, TerminalDef,
};

/// The augmented start production is always first.
pub(crate) const START_PROD: ProdId = 0;

impl Grammar {
    /// Parse and compile a grammar.json descriptor.
    pub fn from_json(json: &str) -> Result<Grammar, GrammarError> {
        Grammar::compile(GrammarSpec::from_json(json)?)
    }

    /// Compile a descriptor into parse tables.
    pub fn compile(spec: GrammarSpec) -> Result<Grammar, GrammarError> {
        Builder::new(spec)?.finish()
    }
}

/// One flattened alternative of a rule body.
#[derive(Clone, Debug, Default)]
struct Alt {
    steps: Vec<Step>,
    precedence: Option<i32>,
    associativity: Option<Associativity>,
    dynamic: i32,
}

impl Alt {
    fn with_step(symbol: Symbol) -> Alt {
        Alt {
            steps: vec![Step {
                symbol,
                field: None,
                alias: None,
                precedence: None,
            }],
            ..Alt::default()
        }
    }
}

struct Builder {
    name: String,
    rules: Vec<(String, Rule)>,
    inline: HashSet<String>,
    prec_names: HashMap<String, i32>,
    conflicts_spec: Vec<Vec<String>>,
    extras_spec: Vec<Rule>,
    externals_spec: Vec<Rule>,
    supertypes_spec: Vec<String>,
    word_name: Option<String>,

    /// (name, named) -> symbol, for everything addressable by name.
    ids: HashMap<(String, bool), Symbol>,
    symbols: Vec<SymbolInfo>,
    fields: Vec<String>,
    field_ids: HashMap<String, FieldId>,
    terminals: Vec<TerminalDef>,
    productions: Vec<Production>,
    /// Bodies of named token rules, for resolving references inside `token()`.
    token_rules: HashMap<String, Rule>,
    extras: Vec<Symbol>,
    skips: Vec<Symbol>,
    externals: Vec<Symbol>,
}

impl Builder {
    fn new(spec: GrammarSpec) -> Result<Self, GrammarError> {
        if spec.rules.is_empty() {
            return Err(GrammarError::NoRules);
        }
        if spec.inherits.is_some() {
            return Err(GrammarError::Unsupported("grammar inheritance"));
        }
        if !spec.reserved.is_empty() {
            return Err(GrammarError::Unsupported("reserved word contexts"));
        }

        // Named precedence levels rank by position within their ordering,
        // highest first. The first ordering to mention a name wins.
        let mut prec_names = HashMap::new();
        for ordering in &spec.precedences {
            let len = ordering.len() as i32;
            for (i, entry) in ordering.iter().enumerate() {
                if let PrecedenceEntry::Name(name) = entry {
                    prec_names.entry(name.clone()).or_insert(len - i as i32);
                }
            }
        }

        let mut builder = Builder {
            name: spec.name,
            rules: spec.rules,
            inline: spec.inline.into_iter().collect(),
            prec_names,
            conflicts_spec: spec.conflicts,
            extras_spec: spec.extras,
            externals_spec: spec.externals,
            supertypes_spec: spec.supertypes,
            word_name: spec.word,
            ids: HashMap::new(),
            symbols: Vec::new(),
            fields: Vec::new(),
            field_ids: HashMap::new(),
            terminals: Vec::new(),
            productions: Vec::new(),
            token_rules: HashMap::new(),
            extras: Vec::new(),
            skips: Vec::new(),
            externals: Vec::new(),
        };

        builder.symbols.push(SymbolInfo {
            name: "end".into(),
            kind: SymbolKind::End,
            named: false,
            visible: false,
        });
        builder.symbols.push(SymbolInfo {
            name: "ERROR".into(),
            kind: SymbolKind::Error,
            named: true,
            visible: true,
        });
        Ok(builder)
    }

    fn finish(mut self) -> Result<Grammar, GrammarError> {
        self.intern_externals()?;
        self.intern_rules()?;
        let root = self.root_symbol()?;

        // Augmented start production; must be first so that the engine can
        // recognize acceptance by production id.
        let start_sym = self.intern_synthetic("_start")?;
        self.productions.push(Production {
            lhs: start_sym,
            steps: vec![Step {
                symbol: root,
                field: None,
                alias: None,
                precedence: None,
            }],
            precedence: None,
            associativity: None,
            dynamic_precedence: 0,
        });
        debug_assert_eq!(self.productions.len() as ProdId - 1, START_PROD);

        self.resolve_extras()?;
        self.lower_rules()?;

        let word = self.resolve_word()?;
        let supertypes = self.resolve_supertypes()?;
        let conflict_symbols = self.conflict_symbols()?;

        let states = {
            let tables = TableBuilder::new(&self.productions, &self.symbols, &conflict_symbols);
            tables.build(root)
        };
        let lex = build_lex_table(&self.terminals)?;
        let (named_lookup, anon_lookup) = Grammar::build_lookups(&self.symbols);

        Ok(Grammar {
            name: self.name,
            symbols: self.symbols,
            fields: self.fields,
            productions: self.productions,
            states,
            terminals: self.terminals,
            extras: self.extras,
            skips: self.skips,
            externals: self.externals,
            supertypes,
            word,
            root,
            lex,
            named_lookup,
            anon_lookup,
        })
    }

    // ==== Symbol interning ====

    fn intern(
        &mut self,
        name: &str,
        named: bool,
        kind: SymbolKind,
        visible: bool,
    ) -> Result<Symbol, GrammarError> {
        if let Some(sym) = self.ids.get(&(name.to_string(), named)) {
            return Ok(*sym);
        }
        let sym = self.push_symbol(name, kind, named, visible)?;
        self.ids.insert((name.to_string(), named), sym);
        Ok(sym)
    }

    /// A symbol that is never addressable by name, so it cannot collide
    /// with anything a grammar can spell.
    fn intern_synthetic(&mut self, name: &str) -> Result<Symbol, GrammarError> {
        self.push_symbol(name, SymbolKind::Auxiliary, false, false)
    }

    fn push_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        named: bool,
        visible: bool,
    ) -> Result<Symbol, GrammarError> {
        let index = self.symbols.len();
        if index > u16::MAX as usize {
            return Err(GrammarError::TooManySymbols(index + 1));
        }
        self.symbols.push(SymbolInfo {
            name: name.to_string(),
            kind,
            named,
            visible,
        });
        Ok(Symbol(index as u16))
    }

    fn intern_field(&mut self, name: &str) -> Result<FieldId, GrammarError> {
        if let Some(id) = self.field_ids.get(name) {
            return Ok(*id);
        }
        if self.fields.len() >= u16::MAX as usize {
            return Err(GrammarError::TooManyFields(self.fields.len() + 1));
        }
        self.fields.push(name.to_string());
        // Length is at least 1 here, so the id is always constructible.
        let id = FieldId(NonZeroU16::new(self.fields.len() as u16).unwrap_or(NonZeroU16::MIN));
        self.field_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Interns an anonymous token, registering its pattern on first sight.
    fn intern_token(
        &mut self,
        name: &str,
        pattern: String,
        is_literal: bool,
    ) -> Result<Symbol, GrammarError> {
        if let Some(sym) = self.ids.get(&(name.to_string(), false)) {
            return Ok(*sym);
        }
        let sym = self.intern(name, false, SymbolKind::Terminal, true)?;
        self.push_terminal(sym, pattern, is_literal)?;
        Ok(sym)
    }

    fn push_terminal(
        &mut self,
        symbol: Symbol,
        pattern: String,
        is_literal: bool,
    ) -> Result<(), GrammarError> {
        let hir = regex_syntax::Parser::new().parse(&pattern).map_err(|e| {
            GrammarError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            }
        })?;
        // A token that can match zero bytes would wedge the lexer.
        if hir.properties().minimum_len().unwrap_or(0) == 0 {
            return Err(GrammarError::InvalidPattern {
                pattern,
                message: "token may match the empty string".into(),
            });
        }
        self.terminals.push(TerminalDef {
            symbol,
            pattern,
            is_literal,
        });
        Ok(())
    }

    fn intern_externals(&mut self) -> Result<(), GrammarError> {
        for rule in self.externals_spec.clone() {
            let sym = match rule {
                Rule::Symbol(name) => {
                    let visible = !name.starts_with('_');
                    self.intern(&name, true, SymbolKind::External, visible)?
                }
                Rule::String(text) => self.intern(&text, false, SymbolKind::External, true)?,
                _ => return Err(GrammarError::Unsupported("complex external rules")),
            };
            self.externals.push(sym);
        }
        Ok(())
    }

    fn intern_rules(&mut self) -> Result<(), GrammarError> {
        let rules = self.rules.clone();
        // Pre-pass so token() bodies can reference token rules declared later.
        for (name, body) in &rules {
            if is_token_rule(body) {
                self.token_rules.insert(name.clone(), body.clone());
            }
        }
        for (name, body) in &rules {
            if self.ids.contains_key(&(name.clone(), true)) {
                // An external scanner claimed this name; the scanner wins.
                continue;
            }
            let visible = !name.starts_with('_') && !self.inline.contains(name);
            if is_token_rule(body) {
                let sym = self.intern(name, true, SymbolKind::Terminal, visible)?;
                let pattern = self.token_regex(body, 0)?;
                let is_literal = literal_text(body).is_some();
                self.push_terminal(sym, pattern, is_literal)?;
            } else {
                self.intern(name, true, SymbolKind::NonTerminal, visible)?;
            }
        }
        Ok(())
    }

    fn root_symbol(&mut self) -> Result<Symbol, GrammarError> {
        let name = self.rules[0].0.clone();
        let sym = self
            .ids
            .get(&(name, true))
            .copied()
            .ok_or(GrammarError::NoRules)?;
        // The root always materializes a node, hidden prefix or not.
        self.symbols[sym.index()].visible = true;
        Ok(sym)
    }

    fn resolve_extras(&mut self) -> Result<(), GrammarError> {
        for rule in self.extras_spec.clone() {
            match rule {
                Rule::Symbol(name) => {
                    let sym = self.ids.get(&(name.clone(), true)).copied().ok_or_else(|| {
                        GrammarError::UndefinedSymbol {
                            rule: "extras".into(),
                            name: name.clone(),
                        }
                    })?;
                    match self.symbols[sym.index()].kind {
                        SymbolKind::Terminal | SymbolKind::External => self.extras.push(sym),
                        _ => return Err(GrammarError::Unsupported("non-token extra rules")),
                    }
                }
                // Anonymous extras never become nodes; the lexer folds them
                // into the padding before the next token.
                Rule::String(text) => {
                    let sym = self.intern_token(&text, regex_syntax::escape(&text), true)?;
                    self.skips.push(sym);
                }
                Rule::Pattern { value, flags } => {
                    let source = pattern_source(&value, flags.as_deref());
                    let sym = self.intern_token(&value, source, false)?;
                    self.skips.push(sym);
                }
                Rule::Token(ref content) | Rule::ImmediateToken(ref content) => {
                    let source = self.token_regex(content, 0)?;
                    let sym = self.intern_token(&source.clone(), source, false)?;
                    self.skips.push(sym);
                }
                _ => return Err(GrammarError::Unsupported("non-token extra rules")),
            }
        }
        Ok(())
    }

    fn resolve_word(&self) -> Result<Option<Symbol>, GrammarError> {
        let Some(name) = &self.word_name else {
            return Ok(None);
        };
        let sym = self
            .ids
            .get(&(name.clone(), true))
            .copied()
            .ok_or_else(|| GrammarError::InvalidWord(name.clone()))?;
        if self.symbols[sym.index()].kind != SymbolKind::Terminal {
            return Err(GrammarError::InvalidWord(name.clone()));
        }
        Ok(Some(sym))
    }

    fn resolve_supertypes(&self) -> Result<Vec<Symbol>, GrammarError> {
        self.supertypes_spec
            .iter()
            .map(|name| {
                self.ids.get(&(name.clone(), true)).copied().ok_or_else(|| {
                    GrammarError::UndefinedSymbol {
                        rule: "supertypes".into(),
                        name: name.clone(),
                    }
                })
            })
            .collect()
    }

    fn conflict_symbols(&self) -> Result<HashSet<Symbol>, GrammarError> {
        let mut out = HashSet::new();
        for set in &self.conflicts_spec {
            for name in set {
                let sym = self.ids.get(&(name.clone(), true)).copied().ok_or_else(|| {
                    GrammarError::UndefinedSymbol {
                        rule: "conflicts".into(),
                        name: name.clone(),
                    }
                })?;
                out.insert(sym);
            }
        }
        Ok(out)
    }

    // ==== Rule lowering ====

    fn lower_rules(&mut self) -> Result<(), GrammarError> {
        let rules = self.rules.clone();
        for (name, body) in &rules {
            let Some(&lhs) = self.ids.get(&(name.clone(), true)) else {
                continue;
            };
            if self.symbols[lhs.index()].kind != SymbolKind::NonTerminal {
                // Token rules and external-claimed names have no productions.
                continue;
            }
            let mut aux = 0;
            for alt in self.expand(body, name, &mut aux)? {
                self.productions.push(Production {
                    lhs,
                    steps: alt.steps,
                    precedence: alt.precedence,
                    associativity: alt.associativity,
                    dynamic_precedence: alt.dynamic,
                });
            }
        }
        Ok(())
    }

    fn expand(
        &mut self,
        rule: &Rule,
        rule_name: &str,
        aux: &mut usize,
    ) -> Result<Vec<Alt>, GrammarError> {
        match rule {
            Rule::Blank => Ok(vec![Alt::default()]),
            Rule::Symbol(name) => {
                let sym = self.ids.get(&(name.clone(), true)).copied().ok_or_else(|| {
                    GrammarError::UndefinedSymbol {
                        rule: rule_name.to_string(),
                        name: name.clone(),
                    }
                })?;
                Ok(vec![Alt::with_step(sym)])
            }
            Rule::String(text) => {
                let sym = self.intern_token(text, regex_syntax::escape(text), true)?;
                Ok(vec![Alt::with_step(sym)])
            }
            Rule::Pattern { value, flags } => {
                let source = pattern_source(value, flags.as_deref());
                let sym = self.intern_token(value, source, false)?;
                Ok(vec![Alt::with_step(sym)])
            }
            Rule::Token(content) | Rule::ImmediateToken(content) => {
                let source = self.token_regex(content, 0)?;
                let sym = match literal_text(content) {
                    Some(text) => self.intern_token(&text, source, true)?,
                    None => self.intern_token(&source.clone(), source, false)?,
                };
                Ok(vec![Alt::with_step(sym)])
            }
            Rule::Seq(members) => {
                let mut alts = vec![Alt::default()];
                for member in members {
                    let member_alts = self.expand(member, rule_name, aux)?;
                    let mut combined = Vec::with_capacity(alts.len() * member_alts.len());
                    for base in &alts {
                        for m in &member_alts {
                            let mut alt = base.clone();
                            // A precedence wrapper on a fragment of a
                            // sequence only affects shifting its tokens.
                            let mut steps = m.steps.clone();
                            if let Some(p) = m.precedence {
                                for step in &mut steps {
                                    step.precedence.get_or_insert(p);
                                }
                            }
                            alt.steps.extend(steps);
                            combined.push(alt);
                        }
                    }
                    alts = combined;
                }
                Ok(alts)
            }
            Rule::Choice(members) => {
                let mut alts = Vec::new();
                for member in members {
                    alts.extend(self.expand(member, rule_name, aux)?);
                }
                Ok(alts)
            }
            Rule::Repeat(content) => {
                let sym = self.lower_repeat(content, rule_name, aux, true)?;
                Ok(vec![Alt::with_step(sym)])
            }
            Rule::Repeat1(content) => {
                let sym = self.lower_repeat(content, rule_name, aux, false)?;
                Ok(vec![Alt::with_step(sym)])
            }
            Rule::Field { name, content } => {
                let field = self.intern_field(name)?;
                let mut alts = self.expand(content, rule_name, aux)?;
                for alt in &mut alts {
                    for step in &mut alt.steps {
                        step.field.get_or_insert(field);
                    }
                }
                Ok(alts)
            }
            Rule::Alias {
                content,
                value,
                named,
            } => {
                let alias = self.intern(value, *named, SymbolKind::Alias, true)?;
                let mut alts = self.expand(content, rule_name, aux)?;
                for alt in &mut alts {
                    for step in &mut alt.steps {
                        step.alias.get_or_insert(alias);
                    }
                }
                Ok(alts)
            }
            Rule::Prec { value, content } => {
                self.expand_prec(content, value, None, rule_name, aux)
            }
            Rule::PrecLeft { value, content } => {
                self.expand_prec(content, value, Some(Associativity::Left), rule_name, aux)
            }
            Rule::PrecRight { value, content } => {
                self.expand_prec(content, value, Some(Associativity::Right), rule_name, aux)
            }
            Rule::PrecDynamic { value, content } => {
                let mut alts = self.expand(content, rule_name, aux)?;
                for alt in &mut alts {
                    if alt.dynamic == 0 {
                        alt.dynamic = *value;
                    }
                }
                Ok(alts)
            }
            Rule::Reserved { .. } => Err(GrammarError::Unsupported("reserved word contexts")),
        }
    }

    fn expand_prec(
        &mut self,
        content: &Rule,
        value: &Precedence,
        assoc: Option<Associativity>,
        rule_name: &str,
        aux: &mut usize,
    ) -> Result<Vec<Alt>, GrammarError> {
        let level = self.resolve_precedence(value)?;
        let mut alts = self.expand(content, rule_name, aux)?;
        for alt in &mut alts {
            alt.precedence.get_or_insert(level);
            if alt.associativity.is_none() {
                alt.associativity = assoc;
            }
            for step in &mut alt.steps {
                step.precedence.get_or_insert(level);
            }
        }
        Ok(alts)
    }

    fn resolve_precedence(&self, value: &Precedence) -> Result<i32, GrammarError> {
        match value {
            Precedence::Integer(v) => Ok(*v),
            Precedence::Name(name) => self
                .prec_names
                .get(name)
                .copied()
                .ok_or_else(|| GrammarError::UndefinedPrecedence(name.clone())),
        }
    }

    /// Lowers `x*` or `x+` to a hidden left-recursive helper symbol. The
    /// helper's nodes are spliced away when a visible parent consumes them,
    /// so repetition costs one stack entry per element, not one copy of the
    /// accumulated list.
    fn lower_repeat(
        &mut self,
        content: &Rule,
        rule_name: &str,
        aux: &mut usize,
        allow_empty: bool,
    ) -> Result<Symbol, GrammarError> {
        *aux += 1;
        let aux_name = format!("_{rule_name}_repeat{aux}");
        let sym = self.intern_synthetic(&aux_name)?;
        let content_alts = self.expand(content, rule_name, aux)?;
        if allow_empty {
            self.productions.push(Production {
                lhs: sym,
                steps: Vec::new(),
                precedence: None,
                associativity: None,
                dynamic_precedence: 0,
            });
        } else {
            for alt in &content_alts {
                self.productions.push(Production {
                    lhs: sym,
                    steps: alt.steps.clone(),
                    precedence: alt.precedence,
                    associativity: alt.associativity,
                    dynamic_precedence: alt.dynamic,
                });
            }
        }
        for alt in &content_alts {
            let mut steps = Vec::with_capacity(alt.steps.len() + 1);
            steps.push(Step {
                symbol: sym,
                field: None,
                alias: None,
                precedence: None,
            });
            steps.extend(alt.steps.iter().cloned());
            self.productions.push(Production {
                lhs: sym,
                steps,
                precedence: alt.precedence,
                associativity: alt.associativity,
                dynamic_precedence: alt.dynamic,
            });
        }
        Ok(sym)
    }

    // ==== Token patterns ====

    /// Regex source for a token rule body.
    fn token_regex(&self, rule: &Rule, depth: usize) -> Result<String, GrammarError> {
        if depth > 32 {
            return Err(GrammarError::Unsupported("recursive token rules"));
        }
        match rule {
            Rule::Blank => Ok(String::new()),
            Rule::String(text) => Ok(regex_syntax::escape(text)),
            Rule::Pattern { value, flags } => Ok(pattern_source(value, flags.as_deref())),
            Rule::Symbol(name) => {
                let body = self
                    .token_rules
                    .get(name)
                    .ok_or(GrammarError::Unsupported("non-token rule inside token"))?;
                self.token_regex(body, depth + 1)
            }
            Rule::Seq(members) => {
                let mut out = String::new();
                for member in members {
                    let part = self.token_regex(member, depth + 1)?;
                    out.push_str("(?:");
                    out.push_str(&part);
                    out.push(')');
                }
                Ok(out)
            }
            Rule::Choice(members) => {
                let parts = members
                    .iter()
                    .map(|m| self.token_regex(m, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("(?:{})", parts.join("|")))
            }
            Rule::Repeat(content) => Ok(format!("(?:{})*", self.token_regex(content, depth + 1)?)),
            Rule::Repeat1(content) => Ok(format!("(?:{})+", self.token_regex(content, depth + 1)?)),
            Rule::Token(content)
            | Rule::ImmediateToken(content)
            | Rule::Field { content, .. }
            | Rule::Alias { content, .. }
            | Rule::Prec { content, .. }
            | Rule::PrecLeft { content, .. }
            | Rule::PrecRight { content, .. }
            | Rule::PrecDynamic { content, .. } => self.token_regex(content, depth + 1),
            Rule::Reserved { .. } => Err(GrammarError::Unsupported("reserved word contexts")),
        }
    }
}

/// True if a rule body lexes as a single token.
fn is_token_rule(rule: &Rule) -> bool {
    match rule {
        Rule::String(_) | Rule::Pattern { .. } | Rule::Token(_) | Rule::ImmediateToken(_) => true,
        Rule::Prec { content, .. }
        | Rule::PrecLeft { content, .. }
        | Rule::PrecRight { content, .. }
        | Rule::PrecDynamic { content, .. } => is_token_rule(content),
        _ => false,
    }
}

/// The literal text of a token rule, if it is a plain string.
fn literal_text(rule: &Rule) -> Option<String> {
    match rule {
        Rule::String(text) => Some(text.clone()),
        Rule::Token(content)
        | Rule::ImmediateToken(content)
        | Rule::Prec { content, .. }
        | Rule::PrecLeft { content, .. }
        | Rule::PrecRight { content, .. }
        | Rule::PrecDynamic { content, .. } => literal_text(content),
        _ => None,
    }
}

fn pattern_source(value: &str, flags: Option<&str>) -> String {
    if flags.is_some_and(|f| f.contains('i')) {
        format!("(?i:{value})")
    } else {
        format!("(?:{value})")
    }
}

pub(super) fn build_lex_table(terminals: &[TerminalDef]) -> Result<LexTable, GrammarError> {
    let mut patterns: Vec<&str> = terminals.iter().map(|t| t.pattern.as_str()).collect();
    let mut pattern_symbols: Vec<Symbol> = terminals.iter().map(|t| t.symbol).collect();
    if patterns.is_empty() {
        // The builder wants at least one pattern; use one that never matches.
        patterns.push(r"[^\s\S]");
        pattern_symbols.push(Symbol::END);
    }
    let lex_error = |message: String| GrammarError::InvalidPattern {
        pattern: "<token set>".into(),
        message,
    };
    let dfa = dense::DFA::builder()
        .configure(
            dense::DFA::config()
                .match_kind(MatchKind::All)
                .start_kind(StartKind::Anchored),
        )
        .syntax(syntax::Config::new().unicode(true).utf8(true))
        .build_many(&patterns)
        .map_err(|e| lex_error(e.to_string()))?;
    let start = dfa
        .start_state(&start::Config::new().anchored(Anchored::Yes))
        .map_err(|e| lex_error(e.to_string()))?;
    Ok(LexTable {
        dfa,
        start,
        pattern_symbols,
    })
}

// ==== Parse table construction ====

/// Item in an LR(0) set: production index and dot position.
type Item = (ProdId, u32);
type ItemSet = BTreeSet<Item>;

struct TableBuilder<'a> {
    productions: &'a [Production],
    symbols: &'a [SymbolInfo],
    conflict_symbols: &'a HashSet<Symbol>,
    prods_by_lhs: HashMap<Symbol, Vec<ProdId>>,
    nullable: HashSet<Symbol>,
    first: Vec<SymbolSet>,
    follow: Vec<SymbolSet>,
}

impl<'a> TableBuilder<'a> {
    fn new(
        productions: &'a [Production],
        symbols: &'a [SymbolInfo],
        conflict_symbols: &'a HashSet<Symbol>,
    ) -> Self {
        let mut prods_by_lhs: HashMap<Symbol, Vec<ProdId>> = HashMap::new();
        for (i, prod) in productions.iter().enumerate() {
            prods_by_lhs.entry(prod.lhs).or_default().push(i as ProdId);
        }
        let mut builder = TableBuilder {
            productions,
            symbols,
            conflict_symbols,
            prods_by_lhs,
            nullable: HashSet::new(),
            first: vec![SymbolSet::new(); symbols.len()],
            follow: vec![SymbolSet::new(); symbols.len()],
        };
        builder.compute_nullable();
        builder.compute_first();
        builder
    }

    fn is_nonterminal(&self, sym: Symbol) -> bool {
        matches!(
            self.symbols[sym.index()].kind,
            SymbolKind::NonTerminal | SymbolKind::Auxiliary
        )
    }

    fn is_terminal(&self, sym: Symbol) -> bool {
        matches!(
            self.symbols[sym.index()].kind,
            SymbolKind::Terminal | SymbolKind::External
        )
    }

    fn compute_nullable(&mut self) {
        loop {
            let mut changed = false;
            for prod in self.productions {
                if self.nullable.contains(&prod.lhs) {
                    continue;
                }
                if prod
                    .steps
                    .iter()
                    .all(|s| self.nullable.contains(&s.symbol))
                {
                    self.nullable.insert(prod.lhs);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn compute_first(&mut self) {
        for (i, info) in self.symbols.iter().enumerate() {
            if matches!(info.kind, SymbolKind::Terminal | SymbolKind::External) {
                self.first[i].insert(Symbol(i as u16));
            }
        }
        loop {
            let mut changed = false;
            for prod in self.productions {
                for step in &prod.steps {
                    let src = self.first[step.symbol.index()].clone();
                    changed |= self.first[prod.lhs.index()].union_with(&src);
                    if !self.nullable.contains(&step.symbol) {
                        break;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn compute_follow(&mut self, root: Symbol) {
        self.follow[root.index()].insert(Symbol::END);
        loop {
            let mut changed = false;
            for prod in self.productions {
                for (i, step) in prod.steps.iter().enumerate() {
                    if !self.is_nonterminal(step.symbol) {
                        continue;
                    }
                    let mut rest_nullable = true;
                    let mut rest_first = SymbolSet::new();
                    for later in &prod.steps[i + 1..] {
                        rest_first.union_with(&self.first[later.symbol.index()]);
                        if !self.nullable.contains(&later.symbol) {
                            rest_nullable = false;
                            break;
                        }
                    }
                    changed |= self.follow[step.symbol.index()].union_with(&rest_first);
                    if rest_nullable {
                        let src = self.follow[prod.lhs.index()].clone();
                        changed |= self.follow[step.symbol.index()].union_with(&src);
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn closure(&self, set: &mut ItemSet) {
        let mut stack: Vec<Item> = set.iter().copied().collect();
        while let Some((p, d)) = stack.pop() {
            let prod = &self.productions[p as usize];
            let Some(step) = prod.steps.get(d as usize) else {
                continue;
            };
            if !self.is_nonterminal(step.symbol) {
                continue;
            }
            if let Some(prods) = self.prods_by_lhs.get(&step.symbol) {
                for &q in prods {
                    if set.insert((q, 0)) {
                        stack.push((q, 0));
                    }
                }
            }
        }
    }

    fn build(mut self, root: Symbol) -> Vec<ParseState> {
        self.compute_follow(root);

        let mut ids: HashMap<ItemSet, StateId> = HashMap::new();
        let mut sets: Vec<ItemSet> = Vec::new();
        let mut transitions_all: Vec<Vec<(Symbol, StateId)>> = Vec::new();

        let mut start_set = ItemSet::new();
        start_set.insert((START_PROD, 0));
        self.closure(&mut start_set);
        ids.insert(start_set.clone(), 0);
        sets.push(start_set);

        let mut index = 0;
        while index < sets.len() {
            let set = sets[index].clone();
            let mut by_symbol: BTreeMap<Symbol, ItemSet> = BTreeMap::new();
            for &(p, d) in &set {
                let prod = &self.productions[p as usize];
                if let Some(step) = prod.steps.get(d as usize) {
                    by_symbol.entry(step.symbol).or_default().insert((p, d + 1));
                }
            }
            let mut transitions = Vec::with_capacity(by_symbol.len());
            for (symbol, mut target) in by_symbol {
                self.closure(&mut target);
                let next = sets.len() as StateId;
                let id = *ids.entry(target.clone()).or_insert_with(|| {
                    sets.push(target);
                    next
                });
                transitions.push((symbol, id));
            }
            transitions_all.push(transitions);
            index += 1;
        }

        sets.iter()
            .zip(&transitions_all)
            .map(|(set, transitions)| self.make_state(set, transitions))
            .collect()
    }

    fn make_state(&self, set: &ItemSet, transitions: &[(Symbol, StateId)]) -> ParseState {
        let mut accepts_end = false;
        let mut reduce_map: BTreeMap<Symbol, Vec<ProdId>> = BTreeMap::new();
        for &(p, d) in set {
            let prod = &self.productions[p as usize];
            if (d as usize) < prod.steps.len() {
                continue;
            }
            if p == START_PROD {
                accepts_end = true;
                continue;
            }
            for t in self.follow[prod.lhs.index()].iter() {
                let entry = reduce_map.entry(t).or_default();
                if !entry.contains(&p) {
                    entry.push(p);
                }
            }
        }

        let mut dropped_shifts: HashSet<Symbol> = HashSet::new();
        let mut reductions: Vec<(Symbol, Vec<ProdId>)> = Vec::new();
        for (t, candidates) in reduce_map {
            let has_shift = transitions.iter().any(|(s, _)| *s == t);
            let shift_prec = self.shift_precedence(set, t);
            let mut keep_shift = has_shift;
            let mut kept: Vec<ProdId> = Vec::new();

            for p in candidates {
                let prod = &self.productions[p as usize];
                if !has_shift {
                    kept.push(p);
                    continue;
                }
                match (prod.precedence, shift_prec) {
                    (Some(rp), Some(sp)) if rp > sp => {
                        keep_shift = false;
                        kept.push(p);
                    }
                    (Some(rp), Some(sp)) if rp < sp => {}
                    (Some(_), Some(_)) => match prod.associativity {
                        Some(Associativity::Left) => {
                            keep_shift = false;
                            kept.push(p);
                        }
                        Some(Associativity::Right) => {}
                        // Equal precedence, no associativity: keep both and
                        // let the runtime fork.
                        None => kept.push(p),
                    },
                    // No declared precedence on one side: shift wins unless
                    // the grammar declared this conflict.
                    _ => {
                        if self.conflict_symbols.contains(&prod.lhs) {
                            kept.push(p);
                        }
                    }
                }
            }

            // Reduce/reduce: a unique highest declared precedence wins; any
            // production without one keeps the conflict alive.
            if kept.len() > 1
                && kept
                    .iter()
                    .all(|&p| self.productions[p as usize].precedence.is_some())
            {
                if let Some(max) = kept
                    .iter()
                    .filter_map(|&p| self.productions[p as usize].precedence)
                    .max()
                {
                    kept.retain(|&p| self.productions[p as usize].precedence == Some(max));
                }
            }

            if !keep_shift {
                dropped_shifts.insert(t);
            }
            if !kept.is_empty() {
                reductions.push((t, kept));
            }
        }

        let final_transitions: Vec<(Symbol, StateId)> = transitions
            .iter()
            .filter(|(s, _)| !dropped_shifts.contains(s))
            .copied()
            .collect();

        let mut valid_terminals = SymbolSet::new();
        for (s, _) in &final_transitions {
            if self.is_terminal(*s) {
                valid_terminals.insert(*s);
            }
        }
        for (t, _) in &reductions {
            valid_terminals.insert(*t);
        }

        ParseState {
            transitions: final_transitions,
            reductions,
            accepts_end,
            valid_terminals,
        }
    }

    fn shift_precedence(&self, set: &ItemSet, t: Symbol) -> Option<i32> {
        let mut best: Option<i32> = None;
        for &(p, d) in set {
            let prod = &self.productions[p as usize];
            if let Some(step) = prod.steps.get(d as usize) {
                if step.symbol == t {
                    if let Some(prec) = step.precedence {
                        best = Some(best.map_or(prec, |b| b.max(prec)));
                    }
                }
            }
        }
        best
    }
}
