//! Grammar descriptor types.
//!
//! A [`GrammarSpec`] is the declarative form of a language: named rules
//! built from the [`Rule`] combinators, plus the lists that shape parsing
//! (extras, conflicts, externals, inline, supertypes). Compiling a spec
//! into runtime tables is the job of [`crate::grammar::Grammar`].

use serde::{Deserialize, Serialize};

/// Complete grammar descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarSpec {
    /// Grammar name (e.g., "javascript", "rust").
    pub name: String,
    /// Production rules, preserving definition order. The first rule is the
    /// root of the language.
    pub rules: Vec<(String, Rule)>,
    /// Extra/trivia rules that may appear between any two tokens.
    #[serde(default)]
    pub extras: Vec<Rule>,
    /// Named precedence orderings, highest first.
    #[serde(default)]
    pub precedences: Vec<Vec<PrecedenceEntry>>,
    /// Symbol sets that are allowed to conflict during parsing.
    #[serde(default)]
    pub conflicts: Vec<Vec<String>>,
    /// External scanner tokens.
    #[serde(default)]
    pub externals: Vec<Rule>,
    /// Rules whose nodes are spliced into their parent.
    #[serde(default)]
    pub inline: Vec<String>,
    /// Supertype rules.
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Keyword identifier rule.
    #[serde(default)]
    pub word: Option<String>,
    /// Reserved word contexts. Parsed but not supported by the engine.
    #[serde(default)]
    pub reserved: Vec<(String, Vec<Rule>)>,
    /// Parent grammar name. Parsed but not supported by the engine.
    #[serde(default)]
    pub inherits: Option<String>,
}

/// Grammar rule variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// Epsilon (empty match).
    Blank,
    /// Literal token.
    String(String),
    /// Regex token.
    Pattern {
        value: String,
        #[serde(default)]
        flags: Option<String>,
    },
    /// Reference to another rule.
    Symbol(String),
    /// Sequence of rules.
    Seq(Vec<Rule>),
    /// Alternation.
    Choice(Vec<Rule>),
    /// Zero or more repetitions.
    Repeat(Box<Rule>),
    /// One or more repetitions.
    Repeat1(Box<Rule>),
    /// Named field on the children this rule produces.
    Field { name: String, content: Box<Rule> },
    /// Rename the node this rule produces.
    Alias {
        content: Box<Rule>,
        value: String,
        named: bool,
    },
    /// Force the content to lex as one token.
    Token(Box<Rule>),
    /// Like `Token`, but without preceding extras. The engine accepts this
    /// and lexes it as an ordinary token.
    ImmediateToken(Box<Rule>),
    /// Precedence.
    Prec {
        value: Precedence,
        content: Box<Rule>,
    },
    /// Left-associative precedence.
    PrecLeft {
        value: Precedence,
        content: Box<Rule>,
    },
    /// Right-associative precedence.
    PrecRight {
        value: Precedence,
        content: Box<Rule>,
    },
    /// Dynamic precedence, applied when resolving ambiguous parses.
    PrecDynamic { value: i32, content: Box<Rule> },
    /// Reserved word context. Parsed but rejected at compile time.
    Reserved {
        context_name: String,
        content: Box<Rule>,
    },
}

impl Rule {
    /// Shorthand for a sequence.
    pub fn seq(members: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::Seq(members.into_iter().collect())
    }

    /// Shorthand for an alternation.
    pub fn choice(members: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::Choice(members.into_iter().collect())
    }

    /// Shorthand for a literal token.
    pub fn literal(text: impl Into<String>) -> Rule {
        Rule::String(text.into())
    }

    /// Shorthand for a regex token.
    pub fn pattern(value: impl Into<String>) -> Rule {
        Rule::Pattern {
            value: value.into(),
            flags: None,
        }
    }

    /// Shorthand for a rule reference.
    pub fn symbol(name: impl Into<String>) -> Rule {
        Rule::Symbol(name.into())
    }

    /// Shorthand for a field wrapper.
    pub fn field(name: impl Into<String>, content: Rule) -> Rule {
        Rule::Field {
            name: name.into(),
            content: Box::new(content),
        }
    }
}

/// Precedence value (numeric or named).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Precedence {
    Integer(i32),
    Name(String),
}

/// Entry in a named precedence ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrecedenceEntry {
    /// Named precedence level.
    Name(String),
    /// Symbol reference. Accepted but not used for ranking.
    Symbol(String),
}

/// Associativity attached to a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Associativity {
    Left,
    Right,
}
