use super::*;

/// Renders every production as `lhs -> step step ... [prec, assoc]`.
fn dump_productions(grammar: &Grammar) -> String {
    let mut out = String::new();
    for i in 0..grammar.production_count() as ProdId {
        let prod = grammar.production(i);
        out.push_str(grammar.symbol_name(prod.lhs));
        out.push_str(" ->");
        for step in &prod.steps {
            out.push(' ');
            if let Some(field) = step.field {
                out.push_str(grammar.field_name(field));
                out.push(':');
            }
            if grammar.symbol_is_named(step.symbol) {
                out.push_str(grammar.symbol_name(step.symbol));
            } else {
                out.push('\'');
                out.push_str(grammar.symbol_name(step.symbol));
                out.push('\'');
            }
            if let Some(alias) = step.alias {
                out.push_str(" as ");
                out.push_str(grammar.symbol_name(alias));
            }
        }
        match (prod.precedence, prod.associativity) {
            (Some(p), Some(Associativity::Left)) => out.push_str(&format!(" [prec {p}, left]")),
            (Some(p), Some(Associativity::Right)) => out.push_str(&format!(" [prec {p}, right]")),
            (Some(p), None) => out.push_str(&format!(" [prec {p}]")),
            (None, _) => {}
        }
        out.push('\n');
    }
    out
}

const ARITH: &str = r#"{
    "name": "arith",
    "rules": {
        "expression": {
            "type": "CHOICE",
            "members": [
                {
                    "type": "PREC_LEFT",
                    "value": 1,
                    "content": { "type": "SEQ", "members": [
                        { "type": "SYMBOL", "name": "expression" },
                        { "type": "STRING", "value": "+" },
                        { "type": "SYMBOL", "name": "expression" }
                    ]}
                },
                {
                    "type": "PREC_LEFT",
                    "value": 2,
                    "content": { "type": "SEQ", "members": [
                        { "type": "SYMBOL", "name": "expression" },
                        { "type": "STRING", "value": "*" },
                        { "type": "SYMBOL", "name": "expression" }
                    ]}
                },
                { "type": "SYMBOL", "name": "number" }
            ]
        },
        "number": { "type": "PATTERN", "value": "[0-9]+" }
    }
}"#;

#[test]
fn compiles_minimal_sequence() {
    let json = r#"{
        "name": "tiny",
        "rules": {
            "source_file": { "type": "SEQ", "members": [
                { "type": "STRING", "value": "a" },
                { "type": "STRING", "value": "b" }
            ]}
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    assert_eq!(grammar.name(), "tiny");

    let root = grammar.root_symbol();
    assert_eq!(grammar.symbol_name(root), "source_file");
    assert_eq!(grammar.symbol_kind(root), SymbolKind::NonTerminal);
    assert_eq!(grammar.symbol_for_name("source_file", true), Some(root));

    // Builtins and synthetics are not addressable by name.
    assert_eq!(grammar.symbol_for_name("end", false), None);
    assert_eq!(grammar.symbol_for_name("_start", true), None);
    assert_eq!(grammar.symbol_for_name("_start", false), None);

    // Start production plus the one real rule.
    assert_eq!(grammar.production_count(), 2);
    assert_eq!(grammar.terminal_defs().len(), 2);

    // Walk the tables: shift a, shift b, reduce at end of input.
    let a = grammar.symbol_for_name("a", false).unwrap();
    let b = grammar.symbol_for_name("b", false).unwrap();
    let s0 = grammar.parse_state(grammar.start_state());
    assert!(s0.handles(a));
    assert!(!s0.handles(b));

    let after_a = grammar.parse_state(s0.transition(a).unwrap());
    let after_b = grammar.parse_state(after_a.transition(b).unwrap());
    assert_eq!(after_b.reductions(Symbol::END).len(), 1);
    let prod = grammar.production(after_b.reductions(Symbol::END)[0]);
    assert_eq!(prod.lhs, root);

    // The goto on the root rule lands in the accepting state.
    let accept = grammar.parse_state(s0.transition(root).unwrap());
    assert!(accept.accepts_end());
}

#[test]
fn flattens_choices_into_separate_productions() {
    let grammar = Grammar::from_json(ARITH).unwrap();
    insta::assert_snapshot!(dump_productions(&grammar), @r#"
    _start -> expression
    expression -> expression '+' expression [prec 1, left]
    expression -> expression '*' expression [prec 2, left]
    expression -> number
    "#);
}

#[test]
fn lowers_repeat_to_hidden_helper() {
    let json = r#"{
        "name": "list",
        "rules": {
            "document": { "type": "REPEAT", "content": { "type": "SYMBOL", "name": "item" } },
            "item": { "type": "STRING", "value": "x" }
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    insta::assert_snapshot!(dump_productions(&grammar), @r#"
    _start -> document
    _document_repeat1 ->
    _document_repeat1 -> _document_repeat1 item
    document -> _document_repeat1
    "#);

    // The helper is never addressable and never visible.
    assert_eq!(grammar.symbol_for_name("_document_repeat1", true), None);
    assert_eq!(grammar.symbol_for_name("_document_repeat1", false), None);
    let helper = (0..grammar.symbol_count() as u16)
        .map(Symbol)
        .find(|&s| grammar.symbol_kind(s) == SymbolKind::Auxiliary && grammar.symbol_name(s) != "_start")
        .unwrap();
    assert!(!grammar.symbol_is_visible(helper));

    // An empty list reduces the helper before any item is shifted.
    let item = grammar.symbol_for_name("item", true).unwrap();
    let s0 = grammar.parse_state(grammar.start_state());
    assert_eq!(s0.reductions(Symbol::END).len(), 1);
    assert_eq!(s0.reductions(item).len(), 1);
}

#[test]
fn repeat1_requires_one_element() {
    let json = r#"{
        "name": "list",
        "rules": {
            "document": { "type": "REPEAT1", "content": { "type": "SYMBOL", "name": "item" } },
            "item": { "type": "STRING", "value": "x" }
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    // No empty production, so nothing reduces before the first item.
    let s0 = grammar.parse_state(grammar.start_state());
    assert!(s0.reductions(Symbol::END).is_empty());
    let item = grammar.symbol_for_name("item", true).unwrap();
    assert!(s0.transition(item).is_some());
}

#[test]
fn precedence_resolves_shift_reduce() {
    let grammar = Grammar::from_json(ARITH).unwrap();
    let expr = grammar.root_symbol();
    let plus = grammar.symbol_for_name("+", false).unwrap();
    let star = grammar.symbol_for_name("*", false).unwrap();

    let s0 = grammar.parse_state(grammar.start_state());
    let s_expr = grammar.parse_state(s0.transition(expr).unwrap());
    assert!(s_expr.accepts_end());

    // After `expr + expr`: `+` at equal precedence and left associativity
    // reduces; `*` at higher precedence shifts.
    let s_plus = grammar.parse_state(s_expr.transition(plus).unwrap());
    let after = grammar.parse_state(s_plus.transition(expr).unwrap());
    assert_eq!(after.reductions(plus).len(), 1);
    assert!(after.transition(plus).is_none());
    assert!(after.reductions(star).is_empty());
    assert!(after.transition(star).is_some());

    // After `expr * expr`: both lookaheads reduce.
    let s_star = grammar.parse_state(s_expr.transition(star).unwrap());
    let after = grammar.parse_state(s_star.transition(expr).unwrap());
    assert_eq!(after.reductions(plus).len(), 1);
    assert!(after.transition(plus).is_none());
    assert_eq!(after.reductions(star).len(), 1);
    assert!(after.transition(star).is_none());
}

#[test]
fn undeclared_conflict_prefers_shift() {
    let json = r#"{
        "name": "amb",
        "rules": {
            "s": { "type": "SEQ", "members": [
                { "type": "SYMBOL", "name": "e" },
                { "type": "STRING", "value": ";" }
            ]},
            "e": { "type": "CHOICE", "members": [
                { "type": "SEQ", "members": [
                    { "type": "SYMBOL", "name": "e" },
                    { "type": "STRING", "value": "+" },
                    { "type": "SYMBOL", "name": "e" }
                ]},
                { "type": "STRING", "value": "x" }
            ]}
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let e = grammar.symbol_for_name("e", true).unwrap();
    let plus = grammar.symbol_for_name("+", false).unwrap();

    let s0 = grammar.parse_state(grammar.start_state());
    let s_e = grammar.parse_state(s0.transition(e).unwrap());
    let s_plus = grammar.parse_state(s_e.transition(plus).unwrap());
    let after = grammar.parse_state(s_plus.transition(e).unwrap());

    // No precedence on either side and no declared conflict: shift wins.
    assert!(after.transition(plus).is_some());
    assert!(after.reductions(plus).is_empty());
}

#[test]
fn declared_conflict_keeps_both_actions() {
    let json = r#"{
        "name": "amb",
        "rules": {
            "s": { "type": "SEQ", "members": [
                { "type": "SYMBOL", "name": "e" },
                { "type": "STRING", "value": ";" }
            ]},
            "e": { "type": "CHOICE", "members": [
                { "type": "SEQ", "members": [
                    { "type": "SYMBOL", "name": "e" },
                    { "type": "STRING", "value": "+" },
                    { "type": "SYMBOL", "name": "e" }
                ]},
                { "type": "STRING", "value": "x" }
            ]}
        },
        "conflicts": [["e"]]
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let e = grammar.symbol_for_name("e", true).unwrap();
    let plus = grammar.symbol_for_name("+", false).unwrap();

    let s0 = grammar.parse_state(grammar.start_state());
    let s_e = grammar.parse_state(s0.transition(e).unwrap());
    let s_plus = grammar.parse_state(s_e.transition(plus).unwrap());
    let after = grammar.parse_state(s_plus.transition(e).unwrap());

    // Both actions stay live; the runtime forks a head for each.
    assert!(after.transition(plus).is_some());
    assert_eq!(after.reductions(plus).len(), 1);
}

#[test]
fn named_precedences_rank_by_position() {
    let json = r#"{
        "name": "t",
        "rules": {
            "e": { "type": "CHOICE", "members": [
                { "type": "PREC_LEFT", "value": "sum", "content": { "type": "SEQ", "members": [
                    { "type": "SYMBOL", "name": "e" },
                    { "type": "STRING", "value": "+" },
                    { "type": "SYMBOL", "name": "e" }
                ]}},
                { "type": "PREC_LEFT", "value": "product", "content": { "type": "SEQ", "members": [
                    { "type": "SYMBOL", "name": "e" },
                    { "type": "STRING", "value": "*" },
                    { "type": "SYMBOL", "name": "e" }
                ]}},
                { "type": "PATTERN", "value": "[0-9]+" }
            ]}
        },
        "precedences": [[
            { "type": "STRING", "value": "product" },
            { "type": "STRING", "value": "sum" }
        ]]
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    // Earlier entries bind tighter: product ranks above sum.
    let sum = grammar.production(1);
    let product = grammar.production(2);
    assert!(product.precedence.unwrap() > sum.precedence.unwrap());
}

#[test]
fn hidden_and_inline_rules_are_invisible() {
    let json = r#"{
        "name": "t",
        "rules": {
            "root": { "type": "SEQ", "members": [
                { "type": "SYMBOL", "name": "_decl" },
                { "type": "SYMBOL", "name": "value" }
            ]},
            "_decl": { "type": "STRING", "value": "let" },
            "value": { "type": "PATTERN", "value": "[0-9]+" }
        },
        "inline": ["value"]
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let decl = grammar.symbol_for_name("_decl", true).unwrap();
    let value = grammar.symbol_for_name("value", true).unwrap();
    assert!(!grammar.symbol_is_visible(decl));
    assert!(!grammar.symbol_is_visible(value));
    assert!(grammar.symbol_is_visible(grammar.root_symbol()));
}

#[test]
fn underscore_root_is_forced_visible() {
    let json = r#"{
        "name": "t",
        "rules": {
            "_program": { "type": "STRING", "value": "x" }
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    assert!(grammar.symbol_is_visible(grammar.root_symbol()));
}

#[test]
fn word_and_literal_metadata() {
    let json = r#"{
        "name": "t",
        "word": "identifier",
        "rules": {
            "root": { "type": "CHOICE", "members": [
                { "type": "STRING", "value": "if" },
                { "type": "SYMBOL", "name": "identifier" }
            ]},
            "identifier": { "type": "PATTERN", "value": "[a-z]+" }
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let ident = grammar.symbol_for_name("identifier", true).unwrap();
    assert_eq!(grammar.word_symbol(), Some(ident));

    let kw = grammar.symbol_for_name("if", false).unwrap();
    let defs = grammar.terminal_defs();
    assert!(defs.iter().any(|d| d.symbol() == kw && d.is_literal()));
    assert!(defs.iter().any(|d| d.symbol() == ident && !d.is_literal()));
}

#[test]
fn extras_split_nodes_from_padding() {
    let json = r##"{
        "name": "t",
        "rules": {
            "doc": { "type": "REPEAT1", "content": { "type": "SYMBOL", "name": "word" } },
            "word": { "type": "PATTERN", "value": "[a-z]+" },
            "comment": { "type": "PATTERN", "value": "#[^\\n]*" }
        },
        "extras": [
            { "type": "PATTERN", "value": "\\s+" },
            { "type": "SYMBOL", "name": "comment" }
        ]
    }"##;

    let grammar = Grammar::from_json(json).unwrap();
    let comment = grammar.symbol_for_name("comment", true).unwrap();
    let ws = grammar.symbol_for_name(r"\s+", false).unwrap();

    // Named extras become nodes; anonymous whitespace folds into padding.
    assert_eq!(grammar.extras(), &[comment]);
    assert!(grammar.is_extra(comment));
    assert!(!grammar.is_skip(comment));
    assert!(grammar.is_skip(ws));
    assert!(!grammar.is_extra(ws));
}

#[test]
fn aliases_and_fields_decorate_steps() {
    let json = r#"{
        "name": "t",
        "rules": {
            "call": { "type": "SEQ", "members": [
                { "type": "FIELD", "name": "function", "content": {
                    "type": "ALIAS",
                    "content": { "type": "SYMBOL", "name": "identifier" },
                    "value": "callee",
                    "named": true
                }},
                { "type": "STRING", "value": "(" },
                { "type": "STRING", "value": ")" }
            ]},
            "identifier": { "type": "PATTERN", "value": "[a-z]+" }
        }
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let call = grammar.root_symbol();
    let ident = grammar.symbol_for_name("identifier", true).unwrap();
    let callee = grammar.symbol_for_name("callee", true).unwrap();
    assert_eq!(grammar.symbol_kind(callee), SymbolKind::Alias);

    let prod = (0..grammar.production_count() as ProdId)
        .map(|i| grammar.production(i))
        .find(|p| p.lhs == call)
        .unwrap();
    assert_eq!(prod.steps.len(), 3);
    assert_eq!(prod.steps[0].symbol, ident);
    assert_eq!(prod.steps[0].alias, Some(callee));
    let field = prod.steps[0].field.unwrap();
    assert_eq!(grammar.field_name(field), "function");
    assert_eq!(grammar.field_id("function"), Some(field));
    assert_eq!(prod.steps[1].field, None);
}

#[test]
fn external_tokens_claim_their_rules() {
    let json = r#"{
        "name": "t",
        "rules": {
            "doc": { "type": "SEQ", "members": [
                { "type": "STRING", "value": "<" },
                { "type": "SYMBOL", "name": "raw_text" },
                { "type": "STRING", "value": ">" }
            ]},
            "raw_text": { "type": "STRING", "value": "placeholder" }
        },
        "externals": [
            { "type": "SYMBOL", "name": "raw_text" },
            { "type": "SYMBOL", "name": "_marker" }
        ]
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let raw = grammar.symbol_for_name("raw_text", true).unwrap();
    let marker = grammar.symbol_for_name("_marker", true).unwrap();

    assert_eq!(grammar.externals(), &[raw, marker]);
    assert_eq!(grammar.symbol_kind(raw), SymbolKind::External);
    assert!(grammar.symbol_is_visible(raw));
    assert!(!grammar.symbol_is_visible(marker));

    // The scanner owns the token; the in-grammar body is discarded.
    assert!(
        grammar
            .terminal_defs()
            .iter()
            .all(|d| d.symbol() != raw)
    );
}

#[test]
fn supertypes_resolve_to_symbols() {
    let json = r#"{
        "name": "t",
        "rules": {
            "root": { "type": "SYMBOL", "name": "expression" },
            "expression": { "type": "STRING", "value": "x" }
        },
        "supertypes": ["expression"]
    }"#;

    let grammar = Grammar::from_json(json).unwrap();
    let expr = grammar.symbol_for_name("expression", true).unwrap();
    assert_eq!(grammar.supertypes(), &[expr]);
}

#[test]
fn rejects_empty_rule_set() {
    let err = Grammar::from_json(r#"{ "name": "t", "rules": {} }"#).unwrap_err();
    assert!(matches!(err, GrammarError::NoRules));
}

#[test]
fn rejects_undefined_symbol() {
    let json = r#"{
        "name": "t",
        "rules": {
            "root": { "type": "SYMBOL", "name": "missing" }
        }
    }"#;

    match Grammar::from_json(json).unwrap_err() {
        GrammarError::UndefinedSymbol { rule, name } => {
            assert_eq!(rule, "root");
            assert_eq!(name, "missing");
        }
        other => panic!("expected UndefinedSymbol, got {other}"),
    }
}

#[test]
fn rejects_undefined_precedence_name() {
    let json = r#"{
        "name": "t",
        "rules": {
            "root": { "type": "PREC", "value": "nope", "content": {
                "type": "SEQ", "members": [{ "type": "STRING", "value": "x" }]
            }}
        }
    }"#;

    let err = Grammar::from_json(json).unwrap_err();
    assert!(matches!(err, GrammarError::UndefinedPrecedence(name) if name == "nope"));
}

#[test]
fn rejects_word_that_is_not_a_token() {
    let json = r#"{
        "name": "t",
        "word": "root",
        "rules": {
            "root": { "type": "SEQ", "members": [{ "type": "STRING", "value": "x" }] }
        }
    }"#;

    let err = Grammar::from_json(json).unwrap_err();
    assert!(matches!(err, GrammarError::InvalidWord(name) if name == "root"));
}

#[test]
fn rejects_token_matching_empty_string() {
    let json = r#"{
        "name": "t",
        "rules": {
            "root": { "type": "SYMBOL", "name": "spaces" },
            "spaces": { "type": "PATTERN", "value": "a*" }
        }
    }"#;

    let err = Grammar::from_json(json).unwrap_err();
    assert!(matches!(err, GrammarError::InvalidPattern { .. }));
}

#[test]
fn rejects_grammar_inheritance() {
    let json = r#"{
        "name": "t",
        "inherits": "base",
        "rules": {
            "root": { "type": "STRING", "value": "x" }
        }
    }"#;

    let err = Grammar::from_json(json).unwrap_err();
    assert!(matches!(err, GrammarError::Unsupported(_)));
}
