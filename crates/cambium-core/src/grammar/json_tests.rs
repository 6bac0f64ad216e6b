use super::*;

#[test]
fn parse_minimal_grammar() {
    let json = r#"{
        "name": "test",
        "rules": {
            "source_file": { "type": "SYMBOL", "name": "expression" },
            "expression": { "type": "STRING", "value": "x" }
        }
    }"#;

    let spec = GrammarSpec::from_json(json).unwrap();
    assert_eq!(spec.name, "test");
    assert_eq!(spec.rules.len(), 2);
}

#[test]
fn preserves_rule_order() {
    let json = r#"{
        "name": "test",
        "rules": {
            "program": { "type": "SYMBOL", "name": "statement" },
            "statement": { "type": "SYMBOL", "name": "expression" },
            "expression": { "type": "STRING", "value": "x" }
        }
    }"#;

    let spec = GrammarSpec::from_json(json).unwrap();

    // Definition order, not alphabetical; the root rule must stay first.
    assert_eq!(spec.rules[0].0, "program");
    assert_eq!(spec.rules[1].0, "statement");
    assert_eq!(spec.rules[2].0, "expression");
}

#[test]
fn parse_seq_and_choice() {
    let json = r#"{
        "name": "test",
        "rules": {
            "root": {
                "type": "SEQ",
                "members": [
                    { "type": "STRING", "value": "a" },
                    { "type": "CHOICE", "members": [
                        { "type": "STRING", "value": "b" },
                        { "type": "BLANK" }
                    ]}
                ]
            }
        }
    }"#;

    let spec = GrammarSpec::from_json(json).unwrap();
    let Rule::Seq(members) = &spec.rules[0].1 else {
        panic!("expected SEQ");
    };
    assert_eq!(members.len(), 2);
    assert!(matches!(members[1], Rule::Choice(_)));
}

#[test]
fn parse_field_and_alias() {
    let json = r#"{
        "name": "test",
        "rules": {
            "call": {
                "type": "FIELD",
                "name": "function",
                "content": {
                    "type": "ALIAS",
                    "content": { "type": "SYMBOL", "name": "identifier" },
                    "value": "callee",
                    "named": true
                }
            },
            "identifier": { "type": "PATTERN", "value": "[a-z]+" }
        }
    }"#;

    let spec = GrammarSpec::from_json(json).unwrap();
    let Rule::Field { name, content } = &spec.rules[0].1 else {
        panic!("expected FIELD");
    };
    assert_eq!(name, "function");
    let Rule::Alias { value, named, .. } = content.as_ref() else {
        panic!("expected ALIAS");
    };
    assert_eq!(value, "callee");
    assert!(named);
}

#[test]
fn parse_pattern_flags() {
    let json = r#"{
        "name": "test",
        "rules": {
            "keyword": { "type": "PATTERN", "value": "select", "flags": "i" }
        }
    }"#;

    let spec = GrammarSpec::from_json(json).unwrap();
    let Rule::Pattern { value, flags } = &spec.rules[0].1 else {
        panic!("expected PATTERN");
    };
    assert_eq!(value, "select");
    assert_eq!(flags.as_deref(), Some("i"));
}

#[test]
fn parse_precedence_forms() {
    let json = r#"{
        "name": "test",
        "rules": {
            "expr": {
                "type": "CHOICE",
                "members": [
                    {
                        "type": "PREC_LEFT",
                        "value": 3,
                        "content": { "type": "STRING", "value": "a" }
                    },
                    {
                        "type": "PREC",
                        "value": "member",
                        "content": { "type": "STRING", "value": "b" }
                    }
                ]
            }
        },
        "precedences": [
            [
                { "type": "STRING", "value": "member" },
                { "type": "STRING", "value": "call" },
                { "type": "SYMBOL", "name": "expr" }
            ]
        ]
    }"#;

    let spec = GrammarSpec::from_json(json).unwrap();
    let Rule::Choice(members) = &spec.rules[0].1 else {
        panic!("expected CHOICE");
    };
    assert!(matches!(
        &members[0],
        Rule::PrecLeft {
            value: Precedence::Integer(3),
            ..
        }
    ));
    assert!(matches!(
        &members[1],
        Rule::Prec {
            value: Precedence::Name(_),
            ..
        }
    ));
    assert_eq!(spec.precedences.len(), 1);
    assert_eq!(
        spec.precedences[0][0],
        PrecedenceEntry::Name("member".into())
    );
    assert_eq!(spec.precedences[0][2], PrecedenceEntry::Symbol("expr".into()));
}

#[test]
fn parse_top_level_sections() {
    let json = r##"{
        "name": "test",
        "word": "identifier",
        "rules": {
            "root": { "type": "SYMBOL", "name": "identifier" },
            "identifier": { "type": "PATTERN", "value": "[a-z]+" },
            "comment": { "type": "PATTERN", "value": "#[^\\n]*" }
        },
        "extras": [
            { "type": "PATTERN", "value": "\\s+" },
            { "type": "SYMBOL", "name": "comment" }
        ],
        "conflicts": [["root"]],
        "inline": ["identifier"],
        "supertypes": ["root"],
        "externals": [{ "type": "SYMBOL", "name": "string_content" }]
    }"##;

    let spec = GrammarSpec::from_json(json).unwrap();
    assert_eq!(spec.word.as_deref(), Some("identifier"));
    assert_eq!(spec.extras.len(), 2);
    assert_eq!(spec.conflicts, vec![vec!["root".to_string()]]);
    assert_eq!(spec.inline, vec!["identifier".to_string()]);
    assert_eq!(spec.supertypes, vec!["root".to_string()]);
    assert!(matches!(&spec.externals[0], Rule::Symbol(name) if name == "string_content"));
}

#[test]
fn rejects_unknown_rule_type() {
    let json = r#"{
        "name": "test",
        "rules": {
            "root": { "type": "BOGUS" }
        }
    }"#;

    let err = GrammarSpec::from_json(json).unwrap_err();
    assert!(matches!(err, GrammarError::Json(_)));
}

#[test]
fn rejects_malformed_json() {
    let err = GrammarSpec::from_json("{not json").unwrap_err();
    assert!(matches!(err, GrammarError::Json(_)));
}
