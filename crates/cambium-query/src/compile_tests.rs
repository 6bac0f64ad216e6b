use std::sync::Arc;

use cambium_core::grammar::Grammar;

use crate::{Query, QueryError, QueryErrorKind};

const LANG: &str = r#"{
    "name": "lang",
    "rules": {
        "module": { "type": "REPEAT", "content": { "type": "SYMBOL", "name": "definition" } },
        "definition": { "type": "SEQ", "members": [
            { "type": "FIELD", "name": "name", "content": { "type": "SYMBOL", "name": "identifier" } },
            { "type": "STRING", "value": "=" },
            { "type": "FIELD", "name": "body", "content": { "type": "SYMBOL", "name": "number" } }
        ]},
        "identifier": { "type": "PATTERN", "value": "[a-z]+" },
        "number": { "type": "PATTERN", "value": "[0-9]+" }
    },
    "extras": [ { "type": "PATTERN", "value": "\\s+" } ]
}"#;

fn grammar() -> Arc<Grammar> {
    Arc::new(Grammar::from_json(LANG).unwrap())
}

fn compile(pattern: &str) -> Result<Query, QueryError> {
    Query::new(grammar(), pattern)
}

fn compile_err(pattern: &str) -> QueryError {
    match compile(pattern) {
        Ok(_) => panic!("pattern `{pattern}` should not compile"),
        Err(err) => err,
    }
}

// ==== successful compilation ====

#[test]
fn compiles_a_single_pattern() {
    let query = compile("(definition name: (identifier) @def)").unwrap();
    assert_eq!(query.pattern_count(), 1);
    assert_eq!(query.capture_names(), ["def"]);
    assert_eq!(query.capture_index_for_name("def"), Some(0));
    assert_eq!(query.capture_index_for_name("nope"), None);
    assert_eq!(query.start_byte_for_pattern(0), Some(0));
    assert_eq!(query.start_byte_for_pattern(1), None);
}

#[test]
fn capture_table_is_shared_across_patterns() {
    let query = compile("(identifier) @x (number) @y (definition) @x").unwrap();
    assert_eq!(query.pattern_count(), 3);
    // `@x` appears in two patterns but is interned once.
    assert_eq!(query.capture_names(), ["x", "y"]);
    assert_eq!(query.start_byte_for_pattern(0), Some(0));
    assert_eq!(query.start_byte_for_pattern(1), Some(16));
    assert_eq!(query.start_byte_for_pattern(2), Some(28));
}

#[test]
fn anonymous_token_literal() {
    let query = compile("\"=\" @op").unwrap();
    assert_eq!(query.pattern_count(), 1);
    assert_eq!(query.capture_names(), ["op"]);
}

#[test]
fn wildcard_patterns() {
    let query = compile("_ (_)").unwrap();
    assert_eq!(query.pattern_count(), 2);
}

#[test]
fn negated_field_on_node() {
    compile("(definition !body)").unwrap();
}

#[test]
fn quantified_field_value() {
    let query = compile("(definition name: (identifier)* @names)").unwrap();
    assert_eq!(query.capture_names(), ["names"]);
}

#[test]
fn regex_predicate_compiles() {
    compile("((number) @n (#match? @n \"\\\\d+\"))").unwrap();
}

#[test]
fn keeps_the_grammar_alive() {
    let g = grammar();
    let query = Query::new(Arc::clone(&g), "(identifier)").unwrap();
    assert!(Arc::ptr_eq(query.grammar(), &g));
}

#[test]
fn query_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Query>();
}

// ==== node kind and field errors ====

#[test]
fn unknown_node_kind() {
    let err = compile_err("(nosuch)");
    assert_eq!(err.kind, QueryErrorKind::NodeKind);
    assert_eq!(err.offset, 1);
    assert_eq!(
        err.to_string(),
        "invalid node kind at offset 1: grammar `lang` has no node kind `nosuch`"
    );
}

#[test]
fn unknown_token_literal() {
    let err = compile_err("\"++\"");
    assert_eq!(err.kind, QueryErrorKind::NodeKind);
    assert_eq!(err.offset, 0);
    assert!(err.message.contains("has no token `++`"));
}

#[test]
fn unknown_field() {
    let err = compile_err("(definition nosuch: (identifier))");
    assert_eq!(err.kind, QueryErrorKind::Field);
    assert_eq!(err.offset, 12);
    assert!(err.message.contains("has no field `nosuch`"));
}

#[test]
fn unknown_negated_field() {
    let err = compile_err("(definition !nosuch)");
    assert_eq!(err.kind, QueryErrorKind::Field);
    assert_eq!(err.offset, 13);
    assert!(err.message.contains("has no field `nosuch`"));
}

// ==== capture and predicate errors ====

#[test]
fn undefined_capture_in_predicate() {
    let err = compile_err("((identifier) @x (#eq? @y \"v\"))");
    assert_eq!(err.kind, QueryErrorKind::Capture);
    assert_eq!(err.offset, 24);
    assert!(err.message.contains("`@y` is not bound in this pattern"));
}

#[test]
fn predicate_may_reference_capture_bound_later() {
    // The predicate sits before the capture in document order.
    compile("((#eq? @x \"v\") (identifier) @x)").unwrap();
}

#[test]
fn unknown_predicate() {
    let err = compile_err("((identifier) @x (#frob? @x))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert_eq!(err.offset, 18);
    assert!(err.message.contains("unknown predicate `#frob?`"));
}

#[test]
fn eq_missing_value() {
    let err = compile_err("((identifier) @x (#eq? @x))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert_eq!(err.offset, 17);
    assert!(err.message.contains("expects a capture and a value"));
}

#[test]
fn eq_extra_arguments() {
    let err = compile_err("((identifier) @x (#eq? @x \"a\" \"b\"))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert!(err.message.contains("takes exactly two arguments"));
}

#[test]
fn eq_requires_capture_first() {
    let err = compile_err("((identifier) @x (#eq? \"a\" \"b\"))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert!(err.message.contains("first argument must be a capture"));
}

#[test]
fn match_requires_string_regex() {
    let err = compile_err("((identifier) @x (#match? @x @x))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert!(err.message.contains("expects a capture and a regex string"));
}

#[test]
fn invalid_regex() {
    let err = compile_err("((identifier) @x (#match? @x \"[\"))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert_eq!(err.offset, 29);
    assert!(err.message.starts_with("invalid regex"));
}

#[test]
fn any_of_requires_string_values() {
    let err = compile_err("((identifier) @x (#any-of? @x @x))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert!(err.message.contains("values must be string literals"));
}

#[test]
fn any_of_requires_at_least_one_value() {
    let err = compile_err("((identifier) @x (#any-of? @x))");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert!(err.message.contains("expects at least one value"));
}

#[test]
fn predicate_outside_pattern() {
    let err = compile_err("(#eq? @x \"v\")");
    assert_eq!(err.kind, QueryErrorKind::Predicate);
    assert_eq!(err.offset, 0);
    assert_eq!(err.message, "predicate outside of a pattern");
}

// ==== structural errors ====

#[test]
fn syntax_error() {
    let err = compile_err("(definition");
    assert_eq!(err.kind, QueryErrorKind::Syntax);
    assert_eq!(err.offset, 0);
    assert!(err.message.contains("expected `)`"));
}

#[test]
fn empty_alternation() {
    let err = compile_err("[]");
    assert_eq!(err.kind, QueryErrorKind::Syntax);
    assert_eq!(err.offset, 0);
    assert!(err.message.contains("at least one branch"));
}

#[test]
fn misplaced_anchor_in_alternation() {
    let err = compile_err("[. (identifier)]");
    assert_eq!(err.kind, QueryErrorKind::Syntax);
    assert_eq!(err.offset, 1);
    assert_eq!(err.message, "anchor is only valid between child patterns");
}

#[test]
fn misplaced_field_in_alternation() {
    let err = compile_err("[name: (identifier)]");
    assert_eq!(err.kind, QueryErrorKind::Syntax);
    assert_eq!(err.offset, 1);
    assert_eq!(
        err.message,
        "field constraint is only valid on a child pattern"
    );
}

#[test]
fn misplaced_negated_field_in_group() {
    let err = compile_err("((identifier) !name)");
    assert_eq!(err.kind, QueryErrorKind::Syntax);
    assert_eq!(err.offset, 14);
    assert_eq!(
        err.message,
        "negated field is only valid inside a node pattern"
    );
}

#[test]
fn render_shows_the_offending_span() {
    let pattern = "(nosuch)";
    let err = compile_err(pattern);
    let rendered = err.render(pattern);
    assert!(rendered.contains("has no node kind `nosuch`"));
    assert!(rendered.contains("(nosuch)"));
}
