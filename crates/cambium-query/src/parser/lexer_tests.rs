use super::lexer::{lex, token_text};

/// Format tokens without trivia (default for most tests)
fn snapshot(input: &str) -> String {
    format_tokens(input, false)
}

/// Format tokens with trivia included
fn snapshot_raw(input: &str) -> String {
    format_tokens(input, true)
}

fn format_tokens(input: &str, include_trivia: bool) -> String {
    let tokens = lex(input);
    let mut out = String::new();
    for token in tokens {
        if include_trivia || !token.kind.is_trivia() {
            out.push_str(&format!(
                "{:?} {:?}\n",
                token.kind,
                token_text(input, &token)
            ));
        }
    }
    out
}

#[test]
fn punctuation() {
    insta::assert_snapshot!(snapshot("( ) [ ] : ! _ ."), @r#"
    ParenOpen "("
    ParenClose ")"
    BracketOpen "["
    BracketClose "]"
    Colon ":"
    Negation "!"
    Underscore "_"
    Dot "."
    "#);
}

#[test]
fn quantifiers() {
    insta::assert_snapshot!(snapshot("* + ?"), @r#"
    Star "*"
    Plus "+"
    Question "?"
    "#);
}

#[test]
fn node_pattern() {
    insta::assert_snapshot!(snapshot("(binary_expression)"), @r#"
    ParenOpen "("
    Id "binary_expression"
    ParenClose ")"
    "#);
}

#[test]
fn identifiers_take_dots_and_hyphens() {
    insta::assert_snapshot!(snapshot("foo foo.bar foo-bar f_1.x"), @r#"
    Id "foo"
    Id "foo.bar"
    Id "foo-bar"
    Id "f_1.x"
    "#);
}

#[test]
fn captures() {
    insta::assert_snapshot!(snapshot("@name @function.name"), @r#"
    At "@"
    Id "name"
    At "@"
    Id "function.name"
    "#);
}

#[test]
fn predicate_names() {
    insta::assert_snapshot!(snapshot("#eq? #not-match? #any-of? #set!"), @r##"
    PredName "#eq?"
    PredName "#not-match?"
    PredName "#any-of?"
    PredName "#set!"
    "##);
}

#[test]
fn string_splits_into_quotes_and_content() {
    insta::assert_snapshot!(snapshot(r#""self""#), @r#"
    DoubleQuote "\""
    StrVal "self"
    DoubleQuote "\""
    "#);
}

#[test]
fn empty_string_has_no_content_token() {
    insta::assert_snapshot!(snapshot(r#""""#), @r#"
    DoubleQuote "\""
    DoubleQuote "\""
    "#);
}

#[test]
fn string_with_escapes() {
    insta::assert_snapshot!(snapshot(r#""a\"b" "\n""#), @r#"
    DoubleQuote "\""
    StrVal "a\\\"b"
    DoubleQuote "\""
    DoubleQuote "\""
    StrVal "\\n"
    DoubleQuote "\""
    "#);
}

#[test]
fn field_pattern() {
    insta::assert_snapshot!(snapshot("(call function: (identifier) @fn)"), @r#"
    ParenOpen "("
    Id "call"
    Id "function"
    Colon ":"
    ParenOpen "("
    Id "identifier"
    ParenClose ")"
    At "@"
    Id "fn"
    ParenClose ")"
    "#);
}

#[test]
fn comments_are_trivia() {
    insta::assert_snapshot!(snapshot("(a) ; trailing"), @r#"
    ParenOpen "("
    Id "a"
    ParenClose ")"
    "#);
}

#[test]
fn trivia_preserved_in_raw_mode() {
    insta::assert_snapshot!(snapshot_raw("(a) ; note\n(b)"), @r#"
    ParenOpen "("
    Id "a"
    ParenClose ")"
    Whitespace " "
    Comment "; note"
    Newline "\n"
    ParenOpen "("
    Id "b"
    ParenClose ")"
    "#);
}

#[test]
fn newline_forms() {
    insta::assert_snapshot!(snapshot_raw("a\nb\r\nc"), @r#"
    Id "a"
    Newline "\n"
    Id "b"
    Newline "\r\n"
    Id "c"
    "#);
}

#[test]
fn garbage_coalesces_consecutive_errors() {
    insta::assert_snapshot!(snapshot("a $%& b"), @r#"
    Id "a"
    Garbage "$%&"
    Id "b"
    "#);
}

#[test]
fn garbage_at_end_of_input() {
    insta::assert_snapshot!(snapshot("(a) ~~"), @r#"
    ParenOpen "("
    Id "a"
    ParenClose ")"
    Garbage "~~"
    "#);
}

#[test]
fn empty_input() {
    assert_eq!(lex(""), vec![]);
}
