use super::*;

const FIXTURE: &str = r##"{
    "name": "demo",
    "word": "identifier",
    "rules": {
        "call": { "type": "SEQ", "members": [
            { "type": "FIELD", "name": "function", "content": { "type": "SYMBOL", "name": "identifier" } },
            { "type": "STRING", "value": "(" },
            { "type": "STRING", "value": ")" }
        ]},
        "identifier": { "type": "PATTERN", "value": "[a-z]+" },
        "comment": { "type": "PATTERN", "value": "#[^\\n]*" }
    },
    "extras": [
        { "type": "PATTERN", "value": "\\s+" },
        { "type": "SYMBOL", "name": "comment" }
    ]
}"##;

#[test]
fn roundtrip_preserves_tables() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let bytes = grammar.to_snapshot().unwrap();
    let decoded = Grammar::from_snapshot(&bytes).unwrap();

    assert_eq!(decoded.name(), grammar.name());
    assert_eq!(decoded.symbol_count(), grammar.symbol_count());
    assert_eq!(decoded.production_count(), grammar.production_count());
    assert_eq!(decoded.state_count(), grammar.state_count());
    assert_eq!(decoded.terminal_defs().len(), grammar.terminal_defs().len());
    assert_eq!(
        decoded.symbol_name(decoded.root_symbol()),
        grammar.symbol_name(grammar.root_symbol())
    );
}

#[test]
fn roundtrip_rebuilds_lookups_and_lexer() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let decoded = Grammar::from_snapshot(&grammar.to_snapshot().unwrap()).unwrap();

    let ident = decoded.symbol_for_name("identifier", true).unwrap();
    assert_eq!(decoded.word_symbol(), Some(ident));
    assert_eq!(decoded.field_id("function").map(|f| decoded.field_name(f)), Some("function"));

    let comment = decoded.symbol_for_name("comment", true).unwrap();
    assert!(decoded.is_extra(comment));
    let ws = decoded.symbol_for_name(r"\s+", false).unwrap();
    assert!(decoded.is_skip(ws));

    // The rebuilt lexer covers the same pattern set.
    assert_eq!(
        decoded.lex_table().pattern_symbols,
        grammar.lex_table().pattern_symbols
    );
}

#[test]
fn roundtrip_preserves_parse_actions() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let decoded = Grammar::from_snapshot(&grammar.to_snapshot().unwrap()).unwrap();

    let ident = decoded.symbol_for_name("identifier", true).unwrap();
    let open = decoded.symbol_for_name("(", false).unwrap();
    let close = decoded.symbol_for_name(")", false).unwrap();

    let s0 = decoded.parse_state(decoded.start_state());
    let s1 = decoded.parse_state(s0.transition(ident).unwrap());
    let s2 = decoded.parse_state(s1.transition(open).unwrap());
    let s3 = decoded.parse_state(s2.transition(close).unwrap());
    assert_eq!(s3.reductions(Symbol::END).len(), 1);

    let accept = decoded.parse_state(s0.transition(decoded.root_symbol()).unwrap());
    assert!(accept.accepts_end());
}

#[test]
fn rejects_bad_magic() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let mut bytes = grammar.to_snapshot().unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        Grammar::from_snapshot(&bytes),
        Err(GrammarError::SnapshotHeader)
    ));
}

#[test]
fn rejects_truncated_header() {
    assert!(matches!(
        Grammar::from_snapshot(b"CAMG"),
        Err(GrammarError::SnapshotHeader)
    ));
}

#[test]
fn rejects_version_mismatch() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let mut bytes = grammar.to_snapshot().unwrap();
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
    assert!(matches!(
        Grammar::from_snapshot(&bytes),
        Err(GrammarError::SnapshotVersion {
            found: 99,
            expected: 1
        })
    ));
}

#[test]
fn detects_payload_corruption() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let mut bytes = grammar.to_snapshot().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        Grammar::from_snapshot(&bytes),
        Err(GrammarError::SnapshotChecksum)
    ));
}

#[test]
fn save_and_load_file() {
    let grammar = Grammar::from_json(FIXTURE).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.camg");

    grammar.save_snapshot(&path).unwrap();
    let loaded = Grammar::load_snapshot(&path).unwrap();
    assert_eq!(loaded.name(), "demo");
    assert_eq!(loaded.state_count(), grammar.state_count());
}
