use std::sync::Arc;

use crate::grammar::{FieldId, Grammar, Symbol};
use crate::points::{Length, Point};
use crate::subtree::{Child, Subtree, SubtreeFlags};
use crate::tree::Tree;

const MINI: &str = r##"{
    "name": "mini",
    "rules": {
        "module": { "type": "REPEAT", "content": { "type": "SYMBOL", "name": "definition" } },
        "definition": { "type": "SEQ", "members": [
            { "type": "FIELD", "name": "name", "content": { "type": "SYMBOL", "name": "identifier" } },
            { "type": "STRING", "value": "=" },
            { "type": "FIELD", "name": "body", "content": { "type": "SYMBOL", "name": "number" } }
        ]},
        "identifier": { "type": "PATTERN", "value": "[a-z]+" },
        "number": { "type": "PATTERN", "value": "[0-9]+" },
        "comment": { "type": "PATTERN", "value": "#[^\\n]*" },
        "_terminator": { "type": "STRING", "value": ";" }
    },
    "extras": [
        { "type": "PATTERN", "value": "\\s+" },
        { "type": "SYMBOL", "name": "comment" }
    ]
}"##;

struct Syms {
    module: Symbol,
    definition: Symbol,
    identifier: Symbol,
    number: Symbol,
    comment: Symbol,
    eq: Symbol,
    terminator: Symbol,
    name_field: FieldId,
    body_field: FieldId,
}

fn grammar() -> (Arc<Grammar>, Syms) {
    let grammar = Arc::new(Grammar::from_json(MINI).unwrap());
    let syms = Syms {
        module: grammar.symbol_for_name("module", true).unwrap(),
        definition: grammar.symbol_for_name("definition", true).unwrap(),
        identifier: grammar.symbol_for_name("identifier", true).unwrap(),
        number: grammar.symbol_for_name("number", true).unwrap(),
        comment: grammar.symbol_for_name("comment", true).unwrap(),
        eq: grammar.symbol_for_name("=", false).unwrap(),
        terminator: grammar.symbol_for_name("_terminator", true).unwrap(),
        name_field: grammar.field_id("name").unwrap(),
        body_field: grammar.field_id("body").unwrap(),
    };
    (grammar, syms)
}

fn l(bytes: usize) -> Length {
    Length::new(bytes, Point::new(0, bytes))
}

fn tok(kind: Symbol, padding: usize, size: usize) -> Subtree {
    Subtree::leaf(kind, l(padding), l(size), 0, 0, SubtreeFlags::EMPTY)
}

fn slot(subtree: Subtree) -> Child {
    Child::new(subtree, None, None)
}

fn fielded(subtree: Subtree, field: FieldId) -> Child {
    Child::new(subtree, Some(field), None)
}

fn definition(s: &Syms, key_padding: usize, value_size: usize) -> Subtree {
    Subtree::node(
        s.definition,
        0,
        SubtreeFlags::EMPTY,
        vec![
            fielded(tok(s.identifier, key_padding, 1), s.name_field),
            slot(tok(s.eq, 0, 1)),
            fielded(tok(s.number, 0, value_size), s.body_field),
        ],
    )
}

/// A hand-built parse of `x=1 #c y=22`.
fn sample(grammar: Arc<Grammar>, s: &Syms) -> Tree {
    let comment = Subtree::leaf(s.comment, l(1), l(2), 0, 0, SubtreeFlags::IS_EXTRA);
    let module = Subtree::node(
        s.module,
        0,
        SubtreeFlags::EMPTY,
        vec![
            slot(definition(s, 0, 1)),
            slot(comment),
            slot(definition(s, 1, 2)),
        ],
    );
    Tree::new(grammar, module.into_root(Length::ZERO))
}

// ==== structure ====

#[test]
fn root_spans_the_document() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let root = tree.root_node();
    assert_eq!(root.kind(), "module");
    assert!(root.is_named());
    assert_eq!(root.start_byte(), 0);
    assert_eq!(root.end_byte(), 11);
    assert_eq!(root.child_count(), 3);
    assert_eq!(root.named_child_count(), 3);
    assert!(root.parent().is_none());
}

#[test]
fn children_fields_and_anonymous_tokens() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let def = tree.root_node().child(0).unwrap();
    assert_eq!(def.kind(), "definition");
    assert_eq!(def.child_count(), 3);
    assert_eq!(def.named_child_count(), 2);

    let eq = def.child(1).unwrap();
    assert_eq!(eq.kind(), "=");
    assert!(!eq.is_named());

    let name = def.child_by_field_name("name").unwrap();
    assert_eq!(name.kind(), "identifier");
    assert_eq!(name.byte_range(), 0..1);
    assert_eq!(def.field_name_for_child(0), Some("name"));
    assert_eq!(def.field_name_for_child(1), None);

    let body = def.child_by_field_id(s.body_field).unwrap();
    assert_eq!(body.kind(), "number");
    assert_eq!(body.byte_range(), 2..3);
    assert_eq!(def.children_by_field_id(s.body_field).count(), 1);
    assert!(def.child_by_field_name("missing_field").is_none());
}

#[test]
fn extras_appear_as_ordinary_children() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let comment = tree.root_node().child(1).unwrap();
    assert_eq!(comment.kind(), "comment");
    assert!(comment.is_extra());
    assert!(comment.is_named());
    assert_eq!(comment.start_byte(), 4);
    assert_eq!(comment.end_byte(), 6);
}

#[test]
fn hidden_tokens_are_filtered_from_the_api() {
    let (grammar, s) = grammar();
    let def = Subtree::node(
        s.definition,
        0,
        SubtreeFlags::EMPTY,
        vec![
            fielded(tok(s.identifier, 0, 1), s.name_field),
            slot(tok(s.eq, 0, 1)),
            fielded(tok(s.number, 0, 1), s.body_field),
            slot(tok(s.terminator, 0, 1)),
        ],
    );
    let module = Subtree::node(s.module, 0, SubtreeFlags::EMPTY, vec![slot(def)]);
    let tree = Tree::new(grammar, module.into_root(Length::ZERO));

    let def = tree.root_node().child(0).unwrap();
    assert_eq!(def.end_byte(), 4);
    // Three visible children; the terminator still occupies bytes.
    assert_eq!(def.child_count(), 3);
    let last = def.child(2).unwrap();
    assert_eq!(last.kind(), "number");
    assert!(last.next_sibling().is_none());
}

// ==== navigation ====

#[test]
fn sibling_navigation() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let root = tree.root_node();
    let def1 = root.child(0).unwrap();
    let comment = root.child(1).unwrap();
    let def2 = root.child(2).unwrap();

    assert_eq!(def1.next_sibling(), Some(comment));
    assert_eq!(comment.next_named_sibling(), Some(def2));
    assert_eq!(def2.prev_named_sibling(), Some(comment));
    assert!(def1.prev_sibling().is_none());
    assert!(def2.next_sibling().is_none());
}

#[test]
fn parent_climbs_to_the_enclosing_node() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let def2 = tree.root_node().child(2).unwrap();
    let body = def2.child_by_field_name("body").unwrap();

    assert_eq!(body.parent(), Some(def2));
    assert_eq!(def2.parent(), Some(tree.root_node()));
}

#[test]
fn descendant_lookup_by_byte_range() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let root = tree.root_node();

    let number = root.descendant_for_byte_range(9, 10).unwrap();
    assert_eq!(number.kind(), "number");
    assert_eq!(number.byte_range(), 9..11);

    let def1 = root.descendant_for_byte_range(0, 3).unwrap();
    assert_eq!(def1.kind(), "definition");

    // The `=` token is anonymous; the named lookup climbs out of it.
    let eq = root.descendant_for_byte_range(1, 2).unwrap();
    assert_eq!(eq.kind(), "=");
    let named = root.named_descendant_for_byte_range(1, 2).unwrap();
    assert_eq!(named.kind(), "definition");

    assert!(root.descendant_for_byte_range(5, 20).is_none());
}

#[test]
fn positions_track_padding() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let def2 = tree.root_node().child(2).unwrap();
    assert_eq!(def2.start_byte(), 7);
    assert_eq!(def2.end_byte(), 11);
    assert_eq!(def2.start_position(), Point::new(0, 7));
    assert_eq!(def2.end_position(), Point::new(0, 11));
}

#[test]
fn text_slicing() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let source = b"x=1 #c y=22";
    let def2 = tree.root_node().child(2).unwrap();
    assert_eq!(def2.utf8_text(source).unwrap(), "y=22");
    let body = def2.child_by_field_name("body").unwrap();
    assert_eq!(body.utf8_text(source).unwrap(), "22");
}

// ==== rendering ====

#[test]
fn sexp_shows_named_structure_with_fields() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    insta::assert_snapshot!(
        tree.root_node().to_sexp(),
        @"(module (definition name: (identifier) body: (number)) (comment) (definition name: (identifier) body: (number)))"
    );
}

#[test]
fn sexp_marks_missing_tokens() {
    let (grammar, s) = grammar();
    let def = Subtree::node(
        s.definition,
        0,
        SubtreeFlags::EMPTY,
        vec![
            fielded(tok(s.identifier, 0, 1), s.name_field),
            slot(tok(s.eq, 0, 1)),
            fielded(Subtree::missing(s.number, 0, 110), s.body_field),
        ],
    );
    let module = Subtree::node(s.module, 0, SubtreeFlags::EMPTY, vec![slot(def)]);
    let tree = Tree::new(grammar, module.into_root(Length::ZERO));

    assert!(tree.root_node().has_error());
    let body = tree.root_node().child(0).unwrap().child(2).unwrap();
    assert!(body.is_missing());
    insta::assert_snapshot!(
        tree.root_node().to_sexp(),
        @"(module (definition name: (identifier) body: (MISSING number)))"
    );
}

#[test]
fn sexp_marks_error_groupings() {
    let (grammar, s) = grammar();
    let stray = Subtree::error(0, 500, vec![slot(tok(s.identifier, 1, 1))]);
    let module = Subtree::node(
        s.module,
        0,
        SubtreeFlags::EMPTY,
        vec![slot(definition(&s, 0, 1)), slot(stray)],
    );
    let tree = Tree::new(grammar, module.into_root(Length::ZERO));

    let error = tree.root_node().child(1).unwrap();
    assert!(error.is_error());
    assert_eq!(error.kind(), "ERROR");
    assert_eq!(error.byte_range(), 4..5);
    insta::assert_snapshot!(
        tree.root_node().to_sexp(),
        @"(module (definition name: (identifier) body: (number)) (ERROR (identifier)))"
    );
}

// ==== cursor ====

#[test]
fn cursor_walks_the_visible_tree() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let mut cursor = tree.walk();
    assert_eq!(cursor.node().kind(), "module");
    assert_eq!(cursor.depth(), 0);

    assert!(cursor.goto_first_child());
    assert_eq!(cursor.node().kind(), "definition");
    assert!(cursor.field_name().is_none());

    assert!(cursor.goto_first_child());
    assert_eq!(cursor.node().kind(), "identifier");
    assert_eq!(cursor.field_name(), Some("name"));
    assert_eq!(cursor.depth(), 2);

    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), "=");
    assert!(cursor.field_name().is_none());

    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), "number");
    assert_eq!(cursor.field_name(), Some("body"));
    assert!(!cursor.goto_next_sibling());

    assert!(cursor.goto_parent());
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), "comment");
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), "definition");
    assert!(!cursor.goto_next_sibling());

    assert!(cursor.goto_parent());
    assert!(!cursor.goto_parent());
    assert_eq!(cursor.node().kind(), "module");
}

#[test]
fn cursor_skips_hidden_tokens() {
    let (grammar, s) = grammar();
    let def = Subtree::node(
        s.definition,
        0,
        SubtreeFlags::EMPTY,
        vec![
            slot(tok(s.terminator, 0, 1)),
            fielded(tok(s.identifier, 0, 1), s.name_field),
        ],
    );
    let module = Subtree::node(s.module, 0, SubtreeFlags::EMPTY, vec![slot(def)]);
    let tree = Tree::new(grammar, module.into_root(Length::ZERO));

    let mut cursor = tree.walk();
    assert!(cursor.goto_first_child());
    assert!(cursor.goto_first_child());
    // The leading hidden terminator is skipped outright.
    assert_eq!(cursor.node().kind(), "identifier");
    assert_eq!(cursor.node().start_byte(), 1);
    assert!(!cursor.goto_next_sibling());
}

#[test]
fn cursor_seeks_to_a_byte() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let mut cursor = tree.walk();

    assert_eq!(cursor.goto_first_child_for_byte(5), Some(1));
    assert_eq!(cursor.node().kind(), "comment");

    cursor.reset(tree.root_node());
    assert_eq!(cursor.goto_first_child_for_byte(0), Some(0));
    assert_eq!(cursor.node().kind(), "definition");

    cursor.reset(tree.root_node());
    assert_eq!(cursor.goto_first_child_for_byte(11), None);
}

#[test]
fn node_identity() {
    let (grammar, s) = grammar();
    let tree = sample(grammar, &s);
    let a = tree.root_node().child(0).unwrap();
    let b = tree.root_node().child(0).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.id(), b.id());
    assert_ne!(a, tree.root_node().child(2).unwrap());
}
