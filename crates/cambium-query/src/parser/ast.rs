//! Typed AST wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors.
//! Cast is infallible for correct `SyntaxKind` - validation happens in the
//! compiler.

use super::cst::{SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn as_cst(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

ast_node!(Root, Root);
ast_node!(Tree, Tree);
ast_node!(Str, Str);
ast_node!(Group, Group);
ast_node!(Alt, Alt);
ast_node!(Field, Field);
ast_node!(NegatedField, NegatedField);
ast_node!(Capture, Capture);
ast_node!(Quantifier, Quantifier);
ast_node!(Wildcard, Wildcard);
ast_node!(Anchor, Anchor);
ast_node!(Pred, Pred);

/// Expression: any pattern that can appear in the tree.
///
/// Predicates are deliberately not expressions; they attach to the
/// enclosing node/group and are read via `preds()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Tree(Tree),
    Str(Str),
    Group(Group),
    Alt(Alt),
    Field(Field),
    NegatedField(NegatedField),
    Capture(Capture),
    Quantifier(Quantifier),
    Wildcard(Wildcard),
    Anchor(Anchor),
}

impl Expr {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::Tree => Tree::cast(node).map(Expr::Tree),
            SyntaxKind::Str => Str::cast(node).map(Expr::Str),
            SyntaxKind::Group => Group::cast(node).map(Expr::Group),
            SyntaxKind::Alt => Alt::cast(node).map(Expr::Alt),
            SyntaxKind::Field => Field::cast(node).map(Expr::Field),
            SyntaxKind::NegatedField => NegatedField::cast(node).map(Expr::NegatedField),
            SyntaxKind::Capture => Capture::cast(node).map(Expr::Capture),
            SyntaxKind::Quantifier => Quantifier::cast(node).map(Expr::Quantifier),
            SyntaxKind::Wildcard => Wildcard::cast(node).map(Expr::Wildcard),
            SyntaxKind::Anchor => Anchor::cast(node).map(Expr::Anchor),
            _ => None,
        }
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        match self {
            Expr::Tree(n) => n.as_cst(),
            Expr::Str(n) => n.as_cst(),
            Expr::Group(n) => n.as_cst(),
            Expr::Alt(n) => n.as_cst(),
            Expr::Field(n) => n.as_cst(),
            Expr::NegatedField(n) => n.as_cst(),
            Expr::Capture(n) => n.as_cst(),
            Expr::Quantifier(n) => n.as_cst(),
            Expr::Wildcard(n) => n.as_cst(),
            Expr::Anchor(n) => n.as_cst(),
        }
    }
}

/// A predicate argument: `@capture`, `"literal"` or a bare word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredArg {
    Capture(Capture),
    Str(Str),
    Ident(SyntaxToken),
}

impl Root {
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }

    pub fn preds(&self) -> impl Iterator<Item = Pred> + '_ {
        self.0.children().filter_map(Pred::cast)
    }
}

impl Tree {
    pub fn node_type(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| matches!(t.kind(), SyntaxKind::Id | SyntaxKind::Underscore))
    }

    pub fn children(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }

    pub fn preds(&self) -> impl Iterator<Item = Pred> + '_ {
        self.0.children().filter_map(Pred::cast)
    }
}

impl Str {
    /// The content token. Absent for the empty literal `""`.
    pub fn value(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| t.kind() == SyntaxKind::StrVal)
    }
}

impl Group {
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }

    pub fn preds(&self) -> impl Iterator<Item = Pred> + '_ {
        self.0.children().filter_map(Pred::cast)
    }
}

impl Alt {
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }
}

impl Field {
    pub fn name(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| t.kind() == SyntaxKind::Id)
    }

    pub fn value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

impl NegatedField {
    pub fn name(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| t.kind() == SyntaxKind::Id)
    }
}

impl Capture {
    pub fn name(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| t.kind() == SyntaxKind::Id)
    }

    pub fn target(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

impl Quantifier {
    pub fn inner(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }

    pub fn operator(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| matches!(t.kind(), SyntaxKind::Star | SyntaxKind::Plus | SyntaxKind::Question))
    }
}

impl Pred {
    /// The predicate name token, including the leading `#`.
    pub fn name(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| t.kind() == SyntaxKind::PredName)
    }

    pub fn args(&self) -> impl Iterator<Item = PredArg> + '_ {
        self.0.children_with_tokens().filter_map(|el| match el {
            rowan::NodeOrToken::Node(n) => match n.kind() {
                SyntaxKind::Capture => Capture::cast(n).map(PredArg::Capture),
                SyntaxKind::Str => Str::cast(n).map(PredArg::Str),
                _ => None,
            },
            rowan::NodeOrToken::Token(t) => {
                (t.kind() == SyntaxKind::Id).then(|| PredArg::Ident(t))
            }
        })
    }
}
