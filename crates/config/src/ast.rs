//! AST for the configuration language.

use crate::diag::Span;
use crate::value::Number;

/// A parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub body: Body,
}

/// A brace-delimited body: attributes plus nested labeled blocks.
///
/// Bodies are handles into the parsed AST; components capture the body of
/// their declaring block at load time and are handed it back for every
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
    pub span: Span,
}

impl Body {
    /// All variable traversals referenced anywhere in this body, including
    /// inside nested blocks, list/object literals, and call arguments.
    pub fn traversals(&self) -> Vec<&Traversal> {
        let mut out = Vec::new();
        for attr in &self.attributes {
            attr.value.collect_traversals(&mut out);
        }
        for block in &self.blocks {
            out.extend(block.body.traversals());
        }
        out
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// `name = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub name_span: Span,
    pub value: Expr,
}

/// `name "label" .. { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub labels: Vec<String>,
    pub body: Body,
    pub span: Span,
}

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Number(Number),
    Bool(bool),
    Null,
    List(Vec<Expr>),
    Object(Vec<ObjectEntry>),
    Traversal(Traversal),
    Call { name: String, args: Vec<Expr> },
}

/// `key = expr` inside an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub key_span: Span,
    pub value: Expr,
}

impl Expr {
    fn collect_traversals<'a>(&'a self, out: &mut Vec<&'a Traversal>) {
        match &self.kind {
            ExprKind::Traversal(t) => out.push(t),
            ExprKind::List(items) => {
                for item in items {
                    item.collect_traversals(out);
                }
            }
            ExprKind::Object(entries) => {
                for entry in entries {
                    entry.value.collect_traversals(out);
                }
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    arg.collect_traversals(out);
                }
            }
            ExprKind::Str(_) | ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Null => {}
        }
    }
}

/// A variable traversal: a root name plus ordered attribute/index steps,
/// e.g. `discovery.static.localhost.targets`.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub root: String,
    pub root_span: Span,
    pub steps: Vec<TraversalStep>,
}

impl Traversal {
    /// Span covering the root and every step.
    pub fn span(&self) -> Span {
        self.steps
            .iter()
            .fold(self.root_span, |acc, step| acc.to(step.span()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraversalStep {
    Attr { name: String, span: Span },
    Index { index: u64, span: Span },
}

impl TraversalStep {
    pub fn span(&self) -> Span {
        match self {
            TraversalStep::Attr { span, .. } | TraversalStep::Index { span, .. } => *span,
        }
    }
}
