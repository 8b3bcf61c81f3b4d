//! Recursive-descent parser producing the labeled-block AST.

use crate::ast::{
    Attribute, Block, Body, Expr, ExprKind, File, ObjectEntry, Traversal, TraversalStep,
};
use crate::diag::{Diagnostic, Diagnostics, Span};
use crate::lex::{lex, SpannedToken, Token};

/// Parse `source` into a [`File`].
///
/// Parsing keeps going after an error so one pass reports as many problems
/// as possible; the result is `Err` when any error-severity diagnostic was
/// produced.
pub fn parse_file(source: &str) -> Result<File, Diagnostics> {
    let (tokens, mut diags) = lex(source);

    let mut parser = Parser {
        tokens,
        pos: 0,
        diags: Diagnostics::new(),
        eof: source.len(),
    };
    let body = parser.parse_body(0, true);

    diags.extend(parser.diags);
    if diags.has_errors() {
        Err(diags)
    } else {
        Ok(File { body })
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    diags: Diagnostics,
    eof: usize,
}

impl Parser {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eof_span(&self) -> Span {
        Span::new(self.eof, self.eof)
    }

    fn current_span(&self) -> Span {
        self.peek().map_or_else(|| self.eof_span(), |t| t.span)
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.eof, |t| t.span.start)
    }

    fn skip_newlines(&mut self) {
        while matches!(
            self.peek(),
            Some(SpannedToken {
                token: Token::Newline,
                ..
            })
        ) {
            self.pos += 1;
        }
    }

    fn error(&mut self, summary: &str, detail: impl Into<String>, span: Span) {
        self.diags.push(Diagnostic::error(summary, detail, span));
    }

    /// Skip to the end of the current line (or the closing brace of the
    /// enclosing body) so parsing can continue at the next construct.
    fn recover_to_line_end(&mut self) {
        while let Some(spanned) = self.peek() {
            match spanned.token {
                Token::Newline => {
                    self.pos += 1;
                    return;
                }
                Token::RBrace => return,
                _ => self.pos += 1,
            }
        }
    }

    fn parse_body(&mut self, start: usize, top_level: bool) -> Body {
        let mut attributes = Vec::new();
        let mut blocks = Vec::new();

        loop {
            self.skip_newlines();

            let Some(spanned) = self.peek() else {
                if !top_level {
                    self.error(
                        "Unclosed block",
                        "the block is missing its closing \"}\"",
                        self.eof_span(),
                    );
                }
                break;
            };

            match &spanned.token {
                Token::RBrace => {
                    if top_level {
                        let span = spanned.span;
                        self.error("Unexpected token", "\"}\" without a matching \"{\"", span);
                        self.pos += 1;
                        continue;
                    }
                    break;
                }
                Token::Ident(_) => {
                    let name_token = self.next().expect("peeked identifier");
                    let Token::Ident(name) = name_token.token else {
                        unreachable!()
                    };
                    self.parse_definition(name, name_token.span, &mut attributes, &mut blocks);
                }
                other => {
                    let summary = format!(
                        "expected an attribute or block definition, found {}",
                        other.describe()
                    );
                    let span = spanned.span;
                    self.error("Unexpected token", summary, span);
                    self.pos += 1;
                    self.recover_to_line_end();
                }
            }
        }

        let end = self.offset();
        Body {
            attributes,
            blocks,
            span: Span::new(start, end.max(start)),
        }
    }

    /// Parse the remainder of `name = expr` or `name "label" .. { body }`
    /// after the leading identifier has been consumed.
    fn parse_definition(
        &mut self,
        name: String,
        name_span: Span,
        attributes: &mut Vec<Attribute>,
        blocks: &mut Vec<Block>,
    ) {
        match self.peek().map(|t| &t.token) {
            Some(Token::Assign) => {
                self.pos += 1;
                let Some(value) = self.parse_expr() else {
                    self.recover_to_line_end();
                    return;
                };
                self.expect_attribute_terminator();
                attributes.push(Attribute {
                    name,
                    name_span,
                    value,
                });
            }
            Some(Token::Str(_)) | Some(Token::LBrace) => {
                let mut labels = Vec::new();
                while let Some(SpannedToken {
                    token: Token::Str(label),
                    ..
                }) = self.peek()
                {
                    labels.push(label.clone());
                    self.pos += 1;
                }

                match self.peek().map(|t| &t.token) {
                    Some(Token::LBrace) => {
                        let open = self.next().expect("peeked brace");
                        let body = self.parse_body(open.span.end, false);
                        let close_end = match self.peek().map(|t| &t.token) {
                            Some(Token::RBrace) => {
                                let close = self.next().expect("peeked brace");
                                close.span.end
                            }
                            _ => self.offset(),
                        };
                        blocks.push(Block {
                            name,
                            labels,
                            body,
                            span: name_span.to(Span::new(close_end, close_end)),
                        });
                    }
                    _ => {
                        let span = self.current_span();
                        self.error(
                            "Invalid block definition",
                            format!("expected \"{{\" to open the {:?} block", name),
                            span,
                        );
                        self.recover_to_line_end();
                    }
                }
            }
            _ => {
                let span = self.current_span();
                self.error(
                    "Invalid definition",
                    format!(
                        "expected \"=\" for an attribute or a block body after {:?}",
                        name
                    ),
                    span,
                );
                self.recover_to_line_end();
            }
        }
    }

    fn expect_attribute_terminator(&mut self) {
        match self.peek().map(|t| &t.token) {
            None | Some(Token::Newline) | Some(Token::RBrace) => {
                if matches!(self.peek().map(|t| &t.token), Some(Token::Newline)) {
                    self.pos += 1;
                }
            }
            Some(other) => {
                let summary = format!("expected a newline after the attribute, found {}", other.describe());
                let span = self.current_span();
                self.error("Unexpected token", summary, span);
                self.recover_to_line_end();
            }
        }
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        let Some(spanned) = self.next() else {
            self.error("Missing expression", "expected an expression", self.eof_span());
            return None;
        };
        let span = spanned.span;

        match spanned.token {
            Token::Str(s) => Some(Expr {
                kind: ExprKind::Str(s),
                span,
            }),
            Token::Number(n) => Some(Expr {
                kind: ExprKind::Number(n),
                span,
            }),
            Token::Ident(name) => match name.as_str() {
                "true" => Some(Expr {
                    kind: ExprKind::Bool(true),
                    span,
                }),
                "false" => Some(Expr {
                    kind: ExprKind::Bool(false),
                    span,
                }),
                "null" => Some(Expr {
                    kind: ExprKind::Null,
                    span,
                }),
                _ => {
                    if matches!(self.peek().map(|t| &t.token), Some(Token::LParen)) {
                        self.parse_call(name, span)
                    } else {
                        self.parse_traversal(name, span)
                    }
                }
            },
            Token::LBracket => self.parse_list(span),
            Token::LBrace => self.parse_object(span),
            other => {
                self.error(
                    "Invalid expression",
                    format!("expected an expression, found {}", other.describe()),
                    span,
                );
                None
            }
        }
    }

    fn parse_traversal(&mut self, root: String, root_span: Span) -> Option<Expr> {
        let mut steps = Vec::new();

        loop {
            match self.peek().map(|t| &t.token) {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(SpannedToken {
                            token: Token::Ident(name),
                            span,
                        }) => steps.push(TraversalStep::Attr { name, span }),
                        other => {
                            let span = other.map_or_else(|| self.eof_span(), |t| t.span);
                            self.error(
                                "Invalid reference",
                                "expected an attribute name after \".\"",
                                span,
                            );
                            return None;
                        }
                    }
                }
                Some(Token::LBracket) => {
                    let open = self.next().expect("peeked bracket");
                    let index = match self.next() {
                        Some(SpannedToken {
                            token: Token::Number(n),
                            span,
                        }) => match n.as_index() {
                            Some(i) => (i, span),
                            None => {
                                self.error(
                                    "Invalid reference",
                                    "index must be a non-negative integer",
                                    span,
                                );
                                return None;
                            }
                        },
                        other => {
                            let span = other.map_or_else(|| self.eof_span(), |t| t.span);
                            self.error("Invalid reference", "expected an index after \"[\"", span);
                            return None;
                        }
                    };
                    match self.next() {
                        Some(SpannedToken {
                            token: Token::RBracket,
                            span,
                        }) => steps.push(TraversalStep::Index {
                            index: index.0,
                            span: open.span.to(span),
                        }),
                        other => {
                            let span = other.map_or_else(|| self.eof_span(), |t| t.span);
                            self.error("Invalid reference", "expected \"]\" after the index", span);
                            return None;
                        }
                    }
                }
                _ => break,
            }
        }

        let traversal = Traversal {
            root,
            root_span,
            steps,
        };
        let span = traversal.span();
        Some(Expr {
            kind: ExprKind::Traversal(traversal),
            span,
        })
    }

    fn parse_call(&mut self, name: String, name_span: Span) -> Option<Expr> {
        self.pos += 1; // consume "("
        let mut args = Vec::new();

        self.skip_newlines();
        loop {
            if let Some(SpannedToken {
                token: Token::RParen,
                span,
            }) = self.peek()
            {
                let end = *span;
                self.pos += 1;
                return Some(Expr {
                    kind: ExprKind::Call { name, args },
                    span: name_span.to(end),
                });
            }

            args.push(self.parse_expr()?);
            self.skip_newlines();

            match self.peek().map(|t| &t.token) {
                Some(Token::Comma) => {
                    self.pos += 1;
                    self.skip_newlines();
                }
                Some(Token::RParen) => {}
                _ => {
                    let span = self.current_span();
                    self.error(
                        "Invalid function call",
                        "expected \",\" or \")\" in the argument list",
                        span,
                    );
                    return None;
                }
            }
        }
    }

    fn parse_list(&mut self, open: Span) -> Option<Expr> {
        let mut items = Vec::new();

        self.skip_newlines();
        loop {
            if let Some(SpannedToken {
                token: Token::RBracket,
                span,
            }) = self.peek()
            {
                let end = *span;
                self.pos += 1;
                return Some(Expr {
                    kind: ExprKind::List(items),
                    span: open.to(end),
                });
            }

            items.push(self.parse_expr()?);
            self.skip_newlines();

            match self.peek().map(|t| &t.token) {
                Some(Token::Comma) => {
                    self.pos += 1;
                    self.skip_newlines();
                }
                Some(Token::RBracket) => {}
                _ => {
                    let span = self.current_span();
                    self.error(
                        "Invalid list",
                        "expected \",\" or \"]\" after the list element",
                        span,
                    );
                    return None;
                }
            }
        }
    }

    fn parse_object(&mut self, open: Span) -> Option<Expr> {
        let mut entries: Vec<ObjectEntry> = Vec::new();

        self.skip_newlines();
        loop {
            match self.peek().cloned() {
                Some(SpannedToken {
                    token: Token::RBrace,
                    span,
                }) => {
                    self.pos += 1;
                    return Some(Expr {
                        kind: ExprKind::Object(entries),
                        span: open.to(span),
                    });
                }
                Some(SpannedToken {
                    token: Token::Ident(key),
                    span,
                })
                | Some(SpannedToken {
                    token: Token::Str(key),
                    span,
                }) => {
                    self.pos += 1;
                    match self.peek().map(|t| &t.token) {
                        Some(Token::Assign) => self.pos += 1,
                        _ => {
                            let err_span = self.current_span();
                            self.error(
                                "Invalid object",
                                format!("expected \"=\" after the key {:?}", key),
                                err_span,
                            );
                            return None;
                        }
                    }

                    let value = self.parse_expr()?;
                    if entries.iter().any(|e| e.key == key) {
                        self.error(
                            "Duplicate key",
                            format!("the key {:?} appears more than once", key),
                            span,
                        );
                    }
                    entries.push(ObjectEntry {
                        key,
                        key_span: span,
                        value,
                    });

                    // Entries are separated by commas or newlines.
                    match self.peek().map(|t| &t.token) {
                        Some(Token::Comma) => {
                            self.pos += 1;
                            self.skip_newlines();
                        }
                        Some(Token::Newline) => self.skip_newlines(),
                        Some(Token::RBrace) => {}
                        _ => {
                            let span = self.current_span();
                            self.error(
                                "Invalid object",
                                "expected \",\", a newline, or \"}\" after the entry",
                                span,
                            );
                            return None;
                        }
                    }
                }
                other => {
                    let span = other.map_or_else(|| self.eof_span(), |t| t.span);
                    self.error(
                        "Invalid object",
                        "expected a key or \"}\" inside the object",
                        span,
                    );
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> File {
        parse_file(source).unwrap_or_else(|diags| panic!("parse failed: {}", diags))
    }

    #[test]
    fn parses_labeled_blocks_and_attributes() {
        let file = parse_ok(
            r#"
scrape_interval = "15s"

discovery "static" "localhost" {
  hosts  = ["127.0.0.1:9090"]
  labels = { env = "dev" }
}

scrape "metrics" {
  targets = discovery.static.localhost.targets
}
"#,
        );

        assert_eq!(file.body.attributes.len(), 1);
        assert_eq!(file.body.attributes[0].name, "scrape_interval");
        assert_eq!(file.body.blocks.len(), 2);

        let disc = &file.body.blocks[0];
        assert_eq!(disc.name, "discovery");
        assert_eq!(disc.labels, ["static", "localhost"]);
        assert_eq!(disc.body.attributes.len(), 2);

        let scrape = &file.body.blocks[1];
        assert_eq!(scrape.name, "scrape");
        assert_eq!(scrape.labels, ["metrics"]);
        match &scrape.body.attributes[0].value.kind {
            ExprKind::Traversal(t) => {
                assert_eq!(t.root, "discovery");
                assert_eq!(t.steps.len(), 3);
            }
            other => panic!("unexpected expr: {:?}", other),
        }
    }

    #[test]
    fn parses_nested_list_and_object_expressions() {
        let file = parse_ok(
            r#"
discovery "chain" "all" {
  input = [
    { targets = discovery.static.localhost.targets, labels = { src = "local" } },
  ]
}
"#,
        );

        let input = &file.body.blocks[0].body.attributes[0];
        let ExprKind::List(items) = &input.value.kind else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 1);
        let ExprKind::Object(entries) = &items[0].kind else {
            panic!("expected object");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "targets");
        assert_eq!(entries[1].key, "labels");
    }

    #[test]
    fn parses_calls_and_index_steps() {
        let file = parse_ok("targets = concat(discovery.static.a.targets, discovery.static.b.targets[0])\n");

        let ExprKind::Call { name, args } = &file.body.attributes[0].value.kind else {
            panic!("expected call");
        };
        assert_eq!(name, "concat");
        assert_eq!(args.len(), 2);
        let ExprKind::Traversal(t) = &args[1].kind else {
            panic!("expected traversal");
        };
        assert!(matches!(
            t.steps.last(),
            Some(TraversalStep::Index { index: 0, .. })
        ));
    }

    #[test]
    fn collects_traversals_recursively() {
        let file = parse_ok(
            r#"
discovery "chain" "all" {
  input = [{ targets = concat(discovery.static.a.targets), labels = { src = "x" } }]
}
"#,
        );

        let traversals = file.body.traversals();
        assert_eq!(traversals.len(), 1);
        assert_eq!(traversals[0].root, "discovery");
    }

    #[test]
    fn reports_multiple_errors_in_one_pass() {
        let err = parse_file("a = @\nb = \n").unwrap_err();
        assert!(err.has_errors());
        assert!(err.len() >= 2, "wanted >= 2 diagnostics, got {}", err.len());
    }

    #[test]
    fn reports_missing_closing_brace() {
        let err = parse_file("scrape \"s\" {\n  targets = []\n").unwrap_err();
        assert!(err
            .iter()
            .any(|d| d.summary == "Unclosed block"));
    }

    #[test]
    fn reports_duplicate_object_keys() {
        let err = parse_file("labels = { a = \"1\", a = \"2\" }\n").unwrap_err();
        assert!(err.iter().any(|d| d.summary == "Duplicate key"));
    }
}
