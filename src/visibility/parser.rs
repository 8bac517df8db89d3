//! Visibility expression lexer and recursive descent parser.
//!
//! Grammar:
//!
//! ```text
//! expr    := operand ( '&' operand )*
//!          | operand ( '|' operand )*
//! operand := TERM | QUOTED | '(' expr ')'
//! ```
//!
//! `&` and `|` may not be mixed at one nesting level: `a&b|c` is rejected,
//! `(a&b)|c` is accepted.

use crate::{Error, Result};

/// Parsed boolean expression over label tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VisibilityNode {
    Term(String),
    And(Vec<VisibilityNode>),
    Or(Vec<VisibilityNode>),
}

impl VisibilityNode {
    /// Walk the tree, treating a term as true when `has_token` says so.
    pub(crate) fn evaluate(&self, has_token: &impl Fn(&str) -> bool) -> bool {
        match self {
            VisibilityNode::Term(t) => has_token(t),
            VisibilityNode::And(children) => children.iter().all(|c| c.evaluate(has_token)),
            VisibilityNode::Or(children) => children.iter().any(|c| c.evaluate(has_token)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Term(String),
    And,
    Or,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn is_term_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '/')
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '&' | '|' | '(' | ')' => {
                chars.next();
                let kind = match ch {
                    '&' => TokenKind::And,
                    '|' => TokenKind::Or,
                    '(' => TokenKind::LParen,
                    _ => TokenKind::RParen,
                };
                tokens.push(Token { kind, position: pos });
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, c @ ('"' | '\\'))) => s.push(c),
                            Some((p, c)) => {
                                return Err(Error::ParseError {
                                    position: p,
                                    message: format!("Invalid escape '\\{c}' in quoted term"),
                                });
                            }
                            None => {
                                return Err(Error::ParseError {
                                    position: pos,
                                    message: "Unterminated quoted term".into(),
                                });
                            }
                        },
                        Some((_, '"')) => {
                            if s.is_empty() {
                                return Err(Error::ParseError {
                                    position: pos,
                                    message: "Empty quoted term".into(),
                                });
                            }
                            tokens.push(Token { kind: TokenKind::Term(s), position: pos });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => {
                            return Err(Error::ParseError {
                                position: pos,
                                message: "Unterminated quoted term".into(),
                            });
                        }
                    }
                }
            }
            c if is_term_char(c) => {
                let mut s = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_term_char(c) {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                tokens.push(Token { kind: TokenKind::Term(s), position: pos });
            }
            other => {
                return Err(Error::ParseError {
                    position: pos,
                    message: format!("Unexpected character '{other}'"),
                });
            }
        }
    }

    tokens.push(Token { kind: TokenKind::Eof, position: input.len() });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::ParseError { position: self.peek().position, message: message.into() }
    }

    fn parse_expr(&mut self) -> Result<VisibilityNode> {
        let first = self.parse_operand()?;
        let op = match self.peek().kind {
            TokenKind::And => TokenKind::And,
            TokenKind::Or => TokenKind::Or,
            _ => return Ok(first),
        };

        let mut operands = vec![first];
        loop {
            let kind = self.peek().kind.clone();
            match kind {
                k if k == op => {
                    self.advance();
                    operands.push(self.parse_operand()?);
                }
                TokenKind::And | TokenKind::Or => {
                    return Err(self.error("Cannot mix '&' and '|' without parentheses"));
                }
                _ => break,
            }
        }

        Ok(match op {
            TokenKind::And => VisibilityNode::And(operands),
            _ => VisibilityNode::Or(operands),
        })
    }

    fn parse_operand(&mut self) -> Result<VisibilityNode> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Term(t) => Ok(VisibilityNode::Term(t)),
            TokenKind::LParen => {
                if self.peek().kind == TokenKind::RParen {
                    return Err(self.error("Empty parentheses"));
                }
                let inner = self.parse_expr()?;
                match self.advance().kind {
                    TokenKind::RParen => Ok(inner),
                    _ => Err(Error::ParseError {
                        position: tok.position,
                        message: "Unbalanced '('".into(),
                    }),
                }
            }
            TokenKind::Eof => Err(Error::ParseError {
                position: tok.position,
                message: "Expected a term, found end of expression".into(),
            }),
            other => Err(Error::ParseError {
                position: tok.position,
                message: format!("Expected a term, found {other:?}"),
            }),
        }
    }
}

/// Parse an expression. Returns `None` for an empty (always readable) expression.
pub(crate) fn parse(input: &str) -> Result<Option<VisibilityNode>> {
    let tokens = tokenize(input)?;
    if tokens.len() == 1 {
        return Ok(None);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let root = parser.parse_expr()?;
    if parser.peek().kind != TokenKind::Eof {
        return Err(parser.error("Unexpected trailing input"));
    }
    Ok(Some(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(t: &str) -> VisibilityNode {
        VisibilityNode::Term(t.into())
    }

    #[test]
    fn test_parse_single_term() {
        assert_eq!(parse("a").unwrap(), Some(term("a")));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_nested() {
        let node = parse("(a&b)|c").unwrap().unwrap();
        assert_eq!(
            node,
            VisibilityNode::Or(vec![VisibilityNode::And(vec![term("a"), term("b")]), term("c")])
        );
    }

    #[test]
    fn test_operator_positions() {
        let tokens = tokenize("(a | b)").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| (t.kind.clone(), t.position)).collect();
        assert_eq!(kinds[0], (TokenKind::LParen, 0));
        assert_eq!(kinds[2], (TokenKind::Or, 3));
        assert_eq!(kinds[4], (TokenKind::RParen, 6));
    }

    #[test]
    fn test_parse_quoted_term() {
        assert_eq!(parse(r#""top secret"&b"#).unwrap().unwrap(),
            VisibilityNode::And(vec![term("top secret"), term("b")]));
        assert_eq!(parse(r#""say \"hi\"""#).unwrap().unwrap(), term("say \"hi\""));
    }

    #[test]
    fn test_mixed_operators_rejected() {
        let err = parse("a&b|c").unwrap_err();
        assert!(matches!(err, Error::ParseError { position: 3, .. }), "got {err:?}");
    }

    #[test]
    fn test_malformed_rejected() {
        for bad in ["a&", "|a", "(a", "a)", "()", "a b", "a&&b", "a$b", "\"open", "\"\""] {
            assert!(parse(bad).is_err(), "expected parse error for {bad:?}");
        }
    }
}
