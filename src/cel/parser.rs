//! # Expression Parser
//!
//! Recursive descent over the token stream, precedence from loosest to
//! tightest:
//!
//! ```text
//! expression := or
//! or         := and ( OR and )*
//! and        := unary ( AND unary )*
//! unary      := NOT unary | primary
//! primary    := "(" expression ")"
//!             | WORD                    reference, or tag:pattern
//!             | WORD_ENDING_IN_COLON QUOTED
//!             | QUOTED                  reference containing spaces
//! ```
//!
//! Operators are always explicit: two operands next to each other are an
//! error, never an implicit `AND`.

use thiserror::Error;

use super::ast::AstNode;
use super::lexer::{Token, TokenKind};
use crate::catalog::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} at position {position}, found {found}")]
pub struct ParseError {
    pub position: usize,
    pub expected: String,
    /// Rendering of the token that was found instead.
    pub found: String,
}

/// Parses a full token stream (as produced by
/// [`tokenize`](super::lexer::tokenize)) into a tree without groups.
///
/// # Errors
///
/// Returns [`ParseError`] for missing operands, unbalanced parentheses,
/// unknown tag names and tokens left over after a complete expression.
pub fn parse(tokens: &[Token]) -> Result<AstNode, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let tree = parser.parse_or()?;

    let next = parser.current();
    if next.kind != TokenKind::End {
        let expected = if next.kind == TokenKind::RParen {
            "matching `(` before `)`"
        } else {
            "AND, OR or end of input"
        };
        return Err(parser.error_at(next, expected));
    }

    Ok(tree.collapse())
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn current(&self) -> &'t Token {
        // `tokenize` always ends the stream with `End`, but hand-built streams
        // may not; treat running off the end as the last token.
        let tokens: &'t [Token] = self.tokens;
        tokens
            .get(self.pos)
            .or_else(|| tokens.last())
            .unwrap_or(&END)
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.current();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, expected: &str) -> ParseError {
        ParseError {
            position: token.position,
            expected: expected.to_string(),
            found: token.kind.to_string(),
        }
    }

    fn parse_or(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_and()?;
        while self.current().kind == TokenKind::Or {
            self.advance();
            let right = self.parse_and()?;
            left = AstNode::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_unary()?;
        while self.current().kind == TokenKind::And {
            self.advance();
            let right = self.parse_unary()?;
            left = AstNode::and(left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        if self.current().kind == TokenKind::Not {
            self.advance();
            let child = self.parse_unary()?;
            return Ok(AstNode::not(child));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                let close = self.current();
                if close.kind != TokenKind::RParen {
                    return Err(self.error_at(close, "`)`"));
                }
                self.advance();
                Ok(AstNode::Group(Box::new(inner)))
            }
            TokenKind::QuotedString(name) => Ok(AstNode::Reference(name.clone())),
            TokenKind::Identifier(word) => match word.split_once(':') {
                None => Ok(AstNode::Reference(word.clone())),
                Some((tag_name, pattern)) => {
                    let tag = Tag::from_name(tag_name).ok_or_else(|| ParseError {
                        position: token.position,
                        expected: format!("a tag name ({})", tag_names()),
                        found: format!("`{tag_name}`"),
                    })?;
                    let pattern = if pattern.is_empty() {
                        self.quoted_pattern()?
                    } else {
                        pattern.to_string()
                    };
                    Ok(AstNode::TagFilter { tag, pattern })
                }
            },
            _ => Err(self.error_at(token, "a reference, tag filter, NOT or `(`")),
        }
    }

    /// The quoted string that must follow `tag:`.
    fn quoted_pattern(&mut self) -> Result<String, ParseError> {
        let token = self.current();
        match &token.kind {
            TokenKind::QuotedString(pattern) => {
                self.advance();
                Ok(pattern.clone())
            }
            _ => Err(self.error_at(token, "a pattern after the tag")),
        }
    }
}

static END: Token = Token { kind: TokenKind::End, text: String::new(), position: 0 };

fn tag_names() -> String {
    Tag::ALL.iter().map(Tag::as_str).collect::<Vec<_>>().join(", ")
}
