//! # Collection Expression Language
//!
//! One textual language addresses every group of tracks: `all`, stored
//! playlists, named collections and tag filters, combined with `AND`, `OR`,
//! `NOT` and parentheses.
//!
//! ```
//! use mpdc::cel;
//!
//! let tree = cel::parse_expression(r#"artist:"Miles Davis" AND NOT live"#)?;
//! assert_eq!(tree.to_string(), r#"artist:"Miles Davis" AND NOT live"#);
//! # Ok::<(), cel::SyntaxError>(())
//! ```
//!
//! - [`lexer`] - text to tokens
//! - [`parser`] - tokens to [`AstNode`]
//! - [`eval`] - [`AstNode`] to an ordered, duplicate-free list of track ids
//! - [`membership`] - per-catalog-position bitsets the evaluator works on

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod membership;
pub mod parser;

pub use ast::{AstNode, ALL};
pub use eval::{evaluate, Evaluator};
pub use lexer::{tokenize, LexError, Token, TokenKind};
pub use parser::{parse, ParseError};

use thiserror::Error;

/// Either stage of turning text into a tree failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    /// Character offset of the offending construct.
    pub fn position(&self) -> usize {
        match self {
            SyntaxError::Lex(err) => err.position(),
            SyntaxError::Parse(err) => err.position,
        }
    }

    /// The message plus the expression with a caret under the fault:
    ///
    /// ```text
    /// expected AND, OR or end of input at position 7, found `c`
    ///     a OR b c
    ///            ^
    /// ```
    pub fn render_diagnostic(&self, expression: &str) -> String {
        format!("{self}\n    {expression}\n    {}^", " ".repeat(self.position()))
    }
}

/// Tokenizes and parses `text`.
///
/// # Errors
///
/// [`SyntaxError::Lex`] or [`SyntaxError::Parse`] naming the position at
/// fault.
pub fn parse_expression(text: &str) -> Result<AstNode, SyntaxError> {
    let tokens = tokenize(text)?;
    Ok(parse(&tokens)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_through_parser() {
        for text in [
            "all",
            "a OR b AND NOT c",
            "(a OR b) AND c",
            r#"album:"Kind of Blue" OR "Road Trip""#,
            "NOT (a AND b)",
            "a AND (b AND c)",
        ] {
            let tree = parse_expression(text).unwrap();
            assert_eq!(parse_expression(&tree.to_string()).unwrap(), tree, "{text}");
        }
    }

    #[test]
    fn test_diagnostic_points_at_fault() {
        let err = parse_expression("a OR b c").unwrap_err();
        assert_eq!(err.position(), 7);
        let rendered = err.render_diagnostic("a OR b c");
        let caret_line = rendered.lines().last().unwrap();
        assert_eq!(caret_line, format!("    {}^", " ".repeat(7)));
    }

    #[test]
    fn test_lex_errors_surface_through_parse_expression() {
        assert!(matches!(
            parse_expression("\"open"),
            Err(SyntaxError::Lex(LexError::UnterminatedString { position: 0 }))
        ));
    }
}
