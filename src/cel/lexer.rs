//! # Expression Lexer
//!
//! Turns the text of a collection expression into [`Token`]s. Whitespace only
//! separates tokens; inside double quotes it is kept verbatim.
//!
//! ```text
//! artist:"Miles Davis" AND NOT (jazz OR album:Kind)
//! ```
//!
//! produces `Identifier("artist:")`, `QuotedString("Miles Davis")`, `And`,
//! `Not`, `LParen`, `Identifier("jazz")`, `Or`, `Identifier("album:Kind")`,
//! `RParen`, `End`.

use std::fmt;
use thiserror::Error;

/// Characters that can never start or continue a bare word.
///
/// `=` separates names from expressions in the definitions file, the rest are
/// kept free for future operators.
const RESERVED: &[char] = &['=', ';', '|', '`', '{', '}'];

/// Kinds of token produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare word. May embed a colon (`tag:pattern`) or end with one when the
    /// pattern is a quoted string.
    Identifier(String),
    /// A double-quoted string with escapes already resolved.
    QuotedString(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(word) => write!(f, "`{word}`"),
            TokenKind::QuotedString(text) => write!(f, "\"{text}\""),
            TokenKind::And => f.write_str("AND"),
            TokenKind::Or => f.write_str("OR"),
            TokenKind::Not => f.write_str("NOT"),
            TokenKind::LParen => f.write_str("`(`"),
            TokenKind::RParen => f.write_str("`)`"),
            TokenKind::End => f.write_str("end of input"),
        }
    }
}

/// A token and the character offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token, quotes included.
    pub text: String,
    /// Offset in characters (not bytes) from the start of the expression.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated quoted string starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("unexpected character {ch:?} at position {position}")]
    UnexpectedChar { ch: char, position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnterminatedString { position } | LexError::UnexpectedChar { position, .. } => {
                *position
            }
        }
    }
}

fn is_word_char(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_control() && !matches!(ch, '(' | ')' | '"') && !RESERVED.contains(&ch)
}

fn keyword(word: &str) -> Option<TokenKind> {
    if word.eq_ignore_ascii_case("and") {
        Some(TokenKind::And)
    } else if word.eq_ignore_ascii_case("or") {
        Some(TokenKind::Or)
    } else if word.eq_ignore_ascii_case("not") {
        Some(TokenKind::Not)
    } else {
        None
    }
}

/// Splits `input` into tokens, always terminated by a [`TokenKind::End`] token.
///
/// # Errors
///
/// - [`LexError::UnterminatedString`] when a `"` is never closed
/// - [`LexError::UnexpectedChar`] for control characters and reserved symbols
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];

        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        match ch {
            '(' | ')' => {
                let kind = if ch == '(' { TokenKind::LParen } else { TokenKind::RParen };
                tokens.push(Token { kind, text: ch.to_string(), position: pos });
                pos += 1;
            }
            '"' => {
                let start = pos;
                let (value, end) = read_quoted(&chars, start)?;
                tokens.push(Token {
                    kind: TokenKind::QuotedString(value),
                    text: chars[start..end].iter().collect(),
                    position: start,
                });
                pos = end;
            }
            c if is_word_char(c) => {
                let start = pos;
                while pos < chars.len() && is_word_char(chars[pos]) {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                let kind = keyword(&word).unwrap_or_else(|| TokenKind::Identifier(word.clone()));
                tokens.push(Token { kind, text: word, position: start });
            }
            c => return Err(LexError::UnexpectedChar { ch: c, position: pos }),
        }
    }

    tokens.push(Token { kind: TokenKind::End, text: String::new(), position: chars.len() });
    log::trace!("Tokenized {:?} into {} tokens", input, tokens.len());
    Ok(tokens)
}

/// Reads a quoted string whose opening quote sits at `start`. Returns the
/// unescaped value and the offset just past the closing quote.
fn read_quoted(chars: &[char], start: usize) -> Result<(String, usize), LexError> {
    let mut value = String::new();
    let mut pos = start + 1;

    while pos < chars.len() {
        match chars[pos] {
            '"' => return Ok((value, pos + 1)),
            '\\' if pos + 1 < chars.len() && matches!(chars[pos + 1], '"' | '\\') => {
                value.push(chars[pos + 1]);
                pos += 2;
            }
            c => {
                value.push(c);
                pos += 1;
            }
        }
    }

    Err(LexError::UnterminatedString { position: start })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_bare_reference() {
        assert_eq!(
            kinds("all"),
            vec![TokenKind::Identifier("all".to_string()), TokenKind::End]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("a and b Or NOT c"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::And,
                TokenKind::Identifier("b".to_string()),
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Identifier("c".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_tag_filter_with_quoted_pattern() {
        assert_eq!(
            kinds(r#"artist:"Miles Davis""#),
            vec![
                TokenKind::Identifier("artist:".to_string()),
                TokenKind::QuotedString("Miles Davis".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_parentheses_split_words() {
        assert_eq!(
            kinds("(jazz)"),
            vec![
                TokenKind::LParen,
                TokenKind::Identifier("jazz".to_string()),
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_positions_are_character_offsets() {
        let tokens = tokenize("é OR b").unwrap();
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 2);
        assert_eq!(tokens[2].position, 5);
        assert_eq!(tokens[3].position, 6);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let tokens = tokenize(r#""say \"hi\"""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::QuotedString(r#"say "hi""#.to_string()));
        assert_eq!(tokens[0].text, r#""say \"hi\"""#);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize(r#"artist:"Miles"#),
            Err(LexError::UnterminatedString { position: 7 })
        );
    }

    #[test]
    fn test_reserved_character_is_rejected() {
        assert_eq!(
            tokenize("a = b"),
            Err(LexError::UnexpectedChar { ch: '=', position: 2 })
        );
    }

    #[test]
    fn test_empty_input_yields_only_end() {
        assert_eq!(kinds("   "), vec![TokenKind::End]);
    }
}
