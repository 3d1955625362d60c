//! Lexical analysis.
//!
//! Scans left-to-right, consuming the first matching class at each position:
//! newlines, whitespace/comments, identifiers, integer literals, operators
//! (longest match first), then punctuation. Keywords are plain identifiers —
//! the parser is the one that recognizes their spelling.

use crate::error::CompileError;
use crate::loc::Loc;
use crate::token::{Token, TokenKind};

const TWO_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "=>"];
const ONE_CHAR_OPERATORS: &[char] = &['+', '-', '*', '/', '=', '<', '>', '%'];
const PUNCTUATION: &[char] = &['(', ')', '{', '}', ',', ';', ':'];

pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut pos = 0usize;
    let mut line = 1usize;
    let mut column = 1usize;
    let mut tokens = Vec::new();

    while pos < chars.len() {
        let ch = chars[pos];

        if ch == '\n' {
            let mut n = 0;
            while pos < chars.len() && chars[pos] == '\n' {
                pos += 1;
                n += 1;
            }
            line += n;
            column = 1;
            continue;
        }

        if ch.is_whitespace() {
            pos += 1;
            column += 1;
            continue;
        }

        if ch == '/' && chars.get(pos + 1) == Some(&'/') || ch == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        let loc = Loc::new(line, column);

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            column += pos - start;
            tokens.push(Token::new(TokenKind::Identifier, text, loc));
            continue;
        }

        if ch.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            column += pos - start;
            tokens.push(Token::new(TokenKind::IntLiteral, text, loc));
            continue;
        }

        if let Some(op) = TWO_CHAR_OPERATORS
            .iter()
            .find(|op| chars[pos..].starts_with(&op.chars().collect::<Vec<_>>()[..]))
        {
            tokens.push(Token::new(TokenKind::Operator, *op, loc));
            pos += 2;
            column += 2;
            continue;
        }

        if ONE_CHAR_OPERATORS.contains(&ch) {
            tokens.push(Token::new(TokenKind::Operator, ch.to_string(), loc));
            pos += 1;
            column += 1;
            continue;
        }

        if PUNCTUATION.contains(&ch) {
            tokens.push(Token::new(TokenKind::Punctuation, ch.to_string(), loc));
            pos += 1;
            column += 1;
            continue;
        }

        let snippet: String = chars[pos..(pos + 10).min(chars.len())].iter().collect();
        return Err(CompileError::lex(loc, format!("invalid token near \"{snippet}\"")));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loc::Loc;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, Loc::ignored())
    }

    #[test]
    fn tokenizes_identifiers_and_ints() {
        let tokens = tokenize("if  3\nwhile").unwrap();
        assert_eq!(
            tokens,
            vec![
                tok(TokenKind::Identifier, "if"),
                tok(TokenKind::IntLiteral, "3"),
                tok(TokenKind::Identifier, "while"),
            ]
        );
    }

    #[test]
    fn tokenizes_operators_longest_match_first() {
        let tokens = tokenize("-3+4 == != <= >=").unwrap();
        assert_eq!(
            tokens,
            vec![
                tok(TokenKind::Operator, "-"),
                tok(TokenKind::IntLiteral, "3"),
                tok(TokenKind::Operator, "+"),
                tok(TokenKind::IntLiteral, "4"),
                tok(TokenKind::Operator, "=="),
                tok(TokenKind::Operator, "!="),
                tok(TokenKind::Operator, "<="),
                tok(TokenKind::Operator, ">="),
            ]
        );
    }

    #[test]
    fn tokenizes_punctuation() {
        let tokens = tokenize("{3 ,4;)").unwrap();
        assert_eq!(
            tokens,
            vec![
                tok(TokenKind::Punctuation, "{"),
                tok(TokenKind::IntLiteral, "3"),
                tok(TokenKind::Punctuation, ","),
                tok(TokenKind::IntLiteral, "4"),
                tok(TokenKind::Punctuation, ";"),
                tok(TokenKind::Punctuation, ")"),
            ]
        );
    }

    #[test]
    fn skips_line_and_hash_comments() {
        let tokens = tokenize("1 // comment\n2 # also a comment\n3").unwrap();
        assert_eq!(
            tokens,
            vec![
                tok(TokenKind::IntLiteral, "1"),
                tok(TokenKind::IntLiteral, "2"),
                tok(TokenKind::IntLiteral, "3"),
            ]
        );
    }

    #[test]
    fn reports_location_of_unmatched_character() {
        let err = tokenize("foo @ bar").unwrap_err();
        match err {
            CompileError::Lex { loc, .. } => assert_eq!(loc, Loc::new(1, 5)),
            other => panic!("expected a lex error, got {other:?}"),
        }
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let tokens = tokenize("a\nb").unwrap();
        assert_eq!(tokens[0].loc, Loc::new(1, 1));
        assert_eq!(tokens[1].loc, Loc::new(2, 1));
    }
}
