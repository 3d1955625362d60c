//! Tokens produced by the tokenizer.

use crate::loc::Loc;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    IntLiteral,
    Identifier,
    Operator,
    Punctuation,
    End,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: Loc,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, loc: Loc) -> Self {
        Token { kind, text: text.into(), loc }
    }

    pub fn end(loc: Loc) -> Self {
        Token { kind: TokenKind::End, text: String::new(), loc }
    }

    pub fn is_text(&self, text: &str) -> bool {
        self.text == text
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        // Loc's own PartialEq already treats a sentinel location as equal to
        // any other, so comparing it here is enough to make position-blind
        // token comparisons work in tests.
        self.kind == other.kind && self.text == other.text && self.loc == other.loc
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?}) at {}", self.kind, self.text, self.loc)
    }
}
