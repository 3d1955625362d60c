//! Compiler error type.
//!
//! One enum for every stage: lexical, syntactic, type, semantic, and
//! toolchain errors. No error list and no recovery — the first error
//! encountered aborts the stage it occurred in. Plain `Display`-only
//! errors, no `thiserror`, no `anyhow`.

use crate::loc::Loc;
use std::fmt;

#[derive(Debug)]
pub enum CompileError {
    Lex { loc: Loc, message: String },
    Syntax { loc: Loc, message: String },
    Type { loc: Loc, message: String },
    Semantic { loc: Loc, message: String },
    Toolchain(String),
    Io(String),
}

impl CompileError {
    pub fn lex(loc: Loc, message: impl Into<String>) -> Self {
        CompileError::Lex { loc, message: message.into() }
    }

    pub fn syntax(loc: Loc, message: impl Into<String>) -> Self {
        CompileError::Syntax { loc, message: message.into() }
    }

    pub fn ty(loc: Loc, message: impl Into<String>) -> Self {
        CompileError::Type { loc, message: message.into() }
    }

    pub fn semantic(loc: Loc, message: impl Into<String>) -> Self {
        CompileError::Semantic { loc, message: message.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex { loc, message } => write!(f, "{loc}: {message}"),
            CompileError::Syntax { loc, message } => write!(f, "{loc}: {message}"),
            CompileError::Type { loc, message } => write!(f, "{loc}: {message}"),
            CompileError::Semantic { loc, message } => write!(f, "{loc}: {message}"),
            CompileError::Toolchain(message) => write!(f, "{message}"),
            CompileError::Io(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e.to_string())
    }
}
