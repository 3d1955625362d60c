//! minic: an ahead-of-time compiler for a small statically-typed,
//! expression-oriented language targeting native Linux x86-64 executables.
//!
//! The pipeline is strictly linear and one-shot: source text -> tokens ->
//! [`ast::Module`] -> typed [`ast::Module`] -> [`ir::IrModule`] -> assembly
//! text -> executable. Each stage is a pure function exposed here so the
//! CLI (and tests) can stop at any point in the pipeline.

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod interpreter;
pub mod ir;
pub mod irgen;
pub mod loc;
pub mod parser;
pub mod symtab;
pub mod token;
pub mod tokenizer;
pub mod typechecker;
pub mod types;

pub use ast::Module;
pub use error::CompileError;
pub use ir::IrModule;
pub use token::Token;

use std::path::Path;

/// Lex `source` into a token stream.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    tracing::debug!(bytes = source.len(), "tokenize");
    tokenizer::tokenize(source)
}

/// Parse `source` into a `Module` AST (tokenizing internally).
pub fn parse(source: &str) -> Result<Module, CompileError> {
    tracing::debug!("parse");
    parser::parse(source)
}

/// Parse and type check `source`, returning the type-annotated `Module`.
pub fn typecheck(source: &str) -> Result<Module, CompileError> {
    let module = parse(source)?;
    tracing::debug!("typecheck");
    typechecker::check(&module)?;
    Ok(module)
}

/// Run the bounded interpreter over `source`.
pub fn interpret(source: &str) -> Result<interpreter::Value, CompileError> {
    let module = typecheck(source)?;
    tracing::debug!("interpret");
    interpreter::interpret(&module)
}

/// Parse, type check, and lower `source` to IR.
pub fn generate_ir(source: &str) -> Result<IrModule, CompileError> {
    let module = typecheck(source)?;
    tracing::debug!("lower");
    irgen::generate(&module)
}

/// Parse, type check, lower, and emit x86-64 assembly text for `source`.
pub fn generate_asm(source: &str) -> Result<String, CompileError> {
    let ir = generate_ir(source)?;
    tracing::debug!("emit");
    codegen::generate(&ir)
}

/// Run the full pipeline and write a native executable to `output_path`.
pub fn compile(source: &str, output_path: &Path) -> Result<(), CompileError> {
    let assembly = generate_asm(source)?;
    tracing::debug!(path = %output_path.display(), "assemble and link");
    driver::assemble_and_link(&assembly, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_stages_compose_on_a_trivial_program() {
        let src = "print_int(1 + 2 * 3)";
        tokenize(src).unwrap();
        typecheck(src).unwrap();
        generate_ir(src).unwrap();
        generate_asm(src).unwrap();
    }

    #[test]
    fn a_lexical_error_surfaces_through_every_downstream_stage() {
        let src = "1 @ 2";
        assert!(matches!(tokenize(src), Err(CompileError::Lex { .. })));
        assert!(matches!(typecheck(src), Err(CompileError::Lex { .. })));
        assert!(matches!(generate_asm(src), Err(CompileError::Lex { .. })));
    }
}
