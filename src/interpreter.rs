//! Bounded tree-walking interpreter.
//!
//! A deliberately partial evaluator used for early-stage diagnostics: it
//! understands literals, binary arithmetic/comparisons, and if-expressions
//! only. Anything else — variables, functions, loops, blocks, assignment —
//! is out of scope; this is a stub and should not be extended toward full
//! compiler semantics.

use crate::ast::{Expr, ExprKind, Literal, Module};
use crate::error::CompileError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Unit,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Unit => write!(f, "unit"),
        }
    }
}

pub fn interpret(module: &Module) -> Result<Value, CompileError> {
    match &module.expr {
        Some(expr) => interpret_expr(expr),
        None => Ok(Value::Unit),
    }
}

fn interpret_expr(expr: &Expr) -> Result<Value, CompileError> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(v)) => Ok(Value::Int(*v)),
        ExprKind::Literal(Literal::Bool(v)) => Ok(Value::Bool(*v)),
        ExprKind::Literal(Literal::Unit) => Ok(Value::Unit),

        ExprKind::Binary { left, op, right } => {
            let a = interpret_expr(left)?;
            let b = interpret_expr(right)?;
            apply_binary(op, a, b, expr)
        }

        ExprKind::If { cond, then_branch, else_branch } => match interpret_expr(cond)? {
            Value::Bool(true) => interpret_expr(then_branch),
            Value::Bool(false) => match else_branch {
                Some(e) => interpret_expr(e),
                None => Ok(Value::Unit),
            },
            other => Err(CompileError::semantic(cond.loc, format!("if condition did not evaluate to Bool, got {other}"))),
        },

        other => Err(CompileError::semantic(
            expr.loc,
            format!("{other:?} is not supported by the bounded interpreter"),
        )),
    }
}

fn apply_binary(op: &str, a: Value, b: Value, expr: &Expr) -> Result<Value, CompileError> {
    match (op, a, b) {
        ("+", Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        ("-", Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        ("*", Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
        ("/", Value::Int(a), Value::Int(b)) => Ok(Value::Int(a / b)),
        ("%", Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),
        ("<", Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        ("<=", Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
        (">", Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
        (">=", Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
        ("==", a, b) => Ok(Value::Bool(a == b)),
        ("!=", a, b) => Ok(Value::Bool(a != b)),
        _ => Err(CompileError::semantic(expr.loc, format!("\"{op}\" is not supported by the bounded interpreter"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(src: &str) -> Value {
        interpret(&parse(src).unwrap()).unwrap()
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(run("1 + 2 * 3"), Value::Int(7));
    }

    #[test]
    fn evaluates_if_without_else() {
        assert_eq!(run("if 1 < 2 then 10"), Value::Int(10));
    }

    #[test]
    fn evaluates_if_with_else() {
        assert_eq!(run("if 2 < 1 then 10 else 20"), Value::Int(20));
    }

    #[test]
    fn unsupported_node_is_a_clear_error() {
        let module = parse("var x = 1").unwrap();
        let err = interpret(&module).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }
}
