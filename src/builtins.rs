//! Built-in operator and runtime-function signatures.
//!
//! Seeds the top-level symbol table frame with the types of every operator
//! spelling and runtime function the checker and IR generator need to
//! resolve by name.

use crate::types::Type;
use std::collections::HashMap;

/// Seed the type checker's root symbol table.
pub fn seed_type_env() -> HashMap<String, Type> {
    let mut env = HashMap::new();

    let arithmetic = Type::fun(vec![Type::Int, Type::Int], Type::Int);
    for op in ["+", "-", "*", "/", "%"] {
        env.insert(op.to_string(), arithmetic.clone());
    }

    let comparison = Type::fun(vec![Type::Int, Type::Int], Type::Bool);
    for op in ["<", "<=", ">", ">="] {
        env.insert(op.to_string(), comparison.clone());
    }

    let logical = Type::fun(vec![Type::Bool, Type::Bool], Type::Bool);
    env.insert("and".to_string(), logical.clone());
    env.insert("or".to_string(), logical);

    env.insert("unary_-".to_string(), Type::Int);
    env.insert("unary_not".to_string(), Type::Bool);

    env.insert("print_int".to_string(), Type::fun(vec![Type::Int], Type::Unit));
    env.insert("print_bool".to_string(), Type::fun(vec![Type::Bool], Type::Unit));
    env.insert("read_int".to_string(), Type::fun(vec![], Type::Int));

    env
}

/// Names bound in the root environment that are not resolved through this
/// table (`==`/`!=` are polymorphic and handled directly by the checker).
pub fn is_builtin_operator(name: &str) -> bool {
    matches!(
        name,
        "+" | "-"
            | "*"
            | "/"
            | "%"
            | "<"
            | "<="
            | ">"
            | ">="
            | "and"
            | "or"
            | "unary_-"
            | "unary_not"
            | "print_int"
            | "print_bool"
            | "read_int"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_arithmetic_and_comparison() {
        let env = seed_type_env();
        assert_eq!(env["+"], Type::fun(vec![Type::Int, Type::Int], Type::Int));
        assert_eq!(env["<"], Type::fun(vec![Type::Int, Type::Int], Type::Bool));
    }

    #[test]
    fn seeds_unary_operators_as_bare_types() {
        let env = seed_type_env();
        assert_eq!(env["unary_-"], Type::Int);
        assert_eq!(env["unary_not"], Type::Bool);
    }

    #[test]
    fn seeds_runtime_functions() {
        let env = seed_type_env();
        assert_eq!(env["print_int"], Type::fun(vec![Type::Int], Type::Unit));
        assert_eq!(env["read_int"], Type::fun(vec![], Type::Int));
    }
}
