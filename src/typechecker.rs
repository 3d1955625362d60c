//! Static type checker.
//!
//! Two phases over a [`Module`]: phase A collects every function's
//! `FunType` into the root frame (enabling forward and recursive calls),
//! phase B walks each body in its own frame. The module's top-level
//! expression, if any, is checked last in the root frame. Every visited
//! node gets its inferred type written back via `Expr::set_type` as the
//! walk proceeds.

use crate::ast::{Expr, ExprKind, FunDef, Literal, Module, TypeExpr};
use crate::builtins::seed_type_env;
use crate::error::CompileError;
use crate::loc::Loc;
use crate::symtab::SymTab;
use crate::types::Type;

pub struct TypeChecker {
    env: SymTab<Type>,
    current_return: Option<Type>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker { env: SymTab::with_root(seed_type_env()), current_return: None }
    }

    pub fn check_module(&mut self, module: &Module) -> Result<(), CompileError> {
        for fun in &module.funcs {
            let fun_type = self.signature_of(fun)?;
            self.env.set(fun.name.clone(), fun_type);
        }

        for fun in &module.funcs {
            self.check_fun_body(fun)?;
        }

        if let Some(expr) = &module.expr {
            self.check_expr(expr)?;
        }

        Ok(())
    }

    fn signature_of(&self, fun: &FunDef) -> Result<Type, CompileError> {
        let mut params = Vec::with_capacity(fun.params.len());
        for p in &fun.params {
            params.push(
                Type::basic(&p.type_name)
                    .ok_or_else(|| CompileError::ty(fun.loc, format!("unknown type \"{}\"", p.type_name)))?,
            );
        }
        let ret = Type::basic(&fun.return_type)
            .ok_or_else(|| CompileError::ty(fun.loc, format!("unknown type \"{}\"", fun.return_type)))?;
        Ok(Type::fun(params, ret))
    }

    fn check_fun_body(&mut self, fun: &FunDef) -> Result<(), CompileError> {
        let Type::Fun(param_types, return_type) = self.signature_of(fun)? else {
            unreachable!("signature_of always returns Type::Fun")
        };

        self.env.push_frame();
        for (param, ty) in fun.params.iter().zip(param_types) {
            self.env.set(param.name.clone(), ty);
        }

        let previous_return = self.current_return.replace((*return_type).clone());
        let body_type = self.check_expr(&fun.body)?;
        self.current_return = previous_return;
        self.env.pop_frame();

        if body_type != *return_type {
            return Err(CompileError::semantic(
                fun.loc,
                format!("function \"{}\" body has type {body_type} but declares {return_type}", fun.name),
            ));
        }
        Ok(())
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Type, CompileError> {
        let ty = self.infer(expr)?;
        expr.set_type(ty.clone());
        Ok(ty)
    }

    fn infer(&mut self, expr: &Expr) -> Result<Type, CompileError> {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(_)) => Ok(Type::Int),
            ExprKind::Literal(Literal::Bool(_)) => Ok(Type::Bool),
            ExprKind::Literal(Literal::Unit) => Ok(Type::Unit),

            ExprKind::Identifier(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| CompileError::ty(expr.loc, format!("unknown identifier \"{name}\""))),

            ExprKind::Binary { left, op, right } if op == "=" => {
                let lt = self.check_expr(left)?;
                let rt = self.check_expr(right)?;
                if lt != rt {
                    return Err(CompileError::ty(
                        expr.loc,
                        format!("cannot assign {rt} to a variable of type {lt}"),
                    ));
                }
                Ok(lt)
            }

            ExprKind::Binary { left, op, right } if op == "==" || op == "!=" => {
                let lt = self.check_expr(left)?;
                let rt = self.check_expr(right)?;
                if lt != rt {
                    return Err(CompileError::ty(expr.loc, format!("cannot compare {lt} with {rt}")));
                }
                Ok(Type::Bool)
            }

            ExprKind::Binary { left, op, right } => {
                let lt = self.check_expr(left)?;
                let rt = self.check_expr(right)?;
                let op_type = self
                    .env
                    .get(op)
                    .cloned()
                    .ok_or_else(|| CompileError::ty(expr.loc, format!("unknown operator \"{op}\"")))?;
                let Type::Fun(params, ret) = op_type else {
                    return Err(CompileError::ty(expr.loc, format!("\"{op}\" is not an operator")));
                };
                if params != vec![lt.clone(), rt.clone()] {
                    return Err(CompileError::ty(
                        expr.loc,
                        format!("operator \"{op}\" does not accept ({lt}, {rt})"),
                    ));
                }
                Ok(*ret)
            }

            ExprKind::Unary { op, right } => {
                let rt = self.check_expr(right)?;
                let name = format!("unary_{op}");
                let op_type = self
                    .env
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| CompileError::ty(expr.loc, format!("unknown operator \"{name}\"")))?;
                if op_type != rt {
                    return Err(CompileError::ty(expr.loc, format!("\"{op}\" does not accept {rt}")));
                }
                Ok(op_type)
            }

            ExprKind::If { cond, then_branch, else_branch } => {
                let ct = self.check_expr(cond)?;
                if ct != Type::Bool {
                    return Err(CompileError::ty(cond.loc, format!("condition must be Bool, got {ct}")));
                }
                let then_t = self.check_expr(then_branch)?;
                match else_branch {
                    None => Ok(Type::Unit),
                    Some(else_branch) => {
                        let else_t = self.check_expr(else_branch)?;
                        if then_t != else_t {
                            return Err(CompileError::ty(
                                expr.loc,
                                format!("if branches have different types: {then_t} vs {else_t}"),
                            ));
                        }
                        Ok(then_t)
                    }
                }
            }

            ExprKind::While { cond, body } => {
                let ct = self.check_expr(cond)?;
                if ct != Type::Bool {
                    return Err(CompileError::ty(cond.loc, format!("condition must be Bool, got {ct}")));
                }
                self.check_expr(body)?;
                Ok(Type::Unit)
            }

            ExprKind::Block(None) => Ok(Type::Unit),
            ExprKind::Block(Some(exprs)) => {
                self.env.push_frame();
                let mut result = Type::Unit;
                for e in exprs {
                    result = self.check_expr(e)?;
                }
                self.env.pop_frame();
                Ok(result)
            }

            ExprKind::VariableDec { name, value, declared_type } => {
                let value_type = self.check_expr(value)?;
                if let Some(annotation) = declared_type {
                    let annotated = self.canonicalize(annotation, expr.loc)?;
                    if annotated != value_type {
                        return Err(CompileError::ty(
                            expr.loc,
                            format!("declared type {annotated} does not match value type {value_type}"),
                        ));
                    }
                }
                if self.env.declared_in_current_frame(name) {
                    return Err(CompileError::ty(expr.loc, format!("\"{name}\" is already declared in this scope")));
                }
                self.env.set(name.clone(), value_type);
                Ok(Type::Unit)
            }

            ExprKind::Call { callee, args } => {
                let callee_type = self
                    .env
                    .get(callee)
                    .cloned()
                    .ok_or_else(|| CompileError::ty(expr.loc, format!("unknown function \"{callee}\"")))?;
                let Type::Fun(params, ret) = callee_type else {
                    return Err(CompileError::ty(expr.loc, format!("\"{callee}\" is not callable")));
                };
                if params.len() != args.len() {
                    return Err(CompileError::ty(
                        expr.loc,
                        format!("\"{callee}\" expects {} argument(s), got {}", params.len(), args.len()),
                    ));
                }
                for (param_ty, arg) in params.iter().zip(args) {
                    let arg_ty = self.check_expr(arg)?;
                    if *param_ty != arg_ty {
                        return Err(CompileError::ty(
                            arg.loc,
                            format!("argument has type {arg_ty}, expected {param_ty}"),
                        ));
                    }
                }
                Ok(*ret)
            }

            ExprKind::Return(value) => {
                let value_type = match value {
                    Some(v) => self.check_expr(v)?,
                    None => Type::Unit,
                };
                match &self.current_return {
                    None => Err(CompileError::semantic(expr.loc, "return used outside a function")),
                    Some(declared) if *declared != value_type => Err(CompileError::semantic(
                        expr.loc,
                        format!("return value has type {value_type}, function declares {declared}"),
                    )),
                    Some(_) => Ok(value_type),
                }
            }

            ExprKind::BreakContinue(_) => Ok(Type::Unit),
        }
    }

    fn canonicalize(&self, type_expr: &TypeExpr, loc: Loc) -> Result<Type, CompileError> {
        match type_expr {
            TypeExpr::Basic(name) => {
                Type::basic(name).ok_or_else(|| CompileError::ty(loc, format!("unknown type \"{name}\"")))
            }
            TypeExpr::Fun(params, ret) => {
                let mut out = Vec::with_capacity(params.len());
                for p in params {
                    out.push(self.canonicalize(p, loc)?);
                }
                Ok(Type::fun(out, self.canonicalize(ret, loc)?))
            }
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

pub fn check(module: &Module) -> Result<(), CompileError> {
    TypeChecker::new().check_module(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn checked(src: &str) -> Result<Module, CompileError> {
        let module = parse(src).unwrap();
        check(&module)?;
        Ok(module)
    }

    #[test]
    fn literal_types_are_assigned() {
        let m = checked("1 + 2").unwrap();
        assert_eq!(m.expr.unwrap().get_type(), Type::Int);
    }

    #[test]
    fn comparison_yields_bool() {
        let m = checked("1 < 2").unwrap();
        assert_eq!(m.expr.unwrap().get_type(), Type::Bool);
    }

    #[test]
    fn unknown_identifier_is_a_type_error() {
        let err = checked("x + 1").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn if_branches_must_match() {
        let err = checked("if true then 1 else false").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn if_without_else_is_unit() {
        let m = checked("if true then 1").unwrap();
        assert_eq!(m.expr.unwrap().get_type(), Type::Unit);
    }

    #[test]
    fn variable_declaration_is_visible_afterward() {
        let m = checked("var x = 5; x + 1").unwrap();
        let ExprKind::Block(Some(exprs)) = &m.expr.as_ref().unwrap().kind else { panic!() };
        assert_eq!(exprs[1].get_type(), Type::Int);
    }

    #[test]
    fn redeclaration_in_same_scope_is_rejected() {
        let err = checked("var x = 1; var x = 2").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn recursive_function_call_typechecks() {
        checked("fun fact(n: Int): Int { if n == 0 then 1 else n * fact(n - 1) } fact(5)").unwrap();
    }

    #[test]
    fn function_body_type_mismatch_is_semantic() {
        let err = checked("fun f(): Int { true }").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn call_arity_mismatch_is_a_type_error() {
        let err = checked("fun f(x: Int): Int { return x } f(1, 2)").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }
}
