//! IR generator.
//!
//! Fresh-name counters for temporaries and labels live in a [`Counters`]
//! value threaded through every function lowering in turn (see
//! [`generate`]), rather than reset per function, so that two functions
//! with the same control-flow shape never mint the same label text — the
//! generated assembly concatenates every function's body into one text
//! section, so label names must be unique program-wide. One
//! [`crate::ir::IrFunction`] is emitted per function definition plus a
//! trailing `main` bucket for the module's top-level expression, each
//! generated in its own IR symbol-table frame.

use crate::ast::{Expr, ExprKind, FunDef, Literal, LoopCtrl, Module};
use crate::error::CompileError;
use crate::ir::{IRVar, Instr, IrModule};
use crate::loc::Loc;
use crate::symtab::SymTab;
use crate::types::Type;
use std::collections::HashMap;

const MAX_CALL_ARGS: usize = 6;

fn root_ir_env() -> HashMap<String, IRVar> {
    let mut env = HashMap::new();
    for name in [
        "+", "-", "*", "/", "%", "<", "<=", ">", ">=", "==", "!=", "and", "or", "unary_-", "unary_not", "print_int",
        "print_bool", "read_int",
    ] {
        env.insert(name.to_string(), IRVar::new(name));
    }
    env
}

struct LoopLabels {
    cond: IRVar,
    end: IRVar,
}

/// Fresh-name counters, shared across every function lowered from the same
/// module so that two functions with the same control-flow shape don't mint
/// the same label text. `IrModule` concatenates every function's
/// instructions into one assembly text section, so label uniqueness has to
/// hold program-wide, not just per function.
#[derive(Default)]
struct Counters {
    var_counter: usize,
    label_counter: usize,
}

struct FunctionGen {
    counters: Counters,
    instrs: Vec<Instr>,
    vars: SymTab<IRVar>,
    loops: Vec<LoopLabels>,
}

impl FunctionGen {
    fn new(env: HashMap<String, IRVar>, counters: Counters) -> Self {
        FunctionGen { counters, instrs: Vec::new(), vars: SymTab::with_root(env), loops: Vec::new() }
    }

    fn fresh_var(&mut self) -> IRVar {
        self.counters.var_counter += 1;
        IRVar::new(format!("x{}", self.counters.var_counter))
    }

    fn fresh_label(&mut self, suffix: &str) -> IRVar {
        self.counters.label_counter += 1;
        IRVar::new(format!("{}_{suffix}", self.counters.label_counter))
    }

    fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    fn unit_var(&mut self, loc: Loc) -> IRVar {
        let dest = self.fresh_var();
        self.emit(Instr::LoadBoolConst { value: false, dest: dest.clone(), loc });
        dest
    }

    fn visit(&mut self, expr: &Expr) -> Result<IRVar, CompileError> {
        let loc = expr.loc;
        match &expr.kind {
            ExprKind::Literal(Literal::Int(v)) => {
                let dest = self.fresh_var();
                self.emit(Instr::LoadIntConst { value: *v, dest: dest.clone(), loc });
                Ok(dest)
            }
            ExprKind::Literal(Literal::Bool(v)) => {
                let dest = self.fresh_var();
                self.emit(Instr::LoadBoolConst { value: *v, dest: dest.clone(), loc });
                Ok(dest)
            }
            ExprKind::Literal(Literal::Unit) => Ok(self.unit_var(loc)),

            ExprKind::Identifier(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| CompileError::semantic(loc, format!("unbound identifier \"{name}\" during lowering"))),

            ExprKind::Binary { left, op, right } if op == "=" => {
                let ExprKind::Identifier(name) = &left.kind else {
                    return Err(CompileError::semantic(loc, "left side of \"=\" must be an identifier"));
                };
                let value = self.visit(right)?;
                let dest = self
                    .vars
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CompileError::semantic(left.loc, format!("unbound identifier \"{name}\"")))?;
                self.emit(Instr::Copy { source: value, dest, loc });
                Ok(self.unit_var(loc))
            }

            ExprKind::Binary { left, op, right } if op == "or" => self.visit_or(left, right, loc),
            ExprKind::Binary { left, op, right } if op == "and" => self.visit_and(left, right, loc),

            ExprKind::Binary { left, op, right } => {
                let l = self.visit(left)?;
                let r = self.visit(right)?;
                let fun = self
                    .vars
                    .get(op)
                    .cloned()
                    .ok_or_else(|| CompileError::semantic(loc, format!("unbound operator \"{op}\"")))?;
                let dest = self.fresh_var();
                self.emit(Instr::Call { fun, args: vec![l, r], dest: dest.clone(), loc });
                Ok(dest)
            }

            ExprKind::Unary { op, right } => {
                let operand = self.visit(right)?;
                let fun = self
                    .vars
                    .get(&format!("unary_{op}"))
                    .cloned()
                    .ok_or_else(|| CompileError::semantic(loc, format!("unbound operator \"unary_{op}\"")))?;
                let dest = self.fresh_var();
                self.emit(Instr::Call { fun, args: vec![operand], dest: dest.clone(), loc });
                Ok(dest)
            }

            ExprKind::If { cond, then_branch, else_branch: None } => {
                let then_label = self.fresh_label("if_then");
                let end_label = self.fresh_label("if_end");
                let cond_var = self.visit(cond)?;
                self.emit(Instr::CondJump {
                    cond: cond_var,
                    then_label: then_label.clone(),
                    else_label: end_label.clone(),
                    loc,
                });
                self.emit(Instr::Label { name: then_label, loc });
                self.visit(then_branch)?;
                self.emit(Instr::Label { name: end_label, loc });
                Ok(self.unit_var(loc))
            }

            ExprKind::If { cond, then_branch, else_branch: Some(else_branch) } => {
                let then_label = self.fresh_label("if_then");
                let else_label = self.fresh_label("if_else");
                let end_label = self.fresh_label("if_end");
                let cond_var = self.visit(cond)?;
                self.emit(Instr::CondJump {
                    cond: cond_var,
                    then_label: then_label.clone(),
                    else_label: else_label.clone(),
                    loc,
                });
                self.emit(Instr::Label { name: then_label, loc });
                let then_result = self.visit(then_branch)?;
                self.emit(Instr::Jump { label: end_label.clone(), loc });
                self.emit(Instr::Label { name: else_label, loc });
                let else_result = self.visit(else_branch)?;
                self.emit(Instr::Copy { source: else_result, dest: then_result.clone(), loc });
                self.emit(Instr::Label { name: end_label, loc });
                Ok(then_result)
            }

            ExprKind::While { cond, body } => {
                let cond_label = self.fresh_label("while_cond");
                let body_label = self.fresh_label("while_body");
                let end_label = self.fresh_label("while_end");

                self.emit(Instr::Label { name: cond_label.clone(), loc });
                let cond_var = self.visit(cond)?;
                self.emit(Instr::CondJump {
                    cond: cond_var,
                    then_label: body_label.clone(),
                    else_label: end_label.clone(),
                    loc,
                });
                self.emit(Instr::Label { name: body_label, loc });
                self.loops.push(LoopLabels { cond: cond_label.clone(), end: end_label.clone() });
                self.visit(body)?;
                self.loops.pop();
                self.emit(Instr::Jump { label: cond_label, loc });
                self.emit(Instr::Label { name: end_label, loc });
                Ok(self.unit_var(loc))
            }

            ExprKind::Block(None) => Ok(self.unit_var(loc)),
            ExprKind::Block(Some(exprs)) => {
                self.vars.push_frame();
                let mut result = None;
                for e in exprs {
                    result = Some(self.visit(e)?);
                }
                self.vars.pop_frame();
                match result {
                    Some(v) => Ok(v),
                    None => Ok(self.unit_var(loc)),
                }
            }

            ExprKind::VariableDec { name, value, .. } => {
                let value_var = self.visit(value)?;
                let dest = self.fresh_var();
                self.emit(Instr::Copy { source: value_var, dest: dest.clone(), loc });
                self.vars.set(name.clone(), dest);
                Ok(self.unit_var(loc))
            }

            ExprKind::Call { callee, args } => {
                if args.len() > MAX_CALL_ARGS {
                    return Err(CompileError::semantic(
                        loc,
                        format!("call to \"{callee}\" has {} arguments, at most {MAX_CALL_ARGS} are supported", args.len()),
                    ));
                }
                let fun = self
                    .vars
                    .get(callee)
                    .cloned()
                    .ok_or_else(|| CompileError::semantic(loc, format!("unbound function \"{callee}\"")))?;
                let mut arg_vars = Vec::with_capacity(args.len());
                for a in args {
                    arg_vars.push(self.visit(a)?);
                }
                let dest = self.fresh_var();
                self.emit(Instr::Call { fun, args: arg_vars, dest: dest.clone(), loc });
                Ok(dest)
            }

            ExprKind::Return(value) => {
                let value_var = match value {
                    Some(v) => Some(self.visit(v)?),
                    None => None,
                };
                self.emit(Instr::Return { value: value_var.clone(), loc });
                match value_var {
                    Some(v) => Ok(v),
                    None => Ok(self.unit_var(loc)),
                }
            }

            ExprKind::BreakContinue(kind) => {
                let target = self
                    .loops
                    .last()
                    .ok_or_else(|| CompileError::semantic(loc, "break/continue used outside a loop"))?;
                let label = match kind {
                    LoopCtrl::Break => target.end.clone(),
                    LoopCtrl::Continue => target.cond.clone(),
                };
                self.emit(Instr::Jump { label, loc });
                Ok(self.unit_var(loc))
            }
        }
    }

    fn visit_or(&mut self, left: &Expr, right: &Expr, loc: Loc) -> Result<IRVar, CompileError> {
        let skip_label = self.fresh_label("or_skip");
        let right_label = self.fresh_label("or_right");
        let end_label = self.fresh_label("or_end");
        let result = self.fresh_var();

        let left_var = self.visit(left)?;
        self.emit(Instr::CondJump {
            cond: left_var,
            then_label: skip_label.clone(),
            else_label: right_label.clone(),
            loc,
        });
        self.emit(Instr::Label { name: right_label, loc });
        let right_var = self.visit(right)?;
        self.emit(Instr::Copy { source: right_var, dest: result.clone(), loc });
        self.emit(Instr::Jump { label: end_label.clone(), loc });
        self.emit(Instr::Label { name: skip_label, loc });
        self.emit(Instr::LoadBoolConst { value: true, dest: result.clone(), loc });
        self.emit(Instr::Label { name: end_label, loc });
        Ok(result)
    }

    fn visit_and(&mut self, left: &Expr, right: &Expr, loc: Loc) -> Result<IRVar, CompileError> {
        let right_label = self.fresh_label("and_right");
        let skip_label = self.fresh_label("and_skip");
        let end_label = self.fresh_label("and_end");
        let result = self.fresh_var();

        let left_var = self.visit(left)?;
        self.emit(Instr::CondJump {
            cond: left_var,
            then_label: right_label.clone(),
            else_label: skip_label.clone(),
            loc,
        });
        self.emit(Instr::Label { name: right_label, loc });
        let right_var = self.visit(right)?;
        self.emit(Instr::Copy { source: right_var, dest: result.clone(), loc });
        self.emit(Instr::Jump { label: end_label.clone(), loc });
        self.emit(Instr::Label { name: skip_label, loc });
        self.emit(Instr::LoadBoolConst { value: false, dest: result.clone(), loc });
        self.emit(Instr::Label { name: end_label, loc });
        Ok(result)
    }
}

fn lower_function(
    fun: &FunDef,
    root_env: &HashMap<String, IRVar>,
    counters: Counters,
) -> Result<(Vec<IRVar>, Vec<Instr>, Counters), CompileError> {
    let mut gen = FunctionGen::new(root_env.clone(), counters);
    let mut params = Vec::with_capacity(fun.params.len());
    for p in &fun.params {
        let var = IRVar::new(p.name.clone());
        gen.vars.set(p.name.clone(), var.clone());
        params.push(var);
    }
    let result = gen.visit(&fun.body)?;
    if !matches!(gen.instrs.last(), Some(Instr::Return { .. })) {
        gen.emit(Instr::Return { value: Some(result), loc: fun.loc });
    }
    Ok((params, gen.instrs, gen.counters))
}

/// Lower a type-checked module. Functions are emitted in declaration order,
/// `main` last, matching `IrModule`'s display order. One `Counters` is
/// threaded through every function and the trailing `main` bucket, so fresh
/// variable and label names are unique across the whole program rather than
/// just within a single function.
pub fn generate(module: &Module) -> Result<IrModule, CompileError> {
    let root_env = root_ir_env();
    let mut ir_module = IrModule::default();
    let mut counters = Counters::default();

    for fun in &module.funcs {
        let (params, instrs, next_counters) = lower_function(fun, &root_env, counters)?;
        counters = next_counters;
        ir_module.push(fun.name.clone(), params, instrs);
    }

    if let Some(expr) = &module.expr {
        let mut gen = FunctionGen::new(root_env, counters);
        let result = gen.visit(expr)?;
        let result_type = expr.get_type();
        let print_fn = match result_type {
            Type::Int => Some("print_int"),
            Type::Bool => Some("print_bool"),
            Type::Unit | Type::Fun(..) => None,
        };
        if let Some(name) = print_fn {
            let fun = gen.vars.get(name).cloned().expect("builtin print function always bound");
            let dest = gen.fresh_var();
            gen.emit(Instr::Call { fun, args: vec![result], dest, loc: Loc::synthetic() });
        }
        ir_module.push("main", vec![], gen.instrs);
    }

    Ok(ir_module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::typechecker::check;

    fn lowered(src: &str) -> IrModule {
        let module = parse(src).unwrap();
        check(&module).unwrap();
        generate(&module).unwrap()
    }

    #[test]
    fn int_literal_prints_implicitly() {
        let m = lowered("1 + 2 * 3");
        let main = m.functions.last().unwrap();
        assert!(main.instrs.iter().any(|i| matches!(i, Instr::Call { fun, .. } if fun.0 == "print_int")));
    }

    #[test]
    fn bool_result_prints_via_print_bool() {
        let m = lowered("true and false");
        let main = m.functions.last().unwrap();
        assert!(main.instrs.iter().any(|i| matches!(i, Instr::Call { fun, .. } if fun.0 == "print_bool")));
    }

    #[test]
    fn unit_result_has_no_implicit_print() {
        let m = lowered("var x = 1;");
        let main = m.functions.last().unwrap();
        assert!(!main.instrs.iter().any(|i| matches!(i, Instr::Call { fun, .. } if fun.0.starts_with("print"))));
    }

    #[test]
    fn assignment_requires_identifier_on_the_left() {
        let module = parse("1 = 2").unwrap();
        check(&module).unwrap();
        let err = generate(&module).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let module = parse("break").unwrap();
        check(&module).unwrap();
        let err = generate(&module).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn while_loop_jumps_back_to_condition() {
        let m = lowered("var x = 3; while x > 0 do { x = x - 1 }");
        let main = m.functions.last().unwrap();
        let cond_labels: Vec<_> = main
            .instrs
            .iter()
            .filter_map(|i| match i {
                Instr::Label { name, .. } if name.0.contains("while_cond") => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(cond_labels.len(), 1);
        assert!(main.instrs.iter().any(|i| matches!(i, Instr::Jump { label, .. } if *label == cond_labels[0])));
    }

    #[test]
    fn function_is_lowered_with_its_params() {
        let module = parse("fun sq(x: Int): Int { return x * x } sq(5)").unwrap();
        check(&module).unwrap();
        let m = generate(&module).unwrap();
        assert_eq!(m.functions[0].name, "sq");
        assert_eq!(m.functions[0].params, vec![IRVar::new("x")]);
    }

    #[test]
    fn labels_are_unique_across_functions_with_the_same_control_flow_shape() {
        let m = lowered(
            "fun f(x: Int): Int { if x < 0 then 0 - x else x } \
             fun g(x: Int): Int { if x > 0 then x else 0 - x } \
             f(1) + g(1)",
        );

        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for func in &m.functions {
            for instr in &func.instrs {
                if let Instr::Label { name, .. } = instr {
                    if !seen.insert(name.0.clone()) {
                        duplicates.push(name.0.clone());
                    }
                }
            }
        }
        assert!(duplicates.is_empty(), "duplicate labels across functions: {duplicates:?}");
    }
}
