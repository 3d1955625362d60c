//! x86-64 assembly generation.
//!
//! Target: Linux x86-64 System V, AT&T syntax, emitted as text via
//! `std::fmt::Write`. No register allocation: every IR variable gets its own
//! 8-byte stack slot for the lifetime of the function, assigned in
//! first-seen order by [`Locals`].

use crate::error::CompileError;
use crate::ir::{IRVar, Instr, IrFunction, IrModule};
use std::collections::HashMap;
use std::fmt::Write as _;

const ARG_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
const MAX_CALL_ARGS: usize = ARG_REGISTERS.len();

const INTRINSICS: &[&str] = &[
    "+", "-", "*", "/", "%", "<", "<=", ">", ">=", "==", "!=", "unary_-", "unary_not",
];

/// Mangle a source-level function name into an assembly symbol, keeping
/// user identifiers out of the reserved C/libc namespace. `main` is left
/// untouched since it is the process entry point the linker expects.
fn mangle_fn(name: &str) -> String {
    if name == "main" {
        name.to_string()
    } else {
        format!("fn_{name}")
    }
}

/// Assigns a stack slot to each distinct [`IRVar`] referenced by a
/// function, in first-seen order.
struct Locals {
    slots: HashMap<String, i64>,
    next_offset: i64,
}

impl Locals {
    fn new() -> Self {
        Locals { slots: HashMap::new(), next_offset: 0 }
    }

    fn slot(&mut self, var: &IRVar) -> i64 {
        if let Some(offset) = self.slots.get(&var.0) {
            return *offset;
        }
        self.next_offset -= 8;
        self.slots.insert(var.0.clone(), self.next_offset);
        self.next_offset
    }

    fn frame_size(&self) -> i64 {
        let raw = -self.next_offset;
        (raw + 15) & !15
    }
}

fn collect_vars(func: &IrFunction) -> Locals {
    let mut locals = Locals::new();
    for p in &func.params {
        locals.slot(p);
    }
    for instr in &func.instrs {
        match instr {
            Instr::LoadIntConst { dest, .. } | Instr::LoadBoolConst { dest, .. } => {
                locals.slot(dest);
            }
            Instr::Copy { source, dest, .. } => {
                locals.slot(source);
                locals.slot(dest);
            }
            Instr::Call { args, dest, .. } => {
                for a in args {
                    locals.slot(a);
                }
                locals.slot(dest);
            }
            Instr::CondJump { cond, .. } => {
                locals.slot(cond);
            }
            Instr::Return { value: Some(v), .. } => {
                locals.slot(v);
            }
            Instr::Jump { .. } | Instr::Label { .. } | Instr::Return { value: None, .. } => {}
        }
    }
    locals
}

struct FunctionCodeGen<'a> {
    out: String,
    locals: Locals,
    epilogue_label: String,
    func: &'a IrFunction,
}

impl<'a> FunctionCodeGen<'a> {
    fn new(func: &'a IrFunction) -> Self {
        let symbol = mangle_fn(&func.name);
        FunctionCodeGen { out: String::new(), locals: collect_vars(func), epilogue_label: format!(".L{symbol}_epilogue"), func }
    }

    fn slot_str(&mut self, var: &IRVar) -> String {
        format!("{}(%rbp)", self.locals.slot(var))
    }

    fn generate(mut self) -> Result<String, CompileError> {
        let symbol = mangle_fn(&self.func.name);
        let frame_size = self.locals.frame_size();

        writeln!(self.out, ".globl {symbol}").ok();
        writeln!(self.out, "{symbol}:").ok();
        writeln!(self.out, "    pushq %rbp").ok();
        writeln!(self.out, "    movq %rsp, %rbp").ok();
        if frame_size > 0 {
            writeln!(self.out, "    subq ${frame_size}, %rsp").ok();
        }

        for (param, reg) in self.func.params.clone().iter().zip(ARG_REGISTERS) {
            let slot = self.slot_str(param);
            writeln!(self.out, "    movq {reg}, {slot}").ok();
        }

        for instr in self.func.instrs.clone().iter() {
            self.emit(instr)?;
        }

        writeln!(self.out, "{}:", self.epilogue_label).ok();
        writeln!(self.out, "    movq %rbp, %rsp").ok();
        writeln!(self.out, "    popq %rbp").ok();
        writeln!(self.out, "    retq").ok();
        Ok(self.out)
    }

    fn emit(&mut self, instr: &Instr) -> Result<(), CompileError> {
        match instr {
            Instr::LoadIntConst { value, dest, .. } => {
                let slot = self.slot_str(dest);
                if i32::try_from(*value).is_ok() {
                    writeln!(self.out, "    movq ${value}, {slot}").ok();
                } else {
                    writeln!(self.out, "    movabsq ${value}, %rax").ok();
                    writeln!(self.out, "    movq %rax, {slot}").ok();
                }
            }
            Instr::LoadBoolConst { value, dest, .. } => {
                let slot = self.slot_str(dest);
                writeln!(self.out, "    movq ${}, {slot}", *value as i64).ok();
            }
            Instr::Copy { source, dest, .. } => {
                let src = self.slot_str(source);
                writeln!(self.out, "    movq {src}, %rax").ok();
                let dst = self.slot_str(dest);
                writeln!(self.out, "    movq %rax, {dst}").ok();
            }
            Instr::Label { name, .. } => {
                writeln!(self.out, ".L{name}:").ok();
            }
            Instr::Jump { label, .. } => {
                writeln!(self.out, "    jmp .L{label}").ok();
            }
            Instr::CondJump { cond, then_label, else_label, .. } => {
                let slot = self.slot_str(cond);
                writeln!(self.out, "    cmpq $0, {slot}").ok();
                writeln!(self.out, "    jne .L{then_label}").ok();
                writeln!(self.out, "    jmp .L{else_label}").ok();
            }
            Instr::Call { fun, args, dest, loc } => {
                if INTRINSICS.contains(&fun.0.as_str()) {
                    self.emit_intrinsic(&fun.0, args, dest)?;
                } else {
                    self.emit_call(fun, args, dest, *loc)?;
                }
            }
            Instr::Return { value, .. } => {
                if let Some(v) = value {
                    let slot = self.slot_str(v);
                    writeln!(self.out, "    movq {slot}, %rax").ok();
                }
                writeln!(self.out, "    jmp {}", self.epilogue_label).ok();
            }
        }
        Ok(())
    }

    fn emit_call(&mut self, fun: &IRVar, args: &[IRVar], dest: &IRVar, loc: crate::loc::Loc) -> Result<(), CompileError> {
        if args.len() > MAX_CALL_ARGS {
            return Err(CompileError::semantic(
                loc,
                format!("call to \"{fun}\" has {} arguments, at most {MAX_CALL_ARGS} are supported", args.len()),
            ));
        }
        for (arg, reg) in args.iter().zip(ARG_REGISTERS) {
            let slot = self.slot_str(arg);
            writeln!(self.out, "    movq {slot}, {reg}").ok();
        }
        writeln!(self.out, "    call {}", mangle_fn(&fun.0)).ok();
        let dst = self.slot_str(dest);
        writeln!(self.out, "    movq %rax, {dst}").ok();
        Ok(())
    }

    fn emit_intrinsic(&mut self, op: &str, args: &[IRVar], dest: &IRVar) -> Result<(), CompileError> {
        let lhs = self.slot_str(&args[0]);
        match op {
            "+" | "-" | "*" => {
                let rhs = self.slot_str(&args[1]);
                let mnemonic = match op {
                    "+" => "addq",
                    "-" => "subq",
                    "*" => "imulq",
                    _ => unreachable!(),
                };
                writeln!(self.out, "    movq {lhs}, %rax").ok();
                writeln!(self.out, "    {mnemonic} {rhs}, %rax").ok();
            }
            "/" | "%" => {
                let rhs = self.slot_str(&args[1]);
                writeln!(self.out, "    movq {lhs}, %rax").ok();
                writeln!(self.out, "    cqto").ok();
                writeln!(self.out, "    movq {rhs}, %rcx").ok();
                writeln!(self.out, "    idivq %rcx").ok();
                if op == "%" {
                    writeln!(self.out, "    movq %rdx, %rax").ok();
                }
            }
            "==" | "!=" | "<" | "<=" | ">" | ">=" => {
                let rhs = self.slot_str(&args[1]);
                let setcc = match op {
                    "==" => "sete",
                    "!=" => "setne",
                    "<" => "setl",
                    "<=" => "setle",
                    ">" => "setg",
                    ">=" => "setge",
                    _ => unreachable!(),
                };
                writeln!(self.out, "    movq {lhs}, %rax").ok();
                writeln!(self.out, "    cmpq {rhs}, %rax").ok();
                writeln!(self.out, "    {setcc} %al").ok();
                writeln!(self.out, "    movzbq %al, %rax").ok();
            }
            "unary_-" => {
                writeln!(self.out, "    movq {lhs}, %rax").ok();
                writeln!(self.out, "    negq %rax").ok();
            }
            "unary_not" => {
                writeln!(self.out, "    movq {lhs}, %rax").ok();
                writeln!(self.out, "    xorq $1, %rax").ok();
            }
            other => unreachable!("{other} is not a registered intrinsic"),
        }
        let dst = self.slot_str(dest);
        writeln!(self.out, "    movq %rax, {dst}").ok();
        Ok(())
    }
}

/// Emit full assembly text for a module: runtime `.extern` declarations
/// followed by one function body per [`IrFunction`].
pub fn generate(module: &IrModule) -> Result<String, CompileError> {
    let mut out = String::new();
    writeln!(out, "    .text").ok();
    for runtime_fn in ["print_int", "print_bool", "read_int"] {
        writeln!(out, "    .extern {runtime_fn}").ok();
    }
    for func in module.functions.iter() {
        if !matches!(func.name.as_str(), "main") {
            writeln!(out, "    .globl {}", mangle_fn(&func.name)).ok();
        }
    }
    out.push('\n');

    for func in &module.functions {
        let body = FunctionCodeGen::new(func).generate()?;
        out.push_str(&body);
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irgen::generate as generate_ir;
    use crate::parser::parse;
    use crate::typechecker::check;

    fn assembly(src: &str) -> String {
        let module = parse(src).unwrap();
        check(&module).unwrap();
        let ir = generate_ir(&module).unwrap();
        generate(&ir).unwrap()
    }

    #[test]
    fn emits_prologue_and_epilogue_for_main() {
        let asm = assembly("1 + 2");
        assert!(asm.contains("main:"));
        assert!(asm.contains("pushq %rbp"));
        assert!(asm.contains("retq"));
    }

    #[test]
    fn declares_runtime_externs() {
        let asm = assembly("print_int(1)");
        assert!(asm.contains(".extern print_int"));
        assert!(asm.contains(".extern print_bool"));
        assert!(asm.contains(".extern read_int"));
    }

    #[test]
    fn user_function_gets_mangled_symbol() {
        let asm = assembly("fun sq(x: Int): Int { return x * x } sq(5)");
        assert!(asm.contains("fn_sq:"));
        assert!(asm.contains("call fn_sq"));
    }

    #[test]
    fn division_uses_cqto_and_idivq() {
        let asm = assembly("7 / 2");
        assert!(asm.contains("cqto"));
        assert!(asm.contains("idivq"));
    }

    #[test]
    fn comparison_uses_setcc() {
        let asm = assembly("1 < 2");
        assert!(asm.contains("setl"));
    }

    #[test]
    fn call_with_too_many_arguments_is_rejected() {
        let module = parse(
            "fun f(a: Int, b: Int, c: Int, d: Int, e: Int, g: Int, h: Int): Int { return a } f(1, 2, 3, 4, 5, 6, 7)",
        )
        .unwrap();
        // the parser and type checker don't bound arity; codegen rejects via the call-site check.
        if check(&module).is_err() {
            return;
        }
        let ir = generate_ir(&module);
        assert!(ir.is_err());
    }
}
