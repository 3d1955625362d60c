//! Three-address intermediate representation.
//!
//! The generator produces one instruction list per function (plus a
//! synthetic `main` bucket for the top-level expression); [`IrModule`]
//! preserves their definition order so the `ir` command's textual output
//! and the assembly generator's function-by-function emission see the same
//! sequence. [`IRVar`] is a newtype over a generated temporary/label name
//! so it can't be confused with a plain `String` holding source text.

use crate::loc::Loc;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IRVar(pub String);

impl IRVar {
    pub fn new(name: impl Into<String>) -> Self {
        IRVar(name.into())
    }
}

impl fmt::Display for IRVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Instr {
    LoadIntConst { value: i64, dest: IRVar, loc: Loc },
    LoadBoolConst { value: bool, dest: IRVar, loc: Loc },
    Copy { source: IRVar, dest: IRVar, loc: Loc },
    Call { fun: IRVar, args: Vec<IRVar>, dest: IRVar, loc: Loc },
    Jump { label: IRVar, loc: Loc },
    CondJump { cond: IRVar, then_label: IRVar, else_label: IRVar, loc: Loc },
    Label { name: IRVar, loc: Loc },
    Return { value: Option<IRVar>, loc: Loc },
}

impl Instr {
    pub fn loc(&self) -> Loc {
        match self {
            Instr::LoadIntConst { loc, .. }
            | Instr::LoadBoolConst { loc, .. }
            | Instr::Copy { loc, .. }
            | Instr::Call { loc, .. }
            | Instr::Jump { loc, .. }
            | Instr::CondJump { loc, .. }
            | Instr::Label { loc, .. }
            | Instr::Return { loc, .. } => *loc,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::LoadIntConst { value, dest, .. } => write!(f, "{dest} = LoadIntConst({value})"),
            Instr::LoadBoolConst { value, dest, .. } => write!(f, "{dest} = LoadBoolConst({value})"),
            Instr::Copy { source, dest, .. } => write!(f, "{dest} = Copy({source})"),
            Instr::Call { fun, args, dest, .. } => {
                write!(f, "{dest} = Call({fun}")?;
                for a in args {
                    write!(f, ", {a}")?;
                }
                write!(f, ")")
            }
            Instr::Jump { label, .. } => write!(f, "Jump({label})"),
            Instr::CondJump { cond, then_label, else_label, .. } => {
                write!(f, "CondJump({cond}, {then_label}, {else_label})")
            }
            Instr::Label { name, .. } => write!(f, "Label({name})"),
            Instr::Return { value: Some(v), .. } => write!(f, "Return({v})"),
            Instr::Return { value: None, .. } => write!(f, "Return()"),
        }
    }
}

/// One function's instruction list, named `main` for the lowered top-level
/// expression.
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<IRVar>,
    pub instrs: Vec<Instr>,
}

/// `{function_name: [instruction]}`, with definition order preserved:
/// every user function first, `main` last.
#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn push(&mut self, name: impl Into<String>, params: Vec<IRVar>, instrs: Vec<Instr>) {
        self.functions.push(IrFunction { name: name.into(), params, instrs });
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.functions {
            writeln!(f, "{}:", func.name)?;
            for instr in &func.instrs {
                writeln!(f, "{instr}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_call_with_args() {
        let i = Instr::Call {
            fun: IRVar::new("+"),
            args: vec![IRVar::new("x1"), IRVar::new("x2")],
            dest: IRVar::new("x3"),
            loc: Loc::synthetic(),
        };
        assert_eq!(i.to_string(), "x3 = Call(+, x1, x2)");
    }

    #[test]
    fn module_display_groups_by_function_name() {
        let mut m = IrModule::default();
        m.push(
            "main",
            vec![],
            vec![Instr::LoadIntConst { value: 1, dest: IRVar::new("x1"), loc: Loc::synthetic() }],
        );
        assert_eq!(m.to_string(), "main:\nx1 = LoadIntConst(1)\n");
    }
}
