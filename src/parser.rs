//! Recursive-descent parser.
//!
//! One-token lookahead over the token stream, with a bounded negative peek
//! at the previously-consumed token to decide whether a `;` may be elided
//! (the block/module semicolon rules) and whether a `var` appears in
//! statement position, plus a full operator-precedence ladder.

use crate::ast::{Expr, ExprKind, FunDef, Literal, LoopCtrl, Module, Param, TypeExpr};
use crate::error::CompileError;
use crate::loc::Loc;
use crate::token::{Token, TokenKind};
use crate::tokenizer::tokenize;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn from_source(source: &str) -> Result<Self, CompileError> {
        Ok(Parser::new(tokenize(source)?))
    }

    pub fn parse(&mut self) -> Result<Module, CompileError> {
        self.parse_module()
    }

    // ---- token stream helpers ----------------------------------------

    fn end_loc(&self) -> Loc {
        self.tokens.last().map(|t| t.loc).unwrap_or_else(Loc::synthetic)
    }

    fn peek(&self) -> Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: isize) -> Token {
        let index = self.pos as isize + offset;
        if index >= 0 && (index as usize) < self.tokens.len() {
            self.tokens[index as usize].clone()
        } else {
            Token::end(self.end_loc())
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, expected: &str) -> Result<Token, CompileError> {
        let token = self.peek();
        if token.text != expected {
            return Err(CompileError::syntax(
                token.loc,
                format!("expected \"{expected}\", got \"{}\"", token.text),
            ));
        }
        Ok(self.advance())
    }

    // ---- module & function definitions --------------------------------

    fn parse_module(&mut self) -> Result<Module, CompileError> {
        let mut funcs = Vec::new();
        let mut exprs = Vec::new();

        while !self.at_end() {
            if self.peek().is_text("fun") {
                funcs.push(self.parse_fun_def()?);
                continue;
            }

            exprs.push(self.parse_expr()?);

            if self.peek().is_text(";") {
                self.advance();
            } else if matches!(self.peek_at(-1).text.as_str(), ";" | "}") {
                continue;
            } else if !self.at_end() {
                let tok = self.peek();
                return Err(CompileError::syntax(
                    tok.loc,
                    format!("expected ; between expressions, got {}", tok.text),
                ));
            }
        }

        if exprs.len() == 1 {
            Ok(Module { funcs, expr: Some(exprs.into_iter().next().unwrap()) })
        } else if exprs.is_empty() && !funcs.is_empty() {
            Ok(Module { funcs, expr: None })
        } else if exprs.is_empty() {
            Err(CompileError::syntax(Loc::new(1, 1), "empty input"))
        } else {
            let loc = exprs[0].loc;
            Ok(Module { funcs, expr: Some(Expr::new(ExprKind::Block(Some(exprs)), loc)) })
        }
    }

    fn parse_fun_def(&mut self) -> Result<FunDef, CompileError> {
        let loc = self.consume("fun")?.loc;
        let name = self.parse_ident_text()?;
        self.consume("(")?;

        let mut params = Vec::new();
        while !self.peek().is_text(")") {
            if !params.is_empty() {
                self.consume(",")?;
            }
            let pname = self.parse_ident_text()?;
            self.consume(":")?;
            let type_name = self.parse_ident_text()?;
            params.push(Param { name: pname, type_name });
        }
        self.consume(")")?;
        self.consume(":")?;
        let return_type = self.parse_ident_text()?;
        let body = self.parse_block()?;

        Ok(FunDef { name, params, return_type, body, loc })
    }

    // ---- precedence ladder ---------------------------------------------

    /// Top-level "an expression" entry point, used everywhere an `expr`
    /// nonterminal appears in the grammar (statements, call arguments, `if`
    /// branches, loop bodies, `var` values).
    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_or()?;
        self.parse_assign_tail(left)
    }

    fn parse_assign_tail(&mut self, left: Expr) -> Result<Expr, CompileError> {
        if self.peek().is_text("=") {
            self.advance();
            let right = self.parse_expr()?;
            let loc = left.loc;
            Ok(Expr::new(
                ExprKind::Binary { left: Box::new(left), op: "=".to_string(), right: Box::new(right) },
                loc,
            ))
        } else {
            Ok(left)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while self.peek().is_text("or") {
            self.advance();
            let right = self.parse_and()?;
            let loc = left.loc;
            left = Expr::new(
                ExprKind::Binary { left: Box::new(left), op: "or".to_string(), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_eq()?;
        while self.peek().is_text("and") {
            self.advance();
            let right = self.parse_eq()?;
            let loc = left.loc;
            left = Expr::new(
                ExprKind::Binary { left: Box::new(left), op: "and".to_string(), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_eq(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_cmp()?;
        while matches!(self.peek().text.as_str(), "==" | "!=") {
            let op = self.advance();
            let right = self.parse_cmp()?;
            left = Expr::new(
                ExprKind::Binary { left: Box::new(left), op: op.text, right: Box::new(right) },
                op.loc,
            );
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_add()?;
        while matches!(self.peek().text.as_str(), "<" | "<=" | ">" | ">=") {
            let op = self.advance();
            let right = self.parse_add()?;
            left = Expr::new(
                ExprKind::Binary { left: Box::new(left), op: op.text, right: Box::new(right) },
                op.loc,
            );
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_mul()?;
        while matches!(self.peek().text.as_str(), "+" | "-") {
            let op = self.advance();
            let right = self.parse_mul()?;
            left = Expr::new(
                ExprKind::Binary { left: Box::new(left), op: op.text, right: Box::new(right) },
                op.loc,
            );
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek().text.as_str(), "*" | "/" | "%") {
            let op = self.advance();
            let right = self.parse_unary()?;
            left = Expr::new(
                ExprKind::Binary { left: Box::new(left), op: op.text, right: Box::new(right) },
                op.loc,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        if matches!(self.peek().text.as_str(), "-" | "not") {
            let op = self.advance();
            let right = self.parse_unary()?;
            Ok(Expr::new(ExprKind::Unary { op: op.text, right: Box::new(right) }, op.loc))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let tok = self.peek();
        match tok.text.as_str() {
            "var" => self.parse_variable_dec(),
            "(" => self.parse_parenthesized(),
            "if" => self.parse_if(),
            "while" => self.parse_while(),
            "true" | "false" => self.parse_bool_literal(),
            "break" => {
                self.advance();
                Ok(Expr::new(ExprKind::BreakContinue(LoopCtrl::Break), tok.loc))
            }
            "continue" => {
                self.advance();
                Ok(Expr::new(ExprKind::BreakContinue(LoopCtrl::Continue), tok.loc))
            }
            "{" => self.parse_block(),
            _ if tok.kind == TokenKind::IntLiteral => self.parse_int_literal(),
            _ if tok.kind == TokenKind::Identifier => {
                let name = self.parse_ident_text()?;
                if self.peek().is_text("(") {
                    self.parse_call(name, tok.loc)
                } else {
                    Ok(Expr::new(ExprKind::Identifier(name), tok.loc))
                }
            }
            _ => Err(CompileError::syntax(tok.loc, format!("unknown syntax at {}", tok.loc))),
        }
    }

    fn parse_variable_dec(&mut self) -> Result<Expr, CompileError> {
        let tok = self.peek();
        let prev_is_block_start = self.pos > 0 && matches!(self.tokens[self.pos - 1].text.as_str(), "{" | ";");
        if tok.loc.column != 1 && !prev_is_block_start {
            return Err(CompileError::semantic(tok.loc, "variable declaration must be top-level"));
        }

        self.consume("var")?;
        let name = self.parse_ident_text()?;
        let declared_type = if self.peek().is_text(":") {
            self.advance();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        self.consume("=")?;
        let value = self.parse_expr()?;
        Ok(Expr::new(
            ExprKind::VariableDec { name, value: Box::new(value), declared_type },
            tok.loc,
        ))
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, CompileError> {
        if self.peek().is_text("(") {
            self.advance();
            let mut params = Vec::new();
            loop {
                params.push(self.parse_type_expr()?);
                if self.peek().is_text(",") {
                    self.advance();
                } else {
                    break;
                }
            }
            self.consume(")")?;
            self.consume("=>")?;
            let ret = self.parse_type_expr()?;
            Ok(TypeExpr::Fun(params, Box::new(ret)))
        } else {
            let tok = self.advance();
            Ok(TypeExpr::Basic(tok.text))
        }
    }

    fn parse_if(&mut self) -> Result<Expr, CompileError> {
        let loc = self.consume("if")?.loc;
        let cond = self.parse_expr()?;
        self.consume("then")?;
        let then_branch = self.parse_expr()?;
        let else_branch = if self.peek().is_text("else") {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch },
            loc,
        ))
    }

    fn parse_while(&mut self) -> Result<Expr, CompileError> {
        let loc = self.consume("while")?.loc;
        let cond = self.parse_expr()?;
        self.consume("do")?;
        let body = self.parse_expr()?;
        Ok(Expr::new(ExprKind::While { cond: Box::new(cond), body: Box::new(body) }, loc))
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, CompileError> {
        self.consume("(")?;
        let expr = self.parse_expr()?;
        self.consume(")")?;
        Ok(expr)
    }

    fn parse_bool_literal(&mut self) -> Result<Expr, CompileError> {
        let tok = self.advance();
        let value = tok.text == "true";
        Ok(Expr::new(ExprKind::Literal(Literal::Bool(value)), tok.loc))
    }

    fn parse_int_literal(&mut self) -> Result<Expr, CompileError> {
        let tok = self.advance();
        let value: i64 = tok
            .text
            .parse()
            .map_err(|_| CompileError::syntax(tok.loc, format!("invalid integer literal \"{}\"", tok.text)))?;
        Ok(Expr::new(ExprKind::Literal(Literal::Int(value)), tok.loc))
    }

    fn parse_return(&mut self) -> Result<Expr, CompileError> {
        let loc = self.consume("return")?.loc;
        let value = if self.peek().is_text("}") { None } else { Some(Box::new(self.parse_expr()?)) };
        if !self.peek().is_text("}") {
            return Err(CompileError::semantic(self.peek().loc, "return must be the last statement in a block"));
        }
        Ok(Expr::new(ExprKind::Return(value), loc))
    }

    fn parse_ident_text(&mut self) -> Result<String, CompileError> {
        let tok = self.peek();
        if tok.kind != TokenKind::Identifier {
            return Err(CompileError::syntax(tok.loc, format!("expected identifier, got \"{}\"", tok.text)));
        }
        self.advance();
        Ok(tok.text)
    }

    fn parse_call(&mut self, callee: String, loc: Loc) -> Result<Expr, CompileError> {
        self.consume("(")?;
        let mut args = Vec::new();
        while !self.peek().is_text(")") {
            if !args.is_empty() {
                self.consume(",")?;
            }
            args.push(self.parse_expr()?);
        }
        self.consume(")")?;
        Ok(Expr::new(ExprKind::Call { callee, args }, loc))
    }

    fn parse_block(&mut self) -> Result<Expr, CompileError> {
        let loc = self.consume("{")?.loc;
        let mut exprs: Vec<Expr> = Vec::new();
        let mut trailing_semicolon = false;

        while !self.peek().is_text("}") {
            if self.at_end() {
                return Err(CompileError::syntax(self.peek().loc, "unclosed block"));
            }

            if self.peek().is_text("return") {
                exprs.push(self.parse_return()?);
                trailing_semicolon = false;
                continue;
            }

            let expr = self.parse_expr()?;
            let is_block = matches!(expr.kind, ExprKind::Block(_));
            exprs.push(expr);
            trailing_semicolon = false;

            if self.peek().is_text("}") {
                break;
            }

            let prev_ends_block = self.tokens[self.pos - 1].text == "}";
            if is_block || prev_ends_block {
                if self.peek().is_text(";") {
                    self.advance();
                    trailing_semicolon = true;
                }
            } else {
                self.consume(";")?;
                trailing_semicolon = true;
            }
        }
        self.consume("}")?;

        if exprs.is_empty() {
            return Ok(Expr::new(ExprKind::Block(None), loc));
        }

        if trailing_semicolon {
            exprs.push(Expr::new(ExprKind::Literal(Literal::Unit), loc));
        }

        Ok(Expr::new(ExprKind::Block(Some(exprs)), loc))
    }
}

pub fn parse(source: &str) -> Result<Module, CompileError> {
    Parser::from_source(source)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(src: &str) -> Module {
        parse(src).unwrap_or_else(|e| panic!("parse error: {e}"))
    }

    #[test]
    fn parses_single_top_level_expression() {
        let m = module("1 + 2 * 3");
        assert!(m.funcs.is_empty());
        assert!(matches!(m.expr.unwrap().kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let m = module("var x = 1; var y = 1; x = y = 2");
        let ExprKind::Block(Some(exprs)) = m.expr.unwrap().kind else { panic!("expected block") };
        let last = &exprs[2];
        match &last.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, "=");
                assert!(matches!(right.kind, ExprKind::Binary { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn empty_block_has_no_expressions() {
        let e = Parser::from_source("{}").unwrap().parse_block_for_test();
        assert!(matches!(e.unwrap().kind, ExprKind::Block(None)));
    }

    #[test]
    fn trailing_semicolon_makes_block_unit() {
        let e = Parser::from_source("{ 1; }").unwrap().parse_block_for_test().unwrap();
        let ExprKind::Block(Some(exprs)) = e.kind else { panic!("expected block") };
        assert_eq!(exprs.len(), 2);
        assert!(matches!(exprs[1].kind, ExprKind::Literal(Literal::Unit)));
    }

    #[test]
    fn var_declaration_outside_statement_position_is_rejected() {
        let err = parse("1 + var x = 2").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn function_definition_parses_params_and_body() {
        let m = module("fun sq(x: Int): Int { return x * x }");
        assert_eq!(m.funcs.len(), 1);
        assert_eq!(m.funcs[0].params.len(), 1);
        assert_eq!(m.funcs[0].params[0].name, "x");
        assert_eq!(m.funcs[0].return_type, "Int");
    }

    #[test]
    fn double_semicolon_is_a_syntax_error() {
        let err = parse("{ 1;; }").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn if_without_else_has_no_else_branch() {
        let m = module("if true then 1");
        match m.expr.unwrap().kind {
            ExprKind::If { else_branch, .. } => assert!(else_branch.is_none()),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn function_call_parses_arguments() {
        let m = module("f(1, 2 + 3)");
        match m.expr.unwrap().kind {
            ExprKind::Call { callee, args } => {
                assert_eq!(callee, "f");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }
}

#[cfg(test)]
impl Parser {
    fn parse_block_for_test(&mut self) -> Result<Expr, CompileError> {
        self.parse_block()
    }
}
