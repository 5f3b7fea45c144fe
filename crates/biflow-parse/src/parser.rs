use crate::lexer::Lexer;
use crate::token::{Tok, TokKind};
use anyhow::{bail, Result};
use biflow_ast::ast::{
    BoolOperator, CmpOp, Expr, FnDef, Ident, Lit, Module, Operator, Stmt, UnaryOperator,
};
use biflow_ast::span::Span;

/// Bound on syntactic nesting (blocks plus expressions) to keep recursion off
/// the end of the stack.
pub const MAX_NESTING_DEPTH: u32 = 100;

// Binding powers (lbp, rbp). Prefix `not` and unary minus use NOT_BP / UNARY_BP.
const NOT_BP: u8 = 5;
const CMP_BP: (u8, u8) = (7, 8);
const UNARY_BP: u8 = 21;
/// Above comparisons, so `for x in ...` stops at `in`.
const TARGET_BP: u8 = 9;

pub fn parse_str(file: &str, src: &str) -> Result<Module> {
    let mut p = Parser::new(file, src);
    p.parse_module()
}

struct Parser<'a> {
    file: &'a str,
    lex: Lexer<'a>,
    cur: Tok,
    nxt: Tok,
    last_end: u32,
    depth: u32,
}

fn unsupported(construct: &str, span: Span) -> Expr {
    Expr::Unsupported {
        construct: construct.to_string(),
        span,
    }
}

impl<'a> Parser<'a> {
    fn new(file: &'a str, src: &'a str) -> Self {
        let mut lex = Lexer::new(src);
        let cur = lex.next_tok();
        let nxt = lex.next_tok();
        Self {
            file,
            lex,
            cur,
            nxt,
            last_end: 0,
            depth: 0,
        }
    }

    fn bump(&mut self) {
        self.last_end = self.cur.span.end;
        self.cur = std::mem::replace(&mut self.nxt, self.lex.next_tok());
    }

    fn at(&self, k: &TokKind) -> bool {
        std::mem::discriminant(&self.cur.kind) == std::mem::discriminant(k)
    }

    fn fail<T>(&self, msg: impl std::fmt::Display) -> Result<T> {
        bail!(
            "{}:{}:{}: {}",
            self.file,
            self.cur.span.line,
            self.cur.span.col,
            msg
        )
    }

    fn unexpected<T>(&self, what: &str) -> Result<T> {
        match &self.cur.kind {
            TokKind::Error(msg) => self.fail(msg),
            TokKind::Indent => self.fail("unexpected indent"),
            other => self.fail(format!("expected {}, found {:?}", what, other)),
        }
    }

    fn expect(&mut self, k: TokKind) -> Result<Tok> {
        if self.at(&k) {
            let t = self.cur.clone();
            self.bump();
            Ok(t)
        } else {
            self.unexpected(&format!("{:?}", k))
        }
    }

    /// Span from `start` through the last consumed token.
    fn finish(&self, start: Span) -> Span {
        Span {
            end: self.last_end.max(start.end),
            ..start
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return self.fail(format!(
                "nesting depth exceeds maximum of {}",
                MAX_NESTING_DEPTH
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn at_stmt_end(&self) -> bool {
        matches!(
            self.cur.kind,
            TokKind::Newline | TokKind::Semicolon | TokKind::Eof
        )
    }

    // ======= module / blocks =======

    fn parse_module(&mut self) -> Result<Module> {
        let mut body = Vec::new();
        loop {
            while matches!(self.cur.kind, TokKind::Newline) {
                self.bump();
            }
            if matches!(self.cur.kind, TokKind::Eof) {
                break;
            }
            self.parse_stmt(&mut body)?;
        }
        Ok(Module {
            body,
            span: Span::new(0, self.cur.span.end, 1, 0),
        })
    }

    /// Body after a `:`; either an indented suite or simple statements on the
    /// same line.
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.enter()?;
        let mut out = Vec::new();
        if matches!(self.cur.kind, TokKind::Newline) {
            self.bump();
            if !matches!(self.cur.kind, TokKind::Indent) {
                return self.fail("expected an indented block");
            }
            self.bump();
            while !matches!(self.cur.kind, TokKind::Dedent | TokKind::Eof) {
                if matches!(self.cur.kind, TokKind::Newline) {
                    self.bump();
                    continue;
                }
                self.parse_stmt(&mut out)?;
            }
            if matches!(self.cur.kind, TokKind::Dedent) {
                self.bump();
            }
        } else {
            self.parse_simple_line(&mut out)?;
        }
        self.leave();
        Ok(out)
    }

    fn parse_stmt(&mut self, out: &mut Vec<Stmt>) -> Result<()> {
        match self.cur.kind {
            TokKind::KwIf => out.push(self.parse_if()?),
            TokKind::KwWhile => out.push(self.parse_while()?),
            TokKind::KwFor => out.push(self.parse_for()?),
            TokKind::KwDef => out.push(self.parse_def()?),
            TokKind::At => out.push(self.parse_decorated()?),
            TokKind::KwOther(kw @ ("class" | "try" | "with" | "async")) => {
                out.push(self.skip_compound(kw)?)
            }
            TokKind::Indent => return self.fail("unexpected indent"),
            TokKind::Error(ref msg) => return self.fail(msg),
            _ => self.parse_simple_line(out)?,
        }
        Ok(())
    }

    fn parse_simple_line(&mut self, out: &mut Vec<Stmt>) -> Result<()> {
        loop {
            out.push(self.parse_simple_stmt()?);
            if matches!(self.cur.kind, TokKind::Semicolon) {
                self.bump();
                if matches!(self.cur.kind, TokKind::Newline | TokKind::Eof) {
                    break;
                }
                continue;
            }
            break;
        }
        if matches!(self.cur.kind, TokKind::Eof) {
            return Ok(());
        }
        self.expect(TokKind::Newline)?;
        Ok(())
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt> {
        let start = self.cur.span;
        match self.cur.kind {
            TokKind::KwReturn => {
                self.bump();
                let value = if self.at_stmt_end() {
                    None
                } else {
                    Some(self.parse_expr_list()?)
                };
                Ok(Stmt::Return {
                    value,
                    span: self.finish(start),
                })
            }
            TokKind::KwPass => {
                self.bump();
                Ok(Stmt::Pass(start))
            }
            TokKind::KwBreak => {
                self.bump();
                Ok(Stmt::Break(start))
            }
            TokKind::KwContinue => {
                self.bump();
                Ok(Stmt::Continue(start))
            }
            TokKind::KwOther(kw) => {
                let construct = match kw {
                    "del" => "Delete",
                    "global" => "Global",
                    "nonlocal" => "Nonlocal",
                    "assert" => "Assert",
                    "raise" => "Raise",
                    "import" => "Import",
                    "from" => "ImportFrom",
                    _ => return self.fail(format!("unexpected keyword '{}'", kw)),
                };
                self.skip_to_stmt_end();
                Ok(Stmt::Unsupported {
                    construct: construct.to_string(),
                    span: self.finish(start),
                })
            }
            _ => self.parse_expr_or_assign(start),
        }
    }

    fn parse_expr_or_assign(&mut self, start: Span) -> Result<Stmt> {
        let first = self.parse_expr_list()?;
        match self.cur.kind {
            TokKind::Eq => {
                let mut targets = vec![first];
                loop {
                    self.bump();
                    let e = self.parse_expr_list()?;
                    if matches!(self.cur.kind, TokKind::Eq) {
                        targets.push(e);
                    } else {
                        return Ok(Stmt::Assign {
                            targets,
                            value: e,
                            span: self.finish(start),
                        });
                    }
                }
            }
            TokKind::PlusEq
            | TokKind::MinusEq
            | TokKind::StarEq
            | TokKind::SlashEq
            | TokKind::SlashSlashEq
            | TokKind::PercentEq
            | TokKind::StarStarEq => {
                let op = match self.cur.kind {
                    TokKind::PlusEq => Operator::Add,
                    TokKind::MinusEq => Operator::Sub,
                    TokKind::StarEq => Operator::Mult,
                    TokKind::SlashEq => Operator::Div,
                    TokKind::SlashSlashEq => Operator::FloorDiv,
                    TokKind::PercentEq => Operator::Mod,
                    _ => Operator::Pow,
                };
                self.bump();
                let value = self.parse_expr_list()?;
                Ok(Stmt::AugAssign {
                    target: first,
                    op,
                    value,
                    span: self.finish(start),
                })
            }
            TokKind::OtherAssign(op) => {
                let construct = match op {
                    ":=" => "NamedExpr",
                    "&=" => "BitAnd",
                    "|=" => "BitOr",
                    "^=" => "BitXor",
                    "<<=" => "LShift",
                    ">>=" => "RShift",
                    _ => "MatMult",
                };
                self.skip_to_stmt_end();
                Ok(Stmt::Unsupported {
                    construct: construct.to_string(),
                    span: self.finish(start),
                })
            }
            TokKind::Colon => {
                self.skip_to_stmt_end();
                Ok(Stmt::Unsupported {
                    construct: "AnnAssign".to_string(),
                    span: self.finish(start),
                })
            }
            _ => Ok(Stmt::Expr {
                expr: first,
                span: self.finish(start),
            }),
        }
    }

    fn skip_to_stmt_end(&mut self) {
        let mut brackets = 0u32;
        loop {
            match self.cur.kind {
                TokKind::Eof => break,
                TokKind::Newline | TokKind::Semicolon if brackets == 0 => break,
                TokKind::LParen | TokKind::LBracket | TokKind::LBrace => brackets += 1,
                TokKind::RParen | TokKind::RBracket | TokKind::RBrace => {
                    brackets = brackets.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Consume a header up to and including its `:` outside brackets.
    fn skip_header(&mut self) -> Result<()> {
        let mut brackets = 0u32;
        loop {
            match self.cur.kind {
                TokKind::Eof | TokKind::Newline => return self.unexpected("':'"),
                TokKind::Colon if brackets == 0 => {
                    self.bump();
                    return Ok(());
                }
                TokKind::LParen | TokKind::LBracket | TokKind::LBrace => brackets += 1,
                TokKind::RParen | TokKind::RBracket | TokKind::RBrace => {
                    brackets = brackets.saturating_sub(1)
                }
                TokKind::Error(ref msg) => return self.fail(msg),
                _ => {}
            }
            self.bump();
        }
    }

    fn skip_compound(&mut self, kw: &str) -> Result<Stmt> {
        let start = self.cur.span;
        let construct = match kw {
            "class" => "ClassDef",
            "try" => "Try",
            "with" => "With",
            _ => match self.nxt.kind {
                TokKind::KwDef => "AsyncFunctionDef",
                TokKind::KwFor => "AsyncFor",
                _ => "AsyncWith",
            },
        };
        self.skip_header()?;
        self.parse_block()?;
        if kw == "try" {
            while matches!(
                self.cur.kind,
                TokKind::KwOther("except" | "finally") | TokKind::KwElse
            ) {
                self.skip_header()?;
                self.parse_block()?;
            }
        }
        Ok(Stmt::Unsupported {
            construct: construct.to_string(),
            span: self.finish(start),
        })
    }

    fn parse_decorated(&mut self) -> Result<Stmt> {
        let start = self.cur.span;
        while matches!(self.cur.kind, TokKind::At) {
            self.bump();
            self.parse_expr()?;
            self.expect(TokKind::Newline)?;
        }
        let mut inner = Vec::new();
        self.parse_stmt(&mut inner)?;
        Ok(Stmt::Unsupported {
            construct: "decorators".to_string(),
            span: self.finish(start),
        })
    }

    // ======= compound statements =======

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.cur.span;
        self.bump(); // `if` or `elif`
        let test = self.parse_expr()?;
        self.expect(TokKind::Colon)?;
        let body = self.parse_block()?;
        let orelse = match self.cur.kind {
            TokKind::KwElif => vec![self.parse_if()?],
            TokKind::KwElse => {
                self.bump();
                self.expect(TokKind::Colon)?;
                self.parse_block()?
            }
            _ => Vec::new(),
        };
        Ok(Stmt::If {
            test,
            body,
            orelse,
            span: self.finish(start),
        })
    }

    /// Trailing `else:` on a loop; parsed so the rest of the file still reads.
    fn parse_loop_else(&mut self) -> Result<bool> {
        if !matches!(self.cur.kind, TokKind::KwElse) {
            return Ok(false);
        }
        self.bump();
        self.expect(TokKind::Colon)?;
        self.parse_block()?;
        Ok(true)
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let start = self.cur.span;
        self.expect(TokKind::KwWhile)?;
        let test = self.parse_expr()?;
        self.expect(TokKind::Colon)?;
        let body = self.parse_block()?;
        if self.parse_loop_else()? {
            return Ok(Stmt::Unsupported {
                construct: "while-else".to_string(),
                span: self.finish(start),
            });
        }
        Ok(Stmt::While {
            test,
            body,
            span: self.finish(start),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.cur.span;
        self.expect(TokKind::KwFor)?;
        let target = self.parse_target_list()?;
        self.expect(TokKind::KwIn)?;
        let iter = self.parse_expr_list()?;
        self.expect(TokKind::Colon)?;
        let body = self.parse_block()?;
        if self.parse_loop_else()? {
            return Ok(Stmt::Unsupported {
                construct: "for-else".to_string(),
                span: self.finish(start),
            });
        }
        Ok(Stmt::For {
            target,
            iter,
            body,
            span: self.finish(start),
        })
    }

    fn parse_target_list(&mut self) -> Result<Expr> {
        let first = self.parse_expr_bp(TARGET_BP)?;
        if !matches!(self.cur.kind, TokKind::Comma) {
            return Ok(first);
        }
        let start = first.span();
        while matches!(self.cur.kind, TokKind::Comma) {
            self.bump();
            if matches!(self.cur.kind, TokKind::KwIn) {
                break;
            }
            self.parse_expr_bp(TARGET_BP)?;
        }
        Ok(unsupported("Tuple", self.finish(start)))
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        match &self.cur.kind {
            TokKind::Ident(s) => {
                let id = Ident {
                    text: s.clone(),
                    span: self.cur.span,
                };
                self.bump();
                Ok(id)
            }
            _ => self.unexpected("identifier"),
        }
    }

    fn parse_def(&mut self) -> Result<Stmt> {
        let start = self.cur.span;
        self.expect(TokKind::KwDef)?;
        let name = self.parse_ident()?;
        self.expect(TokKind::LParen)?;

        let mut params = Vec::new();
        let mut rejected: Option<&'static str> = None;
        while !matches!(self.cur.kind, TokKind::RParen) {
            match self.cur.kind {
                TokKind::Star | TokKind::StarStar | TokKind::Slash => {
                    self.bump();
                    if matches!(self.cur.kind, TokKind::Ident(_)) {
                        self.bump();
                    }
                    rejected.get_or_insert("variadic parameters");
                }
                _ => {
                    params.push(self.parse_ident()?);
                }
            }
            // annotations carry no typing information here
            if matches!(self.cur.kind, TokKind::Colon) {
                self.bump();
                self.parse_expr()?;
            }
            if matches!(self.cur.kind, TokKind::Eq) {
                self.bump();
                self.parse_expr()?;
                rejected.get_or_insert("default parameters");
            }
            if matches!(self.cur.kind, TokKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokKind::RParen)?;
        if matches!(self.cur.kind, TokKind::Arrow) {
            self.bump();
            self.parse_expr()?;
        }
        self.expect(TokKind::Colon)?;
        let body = self.parse_block()?;

        if let Some(construct) = rejected {
            return Ok(Stmt::Unsupported {
                construct: construct.to_string(),
                span: self.finish(start),
            });
        }
        Ok(Stmt::FunctionDef(FnDef {
            name,
            params,
            body,
            span: self.finish(start),
        }))
    }

    // ======= expressions =======

    /// Expression, or a bare tuple `a, b`.
    fn parse_expr_list(&mut self) -> Result<Expr> {
        let first = self.parse_expr()?;
        if !matches!(self.cur.kind, TokKind::Comma) {
            return Ok(first);
        }
        let start = first.span();
        while matches!(self.cur.kind, TokKind::Comma) {
            self.bump();
            if self.at_stmt_end()
                || matches!(
                    self.cur.kind,
                    TokKind::Eq | TokKind::RParen | TokKind::Colon
                )
            {
                break;
            }
            self.parse_expr()?;
        }
        Ok(unsupported("Tuple", self.finish(start)))
    }

    /// Full expression, including lambdas and conditional expressions.
    fn parse_expr(&mut self) -> Result<Expr> {
        if matches!(self.cur.kind, TokKind::KwLambda) {
            return self.parse_lambda();
        }
        let e = self.parse_expr_bp(0)?;
        if matches!(self.cur.kind, TokKind::KwIf) {
            let start = e.span();
            self.bump();
            self.parse_expr_bp(0)?;
            self.expect(TokKind::KwElse)?;
            self.parse_expr()?;
            return Ok(unsupported("IfExp", self.finish(start)));
        }
        Ok(e)
    }

    fn parse_lambda(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        self.bump();
        self.skip_header()?;
        self.parse_expr()?;
        Ok(unsupported("Lambda", self.finish(start)))
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        self.enter()?;
        let mut lhs = self.parse_prefix(min_bp)?;

        loop {
            if let Some(cmp) = self.comparison_op() {
                if CMP_BP.0 < min_bp {
                    break;
                }
                lhs = self.parse_comparison(lhs, cmp)?;
                continue;
            }

            let (lbp, rbp) = match self.cur.kind {
                TokKind::KwOr => (1, 2),
                TokKind::KwAnd => (3, 4),
                TokKind::Pipe => (9, 10),
                TokKind::Caret => (11, 12),
                TokKind::Amp => (13, 14),
                TokKind::Shl | TokKind::Shr => (15, 16),
                TokKind::Plus | TokKind::Minus => (17, 18),
                TokKind::Star
                | TokKind::Slash
                | TokKind::SlashSlash
                | TokKind::Percent
                | TokKind::At => (19, 20),
                TokKind::StarStar => (24, 23),
                _ => break,
            };
            if lbp < min_bp {
                break;
            }

            let start = lhs.span();
            match self.cur.kind {
                TokKind::KwOr | TokKind::KwAnd => {
                    let op = if matches!(self.cur.kind, TokKind::KwOr) {
                        BoolOperator::Or
                    } else {
                        BoolOperator::And
                    };
                    let mut values = vec![lhs];
                    while self.at(&op_token(op)) {
                        self.bump();
                        values.push(self.parse_expr_bp(rbp)?);
                    }
                    lhs = Expr::BoolOp {
                        op,
                        values,
                        span: self.finish(start),
                    };
                }
                TokKind::Pipe
                | TokKind::Caret
                | TokKind::Amp
                | TokKind::Shl
                | TokKind::Shr
                | TokKind::At => {
                    let construct = match self.cur.kind {
                        TokKind::Pipe => "BitOr",
                        TokKind::Caret => "BitXor",
                        TokKind::Amp => "BitAnd",
                        TokKind::Shl => "LShift",
                        TokKind::Shr => "RShift",
                        _ => "MatMult",
                    };
                    self.bump();
                    self.parse_expr_bp(rbp)?;
                    lhs = unsupported(construct, self.finish(start));
                }
                _ => {
                    let op = match self.cur.kind {
                        TokKind::Plus => Operator::Add,
                        TokKind::Minus => Operator::Sub,
                        TokKind::Star => Operator::Mult,
                        TokKind::Slash => Operator::Div,
                        TokKind::SlashSlash => Operator::FloorDiv,
                        TokKind::Percent => Operator::Mod,
                        _ => Operator::Pow,
                    };
                    self.bump();
                    let rhs = self.parse_expr_bp(rbp)?;
                    lhs = Expr::BinOp {
                        left: Box::new(lhs),
                        op,
                        right: Box::new(rhs),
                        span: self.finish(start),
                    };
                }
            }
        }

        self.leave();
        Ok(lhs)
    }

    /// Comparison operator at the cursor. `Err` carries the name of a
    /// membership/identity test, which is not typed.
    fn comparison_op(&self) -> Option<Result<CmpOp, &'static str>> {
        let op = match self.cur.kind {
            TokKind::EqEq => Ok(CmpOp::Eq),
            TokKind::NotEq => Ok(CmpOp::NotEq),
            TokKind::Lt => Ok(CmpOp::Lt),
            TokKind::Le => Ok(CmpOp::LtE),
            TokKind::Gt => Ok(CmpOp::Gt),
            TokKind::Ge => Ok(CmpOp::GtE),
            TokKind::KwIn => Err("In"),
            TokKind::KwIs => Err("Is"),
            TokKind::KwNot if matches!(self.nxt.kind, TokKind::KwIn) => Err("NotIn"),
            _ => return None,
        };
        Some(op)
    }

    fn parse_comparison(
        &mut self,
        left: Expr,
        first: Result<CmpOp, &'static str>,
    ) -> Result<Expr> {
        let start = left.span();
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        let mut rejected = None;
        let mut next = Some(first);
        while let Some(op) = next {
            match op {
                Ok(op) => ops.push(op),
                Err(name) => {
                    rejected.get_or_insert(name);
                }
            }
            let was_not = matches!(self.cur.kind, TokKind::KwNot);
            let was_is = matches!(self.cur.kind, TokKind::KwIs);
            self.bump();
            if was_not {
                self.bump(); // `in`
            }
            if was_is && matches!(self.cur.kind, TokKind::KwNot) {
                self.bump();
                rejected = Some("IsNot");
            }
            comparators.push(self.parse_expr_bp(CMP_BP.1)?);
            next = self.comparison_op();
        }
        if let Some(name) = rejected {
            return Ok(unsupported(name, self.finish(start)));
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
            span: self.finish(start),
        })
    }

    fn parse_prefix(&mut self, min_bp: u8) -> Result<Expr> {
        let start = self.cur.span;
        match self.cur.kind {
            TokKind::Minus => {
                self.bump();
                let operand = self.parse_expr_bp(UNARY_BP)?;
                let span = self.finish(start);
                Ok(match operand {
                    Expr::Constant(Lit::Int(v), _) if v.checked_neg().is_some() => {
                        Expr::Constant(Lit::Int(-v), span)
                    }
                    Expr::Constant(Lit::Float(v), _) => Expr::Constant(Lit::Float(-v), span),
                    Expr::Constant(Lit::Complex(v), _) => {
                        Expr::Constant(Lit::Complex(-v), span)
                    }
                    operand => Expr::UnaryOp {
                        op: UnaryOperator::Neg,
                        operand: Box::new(operand),
                        span,
                    },
                })
            }
            TokKind::KwNot => {
                // `not` binds looser than comparisons and arithmetic
                if min_bp > NOT_BP {
                    return self.fail("invalid syntax: `not` must be parenthesized here");
                }
                self.bump();
                let operand = self.parse_expr_bp(NOT_BP)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(operand),
                    span: self.finish(start),
                })
            }
            TokKind::Plus | TokKind::Tilde => {
                let construct = if matches!(self.cur.kind, TokKind::Plus) {
                    "UAdd"
                } else {
                    "Invert"
                };
                self.bump();
                self.parse_expr_bp(UNARY_BP)?;
                Ok(unsupported(construct, self.finish(start)))
            }
            TokKind::Star => {
                self.bump();
                self.parse_expr_bp(CMP_BP.1)?;
                Ok(unsupported("Starred", self.finish(start)))
            }
            TokKind::KwLambda => self.parse_lambda(),
            TokKind::KwAwait => {
                self.bump();
                self.parse_expr_bp(UNARY_BP)?;
                Ok(unsupported("Await", self.finish(start)))
            }
            TokKind::KwYield => {
                self.bump();
                let construct = if matches!(self.cur.kind, TokKind::KwOther("from")) {
                    self.bump();
                    "YieldFrom"
                } else {
                    "Yield"
                };
                if !self.at_stmt_end() && !matches!(self.cur.kind, TokKind::RParen) {
                    self.parse_expr_list()?;
                }
                Ok(unsupported(construct, self.finish(start)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let mut e = self.parse_atom()?;
        loop {
            let start = e.span();
            match self.cur.kind {
                TokKind::LParen => {
                    self.bump();
                    let args = self.parse_call_args()?;
                    self.expect(TokKind::RParen)?;
                    e = Expr::Call {
                        func: Box::new(e),
                        args,
                        span: self.finish(start),
                    };
                }
                TokKind::Dot => {
                    self.bump();
                    let attr = self.parse_ident()?;
                    e = Expr::Attribute {
                        value: Box::new(e),
                        attr,
                        span: self.finish(start),
                    };
                }
                TokKind::LBracket => {
                    self.bump();
                    let index = self.parse_subscript_index()?;
                    self.expect(TokKind::RBracket)?;
                    e = Expr::Subscript {
                        value: Box::new(e),
                        index: Box::new(index),
                        span: self.finish(start),
                    };
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        let lit = match &self.cur.kind {
            TokKind::Ident(s) => {
                let id = Ident {
                    text: s.clone(),
                    span: start,
                };
                self.bump();
                return Ok(Expr::Name(id));
            }
            TokKind::Int(v) => Lit::Int(*v),
            TokKind::Float(v) => Lit::Float(*v),
            TokKind::Imag(v) => Lit::Complex(*v),
            TokKind::KwTrue => Lit::Bool(true),
            TokKind::KwFalse => Lit::Bool(false),
            TokKind::KwNone => Lit::None,
            TokKind::Ellipsis => Lit::Ellipsis,
            TokKind::Str(_) | TokKind::Bytes(_) | TokKind::FStr(_) => return self.parse_strings(),
            TokKind::LParen => return self.parse_paren(),
            TokKind::LBracket => return self.parse_list_display(),
            TokKind::LBrace => return self.parse_brace_display(),
            _ => return self.unexpected("expression"),
        };
        self.bump();
        Ok(Expr::Constant(lit, start))
    }

    /// Adjacent string literals concatenate.
    fn parse_strings(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        let mut text = String::new();
        let mut bytes: Option<Vec<u8>> = None;
        let mut formatted = false;
        let mut saw_text = false;
        loop {
            match &self.cur.kind {
                TokKind::Str(s) => {
                    text.push_str(s);
                    saw_text = true;
                }
                TokKind::FStr(s) => {
                    text.push_str(s);
                    saw_text = true;
                    formatted = true;
                }
                TokKind::Bytes(b) => bytes.get_or_insert_with(Vec::new).extend_from_slice(b),
                _ => break,
            }
            self.bump();
        }
        let span = self.finish(start);
        match bytes {
            Some(_) if saw_text => self.fail("cannot mix bytes and nonbytes literals"),
            Some(b) => Ok(Expr::Constant(Lit::Bytes(b), span)),
            None if formatted => Ok(unsupported("JoinedStr", span)),
            None => Ok(Expr::Constant(Lit::Str(text), span)),
        }
    }

    fn parse_paren(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        self.expect(TokKind::LParen)?;
        if matches!(self.cur.kind, TokKind::RParen) {
            self.bump();
            return Ok(unsupported("Tuple", self.finish(start)));
        }
        let inner = self.parse_expr()?;
        if matches!(self.cur.kind, TokKind::KwFor) {
            self.skip_comprehension()?;
            self.expect(TokKind::RParen)?;
            return Ok(unsupported("GeneratorExp", self.finish(start)));
        }
        if matches!(self.cur.kind, TokKind::Comma) {
            while matches!(self.cur.kind, TokKind::Comma) {
                self.bump();
                if matches!(self.cur.kind, TokKind::RParen) {
                    break;
                }
                self.parse_expr()?;
            }
            self.expect(TokKind::RParen)?;
            return Ok(unsupported("Tuple", self.finish(start)));
        }
        self.expect(TokKind::RParen)?;
        Ok(inner)
    }

    fn parse_list_display(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        self.expect(TokKind::LBracket)?;
        let mut elts = Vec::new();
        if !matches!(self.cur.kind, TokKind::RBracket) {
            elts.push(self.parse_expr()?);
            if matches!(self.cur.kind, TokKind::KwFor) {
                self.skip_comprehension()?;
                self.expect(TokKind::RBracket)?;
                return Ok(unsupported("ListComp", self.finish(start)));
            }
            while matches!(self.cur.kind, TokKind::Comma) {
                self.bump();
                if matches!(self.cur.kind, TokKind::RBracket) {
                    break;
                }
                elts.push(self.parse_expr()?);
            }
        }
        self.expect(TokKind::RBracket)?;
        Ok(Expr::List {
            elts,
            span: self.finish(start),
        })
    }

    fn parse_brace_display(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        self.expect(TokKind::LBrace)?;
        if matches!(self.cur.kind, TokKind::RBrace) {
            self.bump();
            return Ok(Expr::Dict {
                keys: Vec::new(),
                values: Vec::new(),
                span: self.finish(start),
            });
        }
        if matches!(self.cur.kind, TokKind::StarStar) {
            self.skip_to_closing(TokKind::RBrace)?;
            return Ok(unsupported("DictUnpack", self.finish(start)));
        }

        let first = self.parse_expr()?;
        if matches!(self.cur.kind, TokKind::Colon) {
            self.bump();
            let first_value = self.parse_expr()?;
            if matches!(self.cur.kind, TokKind::KwFor) {
                self.skip_comprehension()?;
                self.expect(TokKind::RBrace)?;
                return Ok(unsupported("DictComp", self.finish(start)));
            }
            let mut keys = vec![first];
            let mut values = vec![first_value];
            while matches!(self.cur.kind, TokKind::Comma) {
                self.bump();
                if matches!(self.cur.kind, TokKind::RBrace) {
                    break;
                }
                if matches!(self.cur.kind, TokKind::StarStar) {
                    self.skip_to_closing(TokKind::RBrace)?;
                    return Ok(unsupported("DictUnpack", self.finish(start)));
                }
                keys.push(self.parse_expr()?);
                self.expect(TokKind::Colon)?;
                values.push(self.parse_expr()?);
            }
            self.expect(TokKind::RBrace)?;
            return Ok(Expr::Dict {
                keys,
                values,
                span: self.finish(start),
            });
        }

        if matches!(self.cur.kind, TokKind::KwFor) {
            self.skip_comprehension()?;
            self.expect(TokKind::RBrace)?;
            return Ok(unsupported("SetComp", self.finish(start)));
        }
        let mut elts = vec![first];
        while matches!(self.cur.kind, TokKind::Comma) {
            self.bump();
            if matches!(self.cur.kind, TokKind::RBrace) {
                break;
            }
            elts.push(self.parse_expr()?);
        }
        self.expect(TokKind::RBrace)?;
        Ok(Expr::Set {
            elts,
            span: self.finish(start),
        })
    }

    /// Skip to and consume the bracket closing the current display.
    fn skip_to_closing(&mut self, close: TokKind) -> Result<()> {
        let mut brackets = 0u32;
        loop {
            match self.cur.kind {
                TokKind::Eof => return self.unexpected(&format!("{:?}", close)),
                TokKind::LParen | TokKind::LBracket | TokKind::LBrace => brackets += 1,
                TokKind::RParen | TokKind::RBracket | TokKind::RBrace => {
                    if brackets == 0 {
                        self.expect(close)?;
                        return Ok(());
                    }
                    brackets -= 1;
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// `for t in it [if c]...` clauses of a comprehension.
    fn skip_comprehension(&mut self) -> Result<()> {
        while matches!(self.cur.kind, TokKind::KwFor) {
            self.bump();
            self.parse_target_list()?;
            self.expect(TokKind::KwIn)?;
            self.parse_expr_bp(0)?;
            while matches!(self.cur.kind, TokKind::KwIf) {
                self.bump();
                self.parse_expr_bp(0)?;
            }
        }
        Ok(())
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        while !matches!(self.cur.kind, TokKind::RParen) {
            let start = self.cur.span;
            let arg = match (&self.cur.kind, &self.nxt.kind) {
                (TokKind::StarStar, _) => {
                    self.bump();
                    self.parse_expr()?;
                    unsupported("keyword", self.finish(start))
                }
                (TokKind::Ident(_), TokKind::Eq) => {
                    self.bump();
                    self.bump();
                    self.parse_expr()?;
                    unsupported("keyword", self.finish(start))
                }
                _ => {
                    let e = self.parse_expr()?;
                    if matches!(self.cur.kind, TokKind::KwFor) {
                        self.skip_comprehension()?;
                        unsupported("GeneratorExp", self.finish(start))
                    } else {
                        e
                    }
                }
            };
            args.push(arg);
            if matches!(self.cur.kind, TokKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        Ok(args)
    }

    fn parse_subscript_index(&mut self) -> Result<Expr> {
        let start = self.cur.span;
        let mut slice = false;
        let mut parts = 0;
        loop {
            if !matches!(
                self.cur.kind,
                TokKind::Colon | TokKind::Comma | TokKind::RBracket
            ) {
                let e = self.parse_expr()?;
                if parts == 0 && !matches!(self.cur.kind, TokKind::Colon | TokKind::Comma) {
                    return Ok(e);
                }
            }
            parts += 1;
            match self.cur.kind {
                TokKind::Colon => {
                    slice = true;
                    self.bump();
                }
                TokKind::Comma => {
                    self.bump();
                }
                _ => break,
            }
            if matches!(self.cur.kind, TokKind::RBracket) {
                break;
            }
        }
        let construct = if slice { "Slice" } else { "Tuple" };
        Ok(unsupported(construct, self.finish(start)))
    }
}

fn op_token(op: BoolOperator) -> TokKind {
    match op {
        BoolOperator::And => TokKind::KwAnd,
        BoolOperator::Or => TokKind::KwOr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Module {
        parse_str("<test>", src).unwrap()
    }

    fn only_expr(src: &str) -> Expr {
        match parse(src).body.into_iter().next() {
            Some(Stmt::Expr { expr, .. }) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_unary_minus() {
        match only_expr("-x ** 2 ** 3") {
            Expr::UnaryOp {
                op: UnaryOperator::Neg,
                operand,
                ..
            } => match *operand {
                Expr::BinOp {
                    op: Operator::Pow,
                    right,
                    ..
                } => assert!(matches!(*right, Expr::BinOp { op: Operator::Pow, .. })),
                other => panic!("{:?}", other),
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn negative_literals_fold() {
        assert!(matches!(
            only_expr("-3"),
            Expr::Constant(Lit::Int(-3), _)
        ));
        assert!(matches!(
            only_expr("-2.5"),
            Expr::Constant(Lit::Float(v), _) if v == -2.5
        ));
    }

    #[test]
    fn bool_chain_flattens() {
        match only_expr("a and b and c") {
            Expr::BoolOp {
                op: BoolOperator::And,
                values,
                ..
            } => assert_eq!(values.len(), 3),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn comparison_chain_is_one_node() {
        match only_expr("a < b <= c") {
            Expr::Compare { ops, comparators, .. } => {
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE]);
                assert_eq!(comparators.len(), 2);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn membership_tests_are_unsupported() {
        for (src, name) in [("a in b", "In"), ("a not in b", "NotIn"), ("a is not b", "IsNot")] {
            match only_expr(src) {
                Expr::Unsupported { construct, .. } => assert_eq!(construct, name),
                other => panic!("{:?}", other),
            }
        }
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        match only_expr("not a == b") {
            Expr::UnaryOp { operand, .. } => assert!(matches!(*operand, Expr::Compare { .. })),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let src = format!("x = {}1{}", "(".repeat(150), ")".repeat(150));
        let err = parse_str("<test>", &src).unwrap_err().to_string();
        assert!(err.contains("nesting depth"), "{}", err);
    }
}
