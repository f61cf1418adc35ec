//! bu-parser : parseur du langage bu
//!
//! Branches :
//! - `bu-lexer` pour la tokenisation
//! - `bu-core` pour `Span`
//! - `bu-ast` pour l’AST cible
//!
//! Grammaire :
//! ```text
//! program     := declaration* EOF
//! declaration := "var" IDENT ("=" expression)? ";" | statement
//! statement   := "print" "(" expression ")" ";"
//!              | "{" declaration* "}"
//!              | expression ";"
//! expression  := assignment
//! assignment  := pratt (("=" | "+=" | "-=" | "*=" | "/=") assignment)?
//! pratt       := unary (binop unary)*        -- or < and < equality < comparison < term < factor
//! unary       := ("-" | "!") unary | ("++" | "--") unary | postfix
//! postfix     := primary ("++" | "--")?
//! primary     := INT | FLOAT | STRING | "true" | "false" | "nil" | "now" | IDENT | "(" expression ")"
//! ```
//!
//! Compound assignments are lowered here: `x += e` becomes `x = x + e`.
//! Targets are not checked; the compiler reports invalid ones.
//!
//! ```
//! use bu_ast::Stmt;
//!
//! let program = bu_parser::parse("var a = 10;\nprint(a + 1);").unwrap();
//! assert_eq!(program.statements.len(), 2);
//! assert!(matches!(program.statements[1], Stmt::Print { .. }));
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/* ─────────────────────────── Imports / alloc ─────────────────────────── */

#[cfg(not(feature = "std"))]
extern crate alloc;

use core::fmt;

#[cfg(feature = "std")]
use std::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};

#[cfg(not(feature = "std"))]
use alloc::{
    boxed::Box,
    format,
    string::{String, ToString},
    vec::Vec,
};

use bu_ast as ast;
use bu_core::{SourceId, Span};
use bu_lexer::{Keyword, LexError, Lexer, LexerOptions, Token, TokenKind};

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur de parsing avec localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Localisation.
    pub span: Span,
    /// Ligne (1-based).
    pub line: u32,
    /// Lexème fautif, `None` en fin de fichier.
    pub lexeme: Option<String>,
    /// Message humain.
    pub message: String,
}

impl ParseError {
    fn at(tok: &Token<'_>, lines: &bu_lexer::LineMap, src: &str, message: impl Into<String>) -> Self {
        let lexeme = match tok.value {
            TokenKind::Eof => None,
            _ => Some(slice(src, tok.span).to_string()),
        };
        Self { span: tok.span, line: lines.line_of(tok.span.start), lexeme, message: message.into() }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self { span: e.span, line: e.line, lexeme: None, message: e.kind.to_string() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lexeme {
            Some(lx) => write!(f, "[line {}] Error at '{}': {}", self.line, lx, self.message),
            None => write!(f, "[line {}] Error at end: {}", self.line, self.message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

type PResult<T> = core::result::Result<T, ParseError>;

/* ─────────────────────────── API ─────────────────────────── */

/// Parse `src` as a whole program.
pub fn parse(src: &str) -> PResult<ast::Program> {
    Parser::new(src, SourceId(0)).parse_program()
}

/* ─────────────────────────── Parser ─────────────────────────── */

/// Parser bu.
pub struct Parser<'a> {
    /// Lexer interne.
    lx: Lexer<'a>,
    /// Buffer 1-token d’anticipation.
    look: Option<Token<'a>>,
}

impl<'a> Parser<'a> {
    /// Crée un parser depuis une source.
    pub fn new(src: &'a str, source: SourceId) -> Self {
        Self::with_options(src, source, LexerOptions::default())
    }

    /// Crée avec options de lexer.
    pub fn with_options(src: &'a str, source: SourceId, opts: LexerOptions) -> Self {
        Self { lx: Lexer::with_options(src, source, opts), look: None }
    }

    /// Parse un programme complet.
    pub fn parse_program(&mut self) -> PResult<ast::Program> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof)? {
            statements.push(self.parse_declaration()?);
        }
        Ok(ast::Program { statements })
    }

    /* ─────────── Déclarations & instructions ─────────── */

    fn parse_declaration(&mut self) -> PResult<ast::Stmt> {
        if self.check_kw(Keyword::Var)? {
            self.bump()?;
            let name = self.expect_ident()?;
            let initializer = if self.eat(&TokenKind::Eq)? { Some(self.parse_expr()?) } else { None };
            self.expect(&TokenKind::Semi, "expected ';' after variable declaration")?;
            return Ok(ast::Stmt::Var { name, initializer });
        }
        self.parse_statement()
    }

    fn parse_statement(&mut self) -> PResult<ast::Stmt> {
        let t = self.peek()?;
        match t.value {
            TokenKind::Kw(Keyword::Print) => {
                let keyword = self.bump()?;
                self.expect(&TokenKind::LParen, "expected '(' after 'print'")?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "expected ')' after value")?;
                self.expect(&TokenKind::Semi, "expected ';' after value")?;
                Ok(ast::Stmt::Print { keyword: self.ast_token(&keyword), expr })
            }
            TokenKind::LBrace => {
                self.bump()?;
                let mut statements = Vec::new();
                while !self.check(&TokenKind::RBrace)? && !self.check(&TokenKind::Eof)? {
                    statements.push(self.parse_declaration()?);
                }
                let close = self.expect(&TokenKind::RBrace, "expected '}' after block")?;
                Ok(ast::Stmt::Block { statements, close })
            }
            TokenKind::Kw(kw) if kw.is_reserved() => Err(self.unsupported(&t, kw)),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::Semi, "expected ';' after expression")?;
                Ok(ast::Stmt::Expression(expr))
            }
        }
    }

    /* ─────────── Expressions ─────────── */

    fn parse_expr(&mut self) -> PResult<ast::Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<ast::Expr> {
        let target = self.parse_prec(0)?;
        let t = self.peek()?;
        let compound = match t.value {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(ast::BinaryOp::Add),
            TokenKind::MinusEq => Some(ast::BinaryOp::Sub),
            TokenKind::StarEq => Some(ast::BinaryOp::Mul),
            TokenKind::SlashEq => Some(ast::BinaryOp::Div),
            _ => return Ok(target),
        };
        let equals = self.bump_token()?;
        let rhs = self.parse_assignment()?;
        let value = match compound {
            None => rhs,
            Some(op) => ast::Expr::Binary {
                left: Box::new(target.clone()),
                op,
                token: equals.clone(),
                right: Box::new(rhs),
            },
        };
        Ok(ast::Expr::Assign { target: Box::new(target), value: Box::new(value), equals })
    }

    fn parse_prec(&mut self, min_bp: u8) -> PResult<ast::Expr> {
        let mut lhs = self.parse_unary()?;

        loop {
            let t = self.peek()?;
            let op = match t.value {
                TokenKind::OrOr => Infix::Logical(ast::LogicalOp::Or),
                TokenKind::AndAnd => Infix::Logical(ast::LogicalOp::And),
                TokenKind::EqEq => Infix::Binary(ast::BinaryOp::Eq),
                TokenKind::Ne => Infix::Binary(ast::BinaryOp::Ne),
                TokenKind::Lt => Infix::Binary(ast::BinaryOp::Lt),
                TokenKind::Le => Infix::Binary(ast::BinaryOp::Le),
                TokenKind::Gt => Infix::Binary(ast::BinaryOp::Gt),
                TokenKind::Ge => Infix::Binary(ast::BinaryOp::Ge),
                TokenKind::Plus => Infix::Binary(ast::BinaryOp::Add),
                TokenKind::Minus => Infix::Binary(ast::BinaryOp::Sub),
                TokenKind::Star => Infix::Binary(ast::BinaryOp::Mul),
                TokenKind::Slash => Infix::Binary(ast::BinaryOp::Div),
                TokenKind::Percent => Infix::Binary(ast::BinaryOp::Mod),
                TokenKind::Caret => return Err(self.error(&t, "operator '^' is not supported")),
                _ => break,
            };
            let (lbp, rbp) = precedence(op);
            if lbp < min_bp {
                break;
            }
            let token = self.bump_token()?;
            let rhs = self.parse_prec(rbp)?;
            lhs = match op {
                Infix::Binary(op) => ast::Expr::Binary { left: Box::new(lhs), op, token, right: Box::new(rhs) },
                Infix::Logical(op) => ast::Expr::Logical { left: Box::new(lhs), op, token, right: Box::new(rhs) },
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<ast::Expr> {
        let t = self.peek()?;
        let op = match t.value {
            TokenKind::Minus => Some(ast::UnaryOp::Neg),
            TokenKind::Bang => Some(ast::UnaryOp::Not),
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let token = self.bump_token()?;
                let op = inc_dec_op(&t.value);
                let target = self.parse_unary()?;
                return Ok(ast::Expr::IncDec { op, fixity: ast::Fixity::Prefix, target: Box::new(target), token });
            }
            _ => None,
        };
        match op {
            Some(op) => {
                let token = self.bump_token()?;
                let operand = self.parse_unary()?;
                Ok(ast::Expr::Unary { op, token, operand: Box::new(operand) })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<ast::Expr> {
        let e = self.parse_primary()?;
        let t = self.peek()?;
        if matches!(t.value, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let token = self.bump_token()?;
            return Ok(ast::Expr::IncDec {
                op: inc_dec_op(&t.value),
                fixity: ast::Fixity::Postfix,
                target: Box::new(e),
                token,
            });
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> PResult<ast::Expr> {
        let t = self.peek()?;
        let literal = match &t.value {
            TokenKind::Int(i) => ast::Literal::Int(*i),
            TokenKind::Float(x) => ast::Literal::Float(*x),
            TokenKind::Str(s) => ast::Literal::Str(s.clone()),
            TokenKind::Kw(Keyword::True) => ast::Literal::Bool(true),
            TokenKind::Kw(Keyword::False) => ast::Literal::Bool(false),
            TokenKind::Kw(Keyword::Nil) => ast::Literal::Nil,
            TokenKind::Kw(Keyword::Now) => {
                let token = self.bump_token()?;
                return Ok(ast::Expr::Now(token));
            }
            TokenKind::Ident(_) => {
                let token = self.bump_token()?;
                return Ok(ast::Expr::Variable(token));
            }
            TokenKind::LParen => {
                self.bump()?;
                let e = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "expected ')' after expression")?;
                return Ok(ast::Expr::Grouping(Box::new(e)));
            }
            TokenKind::Kw(kw) if kw.is_reserved() => return Err(self.unsupported(&t, *kw)),
            _ => return Err(self.error(&t, "expected expression")),
        };
        let token = self.bump_token()?;
        Ok(ast::Expr::Literal { value: literal, token })
    }

    /* ─────────── Utilitaires ─────────── */

    fn peek(&mut self) -> PResult<Token<'a>> {
        if let Some(t) = &self.look {
            return Ok(t.clone());
        }
        let t = self.lx.next_token()?;
        self.look = Some(t.clone());
        Ok(t)
    }

    fn bump(&mut self) -> PResult<Token<'a>> {
        let t = self.peek()?;
        self.look = None;
        Ok(t)
    }

    fn bump_token(&mut self) -> PResult<ast::Token> {
        let t = self.bump()?;
        Ok(self.ast_token(&t))
    }

    fn check(&mut self, kind: &TokenKind<'_>) -> PResult<bool> {
        Ok(token_eq(&self.peek()?.value, kind))
    }

    fn check_kw(&mut self, kw: Keyword) -> PResult<bool> {
        Ok(matches!(self.peek()?.value, TokenKind::Kw(k) if k == kw))
    }

    fn eat(&mut self, kind: &TokenKind<'_>) -> PResult<bool> {
        if self.check(kind)? {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, kind: &TokenKind<'_>, message: &str) -> PResult<ast::Token> {
        let t = self.peek()?;
        if token_eq(&t.value, kind) {
            self.bump()?;
            return Ok(self.ast_token(&t));
        }
        Err(self.error(&t, message))
    }

    fn expect_ident(&mut self) -> PResult<ast::Token> {
        let t = self.peek()?;
        match t.value {
            TokenKind::Ident(_) => {
                self.bump()?;
                Ok(self.ast_token(&t))
            }
            TokenKind::Kw(kw) => Err(self.error(&t, format!("'{kw}' is a keyword and cannot name a variable"))),
            _ => Err(self.error(&t, "expected variable name")),
        }
    }

    fn error(&self, tok: &Token<'_>, message: impl Into<String>) -> ParseError {
        ParseError::at(tok, &self.lx.lines, self.lx.source_text(), message)
    }

    fn unsupported(&self, tok: &Token<'_>, kw: Keyword) -> ParseError {
        self.error(tok, format!("'{kw}' is not supported"))
    }

    fn ast_token(&self, tok: &Token<'_>) -> ast::Token {
        let (line, column) = self.lx.lines.line_col(tok.span.start);
        ast::Token::new(slice(self.lx.source_text(), tok.span), ast::Span::new(line, column, tok.span.start.0))
    }
}

/* ─────────────────────────── Opérateurs & helpers ─────────────────────────── */

#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(ast::BinaryOp),
    Logical(ast::LogicalOp),
}

fn precedence(op: Infix) -> (u8, u8) {
    // Pratt binding power (gauche-associatif)
    use ast::BinaryOp as B;
    match op {
        Infix::Logical(ast::LogicalOp::Or) => (1, 2),
        Infix::Logical(ast::LogicalOp::And) => (3, 4),
        Infix::Binary(B::Eq | B::Ne) => (5, 6),
        Infix::Binary(B::Lt | B::Le | B::Gt | B::Ge) => (7, 8),
        Infix::Binary(B::Add | B::Sub) => (9, 10),
        Infix::Binary(B::Mul | B::Div | B::Mod) => (11, 12),
    }
}

fn inc_dec_op(kind: &TokenKind<'_>) -> ast::IncDecOp {
    if matches!(kind, TokenKind::MinusMinus) {
        ast::IncDecOp::Decrement
    } else {
        ast::IncDecOp::Increment
    }
}

fn slice(src: &str, span: Span) -> &str {
    src.get(span.start.0 as usize..span.end.0 as usize).unwrap_or("")
}

/// Égalité de genre, en ignorant les charges utiles.
fn token_eq(a: &TokenKind<'_>, b: &TokenKind<'_>) -> bool {
    match (a, b) {
        (TokenKind::Kw(x), TokenKind::Kw(y)) => x == y,
        _ => core::mem::discriminant(a) == core::mem::discriminant(b),
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use bu_ast::{BinaryOp, Expr, Fixity, IncDecOp, Literal, LogicalOp, Stmt, UnaryOp};
    use pretty_assertions::assert_eq;

    fn parse_ok(src: &str) -> ast::Program {
        match parse(src) {
            Ok(p) => p,
            Err(e) => panic!("parse failed: {e}"),
        }
    }

    fn expr_of(src: &str) -> Expr {
        match parse_ok(src).statements.into_iter().next() {
            Some(Stmt::Expression(e)) => e,
            other => panic!("not an expression statement: {other:?}"),
        }
    }

    #[test]
    fn var_and_print() {
        let p = parse_ok("var a = 10;\nvar b;\nprint(a);");
        assert_eq!(p.statements.len(), 3);
        match &p.statements[0] {
            Stmt::Var { name, initializer: Some(Expr::Literal { value: Literal::Int(10), .. }) } => {
                assert_eq!(name.lexeme, "a");
                assert_eq!(name.line(), 1);
            }
            other => panic!("{other:?}"),
        }
        assert!(matches!(&p.statements[1], Stmt::Var { initializer: None, .. }));
        match &p.statements[2] {
            Stmt::Print { keyword, expr: Expr::Variable(v) } => {
                assert_eq!(keyword.line(), 3);
                assert_eq!(v.lexeme, "a");
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn precedence_and_associativity() {
        // 1 + 2 * 3 - 4  ==>  (1 + (2 * 3)) - 4
        let e = expr_of("1 + 2 * 3 - 4;");
        let Expr::Binary { left, op: BinaryOp::Sub, right, .. } = e else { panic!("top is not '-'") };
        assert!(matches!(*right, Expr::Literal { value: Literal::Int(4), .. }));
        let Expr::Binary { op: BinaryOp::Add, right: mul, .. } = *left else { panic!("left is not '+'") };
        assert!(matches!(*mul, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn logical_below_comparison() {
        let e = expr_of("a < 1 or b and c;");
        let Expr::Logical { left, op: LogicalOp::Or, right, .. } = e else { panic!("top is not 'or'") };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Lt, .. }));
        assert!(matches!(*right, Expr::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn compound_assignment_is_lowered() {
        let e = expr_of("x -= 2;");
        let Expr::Assign { target, value, equals } = e else { panic!("not an assignment") };
        assert_eq!(equals.lexeme, "-=");
        assert!(matches!(*target, Expr::Variable(ref t) if t.lexeme == "x"));
        let Expr::Binary { left, op: BinaryOp::Sub, right, .. } = *value else { panic!("not lowered") };
        assert!(matches!(*left, Expr::Variable(ref t) if t.lexeme == "x"));
        assert!(matches!(*right, Expr::Literal { value: Literal::Int(2), .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = expr_of("a = b = 3;");
        let Expr::Assign { value, .. } = e else { panic!("not an assignment") };
        assert!(matches!(*value, Expr::Assign { .. }));
    }

    #[test]
    fn increments_and_unary() {
        let e = expr_of("++x;");
        assert!(matches!(e, Expr::IncDec { op: IncDecOp::Increment, fixity: Fixity::Prefix, .. }));
        let e = expr_of("x--;");
        assert!(matches!(e, Expr::IncDec { op: IncDecOp::Decrement, fixity: Fixity::Postfix, .. }));
        let e = expr_of("-!x;");
        let Expr::Unary { op: UnaryOp::Neg, operand, .. } = e else { panic!("not a negation") };
        assert!(matches!(*operand, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn invalid_targets_reach_the_ast() {
        let e = expr_of("(a + b) = 1;");
        assert!(matches!(e, Expr::Assign { .. }));
        let e = expr_of("++1;");
        assert!(matches!(e, Expr::IncDec { .. }));
    }

    #[test]
    fn block_keeps_closing_brace() {
        let p = parse_ok("{\n var a = 1;\n print(a);\n}");
        match &p.statements[0] {
            Stmt::Block { statements, close } => {
                assert_eq!(statements.len(), 2);
                assert_eq!(close.line(), 4);
            }
            other => panic!("{other:?}"),
        }
        assert_eq!(p.last_line(), 4);
    }

    #[test]
    fn now_and_literals() {
        let e = expr_of("now;");
        assert!(matches!(e, Expr::Now(_)));
        let e = expr_of("\"hi\";");
        match e {
            Expr::Literal { value: Literal::Str(s), token } => {
                assert_eq!(s, "hi");
                assert_eq!(token.lexeme, "\"hi\"");
            }
            other => panic!("{other:?}"),
        }
        assert!(matches!(expr_of("2.5;"), Expr::Literal { value: Literal::Float(_), .. }));
        assert!(matches!(expr_of("NIL;"), Expr::Literal { value: Literal::Nil, .. }));
    }

    #[test]
    fn errors_carry_line_and_lexeme() {
        let e = parse("var a = 1;\nprint(a)").unwrap_err();
        assert_eq!(e.line, 2);
        assert_eq!(e.to_string(), "[line 2] Error at end: expected ';' after value");

        let e = parse("var 3 = 1;").unwrap_err();
        assert_eq!(e.to_string(), "[line 1] Error at '3': expected variable name");

        let e = parse("print(1 + );").unwrap_err();
        assert_eq!(e.to_string(), "[line 1] Error at ')': expected expression");
    }

    #[test]
    fn reserved_keywords_are_rejected() {
        let e = parse("while (true) { }").unwrap_err();
        assert_eq!(e.to_string(), "[line 1] Error at 'while': 'while' is not supported");
        let e = parse("var x = 2 ^ 3;").unwrap_err();
        assert_eq!(e.message, "operator '^' is not supported");
        let e = parse("var if = 1;").unwrap_err();
        assert_eq!(e.message, "'if' is a keyword and cannot name a variable");
    }

    #[test]
    fn lex_errors_become_parse_errors() {
        let e = parse("var s = \"open;").unwrap_err();
        assert_eq!(e.line, 1);
        assert_eq!(e.message, "unterminated string literal");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn int_literals_round_trip(n in 0i64..i64::MAX) {
                let src = format!("{n};");
                match expr_of(&src) {
                    Expr::Literal { value: Literal::Int(v), .. } => prop_assert_eq!(v, n),
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
        }
    }
}
