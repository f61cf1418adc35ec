// src/lib.rs
//! bu AST (Abstract Syntax Tree)
//!
//! Ce crate définit les structures produites par `bu-parser` et consommées par
//! `bu-compiler`. Every node that can trigger a compile error keeps its originating
//! [`Token`] (lexeme + position) so diagnostics can name it.
//!
//! - No_std compatible (optionnel)
//! - `serde` : (dé)sérialisation de l’AST
//!
//! # Exemple
//! ```rust
//! use bu_ast::{BinaryOp, Expr, Literal, Program, Stmt};
//!
//! // print(1 + 2);
//! let sum = Expr::binary(Expr::literal(Literal::Int(1), 1), BinaryOp::Add, Expr::literal(Literal::Int(2), 1), 1);
//! let program = Program { statements: vec![Stmt::print(sum, 1)] };
//! assert_eq!(program.statements.len(), 1);
//! assert_eq!(program.last_line(), 1);
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

// ─── alloc uniquement en no_std ───
#[cfg(not(feature = "std"))]
extern crate alloc;

// ─── Imports conditionnels ───
#[cfg(feature = "std")]
use std::{boxed::Box, string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Localisation dans le code source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Ligne de début (1-based)
    pub line: u32,
    /// Colonne de début (1-based)
    pub column: u32,
    /// Offset en bytes depuis le début du fichier
    pub offset: u32,
}

impl Span {
    /// Construit un nouveau `Span` à partir d'une position (ligne, colonne, offset).
    pub const fn new(line: u32, column: u32, offset: u32) -> Self {
        Self { line, column, offset }
    }

    /// Span pointing at the start of `line`, for nodes built outside the parser.
    pub const fn at_line(line: u32) -> Self {
        Self { line, column: 1, offset: 0 }
    }
}

/// Source token kept on a node for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    /// Texte exact du jeton.
    pub lexeme: String,
    /// Position du jeton.
    pub span: Span,
}

impl Token {
    /// Builds a token.
    pub fn new(lexeme: impl Into<String>, span: Span) -> Self {
        Self { lexeme: lexeme.into(), span }
    }

    /// Token located at the start of `line`.
    pub fn at_line(lexeme: impl Into<String>, line: u32) -> Self {
        Self::new(lexeme, Span::at_line(line))
    }

    /// Source line.
    pub const fn line(&self) -> u32 {
        self.span.line
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexeme)
    }
}

/// Un programme bu complet
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program {
    /// Top-level statements, in source order.
    pub statements: Vec<Stmt>,
}

impl Program {
    /// Highest line any top-level statement reaches (0 for an empty program).
    pub fn last_line(&self) -> u32 {
        self.statements.iter().map(Stmt::end_line).max().unwrap_or(0)
    }
}

/// Instruction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stmt {
    /// `expr ;` (value discarded)
    Expression(Expr),
    /// `print ( expr ) ;`
    Print {
        /// The `print` keyword.
        keyword: Token,
        /// Printed expression.
        expr: Expr,
    },
    /// `var name (= init)? ;`
    Var {
        /// Declared name.
        name: Token,
        /// Initializer (`nil` when absent).
        initializer: Option<Expr>,
    },
    /// `{ ... }`
    Block {
        /// Inner declarations.
        statements: Vec<Stmt>,
        /// The closing `}`.
        close: Token,
    },
}

impl Stmt {
    /// `print(expr);` located at `line`.
    pub fn print(expr: Expr, line: u32) -> Self {
        Self::Print { keyword: Token::at_line("print", line), expr }
    }

    /// `var name = init;` located at `line`.
    pub fn var(name: &str, initializer: Option<Expr>, line: u32) -> Self {
        Self::Var { name: Token::at_line(name, line), initializer }
    }

    /// Line the statement starts on.
    pub fn line(&self) -> u32 {
        match self {
            Self::Expression(e) => e.line(),
            Self::Print { keyword, .. } => keyword.line(),
            Self::Var { name, .. } => name.line(),
            Self::Block { statements, close } => statements.first().map_or(close.line(), Self::line),
        }
    }

    /// Line the statement ends on, as far as the tree records it.
    pub fn end_line(&self) -> u32 {
        match self {
            Self::Expression(e) => e.line(),
            Self::Print { keyword, expr } => keyword.line().max(expr.line()),
            Self::Var { name, initializer } => initializer.as_ref().map_or(name.line(), |e| name.line().max(e.line())),
            Self::Block { close, .. } => close.line(),
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Expr {
    /// Littéral (`nil`, booléen, nombre, chaîne).
    Literal {
        /// Valeur.
        value: Literal,
        /// Jeton source.
        token: Token,
    },
    /// `( expr )`
    Grouping(Box<Expr>),
    /// Variable read.
    Variable(Token),
    /// `target = value` (compound forms are lowered by the parser).
    Assign {
        /// Assigned expression; anything but `Variable` is rejected by the compiler.
        target: Box<Expr>,
        /// Value expression.
        value: Box<Expr>,
        /// The `=` (or compound operator) token.
        equals: Token,
    },
    /// Opération binaire
    Binary {
        /// Opérande gauche
        left: Box<Expr>,
        /// Opérateur
        op: BinaryOp,
        /// Jeton opérateur
        token: Token,
        /// Opérande droite
        right: Box<Expr>,
    },
    /// Short-circuit `and` / `or`.
    Logical {
        /// Opérande gauche
        left: Box<Expr>,
        /// Opérateur
        op: LogicalOp,
        /// Jeton opérateur
        token: Token,
        /// Opérande droite
        right: Box<Expr>,
    },
    /// Opération unaire
    Unary {
        /// Opérateur
        op: UnaryOp,
        /// Jeton opérateur
        token: Token,
        /// Expression cible
        operand: Box<Expr>,
    },
    /// `++x`, `--x`, `x++`, `x--`
    IncDec {
        /// Increment or decrement.
        op: IncDecOp,
        /// Prefix or postfix.
        fixity: Fixity,
        /// Updated expression; anything but `Variable` is rejected by the compiler.
        target: Box<Expr>,
        /// The `++` / `--` token.
        token: Token,
    },
    /// `now`: wall-clock seconds.
    Now(Token),
}

impl Expr {
    /// Literal located at `line`.
    pub fn literal(value: Literal, line: u32) -> Self {
        let lexeme = match &value {
            Literal::Nil => String::from("nil"),
            Literal::Bool(true) => String::from("true"),
            Literal::Bool(false) => String::from("false"),
            Literal::Int(i) => i.to_string(),
            Literal::Float(x) => x.to_string(),
            Literal::Str(s) => s.clone(),
        };
        Self::Literal { value, token: Token::at_line(lexeme, line) }
    }

    /// Variable read located at `line`.
    pub fn variable(name: &str, line: u32) -> Self {
        Self::Variable(Token::at_line(name, line))
    }

    /// `left op right` located at `line`.
    pub fn binary(left: Self, op: BinaryOp, right: Self, line: u32) -> Self {
        Self::Binary { left: Box::new(left), op, token: Token::at_line(op.symbol(), line), right: Box::new(right) }
    }

    /// `target = value` located at `line`.
    pub fn assign(target: Self, value: Self, line: u32) -> Self {
        Self::Assign { target: Box::new(target), value: Box::new(value), equals: Token::at_line("=", line) }
    }

    /// `++target`, `target--`, … located at `line`.
    pub fn inc_dec(op: IncDecOp, fixity: Fixity, target: Self, line: u32) -> Self {
        Self::IncDec { op, fixity, target: Box::new(target), token: Token::at_line(op.symbol(), line) }
    }

    /// Token that best locates the expression.
    pub fn token(&self) -> &Token {
        match self {
            Self::Literal { token, .. }
            | Self::Binary { token, .. }
            | Self::Logical { token, .. }
            | Self::Unary { token, .. }
            | Self::IncDec { token, .. }
            | Self::Variable(token)
            | Self::Now(token) => token,
            Self::Assign { equals, .. } => equals,
            Self::Grouping(inner) => inner.token(),
        }
    }

    /// Source line.
    pub fn line(&self) -> u32 {
        self.token().line()
    }
}

/// Littéraux
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Literal {
    /// `nil`
    Nil,
    /// Booléen
    Bool(bool),
    /// Entier 64 bits
    Int(i64),
    /// Flottant 64 bits
    Float(f64),
    /// Chaîne de caractères
    Str(String),
}

/// Opérateurs binaires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinaryOp {
    /// Source spelling.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Opérateurs logiques (court-circuit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LogicalOp {
    /// `and`, `&&`, `&`
    And,
    /// `or`, `||`, `|`
    Or,
}

/// Opérateurs unaires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x` / `not x`
    Not,
}

/// `++` or `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IncDecOp {
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

impl IncDecOp {
    /// Source spelling.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

/// Whether the update is observed before or after the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Fixity {
    /// `++x`: the expression yields the updated value.
    Prefix,
    /// `x++`: the expression yields the previous value.
    Postfix,
}

/* ─────────────────────────── Tests ─────────────────────────── */
