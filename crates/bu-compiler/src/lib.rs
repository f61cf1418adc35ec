// src/lib.rs
//! bu Compiler : AST vers bytecode, en une passe
//!
//! - Entrée : `bu_ast::Program`
//! - Sortie : `bu_core::Chunk` (code, lignes, pool de constantes dédupliqué)
//! - Diagnostics : collectés puis rendus ensemble ; aucun chunk partiel n’est produit
//! - Portées : [`scope::ScopeTable`] (slots locaux), file différée : [`deferred::DeferredQueue`]
//!
//! API principale :
//! ```
//! use bu_compiler::{Compiler, CompilerOptions};
//! use bu_core::{OpCode, Value};
//!
//! let program = bu_parser::parse("var a = 10; print(a);").unwrap();
//! let chunk = Compiler::new(CompilerOptions::default()).compile(&program).unwrap();
//! assert_eq!(chunk.constant(0), Some(&Value::Int(10)));
//! assert_eq!(chunk.code().last(), Some(&u8::from(OpCode::Return)));
//! ```

#![deny(missing_docs)]

use core::fmt;

use bu_ast as ast;
use bu_core::{Chunk, CoreError};
use thiserror::Error;

mod codegen;
pub mod deferred;
pub mod scope;

pub use deferred::{DeferredQueue, Task, VarRef};
pub use scope::{Local, ScopeError, ScopeTable, MAX_LOCALS};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options du compilateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Name given to the produced chunk (shown by the disassembler).
    pub chunk_name: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { chunk_name: String::from("__main__") }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
/* Diagnostics */
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum number of constants in one chunk (constant operands are one byte).
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    /// Local re-declared in the same block.
    #[error("variable '{0}' is already declared in this scope")]
    DuplicateLocal(String),
    /// `=` applied to something that is not a variable.
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    /// `++` / `--` applied to something that is not a variable.
    #[error("invalid increment target")]
    InvalidIncrementTarget,
    /// Constant pool full.
    #[error("too many constants in one chunk (max {})", MAX_CONSTANTS)]
    TooManyConstants,
    /// Every local slot in use.
    #[error("too many local variables in one chunk (max {})", MAX_LOCALS)]
    TooManyLocals,
    /// Jump distance does not fit the 16-bit operand.
    #[error("too much code to jump over")]
    JumpTooLarge,
    /// Chunk refused a write.
    #[error("bytecode encoding failed: {0}")]
    Encoding(#[from] CoreError),
}

/// Un diagnostic : genre, ligne, lexème fautif.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error at '{lexeme}': {kind}")]
pub struct Diagnostic {
    /// Genre.
    pub kind: CompileErrorKind,
    /// Ligne source (1-based).
    pub line: u32,
    /// Lexème du jeton fautif.
    pub lexeme: String,
}

impl Diagnostic {
    /// Diagnostic located on `token`.
    pub fn at(token: &ast::Token, kind: CompileErrorKind) -> Self {
        Self { kind, line: token.line(), lexeme: token.lexeme.clone() }
    }
}

/// Erreur globale de compilation : tous les diagnostics de l’unité.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Diagnostics accumulés, dans l’ordre du source.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    /// First diagnostic, if any.
    pub fn first(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Alias résultat du compilateur.
pub type CompileResult<T> = core::result::Result<T, CompileError>;

// ─────────────────────────────────────────────────────────────────────────────
/* Compiler (façade) */
// ─────────────────────────────────────────────────────────────────────────────

/// Compilateur bu.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    opts: CompilerOptions,
}

impl Compiler {
    /// Nouveau compilateur.
    pub const fn new(opts: CompilerOptions) -> Self {
        Self { opts }
    }

    /// Options in use.
    pub const fn options(&self) -> &CompilerOptions {
        &self.opts
    }

    /// Compiles a whole program into a fresh chunk.
    ///
    /// Every diagnostic of the unit is collected; if there is at least one, no chunk
    /// is returned.
    #[tracing::instrument(level = "debug", skip_all, fields(chunk = %self.opts.chunk_name))]
    pub fn compile(&self, program: &ast::Program) -> CompileResult<Chunk> {
        let chunk = codegen::Emitter::new(&self.opts.chunk_name).program(program)?;
        tracing::debug!(bytes = chunk.len(), constants = chunk.constants().len(), "compiled");
        Ok(chunk)
    }
}

/// Compiles with default options.
pub fn compile(program: &ast::Program) -> CompileResult<Chunk> {
    Compiler::default().compile(program)
}

// ─────────────────────────────────────────────────────────────────────────────
/* Prelude */
// ─────────────────────────────────────────────────────────────────────────────

/// Prelude pratique.
pub mod prelude {
    pub use crate::{compile, CompileError, CompileErrorKind, Compiler, CompilerOptions, Diagnostic};
}
