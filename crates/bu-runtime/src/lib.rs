//! bu-runtime : VM à pile + pipeline d’interprétation
//!
//! - [`Vm`] : exécute un `Chunk` (pile d’opérandes, slots locaux, store de globales)
//! - [`GlobalStore`] / [`Globals`] (+ [`SharedGlobals`] avec la feature `sync`)
//! - [`Interpreter`] : source → jetons → AST → chunk → VM, globales conservées entre appels
//! - [`Captured`] : sortie capturée en mémoire (tests/REPL)
//!
//! ```
//! use bu_runtime::{ExecStatus, Interpreter};
//!
//! let (mut interp, out) = Interpreter::with_captured_output();
//! let status = interp.interpret("var a = 10; var b = 20; print(a + b);").unwrap();
//! assert_eq!(status, ExecStatus::Ok);
//! assert_eq!(out.get(), "30\n");
//! ```

#![deny(missing_docs)]

use thiserror::Error;

pub mod arith;
pub mod globals;
pub mod interpreter;
pub mod output;
pub mod vm;

pub use globals::{GlobalStore, Globals};
#[cfg(feature = "sync")]
pub use globals::SharedGlobals;
pub use interpreter::{InterpretError, Interpreter, InterpreterOptions};
pub use output::{Captured, Output};
pub use vm::{Vm, VmOptions};

/* ------------------------------ Statut ------------------------------ */

/// How a run ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecStatus {
    /// `RETURN` reached.
    Ok,
    /// `HALT` reached.
    Abort,
}

/* ------------------------------ Erreurs ------------------------------ */

/// Genre d’erreur d’exécution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    /// Lecture d’une globale jamais définie.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    /// Seconde définition d’une globale.
    #[error("variable '{0}' is already defined")]
    AlreadyDefined(String),
    /// Affectation d’une globale jamais définie.
    #[error("cannot assign to undefined variable '{0}'")]
    UndefinedAssignment(String),
    /// Opérandes de types non supportés.
    #[error("unsupported operand types for {op}: {operands}")]
    TypeMismatch {
        /// Operator spelling.
        op: &'static str,
        /// Operand type names.
        operands: String,
    },
    /// Division ou modulo par zéro.
    #[error("division by zero")]
    DivisionByZero,
    /// Dépassement entier.
    #[error("integer overflow")]
    IntegerOverflow,
    /// Pile vide.
    #[error("stack underflow")]
    StackUnderflow,
    /// Pile pleine.
    #[error("stack overflow (limit {0})")]
    StackOverflow(usize),
    /// Index de constante invalide (ou nom de globale non textuel).
    #[error("invalid constant index {0}")]
    InvalidConstant(usize),
    /// Slot local jamais écrit.
    #[error("local slot {0} read before it was written")]
    InvalidLocal(u8),
    /// Octet qui n’est pas un opcode.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    /// Cible de saut hors du code.
    #[error("jump target out of range")]
    JumpOutOfRange,
    /// Fin du code avant `RETURN`/`HALT`.
    #[error("unexpected end of bytecode")]
    UnexpectedEnd,
    /// Écriture de sortie impossible.
    #[error("output error: {0}")]
    Io(String),
}

/// Erreur d’exécution localisée.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] {kind}")]
pub struct RuntimeError {
    /// Genre.
    pub kind: RuntimeErrorKind,
    /// Ligne de l’instruction fautive.
    pub line: u32,
}

/// Résultat du runtime.
pub type RResult<T> = std::result::Result<T, RuntimeError>;

/* -------------------------------- Prelude -------------------------------- */

/// Prelude pratique pour importer d’un coup.
pub mod prelude {
    #[cfg(feature = "sync")]
    pub use crate::SharedGlobals;
    pub use crate::{
        Captured, ExecStatus, GlobalStore, Globals, InterpretError, Interpreter, InterpreterOptions, RResult,
        RuntimeError, RuntimeErrorKind, Vm, VmOptions,
    };
}
