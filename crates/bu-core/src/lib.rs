//! bu-core : primitives partagées (no_std-ready)
//!
//! Provides:
//! - `SourceId`, `Pos`, `Span`, `Spanned<T>` for source locations
//! - `Value`, the runtime value domain shared by compiler and VM
//! - `OpCode` + `Chunk` (code bytes, per-byte line table, deduplicated constant pool)
//! - a textual disassembler and a structural chunk validator
//! - `CoreError` + alias `CoreResult<T>`
//!
//! Features:
//! - `std` (default): `impl std::error::Error`
//! - `serde`: derive (de)serialization on the public data types
//!
//! ```
//! use bu_core::{Chunk, OpCode, Value};
//!
//! let mut chunk = Chunk::new("demo");
//! let idx = chunk.add_constant(Value::Int(7));
//! chunk.write_op(OpCode::Constant, 1);
//! chunk.write(idx as u8, 1);
//! chunk.write_op(OpCode::Return, 1);
//! assert_eq!(chunk.len(), 3);
//! assert!(bu_core::helpers::validate_chunk(&chunk).is_ok());
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Bytecode primitives (opcodes, values, chunk, disassembler, validation).
pub mod bytecode;

pub use bytecode::disasm;
pub use bytecode::helpers;
pub use bytecode::{Chunk, ConstPool, Instruction, LineTable, OpCode, OperandKind, Value};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Identifiant de source (fichier, buffer, ligne de REPL…).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(pub u32);

/// Byte offset from the start of a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pos(pub u32);

impl Pos {
    /// Position nulle.
    pub const ZERO: Self = Self(0);

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, v: u32) -> Self {
        Self(self.0.saturating_add(v))
    }
}

/// Half-open range `[start, end)` inside a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Source the item comes from.
    pub source: SourceId,
    /// Inclusive start.
    pub start: Pos,
    /// Exclusive end.
    pub end: Pos,
}

impl Span {
    /// Builds a span.
    pub const fn new(source: SourceId, start: Pos, end: Pos) -> Self {
        Self { source, start, end }
    }

    /// Length in bytes.
    pub const fn len(&self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// True when the span covers nothing.
    pub const fn is_empty(&self) -> bool {
        self.start.0 >= self.end.0
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        Self {
            source: self.source,
            start: if other.start < self.start { other.start } else { self.start },
            end: if other.end > self.end { other.end } else { self.end },
        }
    }
}

/// Value paired with the span it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spanned<T> {
    /// La valeur.
    pub value: T,
    /// La localisation.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Builds a `Spanned<T>`.
    pub const fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    /// Maps the value and keeps the span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned { value: f(self.value), span: self.span }
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Structural errors found while decoding or patching a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Byte at `offset` is not a known opcode.
    UnknownOpcode {
        /// Offset of the offending byte.
        offset: usize,
        /// The byte itself.
        byte: u8,
    },
    /// Instruction operands run past the end of the code.
    Truncated {
        /// Offset of the opcode byte.
        offset: usize,
        /// Opcode whose operands are missing.
        op: OpCode,
    },
    /// Constant operand points outside the pool.
    ConstantOutOfRange {
        /// Offset of the opcode byte.
        offset: usize,
        /// Requested index.
        index: usize,
        /// Pool length.
        len: usize,
    },
    /// Jump lands outside `[0, code.len()]`.
    JumpOutOfRange {
        /// Offset of the jump instruction.
        offset: usize,
        /// Computed absolute target.
        target: i64,
    },
    /// Line table and code buffer disagree in length.
    LineTableMismatch {
        /// Number of code bytes.
        code: usize,
        /// Number of line entries.
        lines: usize,
    },
    /// Offset lies outside the code buffer.
    OutOfBounds {
        /// Requested offset.
        offset: usize,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { offset, byte } => write!(f, "unknown opcode 0x{byte:02x} at {offset:04}"),
            Self::Truncated { offset, op } => write!(f, "truncated {op} instruction at {offset:04}"),
            Self::ConstantOutOfRange { offset, index, len } => {
                write!(f, "constant index {index} out of range (pool has {len}) at {offset:04}")
            }
            Self::JumpOutOfRange { offset, target } => write!(f, "jump at {offset:04} targets {target}, outside the code"),
            Self::LineTableMismatch { code, lines } => {
                write!(f, "line table has {lines} entries for {code} code bytes")
            }
            Self::OutOfBounds { offset } => write!(f, "offset {offset:04} is out of bounds"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/* ─────────────────────────── Prelude ─────────────────────────── */

/// Prelude pratique pour importer d’un coup.
pub mod prelude {
    pub use crate::{
        Chunk, CoreError, CoreResult, Instruction, OpCode, OperandKind, Pos, SourceId, Span, Spanned, Value,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_join_covers_both() {
        let a = Span::new(SourceId(0), Pos(4), Pos(6));
        let b = Span::new(SourceId(0), Pos(1), Pos(3));
        let j = a.join(b);
        assert_eq!(j.start, Pos(1));
        assert_eq!(j.end, Pos(6));
        assert_eq!(j.len(), 5);
        assert!(!j.is_empty());
    }

    #[test]
    fn spanned_map_keeps_span() {
        let sp = Span::new(SourceId(2), Pos(0), Pos(3));
        let s = Spanned::new(21, sp).map(|v| v * 2);
        assert_eq!(s.value, 42);
        assert_eq!(s.span, sp);
    }

    #[test]
    fn error_messages() {
        let e = CoreError::UnknownOpcode { offset: 3, byte: 0xff };
        assert_eq!(e.to_string(), "unknown opcode 0xff at 0003");
        let e = CoreError::LineTableMismatch { code: 4, lines: 3 };
        assert_eq!(e.to_string(), "line table has 3 entries for 4 code bytes");
    }
}
