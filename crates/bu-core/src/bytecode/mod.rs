//! Bytecode primitives: instruction set, value domain, chunk, disassembler, validation.
//!
//! The compiler appends into a [`Chunk`]; the VM and the disassembler both decode it
//! through the widths declared by [`OpCode::width`], so the two never disagree.

pub mod chunk;
pub mod disasm;
pub mod helpers;
pub mod opcode;
pub mod value;

pub use chunk::{Chunk, ConstPool, Instruction, Instructions, LineTable};
pub use opcode::{OpCode, OperandKind};
pub use value::Value;
