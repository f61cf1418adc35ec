//! Textual disassembly.
//!
//! One line per instruction:
//!
//! ```text
//! 0000    1 CONSTANT            0 '10'
//! 0002    | DEFINE_GLOBAL       1 'a'
//! 0004    2 GET_LOCAL           0
//! 0006    | JUMP_IF_FALSE       6 -> 15
//! ```
//!
//! The line column shows `|` when the byte shares the previous byte's line.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt::Write;

use super::chunk::Chunk;
use super::opcode::OperandKind;
use crate::CoreError;

/// Disassembles every instruction under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", chunk.name());
    let mut offset = 0;
    while offset < chunk.len() {
        offset = write_instruction(&mut out, chunk, offset);
        out.push('\n');
    }
    out
}

/// Same as [`disassemble_chunk`], preceded by the constant pool and line runs.
pub fn disassemble_full(chunk: &Chunk) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        ";; chunk {} (bytes={}, consts={})",
        chunk.name(),
        chunk.len(),
        chunk.constants().len()
    );
    for (idx, value) in chunk.constants().iter() {
        let _ = writeln!(out, ";; const[{idx:03}] = {value:?}");
    }
    for (start, end, line) in chunk.lines().ranges() {
        let _ = writeln!(out, ";; line {line:>4}: {start:04}..{end:04}");
    }
    out.push_str(&disassemble_chunk(chunk));
    out
}

/// Renders the instruction at `offset`; returns the text and the next offset.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = String::new();
    let next = write_instruction(&mut out, chunk, offset);
    (out, next)
}

fn write_instruction(out: &mut String, chunk: &Chunk, offset: usize) -> usize {
    let _ = write!(out, "{offset:04} ");
    let line = chunk.line_at(offset);
    if offset > 0 && line.is_some() && line == chunk.line_at(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", line.unwrap_or(0));
    }

    let ins = match chunk.decode(offset) {
        Ok(ins) => ins,
        Err(CoreError::UnknownOpcode { byte, .. }) => {
            let _ = write!(out, "Unknown opcode {byte}");
            return offset + 1;
        }
        Err(CoreError::Truncated { op, .. }) => return truncated(out, op.mnemonic(), chunk),
        Err(_) => {
            out.push_str("<end>");
            return offset.saturating_add(1);
        }
    };

    let name = ins.op.mnemonic();
    match ins.op.operand() {
        OperandKind::None => out.push_str(name),
        OperandKind::Slot => {
            let _ = write!(out, "{name:<16} {:>4}", ins.operand);
        }
        OperandKind::Constant => {
            let idx = ins.operand;
            let _ = match chunk.constant(usize::from(idx)) {
                Some(value) => write!(out, "{name:<16} {idx:>4} '{value}'"),
                None => write!(out, "{name:<16} {idx:>4} <bad constant>"),
            };
        }
        OperandKind::JumpForward | OperandKind::JumpBackward => {
            let target = ins.jump_target().unwrap_or_default();
            let _ = write!(out, "{name:<16} {:>4} -> {target}", ins.operand);
        }
    }
    ins.next_offset()
}

fn truncated(out: &mut String, name: &str, chunk: &Chunk) -> usize {
    let _ = write!(out, "{name:<16} <truncated>");
    chunk.len()
}

/* ─────────────────────────── Tests ─────────────────────────── */
