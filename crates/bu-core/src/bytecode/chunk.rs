//! Chunk: instruction bytes + per-byte line table + deduplicated constant pool.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::opcode::{OpCode, OperandKind};
use super::value::Value;
use crate::{CoreError, CoreResult};

/* ─────────────────────────── Constant pool ─────────────────────────── */

/// Ordered pool of literal values and interned global names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstPool {
    values: Vec<Value>,
}

impl ConstPool {
    /// Empty pool.
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Returns the index of `value`, appending it only when no equal value exists.
    pub fn add(&mut self, value: Value) -> usize {
        if let Some(idx) = self.values.iter().position(|v| *v == value) {
            return idx;
        }
        self.values.push(value);
        self.values.len() - 1
    }

    /// Value at `idx`.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing was added yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(index, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> + '_ {
        self.values.iter().enumerate()
    }

    /// Raw slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

/* ─────────────────────────── Line table ─────────────────────────── */

/// One source line per code byte; operand bytes repeat their opcode's line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineTable {
    lines: Vec<u32>,
}

impl LineTable {
    /// Empty table.
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Records the line of the next byte.
    pub fn push(&mut self, line: u32) {
        self.lines.push(line);
    }

    /// Line of the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Runs of identical lines as `(start_offset, end_offset_exclusive, line)`.
    pub fn ranges(&self) -> LineRanges<'_> {
        LineRanges { lines: &self.lines, pos: 0 }
    }
}

/// Iterator returned by [`LineTable::ranges`].
#[derive(Debug, Clone)]
pub struct LineRanges<'a> {
    lines: &'a [u32],
    pos: usize,
}

impl Iterator for LineRanges<'_> {
    type Item = (usize, usize, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let line = *self.lines.get(start)?;
        let run = self.lines[start..].iter().take_while(|l| **l == line).count();
        self.pos = start + run;
        Some((start, self.pos, line))
    }
}

/* ─────────────────────────── Instructions décodées ─────────────────────────── */

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte.
    pub offset: usize,
    /// The opcode.
    pub op: OpCode,
    /// Operand value (index, slot or raw jump distance); `0` when the opcode has none.
    pub operand: u16,
}

impl Instruction {
    /// Offset of the following instruction.
    pub const fn next_offset(&self) -> usize {
        self.offset + self.op.width()
    }

    /// Absolute target of a jump, `None` for other opcodes.
    pub fn jump_target(&self) -> Option<i64> {
        let after = i64::try_from(self.next_offset()).ok()?;
        match self.op.operand() {
            OperandKind::JumpForward => Some(after + i64::from(self.operand)),
            OperandKind::JumpBackward => Some(after - i64::from(self.operand)),
            OperandKind::None | OperandKind::Constant | OperandKind::Slot => None,
        }
    }
}

/* ─────────────────────────── Chunk ─────────────────────────── */

/// A compilation unit's bytecode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chunk {
    name: String,
    code: Vec<u8>,
    lines: LineTable,
    constants: ConstPool,
}

impl Chunk {
    /// Empty chunk labelled `name` (shown in disassembly headers).
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Label of the chunk.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends one byte and its source line.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Appends an opcode byte.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(u8::from(op), line);
    }

    /// Appends a 16-bit operand, high byte first.
    pub fn write_u16(&mut self, value: u16, line: u32) {
        let [hi, lo] = value.to_be_bytes();
        self.write(hi, line);
        self.write(lo, line);
    }

    /// Overwrites the two bytes at `offset` with `value`, high byte first.
    ///
    /// Only used to back-patch jump placeholders; lengths never change.
    pub fn patch_u16(&mut self, offset: usize, value: u16) -> CoreResult<()> {
        let slot = self
            .code
            .get_mut(offset..offset.saturating_add(2))
            .ok_or(CoreError::OutOfBounds { offset })?;
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Deduplicating insert into the constant pool.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.add(value)
    }

    /// Raw code bytes.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Number of code bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True when no byte was written.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Per-byte line table.
    pub const fn lines(&self) -> &LineTable {
        &self.lines
    }

    /// Source line of the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.line_at(offset)
    }

    /// Constant pool.
    pub const fn constants(&self) -> &ConstPool {
        &self.constants
    }

    /// Constant at `idx`.
    pub fn constant(&self, idx: usize) -> Option<&Value> {
        self.constants.get(idx)
    }

    /// Byte at `offset`.
    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Big-endian `u16` at `offset`.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = self.read_u8(offset)?;
        let lo = self.read_u8(offset.checked_add(1)?)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Decodes the instruction starting at `offset`.
    pub fn decode(&self, offset: usize) -> CoreResult<Instruction> {
        let byte = self.read_u8(offset).ok_or(CoreError::OutOfBounds { offset })?;
        let op = OpCode::try_from(byte).map_err(|byte| CoreError::UnknownOpcode { offset, byte })?;
        let operand = match op.operand() {
            OperandKind::None => Some(0),
            OperandKind::Constant | OperandKind::Slot => self.read_u8(offset + 1).map(u16::from),
            OperandKind::JumpForward | OperandKind::JumpBackward => self.read_u16(offset + 1),
        }
        .ok_or(CoreError::Truncated { offset, op })?;
        Ok(Instruction { offset, op, operand })
    }

    /// Decodes the whole chunk front to back; stops after the first error.
    pub const fn instructions(&self) -> Instructions<'_> {
        Instructions { chunk: self, offset: 0, failed: false }
    }
}

/// Iterator returned by [`Chunk::instructions`].
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = CoreResult<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.chunk.len() {
            return None;
        }
        let decoded = self.chunk.decode(self.offset);
        match &decoded {
            Ok(ins) => self.offset = ins.next_offset(),
            Err(_) => self.failed = true,
        }
        Some(decoded)
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
