//! Instruction set.
//!
//! Every instruction is one opcode byte followed by a fixed number of operand bytes:
//! one byte for constant-pool and local-slot indices, two big-endian bytes for jumps.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shape of the operand that follows an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand.
    None,
    /// One-byte constant-pool index.
    Constant,
    /// One-byte local slot index.
    Slot,
    /// 16-bit offset added to the address after the instruction.
    JumpForward,
    /// 16-bit offset subtracted from the address after the instruction.
    JumpBackward,
}

impl OperandKind {
    /// Operand width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::None => 0,
            Self::Constant | Self::Slot => 1,
            Self::JumpForward | Self::JumpBackward => 2,
        }
    }

    /// True for both jump directions.
    pub const fn is_jump(self) -> bool {
        matches!(self, Self::JumpForward | Self::JumpBackward)
    }
}

/// One-byte opcode understood by the virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum OpCode {
    /// Push `constants[idx]`.
    Constant = 0,
    /// Push `nil`.
    Nil,
    /// Push `true`.
    True,
    /// Push `false`.
    False,
    /// Discard the top of the stack.
    Pop,
    /// Duplicate the top of the stack.
    Dup,
    /// `a + b` (numbers, or two strings).
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a % b`
    Mod,
    /// `a == b`
    Equal,
    /// `a != b`
    NotEqual,
    /// `a > b`
    Greater,
    /// `a >= b`
    GreaterEqual,
    /// `a < b`
    Less,
    /// `a <= b`
    LessEqual,
    /// Arithmetic negation.
    Negate,
    /// Logical not (truthiness).
    Not,
    /// Add one to the number on top of the stack.
    Inc,
    /// Subtract one from the number on top of the stack.
    Dec,
    /// Push the value held in local slot `idx`.
    GetLocal,
    /// Store the top of the stack into local slot `idx` (value stays on the stack).
    SetLocal,
    /// Push the global named by `constants[idx]`.
    GetGlobal,
    /// Define the global named by `constants[idx]`, popping its value.
    DefineGlobal,
    /// Assign the top of the stack to an existing global (value stays on the stack).
    SetGlobal,
    /// Pop and print one value.
    Print,
    /// Push the wall-clock time in seconds.
    Now,
    /// Unconditional forward jump.
    Jump,
    /// Forward jump when the top of the stack is falsey (peeks).
    JumpIfFalse,
    /// Forward jump when the top of the stack is truthy (peeks).
    JumpIfTrue,
    /// Unconditional backward jump.
    Loop,
    /// End of program, status `Ok`.
    Return,
    /// Stop execution, status `Abort`.
    Halt,
}

impl OpCode {
    /// Every opcode, indexed by its byte value.
    pub const ALL: [Self; 34] = [
        Self::Constant,
        Self::Nil,
        Self::True,
        Self::False,
        Self::Pop,
        Self::Dup,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::GreaterEqual,
        Self::Less,
        Self::LessEqual,
        Self::Negate,
        Self::Not,
        Self::Inc,
        Self::Dec,
        Self::GetLocal,
        Self::SetLocal,
        Self::GetGlobal,
        Self::DefineGlobal,
        Self::SetGlobal,
        Self::Print,
        Self::Now,
        Self::Jump,
        Self::JumpIfFalse,
        Self::JumpIfTrue,
        Self::Loop,
        Self::Return,
        Self::Halt,
    ];

    /// Operand shape for this opcode.
    pub const fn operand(self) -> OperandKind {
        match self {
            Self::Constant | Self::GetGlobal | Self::DefineGlobal | Self::SetGlobal => OperandKind::Constant,
            Self::GetLocal | Self::SetLocal => OperandKind::Slot,
            Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue => OperandKind::JumpForward,
            Self::Loop => OperandKind::JumpBackward,
            Self::Nil
            | Self::True
            | Self::False
            | Self::Pop
            | Self::Dup
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Mod
            | Self::Equal
            | Self::NotEqual
            | Self::Greater
            | Self::GreaterEqual
            | Self::Less
            | Self::LessEqual
            | Self::Negate
            | Self::Not
            | Self::Inc
            | Self::Dec
            | Self::Print
            | Self::Now
            | Self::Return
            | Self::Halt => OperandKind::None,
        }
    }

    /// Total instruction width (opcode + operands).
    pub const fn width(self) -> usize {
        1 + self.operand().width()
    }

    /// Mnemonic used by the disassembler.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Constant => "CONSTANT",
            Self::Nil => "NIL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::Add => "ADD",
            Self::Sub => "SUBTRACT",
            Self::Mul => "MULTIPLY",
            Self::Div => "DIVIDE",
            Self::Mod => "MODULO",
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::Greater => "GREATER",
            Self::GreaterEqual => "GREATER_EQUAL",
            Self::Less => "LESS",
            Self::LessEqual => "LESS_EQUAL",
            Self::Negate => "NEGATE",
            Self::Not => "NOT",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::GetLocal => "GET_LOCAL",
            Self::SetLocal => "SET_LOCAL",
            Self::GetGlobal => "GET_GLOBAL",
            Self::DefineGlobal => "DEFINE_GLOBAL",
            Self::SetGlobal => "SET_GLOBAL",
            Self::Print => "PRINT",
            Self::Now => "NOW",
            Self::Jump => "JUMP",
            Self::JumpIfFalse => "JUMP_IF_FALSE",
            Self::JumpIfTrue => "JUMP_IF_TRUE",
            Self::Loop => "LOOP",
            Self::Return => "RETURN",
            Self::Halt => "HALT",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(byte)).copied().ok_or(byte)
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as Self
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
