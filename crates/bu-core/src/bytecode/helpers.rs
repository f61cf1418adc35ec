//! Structural checks over a chunk.

use super::chunk::Chunk;
use super::opcode::OperandKind;
use crate::{CoreError, CoreResult};

/// Checks that a chunk can be executed without the VM tripping over its encoding.
///
/// Verifies the line table length, that every byte decodes to a known opcode with
/// all its operands present, that constant operands index into the pool, and that
/// jump targets stay within `[0, len]`.
pub fn validate_chunk(chunk: &Chunk) -> CoreResult<()> {
    if chunk.lines().len() != chunk.len() {
        return Err(CoreError::LineTableMismatch { code: chunk.len(), lines: chunk.lines().len() });
    }
    let code_len = i64::try_from(chunk.len()).unwrap_or(i64::MAX);
    for ins in chunk.instructions() {
        let ins = ins?;
        match ins.op.operand() {
            OperandKind::Constant => {
                let index = usize::from(ins.operand);
                if chunk.constant(index).is_none() {
                    return Err(CoreError::ConstantOutOfRange {
                        offset: ins.offset,
                        index,
                        len: chunk.constants().len(),
                    });
                }
            }
            OperandKind::JumpForward | OperandKind::JumpBackward => {
                if let Some(target) = ins.jump_target() {
                    if !(0..=code_len).contains(&target) {
                        return Err(CoreError::JumpOutOfRange { offset: ins.offset, target });
                    }
                }
            }
            OperandKind::None | OperandKind::Slot => {}
        }
    }
    Ok(())
}

/// Number of instructions in a well-formed chunk, `None` if decoding fails.
pub fn instruction_count(chunk: &Chunk) -> Option<usize> {
    chunk.instructions().try_fold(0usize, |n, ins| ins.ok().map(|_| n + 1))
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{OpCode, Value};

    #[test]
    fn accepts_well_formed_chunk() {
        let mut c = Chunk::new("ok");
        let k = c.add_constant(Value::Int(1)) as u8;
        c.write_op(OpCode::Constant, 1);
        c.write(k, 1);
        c.write_op(OpCode::JumpIfTrue, 1);
        c.write_u16(1, 1);
        c.write_op(OpCode::Pop, 1);
        c.write_op(OpCode::Return, 2);
        assert_eq!(validate_chunk(&c), Ok(()));
        assert_eq!(instruction_count(&c), Some(4));
    }

    #[test]
    fn rejects_bad_constant_and_jump() {
        let mut c = Chunk::new("bad");
        c.write_op(OpCode::GetGlobal, 1);
        c.write(3, 1);
        assert_eq!(validate_chunk(&c), Err(CoreError::ConstantOutOfRange { offset: 0, index: 3, len: 0 }));

        let mut c = Chunk::new("bad");
        c.write_op(OpCode::Loop, 1);
        c.write_u16(10, 1);
        assert_eq!(validate_chunk(&c), Err(CoreError::JumpOutOfRange { offset: 0, target: -7 }));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let mut c = Chunk::new("bad");
        c.write_op(OpCode::Nil, 1);
        c.write(99, 1);
        assert_eq!(validate_chunk(&c), Err(CoreError::UnknownOpcode { offset: 1, byte: 99 }));
        assert_eq!(instruction_count(&c), None);
    }
}
