//! File d’émission différée (post-incrément / post-décrément).
//!
//! A postfix update yields the old value inline; the write-back is queued here and
//! appended once the enclosing statement has consumed that value.

use bu_core::OpCode;
use smallvec::SmallVec;

/// Where a variable lives once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    /// Local slot.
    Local(u8),
    /// Global name, as a constant-pool index.
    Global(u8),
}

impl VarRef {
    /// Opcode + operand reading the variable.
    pub const fn get(self) -> (OpCode, u8) {
        match self {
            Self::Local(slot) => (OpCode::GetLocal, slot),
            Self::Global(name) => (OpCode::GetGlobal, name),
        }
    }

    /// Opcode + operand writing the stack top into the variable (value stays pushed).
    pub const fn set(self) -> (OpCode, u8) {
        match self {
            Self::Local(slot) => (OpCode::SetLocal, slot),
            Self::Global(name) => (OpCode::SetGlobal, name),
        }
    }
}

/// A pending `GET x; INC|DEC; SET x; POP` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    /// `Inc` or `Dec`.
    pub step: OpCode,
    /// Updated variable.
    pub target: VarRef,
    /// Line attributed to the emitted bytes.
    pub line: u32,
}

impl Task {
    /// Instruction sequence as `(opcode, operand)` pairs.
    pub const fn sequence(&self) -> [(OpCode, Option<u8>); 4] {
        let (get, get_arg) = self.target.get();
        let (set, set_arg) = self.target.set();
        [(get, Some(get_arg)), (self.step, None), (set, Some(set_arg)), (OpCode::Pop, None)]
    }
}

/// FIFO of pending tasks.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    tasks: SmallVec<[Task; 4]>,
}

impl DeferredQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task.
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Removes every task, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Task> + '_ {
        self.tasks.drain(..)
    }

    /// Removes the tasks queued at or after position `start`, oldest first.
    /// Earlier tasks stay pending.
    pub fn drain_from(&mut self, start: usize) -> impl Iterator<Item = Task> + '_ {
        let start = start.min(self.tasks.len());
        self.tasks.drain(start..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drains_in_insertion_order() {
        let mut q = DeferredQueue::new();
        q.push(Task { step: OpCode::Inc, target: VarRef::Global(1), line: 1 });
        q.push(Task { step: OpCode::Dec, target: VarRef::Local(0), line: 2 });
        let lines: Vec<u32> = q.drain().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn drain_from_keeps_older_tasks() {
        let mut q = DeferredQueue::new();
        q.push(Task { step: OpCode::Inc, target: VarRef::Global(1), line: 1 });
        let mark = q.len();
        q.push(Task { step: OpCode::Dec, target: VarRef::Local(0), line: 2 });
        q.push(Task { step: OpCode::Inc, target: VarRef::Local(1), line: 3 });
        let lines: Vec<u32> = q.drain_from(mark).map(|t| t.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain_from(5).count(), 0);
        assert!(q.is_empty());
    }

    #[test]
    fn sequence_reads_steps_writes_and_pops() {
        let t = Task { step: OpCode::Dec, target: VarRef::Local(3), line: 9 };
        assert_eq!(
            t.sequence(),
            [
                (OpCode::GetLocal, Some(3)),
                (OpCode::Dec, None),
                (OpCode::SetLocal, Some(3)),
                (OpCode::Pop, None)
            ]
        );
    }
}
