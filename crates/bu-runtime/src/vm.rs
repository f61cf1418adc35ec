//! Machine à pile : fetch / decode / execute sur un seul `Chunk`.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use bu_core::disasm::disassemble_instruction;
use bu_core::{Chunk, OpCode, Value};

use crate::arith::{self, ArithOp};
use crate::globals::GlobalStore;
use crate::{ExecStatus, RuntimeError, RuntimeErrorKind};

/// Limites de la VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Maximum operand stack depth.
    pub max_stack: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self { max_stack: 1024 }
    }
}

type Step = Result<Option<ExecStatus>, RuntimeErrorKind>;

/// One execution of one chunk.
///
/// Locals live in a slot-indexed array next to the operand stack; globals are
/// delegated to the borrowed [`GlobalStore`].
pub struct Vm<'a, G: GlobalStore + ?Sized> {
    chunk: &'a Chunk,
    globals: &'a mut G,
    out: &'a mut dyn Write,
    opts: VmOptions,
    ip: usize,
    stack: Vec<Value>,
    locals: Vec<Value>,
}

impl<'a, G: GlobalStore + ?Sized> Vm<'a, G> {
    /// Prépare une exécution.
    pub fn new(chunk: &'a Chunk, globals: &'a mut G, out: &'a mut dyn Write) -> Self {
        Self::with_options(chunk, globals, out, VmOptions::default())
    }

    /// Prépare une exécution avec des limites explicites.
    pub fn with_options(chunk: &'a Chunk, globals: &'a mut G, out: &'a mut dyn Write, opts: VmOptions) -> Self {
        Self { chunk, globals, out, opts, ip: 0, stack: Vec::with_capacity(64), locals: Vec::new() }
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Local slots written so far.
    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    /// Runs until `RETURN`, `HALT` or the first runtime error.
    #[tracing::instrument(level = "debug", skip_all, fields(chunk = self.chunk.name()))]
    pub fn run(&mut self) -> Result<ExecStatus, RuntimeError> {
        loop {
            let at = self.ip;
            if tracing::enabled!(tracing::Level::TRACE) {
                let (text, _) = disassemble_instruction(self.chunk, at);
                tracing::trace!(stack = ?self.stack, "{text}");
            }
            match self.step() {
                Ok(None) => {}
                Ok(Some(status)) => {
                    tracing::debug!(?status, "finished");
                    return Ok(status);
                }
                Err(kind) => {
                    let line = self.chunk.line_at(at).unwrap_or(0);
                    let err = RuntimeError { kind, line };
                    if matches!(err.kind, RuntimeErrorKind::UnknownOpcode(_)) {
                        tracing::error!(%err, offset = at, "corrupt bytecode");
                    } else {
                        tracing::warn!(%err, "runtime error");
                    }
                    return Err(err);
                }
            }
        }
    }

    fn step(&mut self) -> Step {
        let byte = self.read_u8()?;
        let op = OpCode::try_from(byte).map_err(RuntimeErrorKind::UnknownOpcode)?;

        match op {
            OpCode::Constant => {
                let v = self.read_constant()?.clone();
                self.push(v)?;
            }
            OpCode::Nil => self.push(Value::Nil)?,
            OpCode::True => self.push(Value::Bool(true))?,
            OpCode::False => self.push(Value::Bool(false))?,
            OpCode::Pop => {
                self.pop()?;
            }
            OpCode::Dup => {
                let v = self.peek()?.clone();
                self.push(v)?;
            }

            OpCode::Add => self.arith(ArithOp::Add)?,
            OpCode::Sub => self.arith(ArithOp::Sub)?,
            OpCode::Mul => self.arith(ArithOp::Mul)?,
            OpCode::Div => self.arith(ArithOp::Div)?,
            OpCode::Mod => self.arith(ArithOp::Rem)?,

            OpCode::Equal | OpCode::NotEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                let eq = arith::equals(&a, &b);
                self.push(Value::Bool(if op == OpCode::Equal { eq } else { !eq }))?;
            }
            OpCode::Greater => self.compare(">", |o| o.is_gt())?,
            OpCode::GreaterEqual => self.compare(">=", |o| o.is_ge())?,
            OpCode::Less => self.compare("<", |o| o.is_lt())?,
            OpCode::LessEqual => self.compare("<=", |o| o.is_le())?,

            OpCode::Negate => {
                let v = self.pop()?;
                self.push(arith::negate(&v)?)?;
            }
            OpCode::Not => {
                let v = self.pop()?;
                self.push(Value::Bool(v.is_falsey()))?;
            }
            OpCode::Inc | OpCode::Dec => {
                let v = self.pop()?;
                let delta = if op == OpCode::Inc { 1 } else { -1 };
                self.push(arith::step(&v, delta)?)?;
            }

            OpCode::GetLocal => {
                let slot = self.read_u8()?;
                let v = self.locals.get(usize::from(slot)).cloned().ok_or(RuntimeErrorKind::InvalidLocal(slot))?;
                self.push(v)?;
            }
            OpCode::SetLocal => {
                let slot = usize::from(self.read_u8()?);
                let v = self.peek()?.clone();
                if slot >= self.locals.len() {
                    self.locals.resize(slot + 1, Value::Nil);
                }
                self.locals[slot] = v;
            }

            OpCode::GetGlobal => {
                let name = self.read_name()?;
                let v = self.globals.get(&name).ok_or(RuntimeErrorKind::UndefinedVariable(name))?;
                self.push(v)?;
            }
            OpCode::DefineGlobal => {
                let name = self.read_name()?;
                let v = self.pop()?;
                if !self.globals.define(&name, v) {
                    return Err(RuntimeErrorKind::AlreadyDefined(name));
                }
            }
            OpCode::SetGlobal => {
                let name = self.read_name()?;
                let v = self.peek()?.clone();
                if !self.globals.assign(&name, v) {
                    return Err(RuntimeErrorKind::UndefinedAssignment(name));
                }
            }

            OpCode::Print => {
                let v = self.pop()?;
                writeln!(self.out, "{v}").map_err(|e| RuntimeErrorKind::Io(e.to_string()))?;
            }
            OpCode::Now => {
                let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0.0, |d| d.as_secs_f64());
                self.push(Value::Float(secs))?;
            }

            OpCode::Jump => {
                let off = usize::from(self.read_u16()?);
                self.jump_forward(off)?;
            }
            OpCode::JumpIfFalse => {
                let off = usize::from(self.read_u16()?);
                if self.peek()?.is_falsey() {
                    self.jump_forward(off)?;
                }
            }
            OpCode::JumpIfTrue => {
                let off = usize::from(self.read_u16()?);
                if !self.peek()?.is_falsey() {
                    self.jump_forward(off)?;
                }
            }
            OpCode::Loop => {
                let off = usize::from(self.read_u16()?);
                self.ip = self.ip.checked_sub(off).ok_or(RuntimeErrorKind::JumpOutOfRange)?;
            }

            OpCode::Return => {
                self.stack.pop();
                return Ok(Some(ExecStatus::Ok));
            }
            OpCode::Halt => return Ok(Some(ExecStatus::Abort)),
        }
        Ok(None)
    }

    /* ─────────── Pile ─────────── */

    fn push(&mut self, v: Value) -> Result<(), RuntimeErrorKind> {
        if self.stack.len() >= self.opts.max_stack {
            return Err(RuntimeErrorKind::StackOverflow(self.opts.max_stack));
        }
        self.stack.push(v);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    fn peek(&self) -> Result<&Value, RuntimeErrorKind> {
        self.stack.last().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /* ─────────── Opérateurs ─────────── */

    fn arith(&mut self, op: ArithOp) -> Result<(), RuntimeErrorKind> {
        // Right operand is on top.
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(arith::binary(op, &a, &b)?)
    }

    fn compare(&mut self, symbol: &'static str, test: fn(core::cmp::Ordering) -> bool) -> Result<(), RuntimeErrorKind> {
        let b = self.pop()?;
        let a = self.pop()?;
        let r = arith::compare(symbol, &a, &b)?.is_some_and(test);
        self.push(Value::Bool(r))
    }

    /* ─────────── Lecture du code ─────────── */

    fn read_u8(&mut self) -> Result<u8, RuntimeErrorKind> {
        let b = self.chunk.read_u8(self.ip).ok_or(RuntimeErrorKind::UnexpectedEnd)?;
        self.ip += 1;
        Ok(b)
    }

    fn read_u16(&mut self) -> Result<u16, RuntimeErrorKind> {
        let v = self.chunk.read_u16(self.ip).ok_or(RuntimeErrorKind::UnexpectedEnd)?;
        self.ip += 2;
        Ok(v)
    }

    fn read_constant(&mut self) -> Result<&'a Value, RuntimeErrorKind> {
        let idx = usize::from(self.read_u8()?);
        let chunk: &'a Chunk = self.chunk;
        chunk.constant(idx).ok_or(RuntimeErrorKind::InvalidConstant(idx))
    }

    fn read_name(&mut self) -> Result<String, RuntimeErrorKind> {
        let idx = usize::from(self.read_u8()?);
        match self.chunk.constant(idx) {
            Some(Value::Str(name)) => Ok(name.clone()),
            _ => Err(RuntimeErrorKind::InvalidConstant(idx)),
        }
    }

    fn jump_forward(&mut self, off: usize) -> Result<(), RuntimeErrorKind> {
        let target = self.ip + off;
        if target > self.chunk.len() {
            return Err(RuntimeErrorKind::JumpOutOfRange);
        }
        self.ip = target;
        Ok(())
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
