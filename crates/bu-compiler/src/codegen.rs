//! Émetteur : un parcours en profondeur de l’AST, une méthode par genre de nœud.

use bu_ast::{self as ast, BinaryOp, Expr, Fixity, IncDecOp, Literal, LogicalOp, Stmt, UnaryOp};
use bu_core::{Chunk, OpCode, Value};

use crate::deferred::{DeferredQueue, Task, VarRef};
use crate::scope::{ScopeError, ScopeTable};
use crate::{CompileError, CompileErrorKind, Diagnostic};

/// Single-use code generator for one chunk.
pub(crate) struct Emitter {
    chunk: Chunk,
    scopes: ScopeTable,
    deferred: DeferredQueue,
    diagnostics: Vec<Diagnostic>,
    pool_full: bool,
}

impl Emitter {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            chunk: Chunk::new(name),
            scopes: ScopeTable::new(),
            deferred: DeferredQueue::new(),
            diagnostics: Vec::new(),
            pool_full: false,
        }
    }

    /// Compiles every statement, then the implicit `NIL; RETURN`.
    pub(crate) fn program(mut self, program: &ast::Program) -> Result<Chunk, CompileError> {
        for stmt in &program.statements {
            self.statement(stmt);
        }
        let line = program.last_line().max(1);
        self.emit_op(OpCode::Nil, line);
        self.emit_op(OpCode::Return, line);

        if self.diagnostics.is_empty() {
            Ok(self.chunk)
        } else {
            Err(CompileError { diagnostics: self.diagnostics })
        }
    }

    /* ─────────── Statements ─────────── */

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => {
                self.expression(expr);
                self.emit_op(OpCode::Pop, expr.line());
            }
            Stmt::Print { keyword, expr } => {
                self.expression(expr);
                self.emit_op(OpCode::Print, keyword.line());
            }
            Stmt::Var { name, initializer } => self.var_declaration(name, initializer.as_ref()),
            Stmt::Block { statements, .. } => {
                self.scopes.begin_scope();
                for inner in statements {
                    self.statement(inner);
                }
                let dropped = self.scopes.end_scope();
                tracing::trace!(depth = self.scopes.depth(), dropped, "block closed");
            }
        }
        self.flush_deferred();
    }

    fn var_declaration(&mut self, name: &ast::Token, initializer: Option<&Expr>) {
        let line = name.line();
        match initializer {
            Some(expr) => self.expression(expr),
            None => self.emit_op(OpCode::Nil, line),
        }

        if self.scopes.is_global() {
            let idx = self.identifier_constant(name);
            self.emit_with_operand(OpCode::DefineGlobal, idx, line);
            return;
        }

        match self.scopes.declare(&name.lexeme) {
            Ok(slot) => {
                self.emit_with_operand(OpCode::SetLocal, slot, line);
                self.emit_op(OpCode::Pop, line);
            }
            Err(ScopeError::Duplicate) => {
                self.error(name, CompileErrorKind::DuplicateLocal(name.lexeme.clone()));
            }
            Err(ScopeError::TooMany) => self.error(name, CompileErrorKind::TooManyLocals),
        }
    }

    fn flush_deferred(&mut self) {
        self.flush_deferred_from(0);
    }

    /// Emits the tasks queued since `start`; older ones stay pending.
    fn flush_deferred_from(&mut self, start: usize) {
        if self.deferred.len() <= start {
            return;
        }
        let tasks: Vec<Task> = self.deferred.drain_from(start).collect();
        tracing::debug!(tasks = tasks.len(), at = self.chunk.len(), "flushing deferred tasks");
        for task in tasks {
            for (op, operand) in task.sequence() {
                match operand {
                    Some(arg) => self.emit_with_operand(op, arg, task.line),
                    None => self.emit_op(op, task.line),
                }
            }
        }
    }

    /* ─────────── Expressions ─────────── */

    fn expression(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { value, token } => self.literal(value, token),
            Expr::Grouping(inner) => self.expression(inner),
            Expr::Variable(token) => {
                let var = self.resolve(token);
                let (op, arg) = var.get();
                self.emit_with_operand(op, arg, token.line());
            }
            Expr::Assign { target, value, equals } => {
                self.expression(value);
                match target.as_ref() {
                    Expr::Variable(name) => {
                        let var = self.resolve(name);
                        let (op, arg) = var.set();
                        self.emit_with_operand(op, arg, equals.line());
                    }
                    _ => self.error(equals, CompileErrorKind::InvalidAssignmentTarget),
                }
            }
            Expr::Binary { left, op, token, right } => {
                self.expression(left);
                self.expression(right);
                self.emit_op(binary_opcode(*op), token.line());
            }
            Expr::Logical { left, op, token, right } => {
                self.expression(left);
                let jump = match op {
                    LogicalOp::And => OpCode::JumpIfFalse,
                    LogicalOp::Or => OpCode::JumpIfTrue,
                };
                let at = self.emit_jump(jump, token.line());
                self.emit_op(OpCode::Pop, token.line());
                // Postfix updates in the right operand run only when it does.
                let mark = self.deferred.len();
                self.expression(right);
                self.flush_deferred_from(mark);
                self.patch_jump(at, token);
            }
            Expr::Unary { op, token, operand } => {
                self.expression(operand);
                let code = match op {
                    UnaryOp::Neg => OpCode::Negate,
                    UnaryOp::Not => OpCode::Not,
                };
                self.emit_op(code, token.line());
            }
            Expr::IncDec { op, fixity, target, token } => self.inc_dec(*op, *fixity, target, token),
            Expr::Now(token) => self.emit_op(OpCode::Now, token.line()),
        }
    }

    fn literal(&mut self, value: &Literal, token: &ast::Token) {
        let line = token.line();
        let constant = match value {
            Literal::Nil => return self.emit_op(OpCode::Nil, line),
            Literal::Bool(true) => return self.emit_op(OpCode::True, line),
            Literal::Bool(false) => return self.emit_op(OpCode::False, line),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(x) => Value::Float(*x),
            Literal::Str(s) => Value::Str(s.clone()),
        };
        let idx = self.make_constant(constant, token);
        self.emit_with_operand(OpCode::Constant, idx, line);
    }

    fn inc_dec(&mut self, op: IncDecOp, fixity: Fixity, target: &Expr, token: &ast::Token) {
        let Expr::Variable(name) = target else {
            self.error(token, CompileErrorKind::InvalidIncrementTarget);
            return;
        };
        let var = self.resolve(name);
        let step = match op {
            IncDecOp::Increment => OpCode::Inc,
            IncDecOp::Decrement => OpCode::Dec,
        };
        let line = token.line();
        let (get, get_arg) = var.get();
        self.emit_with_operand(get, get_arg, line);
        match fixity {
            Fixity::Prefix => {
                self.emit_op(step, line);
                let (set, set_arg) = var.set();
                self.emit_with_operand(set, set_arg, line);
            }
            Fixity::Postfix => self.deferred.push(Task { step, target: var, line }),
        }
    }

    /* ─────────── Helpers ─────────── */

    fn resolve(&mut self, name: &ast::Token) -> VarRef {
        match self.scopes.resolve(&name.lexeme) {
            Some(slot) => VarRef::Local(slot),
            None => VarRef::Global(self.identifier_constant(name)),
        }
    }

    fn identifier_constant(&mut self, name: &ast::Token) -> u8 {
        self.make_constant(Value::Str(name.lexeme.clone()), name)
    }

    fn make_constant(&mut self, value: Value, token: &ast::Token) -> u8 {
        let idx = self.chunk.add_constant(value);
        if let Ok(idx) = u8::try_from(idx) {
            return idx;
        }
        if !self.pool_full {
            self.pool_full = true;
            self.error(token, CompileErrorKind::TooManyConstants);
        }
        0
    }

    fn emit_op(&mut self, op: OpCode, line: u32) {
        tracing::trace!(offset = self.chunk.len(), ?op, line, "emit");
        self.chunk.write_op(op, line);
    }

    fn emit_with_operand(&mut self, op: OpCode, operand: u8, line: u32) {
        self.emit_op(op, line);
        self.chunk.write(operand, line);
    }

    /// Emits `op` with a placeholder operand; returns the operand offset.
    fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.emit_op(op, line);
        self.chunk.write_u16(u16::MAX, line);
        self.chunk.len() - 2
    }

    fn patch_jump(&mut self, at: usize, token: &ast::Token) {
        let distance = self.chunk.len() - at - 2;
        let Ok(distance) = u16::try_from(distance) else {
            self.error(token, CompileErrorKind::JumpTooLarge);
            return;
        };
        if let Err(e) = self.chunk.patch_u16(at, distance) {
            self.error(token, CompileErrorKind::Encoding(e));
        }
    }

    fn error(&mut self, token: &ast::Token, kind: CompileErrorKind) {
        let diag = Diagnostic::at(token, kind);
        tracing::debug!(line = diag.line, "{diag}");
        self.diagnostics.push(diag);
    }
}

/// Opcode for a binary operator.
const fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Eq => OpCode::Equal,
        BinaryOp::Ne => OpCode::NotEqual,
        BinaryOp::Lt => OpCode::Less,
        BinaryOp::Le => OpCode::LessEqual,
        BinaryOp::Gt => OpCode::Greater,
        BinaryOp::Ge => OpCode::GreaterEqual,
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
