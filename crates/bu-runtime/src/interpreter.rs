//! Pipeline complet : source → AST → chunk → VM.
//!
//! Un [`Interpreter`] garde son store de globales entre deux appels à
//! [`Interpreter::interpret`], ce qui permet un REPL ligne à ligne.

use std::fmt;
use std::io::{self, Write};

use bu_ast::Program;
use bu_compiler::{CompileError, Compiler, CompilerOptions};
use bu_core::disasm::disassemble_chunk;
use bu_core::{Chunk, SourceId};
use bu_lexer::LexerOptions;
use bu_parser::{ParseError, Parser};
use thiserror::Error;

use crate::globals::{GlobalStore, Globals};
use crate::output::{Captured, Output};
use crate::vm::{Vm, VmOptions};
use crate::{ExecStatus, RuntimeError, RuntimeErrorKind};

/// Options de bout en bout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Lexer settings.
    pub lexer: LexerOptions,
    /// Compiler settings.
    pub compiler: CompilerOptions,
    /// VM limits.
    pub vm: VmOptions,
    /// Écrit le désassemblage du chunk sur la sortie avant de l’exécuter.
    pub disassemble: bool,
}

/// Échec d’une étape du pipeline.
#[derive(Debug, Error)]
pub enum InterpretError {
    /// Syntaxe.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Compilation (toutes les erreurs de l’unité).
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Exécution.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    /// Source line of the first reported problem.
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Parse(e) => Some(e.line),
            Self::Compile(e) => e.first().map(|d| d.line),
            Self::Runtime(e) => Some(e.line),
        }
    }
}

/// Interpréteur bu.
pub struct Interpreter<G: GlobalStore = Globals> {
    globals: G,
    out: Output,
    opts: InterpreterOptions,
}

impl Interpreter {
    /// Interpréteur qui écrit sur stdout.
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default())
    }

    /// Idem avec options.
    pub fn with_options(opts: InterpreterOptions) -> Self {
        Self { globals: Globals::new(), out: Box::new(io::stdout()), opts }
    }

    /// Interpréteur dont la sortie est capturée en mémoire.
    pub fn with_captured_output() -> (Self, Captured) {
        let cap = Captured::default();
        (Self::with_output(cap.clone()), cap)
    }

    /// Interpréteur qui écrit dans `out`.
    pub fn with_output(out: impl Write + Send + 'static) -> Self {
        Self { globals: Globals::new(), out: Box::new(out), opts: InterpreterOptions::default() }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GlobalStore + fmt::Debug> Interpreter<G> {
    /// Interpréteur branché sur un store de globales existant.
    pub fn with_globals(globals: G, out: impl Write + Send + 'static, opts: InterpreterOptions) -> Self {
        Self { globals, out: Box::new(out), opts }
    }

    /// Options in use.
    pub const fn options(&self) -> &InterpreterOptions {
        &self.opts
    }

    /// Globals defined so far.
    pub const fn globals(&self) -> &G {
        &self.globals
    }

    /// Mutable access to the globals.
    pub fn globals_mut(&mut self) -> &mut G {
        &mut self.globals
    }

    /// Parse, compile puis exécute `src`.
    ///
    /// Parse and compile errors stop before any bytecode runs, so nothing is
    /// printed and no global changes.
    pub fn interpret(&mut self, src: &str) -> Result<ExecStatus, InterpretError> {
        let program = Parser::with_options(src, SourceId(0), self.opts.lexer).parse_program()?;
        self.run_program(&program)
    }

    /// Compile puis exécute un AST déjà construit.
    pub fn run_program(&mut self, program: &Program) -> Result<ExecStatus, InterpretError> {
        let chunk = Compiler::new(self.opts.compiler.clone()).compile(program)?;
        Ok(self.run_chunk(&chunk)?)
    }

    /// Exécute un chunk sur les globales de l’interpréteur.
    pub fn run_chunk(&mut self, chunk: &Chunk) -> Result<ExecStatus, RuntimeError> {
        if self.opts.disassemble {
            let text = disassemble_chunk(chunk);
            tracing::debug!("\n{text}");
            self.out.write_all(text.as_bytes()).map_err(|e| io_error(&e))?;
        }
        let result = Vm::with_options(chunk, &mut self.globals, &mut *self.out, self.opts.vm).run();
        self.out.flush().map_err(|e| io_error(&e))?;
        tracing::trace!(globals = ?self.globals, "after run");
        result
    }
}

fn io_error(e: &io::Error) -> RuntimeError {
    RuntimeError { kind: RuntimeErrorKind::Io(e.to_string()), line: 0 }
}

/* ─────────────────────────── Tests ─────────────────────────── */
