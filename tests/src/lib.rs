//! Outils partagés par les tests d'intégration.

#![deny(missing_docs)]

use anyhow::Context;
use bu_core::{Chunk, Value};
use bu_runtime::{Captured, ExecStatus, Globals, InterpretError, Interpreter, Vm};

/// Installe un subscriber `tracing` (filtre `RUST_LOG`, défaut `warn`). Idempotent.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Result of running one source text on a fresh interpreter.
pub struct Run {
    /// Status or first error.
    pub result: Result<ExecStatus, InterpretError>,
    /// Everything `print` wrote.
    pub output: String,
    /// Globals after the run.
    pub globals: Globals,
}

/// Runs `src` on a fresh interpreter with captured output.
pub fn run(src: &str) -> Run {
    init_tracing();
    let (mut interp, out) = Interpreter::with_captured_output();
    let result = interp.interpret(src);
    Run { result, output: out.get(), globals: interp.globals().clone() }
}

/// Parses and compiles `src`, failing with context on either step.
pub fn compile(src: &str) -> anyhow::Result<Chunk> {
    let program = bu_parser::parse(src).context("parse")?;
    let chunk = bu_compiler::compile(&program).context("compile")?;
    Ok(chunk)
}

/// Runs a chunk directly on a VM and returns the status with the final stack.
pub fn run_chunk(chunk: &Chunk, globals: &mut Globals) -> anyhow::Result<(ExecStatus, Vec<Value>, String)> {
    let cap = Captured::default();
    let mut out = cap.clone();
    let mut vm = Vm::new(chunk, globals, &mut out);
    let status = vm.run()?;
    let stack = vm.stack().to_vec();
    Ok((status, stack, cap.get()))
}
