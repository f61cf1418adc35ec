//! Propriétés de bout en bout : pool de constantes, neutralité de pile,
//! résolution des locales, contrat du store de globales, ordre des opérandes.

use bu_core::{Chunk, Value};
use bu_runtime::{ExecStatus, GlobalStore, Globals, InterpretError, RuntimeErrorKind};
use bu_tests::{compile, run, run_chunk};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn sum_of_two_globals() {
    let r = run("var a = 10; var b = 20; print(a + b);");
    assert_eq!(r.result.unwrap(), ExecStatus::Ok);
    assert_eq!(r.output, "30\n");
    assert_eq!(r.globals.value("a"), Some(&Value::Int(10)));
    assert_eq!(r.globals.value("b"), Some(&Value::Int(20)));
    assert_eq!(r.globals.len(), 2);
}

#[test]
fn subtraction_keeps_operand_order() {
    let r = run("print(5 - 2); print(8 / 2); print(7 % 4);");
    assert_eq!(r.output, "3\n4.0\n3\n");
}

#[test]
fn postfix_update_lands_after_the_statement() {
    let r = run("var x = 5;\nprint(x++);\nprint(x);");
    r.result.unwrap();
    assert_eq!(r.output, "5\n6\n");
}

#[test]
fn undefined_global_is_a_runtime_error() {
    let r = run("print(q);");
    match r.result {
        Err(InterpretError::Runtime(e)) => assert_eq!(e.kind, RuntimeErrorKind::UndefinedVariable("q".into())),
        other => panic!("expected a runtime error, got {other:?}"),
    }
    assert_eq!(r.output, "");
}

#[test]
fn inner_local_shadows_outer_until_block_ends() {
    let r = run("{ var x = 1; { var x = 2; print(x); } print(x); }");
    r.result.unwrap();
    assert_eq!(r.output, "2\n1\n");
}

#[test]
fn outer_local_is_visible_in_nested_block() {
    let r = run("{ var x = 1; { x = x + 41; } print(x); }");
    r.result.unwrap();
    assert_eq!(r.output, "42\n");
}

#[test]
fn local_is_gone_after_its_block() {
    let r = run("{ var y = 1; } print(y);");
    match r.result {
        Err(InterpretError::Runtime(e)) => assert_eq!(e.kind, RuntimeErrorKind::UndefinedVariable("y".into())),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn global_store_contract() {
    let mut g = Globals::new();
    assert!(g.define("x", Value::Int(1)));
    assert!(!g.define("x", Value::Int(2)));
    assert_eq!(g.get("x"), Some(Value::Int(1)));
    assert!(!g.assign("y", Value::Int(1)));
    assert_eq!(g.get("y"), None);
    assert_eq!(g.get("z"), None);
}

#[test]
fn falsy_global_reads_back() {
    let r = run("var off = false; print(off); off = 0; print(off);");
    r.result.unwrap();
    assert_eq!(r.output, "false\n0\n");
}

#[test]
fn compiled_program_leaves_an_empty_stack() -> anyhow::Result<()> {
    let chunk = compile("var a = 1; a = a + 1; a++; ++a; print(a); { var l = a; l--; print(l); } 1 + 2;")?;
    let mut globals = Globals::new();
    let (status, stack, out) = run_chunk(&chunk, &mut globals)?;
    assert_eq!(status, ExecStatus::Ok);
    assert!(stack.is_empty(), "{stack:?}");
    assert_eq!(out, "4\n3\n");
    Ok(())
}

/* ─────────────────────────── proptest ─────────────────────────── */

fn constant() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        (-50i64..50).prop_map(Value::Int),
        (-50i32..50).prop_map(|i| Value::Float(f64::from(i) / 4.0)),
        "[a-c]{0,2}".prop_map(Value::Str),
    ]
}

/// One stack-neutral statement; `n` and `m` are small literals.
fn statement() -> impl Strategy<Value = String> {
    (0usize..8, 0i64..100, 0i64..100).prop_map(|(kind, n, m)| match kind {
        0 => format!("print({n} + {m});"),
        1 => format!("g = g + {n};"),
        2 => "g++;".to_owned(),
        3 => format!("print(--g * {m});"),
        4 => format!("{{ var a = {n}; var b = a++; print(a + b); }}"),
        5 => format!("{n} * {m};"),
        6 => format!("print({n} < {m} and g > 0 or nil);"),
        _ => format!("{{ var s = \"v\"; {{ var s = {m}; s += {n}; }} print(s); }}"),
    })
}

proptest! {
    #[test]
    fn constant_pool_dedups(values in prop::collection::vec(constant(), 0..40)) {
        let mut chunk = Chunk::new("pool");
        let mut distinct: Vec<Value> = Vec::new();
        for v in &values {
            let before = chunk.constants().len();
            let first = chunk.add_constant(v.clone());
            let again = chunk.add_constant(v.clone());
            prop_assert_eq!(first, again);
            prop_assert!(chunk.constants().len() <= before + 1);
            if !distinct.contains(v) {
                distinct.push(v.clone());
            }
        }
        prop_assert_eq!(chunk.constants().len(), distinct.len());
    }

    #[test]
    fn statements_are_stack_neutral(stmts in prop::collection::vec(statement(), 0..12)) {
        let src = format!("var g = 1;\n{}", stmts.join("\n"));
        let chunk = compile(&src).map_err(|e| TestCaseError::fail(format!("{e:#}")))?;
        let mut globals = Globals::new();
        let (status, stack, _) = run_chunk(&chunk, &mut globals).map_err(|e| TestCaseError::fail(format!("{e:#}")))?;
        prop_assert_eq!(status, ExecStatus::Ok);
        prop_assert!(stack.is_empty());
    }
}
