//! Scénarios du langage, de la source à la sortie imprimée.

use bu_compiler::CompileErrorKind;
use bu_core::disasm::disassemble_chunk;
use bu_runtime::{ExecStatus, InterpretError, RuntimeErrorKind};
use bu_tests::{compile, run};
use pretty_assertions::assert_eq;

fn output_of(src: &str) -> String {
    let r = run(src);
    if let Err(e) = r.result {
        panic!("{src:?} failed: {e}");
    }
    r.output
}

fn runtime_error_of(src: &str) -> (RuntimeErrorKind, u32) {
    match run(src).result {
        Err(InterpretError::Runtime(e)) => (e.kind, e.line),
        other => panic!("{src:?}: expected a runtime error, got {other:?}"),
    }
}

#[test]
fn arithmetic() {
    assert_eq!(
        output_of(r#"print(7 / 2); print(7.0 / 2); print(-7 % 3); print(1 + 0.5); print(2.5 * 2); print("ab" + "cd");"#),
        "3.5\n3.5\n2\n1.5\n5.0\nabcd\n"
    );
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(output_of("print(1 + 2 * 3); print((1 + 2) * 3); print(-(4 - 6));"), "7\n9\n2\n");
}

#[test]
fn comparisons_and_equality() {
    assert_eq!(
        output_of(r#"print(1 == 1.0); print(1 != 2); print("a" < "b"); print(2 >= 3); print(!nil); print(nil == false);"#),
        "true\ntrue\ntrue\nfalse\ntrue\nfalse\n"
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(output_of(r#"print(nil or "x"); print(false and missing); print(1 and 2); print(true || missing);"#), "x\nfalse\n2\ntrue\n");
}

#[test]
fn division_is_real_and_modulo_is_floored() {
    assert_eq!(output_of("print(10 / 4); print(8 / 2); print(-7 / 2);"), "2.5\n4.0\n-3.5\n");
    assert_eq!(output_of("print(-7 % 3); print(7 % -3); print(-7 mod -3); print(-7.5 % 2);"), "2\n-2\n-1\n0.5\n");
}

#[test]
fn postfix_update_in_skipped_operand_does_not_run() {
    assert_eq!(output_of("var x = 1; print(false and x++); print(x);"), "false\n1\n");
    assert_eq!(output_of("{ var x = 1; print(nil or x--); print(x); }"), "1\n0\n");
    assert_eq!(output_of("print(true or q++);"), "true\n");
    assert_eq!(output_of("var y = 1; print(true and y++); print(y);"), "1\n2\n");
}

#[test]
fn word_operators_and_case_insensitive_keywords() {
    assert_eq!(output_of("print(true and not false); print(7 mod 4); VAR X = 1; PRINT(X);"), "true\n3\n1\n");
}

#[test]
fn compound_assignment() {
    assert_eq!(output_of("var n = 10; n += 5; n -= 3; n *= 2; n /= 4; print(n);"), "6.0\n");
}

#[test]
fn prefix_updates_are_visible_immediately() {
    assert_eq!(output_of("var i = 1; print(++i); print(i); print(--i);"), "2\n2\n1\n");
}

#[test]
fn postfix_updates_run_in_order() {
    assert_eq!(output_of("var a = 1; var b = 10; print(a++ + b--); print(a); print(b);"), "11\n2\n9\n");
    assert_eq!(output_of("{ var i = 0; i++; i++; print(i); }"), "2\n");
}

#[test]
fn locals() {
    assert_eq!(output_of("{ var u; print(u); }"), "nil\n");
    assert_eq!(output_of("var g = 3; { var l = g * 2; g = l; } print(g);"), "6\n");
}

#[test]
fn now_is_a_positive_float() {
    assert_eq!(output_of("var t = now; print(t > 0);"), "true\n");
}

#[test]
fn runtime_errors() {
    assert_eq!(runtime_error_of("print(1 / 0);"), (RuntimeErrorKind::DivisionByZero, 1));
    assert_eq!(
        runtime_error_of(r#"print("a" - 1);"#),
        (RuntimeErrorKind::TypeMismatch { op: "-", operands: "string and int".into() }, 1)
    );
    assert_eq!(runtime_error_of("x = 1;"), (RuntimeErrorKind::UndefinedAssignment("x".into()), 1));
    assert_eq!(runtime_error_of("var d = 1;\nvar d = 2;"), (RuntimeErrorKind::AlreadyDefined("d".into()), 2));
}

#[test]
fn runtime_error_stops_after_earlier_output() {
    let r = run("print(1);\n\nprint(-\"s\");\nprint(2);");
    let err = r.result.unwrap_err();
    assert_eq!(err.to_string(), "[line 3] unsupported operand types for -: string");
    assert_eq!(r.output, "1\n");
}

#[test]
fn compile_errors_are_collected() {
    let r = run("{ var a; var a; }\n{ var b; var b; }");
    let Err(InterpretError::Compile(e)) = r.result else { panic!("expected a compile error") };
    let kinds: Vec<_> = e.diagnostics.iter().map(|d| (d.kind.clone(), d.line)).collect();
    assert_eq!(
        kinds,
        vec![
            (CompileErrorKind::DuplicateLocal("a".into()), 1),
            (CompileErrorKind::DuplicateLocal("b".into()), 2),
        ]
    );
    assert_eq!(r.output, "");
}

#[test]
fn invalid_targets_are_compile_errors() {
    for (src, kind) in [
        ("1 = 2;", CompileErrorKind::InvalidAssignmentTarget),
        ("5++;", CompileErrorKind::InvalidIncrementTarget),
    ] {
        match run(src).result {
            Err(InterpretError::Compile(e)) => assert_eq!(e.first().map(|d| d.kind.clone()), Some(kind), "{src}"),
            other => panic!("{src:?}: expected a compile error, got {other:?}"),
        }
    }
}

#[test]
fn parse_errors() {
    for (src, message) in [
        ("if (x) print(1);", "'if' is not supported"),
        ("print 1;", "expected '(' after 'print'"),
        ("var s = \"abc;", "unterminated string literal"),
    ] {
        match run(src).result {
            Err(InterpretError::Parse(e)) => {
                assert_eq!(e.message, message);
                assert_eq!(e.line, 1);
            }
            other => panic!("{src:?}: expected a parse error, got {other:?}"),
        }
    }
}

#[test]
fn disassembly_of_a_small_program() -> anyhow::Result<()> {
    let chunk = compile("var a = 1;\nprint(a);")?;
    let text = disassemble_chunk(&chunk);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "== __main__ ==");
    assert!(lines[1].starts_with("0000    1 CONSTANT"), "{}", lines[1]);
    assert!(lines[1].ends_with("'1'"));
    assert!(lines[2].starts_with("0002    | DEFINE_GLOBAL"), "{}", lines[2]);
    assert!(lines[2].ends_with("'a'"));
    assert!(lines[3].starts_with("0004    2 GET_GLOBAL"), "{}", lines[3]);
    assert_eq!(lines[4], "0006    | PRINT");
    assert_eq!(lines[5], "0007    | NIL");
    assert_eq!(lines[6], "0008    | RETURN");
    assert_eq!(lines.len(), 7);
    Ok(())
}

#[test]
fn halt_status_is_distinct() {
    use bu_core::{Chunk, OpCode};
    use bu_runtime::Globals;

    let mut chunk = Chunk::new("halt");
    chunk.write_op(OpCode::Halt, 1);
    let (status, stack, _) = bu_tests::run_chunk(&chunk, &mut Globals::new()).unwrap();
    assert_eq!(status, ExecStatus::Abort);
    assert!(stack.is_empty());
}
