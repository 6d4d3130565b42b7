//! Compiler integration tests: assembly shape, symbol tables, and the error
//! surface of the lowering phases.

use wireword::error::Error;
use wireword::{compile, compiler, Machine};

// =============================================================================
// ASSEMBLY SHAPE
// =============================================================================

#[test]
fn test_every_line_is_numbered_and_terminated() {
    let program = compile(
        "global int a;
         sub main() {
             a = 1;
             if (a < 2) { a = 3; }
         }",
    )
    .unwrap();
    for (i, line) in program.assembly.lines().enumerate() {
        assert!(
            line.starts_with(&format!("{i}. ")),
            "line {i} is misnumbered: {line}"
        );
        assert!(line.ends_with(';'), "line {i} lacks a terminator: {line}");
        let body = &line[line.find(' ').unwrap() + 1..line.len() - 1];
        assert_eq!(
            body.split_whitespace().count(),
            4,
            "line {i} is not opcode + 3 operands: {line}"
        );
    }
}

#[test]
fn test_straight_line_program_compiles_to_three_lines() {
    let program = compile("global int a; sub main() { a = 1 + 2; }").unwrap();
    // stack prologue, the inlined add, the jump to the halt line
    assert_eq!(
        program.assembly,
        "0. MLZ -1 5 4;\n1. ADD 1 2 1;\n2. MLZ -1 2 0;\n"
    );
    assert_eq!(program.symbols.offset("a"), Some(1));
}

#[test]
fn test_first_line_initializes_the_stack_pointer() {
    let program = compile("sub main() { int a = 1; }").unwrap();
    let first = program.assembly.lines().next().unwrap();
    assert!(first.starts_with("0. MLZ -1 "), "no prologue: {first}");
}

#[test]
fn test_operators_inline_with_no_call_machinery() {
    // every operator application becomes a primitive opcode in place; only
    // real subroutine calls touch the stack pointer after the prologue
    let program = compile(
        "global int a;
         sub main() { a = 1 + 2 + 3 + 4; }",
    )
    .unwrap();
    let sp_touches = program
        .assembly
        .lines()
        .skip(1)
        .filter(|line| line.contains("A4") || line.ends_with(" 4;"))
        .count();
    assert_eq!(sp_touches, 0, "inlined operators used the stack");
}

#[test]
fn test_conditionals_emit_a_forward_branch() {
    let program = compile(
        "global int a;
         sub main() { if (1 < 2) { a = 1; } }",
    )
    .unwrap();
    assert!(program.assembly.contains("MNZ"), "no conditional branch");
}

#[test]
fn test_compiled_assembly_loads_back_into_the_machine() {
    let program = compile(
        "global int a;
         sub helper(int x) -> int { return x + 1; }
         sub main() {
             a = helper(1);
             while (a < 5) { a += 1; }
         }",
    )
    .unwrap();
    let machine = Machine::load(&program.assembly).unwrap();
    assert!(!machine.is_empty());
}

// =============================================================================
// SYMBOL TABLE
// =============================================================================

#[test]
fn test_symbols_cover_globals_and_qualified_locals() {
    let program = compile(
        "global int g;
         sub main() {
             int x = 1;
             int arr[4] = [1, 2, 3, 4];
         }",
    )
    .unwrap();
    assert!(program.symbols.offset("g").is_some());
    assert!(program.symbols.offset("main::x").is_some());
    let arr = program.symbols.get("main::arr").unwrap();
    assert_eq!(arr.size, 4);
    assert!(program.symbols.offset("x").is_none());
}

#[test]
fn test_symbol_offsets_never_overlap() {
    let program = compile(
        "global int a, b;
         sub main() {
             int arr[3] = [1, 2, 3];
             int x = 1;
         }",
    )
    .unwrap();
    let mut spans: Vec<(u16, u16)> = program
        .symbols
        .iter()
        .map(|(_, sym)| (sym.offset, sym.offset + sym.size))
        .collect();
    spans.sort();
    assert!(spans[0].0 >= 1, "offset 0 is the program counter");
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping symbols: {spans:?}");
    }
}

// =============================================================================
// ERROR SURFACE
// =============================================================================

#[test]
fn test_syntax_error_carries_a_position() {
    match compile("sub main() { int a = ; }") {
        Err(Error::SyntaxError { line, col, .. }) => {
            assert_eq!(line, 1);
            assert!(col > 1);
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_missing_main_is_rejected() {
    assert_eq!(
        compile("sub helper() { int a = 1; }").unwrap_err(),
        Error::MissingMain
    );
}

#[test]
fn test_undeclared_variable_is_rejected() {
    assert_eq!(
        compile("sub main() { int a = b; }").unwrap_err(),
        Error::UndeclaredVariable {
            name: "b".to_string()
        }
    );
}

#[test]
fn test_unknown_operator_reports_the_signature() {
    // the stock prelude deliberately defines no division
    match compile("sub main() { int a = 1 / 2; }") {
        Err(Error::UnknownOperator {
            symbol, operands, ..
        }) => {
            assert_eq!(symbol, "/");
            assert_eq!(operands, "int, int");
        }
        other => panic!("expected unknown operator, got {other:?}"),
    }
}

#[test]
fn test_unknown_subroutine_is_rejected() {
    assert_eq!(
        compile("sub main() { int a = nope(1); }").unwrap_err(),
        Error::UnknownSubroutine {
            name: "nope".to_string()
        }
    );
}

#[test]
fn test_wrong_argument_count_reports_the_arity() {
    let src = "sub pick(int a, int b) -> int { return a; }
               sub main() { int x = pick(1); }";
    assert_eq!(
        compile(src).unwrap_err(),
        Error::ArityMismatch {
            name: "pick".to_string(),
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn test_intrinsics_check_their_operand_count() {
    match compile("sub main() { int x = __ADD__(1); }") {
        Err(Error::ArityMismatch {
            name,
            expected,
            found,
        }) => {
            assert_eq!(name, "__ADD__");
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
        }
        other => panic!("expected arity mismatch, got {other:?}"),
    }
}

#[test]
fn test_non_constant_array_size_is_rejected() {
    match compile("sub main() { int n = 2; int a[n] = [1, 2]; }") {
        Err(Error::NonConstantArraySize { name }) => assert_eq!(name, "a"),
        other => panic!("expected non-constant size error, got {other:?}"),
    }
}

#[test]
fn test_array_literal_length_must_match() {
    match compile("sub main() { int a[3] = [1, 2]; }") {
        Err(Error::ArrayLengthMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
        }
        other => panic!("expected length mismatch, got {other:?}"),
    }
}

#[test]
fn test_operator_body_must_end_in_return() {
    let src = "operator / (int a, int b) -> int { int c = __SRL__(a, b); }
               sub main() { int x = 1; }";
    match compile(src) {
        Err(Error::MalformedOperator { symbol, .. }) => assert_eq!(symbol, "/"),
        other => panic!("expected malformed operator, got {other:?}"),
    }
}

// =============================================================================
// SCRATCH DISCIPLINE
// =============================================================================

#[test]
fn test_lowering_frees_every_scratch_it_allocates() {
    let lowered = compiler::lower(
        "global int g;
         sub helper(int x) -> int { return x + x; }
         sub main() {
             int arr[3] = [1, 2, 3];
             g = 0;
             for (int i = 0; i < 3; i += 1) {
                 g += arr[i] * 2;
             }
             if (g > 5) { g = helper(g); }
         }",
    )
    .unwrap();
    for (label, allocs, frees) in &lowered.counters {
        assert_eq!(allocs, frees, "scope `{label}` leaked scratch slots");
    }
}
