//! Machine-level tests: decoding, indirection, wrapping arithmetic, the
//! halt condition and the step limit.

use wireword::error::Error;
use wireword::{Machine, DEFAULT_STEP_LIMIT};

/// Loads a program, runs it to the halt condition, and returns the machine
fn run(text: &str) -> Machine {
    let mut machine = Machine::load(text).expect("load failed");
    machine.run(DEFAULT_STEP_LIMIT).expect("did not halt");
    machine
}

// =============================================================================
// ARITHMETIC AND SHIFTS
// =============================================================================

#[test]
fn test_addition_wraps_at_the_word_width() {
    let machine = run("0. ADD 65535 3 1;");
    assert_eq!(machine.read(1), 2);
}

#[test]
fn test_subtraction_wraps_below_zero() {
    let machine = run("0. SUB 3 5 1;");
    assert_eq!(machine.read(1), 65534);
}

#[test]
fn test_negative_immediates_are_masked() {
    let machine = run("0. SUB -3 5 1;");
    assert_eq!(machine.read(1), 65528);
}

#[test]
fn test_logical_shift_right_zero_fills() {
    let machine = run("0. SRL -1 3 1;");
    assert_eq!(machine.read(1), 8191);
}

#[test]
fn test_arithmetic_shift_right_sign_extends() {
    let machine = run("0. SRA -8 1 1;\n1. SRA 8 1 2;");
    assert_eq!(machine.read(1), 65532);
    assert_eq!(machine.read(2), 4);
}

#[test]
fn test_shift_counts_saturate_at_the_word_width() {
    let machine = run("0. SL 1 16 1;\n1. SRL -1 20 2;\n2. SRA -1 20 3;\n3. SRA 1 16 4;");
    assert_eq!(machine.read(1), 0);
    assert_eq!(machine.read(2), 0);
    assert_eq!(machine.read(3), 65535);
    assert_eq!(machine.read(4), 0);
}

#[test]
fn test_and_not_masks_the_second_operand_out() {
    let machine = run("0. ANT 255 15 1;");
    assert_eq!(machine.read(1), 240);
}

// =============================================================================
// CONDITIONAL MOVES AND JUMPS
// =============================================================================

#[test]
fn test_mnz_moves_only_on_nonzero() {
    let machine = run("0. MNZ 0 7 1;\n1. MNZ 3 9 2;");
    assert_eq!(machine.read(1), 0);
    assert_eq!(machine.read(2), 9);
}

#[test]
fn test_mlz_tests_the_sign_bit() {
    let machine = run("0. MLZ 32767 7 1;\n1. MLZ -1 9 2;\n2. MLZ 32768 5 3;");
    assert_eq!(machine.read(1), 0);
    assert_eq!(machine.read(2), 9);
    assert_eq!(machine.read(3), 5);
}

#[test]
fn test_writing_the_pc_jumps_after_the_advance() {
    // the machine increments the pc after the write, so a jump operand is
    // the target line minus one
    let machine = run("0. MLZ -1 1 0;\n1. MLZ -1 7 1;\n2. MLZ -1 9 2;");
    assert_eq!(machine.read(1), 0, "skipped line executed");
    assert_eq!(machine.read(2), 9);
}

// =============================================================================
// INDIRECTION
// =============================================================================

#[test]
fn test_read_indirection_chains() {
    let mut machine = Machine::load("0. ADD B1 C2 3;").unwrap();
    machine.poke(1, 5);
    machine.poke(5, 40);
    machine.poke(2, 6);
    machine.poke(6, 7);
    machine.poke(7, 2);
    machine.run(DEFAULT_STEP_LIMIT).unwrap();
    assert_eq!(machine.read(3), 42);
}

#[test]
fn test_write_indirection_resolves_before_the_store() {
    let mut machine = Machine::load("0. MLZ -1 9 A1;").unwrap();
    machine.poke(1, 5);
    machine.run(DEFAULT_STEP_LIMIT).unwrap();
    assert_eq!(machine.read(5), 9);
    assert_eq!(machine.read(1), 5);
}

#[test]
fn test_operands_resolve_before_the_effect_applies() {
    // the write to address 1 must not affect operand resolution of the same
    // instruction
    let mut machine = Machine::load("0. ADD A1 A1 1;").unwrap();
    machine.poke(1, 21);
    machine.run(DEFAULT_STEP_LIMIT).unwrap();
    assert_eq!(machine.read(1), 42);
}

// =============================================================================
// MEMORY MODEL
// =============================================================================

#[test]
fn test_zero_writes_remove_cells() {
    let machine = run("0. MLZ -1 5 7;\n1. MLZ -1 0 7;");
    assert_eq!(machine.read(7), 0);
    // only the program counter cell remains
    assert_eq!(machine.memory().occupied(), 1);
}

// =============================================================================
// LOAD ERRORS AND LIMITS
// =============================================================================

#[test]
fn test_missing_terminator_is_a_load_error() {
    match Machine::load("0. ADD 1 2 3") {
        Err(Error::UnterminatedLine { line: 0 }) => {}
        other => panic!("expected unterminated line, got {other:?}"),
    }
}

#[test]
fn test_unknown_opcode_is_a_load_error() {
    match Machine::load("0. MOV 1 2 3;") {
        Err(Error::UnknownOpcode { mnemonic, .. }) => assert_eq!(mnemonic, "MOV"),
        other => panic!("expected unknown opcode, got {other:?}"),
    }
}

#[test]
fn test_wrong_operand_count_is_a_load_error() {
    match Machine::load("0. ADD 1 2;") {
        Err(Error::MalformedInstruction { line: 0, .. }) => {}
        other => panic!("expected malformed instruction, got {other:?}"),
    }
}

#[test]
fn test_deep_destination_indirection_is_rejected() {
    match Machine::load("0. ADD 1 2 B3;") {
        Err(Error::MalformedInstruction { .. }) => {}
        other => panic!("expected malformed instruction, got {other:?}"),
    }
}

#[test]
fn test_infinite_loops_hit_the_step_limit() {
    let mut machine = Machine::load("0. ADD 0 0 1;\n1. MLZ -1 -1 0;").unwrap();
    match machine.run(1000) {
        Err(Error::ExecutionLimitExceeded { limit: 1000 }) => {}
        other => panic!("expected step-limit error, got {other:?}"),
    }
}
