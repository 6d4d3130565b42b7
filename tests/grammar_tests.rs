//! Grammar-engine integration tests: alternative ordering, greedy
//! repetition, optional elements, and deepest-failure diagnostics.

use wireword::error::Error;
use wireword::grammar::GRAMMAR;
use wireword::lexer::Scanner;
use wireword::parser::{parse, Expr, Item, Stmt, Target, VarRef};

fn tokens(source: &str) -> Vec<wireword::lexer::Token> {
    Scanner::new(source).scan_tokens().unwrap()
}

fn main_body(source: &str) -> Vec<Stmt> {
    let program = parse(source).unwrap();
    for item in program.items {
        if let Item::Sub(sub) = item {
            if sub.name == "main" {
                return sub.body;
            }
        }
    }
    panic!("no main in test source");
}

// =============================================================================
// ALTERNATIVE ORDERING
// =============================================================================

#[test]
fn test_typed_declarations_win_over_plain_names() {
    // `int a` must match the declaration alternative, not a plain variable
    // named `int` followed by garbage
    let body = main_body("sub main() { int a = 1; }");
    match &body[0] {
        Stmt::Assign {
            target: Target::Var(VarRef::Decl(decl)),
            ..
        } => {
            assert_eq!(decl.ty, "int");
            assert_eq!(decl.name, "a");
            assert!(!decl.is_global);
        }
        other => panic!("expected declaring assignment, got {other:?}"),
    }
}

#[test]
fn test_compound_assignment_wins_over_plain_assignment() {
    let body = main_body("sub main() { int a = 1; a += 2; }");
    match &body[1] {
        Stmt::ModAssign { op, .. } => assert_eq!(op, "+"),
        other => panic!("expected compound assignment, got {other:?}"),
    }
}

#[test]
fn test_maximal_munch_keeps_shift_assign_whole() {
    let body = main_body("sub main() { int a = 1; a <<= 2; }");
    match &body[1] {
        Stmt::ModAssign { op, .. } => assert_eq!(op, "<<"),
        other => panic!("expected shift-assign, got {other:?}"),
    }
}

// =============================================================================
// REPETITION AND OPTIONALS
// =============================================================================

#[test]
fn test_statement_repetition_is_greedy() {
    let body = main_body(
        "sub main() {
             int a = 1;
             int b = 2;
             int c = 3;
             a = b;
             b = c;
         }",
    );
    assert_eq!(body.len(), 5);
}

#[test]
fn test_parameter_lists_are_optional() {
    let program = parse(
        "sub none() { int a = 1; }
         sub one(int x) { int a = x; }
         sub two(int x, int* y) -> int { return x; }
         sub main() { int a = 1; }",
    )
    .unwrap();
    let arities: Vec<usize> = program
        .items
        .iter()
        .map(|item| match item {
            Item::Sub(sub) => sub.params.len(),
            other => panic!("expected sub, got {other:?}"),
        })
        .collect();
    assert_eq!(arities, [0, 1, 2, 0]);
    match &program.items[2] {
        Item::Sub(sub) => {
            assert!(sub.params[1].is_pointer);
            assert_eq!(sub.rtn_type.as_deref(), Some("int"));
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_global_declarations_take_multiple_names() {
    let program = parse("global int a, b, c; sub main() { a = 1; }").unwrap();
    match &program.items[0] {
        Item::Globals(decl) => assert_eq!(decl.names, ["a", "b", "c"]),
        other => panic!("expected globals, got {other:?}"),
    }
}

// =============================================================================
// EXPRESSION SHAPES
// =============================================================================

#[test]
fn test_parenthesized_groups_override_nesting() {
    let body = main_body("sub main() { int a = (1 + 2) + 3; }");
    match &body[0] {
        Stmt::Assign {
            value: Expr::Binary { lhs, .. },
            ..
        } => assert!(matches!(**lhs, Expr::Binary { .. })),
        other => panic!("expected binary with grouped lhs, got {other:?}"),
    }
}

#[test]
fn test_unary_over_parenthesized_comparison() {
    let body = main_body("sub main() { int b = 1; int a = 0; if (!(b < 3)) { a = 1; } }");
    match &body[2] {
        Stmt::If { cond, .. } => match cond {
            Expr::Unary { op, operand } => {
                assert_eq!(op, "!");
                assert!(matches!(**operand, Expr::Binary { .. }));
            }
            other => panic!("expected unary condition, got {other:?}"),
        },
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn test_variable_products_stay_binary_expressions() {
    // the pointer-declaration shape (`type * name`) only fires on type
    // keywords, so `m * n` in expression position is a product
    let body = main_body("sub main() { int m = 6; int n = 7; int out = m * n; }");
    match &body[2] {
        Stmt::Assign {
            value: Expr::Binary { lhs, op, rhs },
            ..
        } => {
            assert_eq!(op, "*");
            assert!(matches!(**lhs, Expr::Var(VarRef::Named(_))));
            assert!(matches!(**rhs, Expr::Var(VarRef::Named(_))));
        }
        other => panic!("expected binary product, got {other:?}"),
    }
}

#[test]
fn test_negative_literals_are_terms() {
    let body = main_body("sub main() { int a = -5; }");
    match &body[0] {
        Stmt::Assign { value, .. } => assert_eq!(*value, Expr::Literal(-5)),
        other => panic!("expected assignment, got {other:?}"),
    }
}

// =============================================================================
// ENGINE BEHAVIOR
// =============================================================================

#[test]
fn test_match_rule_is_pure_and_repeatable() {
    let toks = tokens("1 + 2 + 3");
    let first = GRAMMAR.match_rule("expr", &toks).unwrap();
    let second = GRAMMAR.match_rule("expr", &toks).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.0, 5);
    assert_eq!(first.1.rule, "expr");
    assert_eq!(first.1.alt, "binary");
}

#[test]
fn test_failures_report_the_deepest_token() {
    // everything up to line 3 parses; the hole after `=` is the deepest
    // point any alternative reaches
    let err = parse(
        "global int a;
         sub main() {
             a = ;
         }",
    )
    .unwrap_err();
    match err {
        Error::SyntaxError { line, message, .. } => {
            assert_eq!(line, 3);
            assert!(message.contains("found `;`"), "message: {message}");
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_unclosed_block_fails_at_end_of_input() {
    let err = parse("sub main() { int a = 1;").unwrap_err();
    match err {
        Error::SyntaxError { message, .. } => {
            assert!(message.contains("end of input"), "message: {message}");
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}
