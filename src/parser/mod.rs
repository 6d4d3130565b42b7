//! Parsing: grammar-driven matching plus conversion to the typed AST.

pub mod ast;
mod builder;

use crate::error::Result;
use crate::grammar::GRAMMAR;
use crate::lexer::Scanner;

pub use ast::{
    Expr, GlobalDecl, Item, OperatorDef, Param, Program, Stmt, SubCall, SubDef, Target, TypeDecl,
    VarRef,
};

/// Scans and parses a full source file into its typed AST.
pub fn parse(source: &str) -> Result<Program> {
    let tokens = Scanner::new(source).scan_tokens()?;
    let tree = GRAMMAR.parse(&tokens)?;
    builder::build_program(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_main() {
        let program = parse("sub main() { int a = 1; }").unwrap();
        assert_eq!(program.items.len(), 1);
        match &program.items[0] {
            Item::Sub(sub) => {
                assert_eq!(sub.name, "main");
                assert!(sub.params.is_empty());
                assert!(sub.rtn_type.is_none());
                assert_eq!(sub.body.len(), 1);
            }
            other => panic!("expected sub, got {other:?}"),
        }
    }

    #[test]
    fn binary_expressions_nest_to_the_right() {
        let program = parse("sub main() { int a = 1 + 2 + 3; }").unwrap();
        let sub = match &program.items[0] {
            Item::Sub(sub) => sub,
            other => panic!("expected sub, got {other:?}"),
        };
        let value = match &sub.body[0] {
            Stmt::Assign { value, .. } => value,
            other => panic!("expected assignment, got {other:?}"),
        };
        match value {
            Expr::Binary { lhs, op, rhs } => {
                assert_eq!(op, "+");
                assert_eq!(**lhs, Expr::Literal(1));
                assert!(matches!(**rhs, Expr::Binary { .. }));
            }
            other => panic!("expected binary expr, got {other:?}"),
        }
    }

    #[test]
    fn operator_definitions_carry_the_unsafe_flag() {
        let src = "operator ! (int a) -> bool unsafe { return __XOR__(a, 1); }";
        let program = parse(src).unwrap();
        match &program.items[0] {
            Item::Operator(op) => {
                assert_eq!(op.symbol, "!");
                assert_eq!(op.rtn_type, "bool");
                assert!(op.is_unsafe);
                assert_eq!(op.params.len(), 1);
            }
            other => panic!("expected operator, got {other:?}"),
        }
    }

    #[test]
    fn for_loops_desugar_into_setup_cond_step() {
        let src = "sub main() { for (int i = 0; i < 10; i += 1) { int a = i; } }";
        let program = parse(src).unwrap();
        let sub = match &program.items[0] {
            Item::Sub(sub) => sub,
            other => panic!("expected sub, got {other:?}"),
        };
        match &sub.body[0] {
            Stmt::For { setup, step, .. } => {
                assert!(matches!(**setup, Stmt::Assign { .. }));
                match &**step {
                    Stmt::ModAssign { op, .. } => assert_eq!(op, "+"),
                    other => panic!("expected compound step, got {other:?}"),
                }
            }
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_point_at_the_deepest_token() {
        let err = parse("sub main() { int a = ; }").unwrap_err();
        match err {
            crate::error::Error::SyntaxError { line, .. } => assert_eq!(line, 1),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
