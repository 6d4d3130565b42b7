//! The static rule table for the source language.
//!
//! The surface is C-like: `sub` and `operator` items with `{}` blocks,
//! declarations bound at first typed reference, `if`/`while`/`for`, compound
//! assignment, array literals and indexing. Alternatives are ordered so that
//! longer shapes (typed declarations, compound assignment) are tried before
//! their plain-variable prefixes. Type positions admit only the type
//! keywords; an arbitrary identifier there would let `m * n` in expression
//! context match as a pointer declaration instead of a product.

use lazy_static::lazy_static;

use super::engine::{Alt, Elem, Grammar, Rule};
use crate::lexer::TokenKind;

/// Binary operator symbols resolvable against inline-operator declarations
pub const BINARY_OPS: &[&str] = &[
    "+", "-", "*", "/", "%", "&", "|", "^", "<<", ">>", "<", ">", "<=", ">=", "==", "!=",
];

/// Unary operator symbols
pub const UNARY_OPS: &[&str] = &["!", "~"];

/// Compound-assignment symbols; stripping the trailing `=` yields the base
/// binary operator
pub const AUG_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
];

fn t(text: &'static str) -> Elem {
    Elem::Tok {
        kind: None,
        text: Some(text),
        capture: None,
    }
}

fn ident(capture: &'static str) -> Elem {
    Elem::Tok {
        kind: Some(TokenKind::Ident),
        text: None,
        capture: Some(capture),
    }
}

fn number(capture: &'static str) -> Elem {
    Elem::Tok {
        kind: Some(TokenKind::Number),
        text: None,
        capture: Some(capture),
    }
}

fn symbol(capture: &'static str) -> Elem {
    Elem::Tok {
        kind: Some(TokenKind::Symbol),
        text: None,
        capture: Some(capture),
    }
}

fn eof() -> Elem {
    Elem::Tok {
        kind: Some(TokenKind::Eof),
        text: None,
        capture: None,
    }
}

fn r(rule: &'static str, capture: &'static str) -> Elem {
    Elem::RuleRef {
        rule,
        capture: Some(capture),
    }
}

fn opt(flag: &'static str, elems: Vec<Elem>) -> Elem {
    Elem::Opt {
        flag: Some(flag),
        elems,
    }
}

fn repeat(capture: &'static str, elems: Vec<Elem>) -> Elem {
    Elem::Repeat { capture, elems }
}

fn alt(name: &'static str, elems: Vec<Elem>) -> Alt {
    Alt { name, elems }
}

fn rule(name: &'static str, alts: Vec<Alt>) -> Rule {
    Rule { name, alts }
}

/// One alternative per symbol; the matched symbol is exposed as the node's
/// alternative name.
fn symbol_rule(name: &'static str, symbols: &[&'static str]) -> Rule {
    let alts = symbols.iter().map(|sym| alt(sym, vec![t(sym)])).collect();
    rule(name, alts)
}

lazy_static! {
    /// The source-language grammar, constructed once
    pub static ref GRAMMAR: Grammar = build_grammar();
}

fn build_grammar() -> Grammar {
    Grammar::new(
        "program",
        vec![
            rule(
                "program",
                vec![alt(
                    "program",
                    vec![repeat("items", vec![r("item", "item")]), eof()],
                )],
            ),
            rule(
                "item",
                vec![
                    alt(
                        "sub",
                        vec![
                            t("sub"),
                            ident("name"),
                            t("("),
                            opt("_params", vec![r("param_list", "params")]),
                            t(")"),
                            opt("_rtn", vec![t("->"), r("type_name", "rtn_type")]),
                            r("block", "body"),
                        ],
                    ),
                    alt(
                        "operator",
                        vec![
                            t("operator"),
                            symbol("symbol"),
                            t("("),
                            r("param_list", "params"),
                            t(")"),
                            t("->"),
                            r("type_name", "rtn_type"),
                            opt("_unsafe", vec![t("unsafe")]),
                            r("block", "body"),
                        ],
                    ),
                    alt(
                        "globals",
                        vec![
                            t("global"),
                            r("type_name", "type"),
                            ident("name"),
                            repeat("more", vec![t(","), ident("name")]),
                            t(";"),
                        ],
                    ),
                ],
            ),
            rule(
                "param_list",
                vec![alt(
                    "params",
                    vec![
                        r("param", "first"),
                        repeat("rest", vec![t(","), r("param", "param")]),
                    ],
                )],
            ),
            rule(
                "param",
                vec![
                    alt(
                        "pointer",
                        vec![r("type_name", "type"), t("*"), ident("name")],
                    ),
                    alt("scalar", vec![r("type_name", "type"), ident("name")]),
                ],
            ),
            rule(
                "block",
                vec![alt(
                    "block",
                    vec![t("{"), repeat("stmts", vec![r("stmt", "stmt")]), t("}")],
                )],
            ),
            rule(
                "stmt",
                vec![
                    alt(
                        "if",
                        vec![t("if"), t("("), r("expr", "cond"), t(")"), r("block", "body")],
                    ),
                    alt(
                        "while",
                        vec![
                            t("while"),
                            t("("),
                            r("expr", "cond"),
                            t(")"),
                            r("block", "body"),
                        ],
                    ),
                    alt(
                        "for",
                        vec![
                            t("for"),
                            t("("),
                            r("generic_var", "setup_target"),
                            t("="),
                            r("expr", "setup_value"),
                            t(";"),
                            r("expr", "cond"),
                            t(";"),
                            r("generic_var", "step_target"),
                            r("aug_op", "step_op"),
                            r("expr", "step_value"),
                            t(")"),
                            r("block", "body"),
                        ],
                    ),
                    alt("return", vec![t("return"), r("expr", "value"), t(";")]),
                    alt(
                        "mod_assign",
                        vec![
                            r("generic_var", "target"),
                            r("aug_op", "op"),
                            r("expr", "value"),
                            t(";"),
                        ],
                    ),
                    alt(
                        "assign",
                        vec![
                            r("generic_var", "target"),
                            t("="),
                            r("expr", "value"),
                            t(";"),
                        ],
                    ),
                    alt("call", vec![r("sub_call", "call"), t(";")]),
                ],
            ),
            rule(
                "generic_var",
                vec![
                    alt("decl", vec![r("type_var", "decl")]),
                    alt(
                        "indexed",
                        vec![ident("name"), t("["), r("expr", "index"), t("]")],
                    ),
                    alt("plain", vec![ident("name")]),
                ],
            ),
            rule(
                "type_var",
                vec![
                    alt(
                        "array",
                        vec![
                            opt("_global", vec![t("global")]),
                            r("type_name", "type"),
                            ident("name"),
                            t("["),
                            r("expr", "size"),
                            t("]"),
                        ],
                    ),
                    alt(
                        "pointer",
                        vec![
                            opt("_global", vec![t("global")]),
                            r("type_name", "type"),
                            t("*"),
                            ident("name"),
                        ],
                    ),
                    alt(
                        "scalar",
                        vec![
                            opt("_global", vec![t("global")]),
                            r("type_name", "type"),
                            ident("name"),
                        ],
                    ),
                ],
            ),
            rule(
                "type_name",
                vec![alt("int", vec![t("int")]), alt("bool", vec![t("bool")])],
            ),
            rule(
                "expr",
                vec![
                    alt(
                        "binary",
                        vec![r("term", "lhs"), r("bin_op", "op"), r("expr", "rhs")],
                    ),
                    alt("call", vec![r("sub_call", "call")]),
                    alt("unary", vec![r("un_op", "op"), r("expr", "operand")]),
                    alt("term", vec![r("term", "term")]),
                ],
            ),
            rule(
                "term",
                vec![
                    alt("paren", vec![t("("), r("expr", "inner"), t(")")]),
                    alt(
                        "array",
                        vec![
                            t("["),
                            r("expr", "first"),
                            repeat("rest", vec![t(","), r("expr", "elem")]),
                            t("]"),
                        ],
                    ),
                    alt("negative", vec![t("-"), number("value")]),
                    alt("literal", vec![number("value")]),
                    alt("var", vec![r("generic_var", "var")]),
                ],
            ),
            rule(
                "sub_call",
                vec![alt(
                    "call",
                    vec![
                        ident("name"),
                        t("("),
                        opt(
                            "_args",
                            vec![
                                r("expr", "first"),
                                repeat("rest", vec![t(","), r("expr", "arg")]),
                            ],
                        ),
                        t(")"),
                    ],
                )],
            ),
            symbol_rule("bin_op", BINARY_OPS),
            symbol_rule("un_op", UNARY_OPS),
            symbol_rule("aug_op", AUG_OPS),
        ],
    )
}
