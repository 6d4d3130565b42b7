//! Conversion of generic parse trees into the typed AST.
//!
//! This is the only layer doing string-keyed field access; a field missing
//! here means the rule table and this module disagree, which is an internal
//! defect rather than a user error.

use super::ast::*;
use crate::error::{Error, Result};
use crate::grammar::ParseNode;

/// Builds the typed AST for a whole program tree
pub fn build_program(tree: &ParseNode) -> Result<Program> {
    let mut items = Vec::new();
    for entry in list(tree, "items")? {
        items.push(build_item(node(entry, "item")?)?);
    }
    Ok(Program { items })
}

fn build_item(item: &ParseNode) -> Result<Item> {
    match item.alt {
        "sub" => {
            let params = if item.has("_params") {
                build_param_list(node(item, "params")?)?
            } else {
                Vec::new()
            };
            let rtn_type = if item.has("_rtn") {
                Some(type_name(item, "rtn_type")?)
            } else {
                None
            };
            Ok(Item::Sub(SubDef {
                name: token(item, "name")?.to_string(),
                params,
                rtn_type,
                body: build_block(node(item, "body")?)?,
            }))
        }
        "operator" => Ok(Item::Operator(OperatorDef {
            symbol: token(item, "symbol")?.to_string(),
            params: build_param_list(node(item, "params")?)?,
            rtn_type: type_name(item, "rtn_type")?,
            is_unsafe: item.has("_unsafe"),
            body: build_block(node(item, "body")?)?,
        })),
        "globals" => {
            let mut names = vec![token(item, "name")?.to_string()];
            for extra in list(item, "more")? {
                names.push(token(extra, "name")?.to_string());
            }
            Ok(Item::Globals(GlobalDecl {
                ty: type_name(item, "type")?,
                names,
            }))
        }
        other => Err(shape("item", other)),
    }
}

fn build_param_list(params: &ParseNode) -> Result<Vec<Param>> {
    let mut out = vec![build_param(node(params, "first")?)?];
    for rest in list(params, "rest")? {
        out.push(build_param(node(rest, "param")?)?);
    }
    Ok(out)
}

fn build_param(param: &ParseNode) -> Result<Param> {
    Ok(Param {
        ty: type_name(param, "type")?,
        name: token(param, "name")?.to_string(),
        is_pointer: param.alt == "pointer",
    })
}

fn build_block(block: &ParseNode) -> Result<Vec<Stmt>> {
    let mut stmts = Vec::new();
    for entry in list(block, "stmts")? {
        stmts.push(build_stmt(node(entry, "stmt")?)?);
    }
    Ok(stmts)
}

fn build_stmt(stmt: &ParseNode) -> Result<Stmt> {
    match stmt.alt {
        "if" => Ok(Stmt::If {
            cond: build_expr(node(stmt, "cond")?)?,
            body: build_block(node(stmt, "body")?)?,
        }),
        "while" => Ok(Stmt::While {
            cond: build_expr(node(stmt, "cond")?)?,
            body: build_block(node(stmt, "body")?)?,
        }),
        "for" => {
            let setup = Stmt::Assign {
                target: build_target(node(stmt, "setup_target")?)?,
                value: build_expr(node(stmt, "setup_value")?)?,
            };
            let step = Stmt::ModAssign {
                target: build_target(node(stmt, "step_target")?)?,
                op: base_op(node(stmt, "step_op")?.alt),
                value: build_expr(node(stmt, "step_value")?)?,
            };
            Ok(Stmt::For {
                setup: Box::new(setup),
                cond: build_expr(node(stmt, "cond")?)?,
                step: Box::new(step),
                body: build_block(node(stmt, "body")?)?,
            })
        }
        "return" => Ok(Stmt::Return(build_expr(node(stmt, "value")?)?)),
        "mod_assign" => Ok(Stmt::ModAssign {
            target: build_target(node(stmt, "target")?)?,
            op: base_op(node(stmt, "op")?.alt),
            value: build_expr(node(stmt, "value")?)?,
        }),
        "assign" => Ok(Stmt::Assign {
            target: build_target(node(stmt, "target")?)?,
            value: build_expr(node(stmt, "value")?)?,
        }),
        "call" => Ok(Stmt::Call(build_call(node(stmt, "call")?)?)),
        other => Err(shape("stmt", other)),
    }
}

fn build_target(var: &ParseNode) -> Result<Target> {
    match var.alt {
        "decl" => Ok(Target::Var(VarRef::Decl(build_type_decl(node(
            var, "decl",
        )?)?))),
        "indexed" => Ok(Target::Index {
            name: token(var, "name")?.to_string(),
            index: build_expr(node(var, "index")?)?,
        }),
        "plain" => Ok(Target::Var(VarRef::Named(token(var, "name")?.to_string()))),
        other => Err(shape("generic_var", other)),
    }
}

fn build_type_decl(decl: &ParseNode) -> Result<TypeDecl> {
    let size = if decl.alt == "array" {
        Some(Box::new(build_expr(node(decl, "size")?)?))
    } else {
        None
    };
    Ok(TypeDecl {
        is_global: decl.has("_global"),
        ty: type_name(decl, "type")?,
        name: token(decl, "name")?.to_string(),
        is_pointer: decl.alt == "pointer",
        size,
    })
}

fn build_expr(expr: &ParseNode) -> Result<Expr> {
    match expr.alt {
        "binary" => Ok(Expr::Binary {
            lhs: Box::new(build_term(node(expr, "lhs")?)?),
            op: node(expr, "op")?.alt.to_string(),
            rhs: Box::new(build_expr(node(expr, "rhs")?)?),
        }),
        "call" => Ok(Expr::Call(build_call(node(expr, "call")?)?)),
        "unary" => Ok(Expr::Unary {
            op: node(expr, "op")?.alt.to_string(),
            operand: Box::new(build_expr(node(expr, "operand")?)?),
        }),
        "term" => build_term(node(expr, "term")?),
        other => Err(shape("expr", other)),
    }
}

fn build_term(term: &ParseNode) -> Result<Expr> {
    match term.alt {
        "paren" => build_expr(node(term, "inner")?),
        "array" => {
            let mut elems = vec![build_expr(node(term, "first")?)?];
            for rest in list(term, "rest")? {
                elems.push(build_expr(node(rest, "elem")?)?);
            }
            Ok(Expr::Array(elems))
        }
        "negative" => Ok(Expr::Literal(-parse_number(token(term, "value")?)?)),
        "literal" => Ok(Expr::Literal(parse_number(token(term, "value")?)?)),
        "var" => {
            let var = node(term, "var")?;
            match var.alt {
                "decl" => Ok(Expr::Var(VarRef::Decl(build_type_decl(node(
                    var, "decl",
                )?)?))),
                "indexed" => Ok(Expr::Index {
                    name: token(var, "name")?.to_string(),
                    index: Box::new(build_expr(node(var, "index")?)?),
                }),
                "plain" => Ok(Expr::Var(VarRef::Named(token(var, "name")?.to_string()))),
                other => Err(shape("generic_var", other)),
            }
        }
        other => Err(shape("term", other)),
    }
}

fn build_call(call: &ParseNode) -> Result<SubCall> {
    let mut args = Vec::new();
    if call.has("_args") {
        args.push(build_expr(node(call, "first")?)?);
        for rest in list(call, "rest")? {
            args.push(build_expr(node(rest, "arg")?)?);
        }
    }
    Ok(SubCall {
        name: token(call, "name")?.to_string(),
        args,
    })
}

fn base_op(aug: &str) -> String {
    aug.trim_end_matches('=').to_string()
}

/// A type position matches the `type_name` rule; the winning alternative's
/// name is the type itself.
fn type_name(parent: &ParseNode, field: &str) -> Result<String> {
    Ok(node(parent, field)?.alt.to_string())
}

fn parse_number(text: &str) -> Result<i64> {
    text.parse()
        .map_err(|_| Error::internal(format!("unparseable number literal `{text}`")))
}

fn token<'a>(node: &'a ParseNode, name: &str) -> Result<&'a str> {
    node.token(name)
        .ok_or_else(|| missing(node.rule, name, "token"))
}

fn node<'a>(parent: &'a ParseNode, name: &str) -> Result<&'a ParseNode> {
    parent
        .node(name)
        .ok_or_else(|| missing(parent.rule, name, "node"))
}

fn list<'a>(parent: &'a ParseNode, name: &str) -> Result<&'a [ParseNode]> {
    parent
        .list(name)
        .ok_or_else(|| missing(parent.rule, name, "list"))
}

fn missing(rule: &str, field: &str, kind: &str) -> Error {
    Error::internal(format!("rule `{rule}` is missing {kind} field `{field}`"))
}

fn shape(rule: &str, alt: &str) -> Error {
    Error::internal(format!("rule `{rule}` matched unexpected alternative `{alt}`"))
}
