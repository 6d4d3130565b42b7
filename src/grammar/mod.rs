//! Grammar-driven matching of token sequences into parse trees.
//!
//! The engine is a pure, backtracking rule matcher: alternatives are tried
//! strictly in declaration order, repeats are greedy, and the single
//! deepest-consuming failure is retained for diagnostics. The rule table
//! itself is static data built once at startup.

mod engine;
mod rules;

pub use engine::{Alt, Elem, Grammar, MatchFailure, ParseNode, ParseValue, Rule};
pub use rules::{AUG_OPS, BINARY_OPS, GRAMMAR, UNARY_OPS};
