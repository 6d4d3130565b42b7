//! # Wireword - a compiler and VM for a 16-bit wire-logic CPU
//!
//! Wireword compiles a small imperative language into the fixed-width-word
//! assembly of a constructed puzzle CPU, and executes that assembly on a
//! faithful virtual machine. The target has 11 three-operand opcodes,
//! multi-level pointer-indirect addressing, a sparse 16-bit word memory with
//! the program counter at address 0, and no hardware call stack; the compiler
//! builds subroutine calls out of an explicit stack region and inlines every
//! operator at its call site.
//!
//! ## Quick Start
//!
//! Compile a program, run it, and inspect memory through the symbol table:
//!
//! ```rust
//! use wireword::{compile, Machine, DEFAULT_STEP_LIMIT};
//!
//! # fn main() -> wireword::Result<()> {
//! let program = compile(
//!     "global int answer;
//!      sub main() {
//!          answer = 40 + 2;
//!      }",
//! )?;
//!
//! let mut machine = Machine::load(&program.assembly)?;
//! machine.run(DEFAULT_STEP_LIMIT)?;
//!
//! let addr = program.symbols.offset("answer").unwrap();
//! assert_eq!(machine.read(addr), 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The pipeline is a pure sequential transform:
//!
//! ```text
//! source → Scanner → tokens → Grammar → parse tree → typed AST
//!        → HighLevelCompiler → symbolic IR + variable layout
//!        → LowLevelCompiler → assembly text → Machine → memory state
//! ```
//!
//! ### Main Components
//!
//! - [`lexer::Scanner`] - tokenizes source text
//! - [`grammar::Grammar`] - the rule-table matcher producing parse trees
//! - [`parser`] - typed AST and its builder
//! - [`compiler::HighLevelCompiler`] - lowering, variable/scratch allocation,
//!   operator inlining
//! - [`compiler::LowLevelCompiler`] - offsets, calling convention, label
//!   resolution, assembly text
//! - [`vm::Machine`] - the fetch-execute loop over sparse word memory
//!
//! ## Language Overview
//!
//! - Subroutines: `sub name(int a) -> int { ... }`, exactly one `main`
//! - Variables type-bound at first reference: `int x = 5;`,
//!   `global int g;`, `int arr[3] = [1, 2, 3];`, `int* p`
//! - Statements: assignment, compound assignment, `if`, `while`,
//!   `for (setup; cond; step)`, `return`, bare calls
//! - Operators are user-definable and fully inlined:
//!   `operator + (int a, int b) -> int { return __ADD__(a, b); }`
//! - The stock definitions live in [`compiler::prelude::STANDARD_OPERATORS`]

/// Version of the wireword crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod vm;

pub use compiler::{compile, CompiledProgram, Symbol, SymbolTable};
pub use error::{Error, Result};
pub use lexer::{Scanner, Token, TokenKind};
pub use vm::{Machine, Memory, DEFAULT_STEP_LIMIT};
