//! The three-phase compiler pipeline.
//!
//! Source text is parsed into a typed AST, lowered per subroutine into
//! symbolic IR with a flat finalized variable layout, then translated into
//! numbered assembly text for the machine. Each phase completes fully before
//! the next starts; a failed phase aborts with no partial output.

mod highlevel;
mod ir;
mod lowlevel;
pub mod prelude;
mod variables;

pub use highlevel::{HighLevelCompiler, LoweredProgram, SubMeta};
pub use ir::{Instr, Value};
pub use lowlevel::LowLevelCompiler;
pub use variables::{VarId, VarInfo, VarTable, VariableStore};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::parser;

/// One finalized variable: its word address and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Word address of the first element
    pub offset: u16,
    /// Word count; arrays occupy a contiguous run
    pub size: u16,
}

/// Name-to-address mapping of every finalized variable, for inspecting the
/// machine's memory after a run. Locals appear under scope-qualified names
/// (`main::x`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    /// Word address of a variable, if it exists
    pub fn offset(&self, name: &str) -> Option<u16> {
        self.symbols.get(name).map(|s| s.offset)
    }

    /// Full symbol entry
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Iterates symbols in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, sym)| (name.as_str(), sym))
    }
}

/// Output of a full compilation
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// Numbered assembly text, one instruction per line
    pub assembly: String,
    /// Finalized variable addresses
    pub symbols: SymbolTable,
}

/// Parses the operator prelude plus the user program and lowers the whole
/// thing into finalized IR.
pub fn lower(source: &str) -> Result<LoweredProgram> {
    let mut program = parser::parse(prelude::STANDARD_OPERATORS)?;
    let user = parser::parse(source)?;
    debug!(items = user.items.len(), "parsed");
    program.items.extend(user.items);
    HighLevelCompiler::new().lower(program)
}

/// Compiles source text through all three phases into assembly
pub fn compile(source: &str) -> Result<CompiledProgram> {
    let lowered = lower(source)?;
    let mut symbols = BTreeMap::new();
    for &id in &lowered.layout {
        let info = lowered.table.get(id);
        symbols.insert(
            info.name.clone(),
            Symbol {
                offset: lowered.table.offset(id)?,
                size: info.size,
            },
        );
    }
    let assembly = LowLevelCompiler::new(&lowered).emit()?;
    Ok(CompiledProgram {
        assembly,
        symbols: SymbolTable { symbols },
    })
}
