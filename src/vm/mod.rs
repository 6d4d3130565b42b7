//! The target machine: sparse 16-bit word memory and the execution loop.

mod machine;
mod memory;

pub use machine::{Instruction, Machine, Opcode, Operand, DEFAULT_STEP_LIMIT};
pub use memory::{mask, Memory};
