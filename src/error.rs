//! Error types for the wireword compiler and virtual machine

use thiserror::Error;

/// Errors produced by any phase of the pipeline.
///
/// Every phase is fatal-on-error: a failed phase aborts immediately and no
/// partial output is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Parse errors
    /// No grammar alternative matched. Reports the deepest-consuming failure
    /// point across the whole match tree, not the first or last one tried.
    #[error("Syntax error at line {line}, column {col}: {message}")]
    SyntaxError {
        /// Line number of the offending token (1-indexed)
        line: usize,
        /// Column number of the offending token (1-indexed)
        col: usize,
        /// What the matcher expected at that point
        message: String,
    },

    /// A character the scanner does not recognize
    #[error("Unexpected character `{ch}` at line {line}, column {col}")]
    UnexpectedCharacter {
        /// The offending character
        ch: char,
        /// Line number (1-indexed)
        line: usize,
        /// Column number (1-indexed)
        col: usize,
    },

    // Compile errors
    /// A variable was referenced before any type-carrying declaration
    #[error("Variable `{name}` has no type at its first reference")]
    UndeclaredVariable {
        /// Variable name as written
        name: String,
    },

    /// No inline operator matches the symbol, operand types and result type
    #[error("Operator `{symbol}` not implemented for operands ({operands}) -> {result}")]
    UnknownOperator {
        /// Operator symbol as written
        symbol: String,
        /// Comma-joined static types of the operands
        operands: String,
        /// Type expected for the result
        result: String,
    },

    /// An inline operator body whose last statement is not `return`, or whose
    /// returned value does not have the declared return type
    #[error("Operator `{symbol}` must end with a `return` of type {expected}")]
    MalformedOperator {
        /// Operator symbol as written
        symbol: String,
        /// Declared return type
        expected: String,
    },

    /// Array sizes must be compile-time integer constants
    #[error("Array `{name}` has a non-constant size expression")]
    NonConstantArraySize {
        /// Array variable name
        name: String,
    },

    /// An array literal whose element count does not match the declared size
    #[error("Array `{name}` holds {expected} words but the literal has {found}")]
    ArrayLengthMismatch {
        /// Array variable name
        name: String,
        /// Declared element count
        expected: u16,
        /// Literal element count
        found: usize,
    },

    /// Every program needs exactly one subroutine named `main`
    #[error("No `main` subroutine defined")]
    MissingMain,

    /// A call targets a name that is neither a subroutine nor a primitive
    #[error("Call to unknown subroutine `{name}`")]
    UnknownSubroutine {
        /// Callee name as written
        name: String,
    },

    /// A call whose argument count differs from the callee's parameter count
    #[error("Subroutine `{name}` takes {expected} arguments but the call passes {found}")]
    ArityMismatch {
        /// Callee name as written
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Argument count at the call site
        found: usize,
    },

    /// A variable store was finalized while a scratch slot was still busy.
    /// This is an internal invariant violation, not a user error.
    #[error("Scratch `{name}` still busy at store finalization")]
    ScratchStillBusy {
        /// Name of the leaked scratch slot
        name: String,
    },

    // VM load errors (fatal before any execution)
    /// An assembly line without its terminating semicolon
    #[error("Assembly line {line}: missing `;` terminator")]
    UnterminatedLine {
        /// Zero-based index of the offending line
        line: usize,
    },

    /// An unrecognized opcode mnemonic
    #[error("Assembly line {line}: unknown opcode `{mnemonic}`")]
    UnknownOpcode {
        /// Zero-based index of the offending line
        line: usize,
        /// The mnemonic as written
        mnemonic: String,
    },

    /// A malformed operand or wrong operand count
    #[error("Assembly line {line}: {message}")]
    MalformedInstruction {
        /// Zero-based index of the offending line
        line: usize,
        /// Description of the defect
        message: String,
    },

    // VM run-time resource guard
    /// The execution loop exceeded its configured step limit
    #[error("Execution limit exceeded (max: {limit} steps)")]
    ExecutionLimitExceeded {
        /// Maximum allowed steps
        limit: u64,
    },

    /// Internal pipeline defect (malformed tree shape, handle misuse)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result type for wireword operations
pub type Result<T> = std::result::Result<T, Error>;
