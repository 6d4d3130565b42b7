//! Typed AST for the source language.
//!
//! Each grammar rule is a closed tagged variant; the compiler walks these with
//! exhaustive matches instead of string-keyed field lookups.

/// A whole source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level items in declaration order
    pub items: Vec<Item>,
}

/// A top-level item
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Subroutine definition
    Sub(SubDef),
    /// Inline operator definition
    Operator(OperatorDef),
    /// Top-level `global type a, b, c;` declaration
    Globals(GlobalDecl),
}

/// `sub name(params) -> type { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct SubDef {
    /// Subroutine name
    pub name: String,
    /// Ordered typed parameters
    pub params: Vec<Param>,
    /// Declared return type, if any
    pub rtn_type: Option<String>,
    /// Body statements
    pub body: Vec<Stmt>,
}

/// `operator OP(params) -> type [unsafe] { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDef {
    /// Operator symbol
    pub symbol: String,
    /// Typed formal arguments (arity 1 or 2)
    pub params: Vec<Param>,
    /// Declared return type
    pub rtn_type: String,
    /// Unsafe inlines alias their operands instead of substituting a result
    /// variable
    pub is_unsafe: bool,
    /// Body statements; the last must be `return`
    pub body: Vec<Stmt>,
}

/// A typed formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Scalar type tag
    pub ty: String,
    /// Parameter name
    pub name: String,
    /// Declared with `type* name`
    pub is_pointer: bool,
}

/// Top-level multi-name global declaration
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    /// Scalar type tag
    pub ty: String,
    /// Declared names, in order
    pub names: Vec<String>,
}

/// A type-carrying first reference (`[global] type [*] name` or
/// `[global] type name[size]`)
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    /// Declared with the `global` qualifier
    pub is_global: bool,
    /// Scalar type tag
    pub ty: String,
    /// Variable name
    pub name: String,
    /// Pointer annotation
    pub is_pointer: bool,
    /// Array element-count expression; must be a compile-time constant.
    /// Boxed to break the `TypeDecl` -> `VarRef` -> `Expr` cycle.
    pub size: Option<Box<Expr>>,
}

/// A variable reference: either its defining typed reference or a plain name
#[derive(Debug, Clone, PartialEq)]
pub enum VarRef {
    /// First reference carrying the type declaration
    Decl(TypeDecl),
    /// Subsequent reference by name
    Named(String),
}

/// An assignment target
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Plain or declaring variable reference
    Var(VarRef),
    /// Array element `name[index]`
    Index {
        /// Array variable name
        name: String,
        /// Element index expression
        index: Expr,
    },
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `target = value;`
    Assign {
        /// Assignment target
        target: Target,
        /// Right-hand side
        value: Expr,
    },
    /// `target op= value;`
    ModAssign {
        /// Assignment target
        target: Target,
        /// Base binary operator (the symbol without its trailing `=`)
        op: String,
        /// Right-hand side
        value: Expr,
    },
    /// `if (cond) { body }`
    If {
        /// Condition expression
        cond: Expr,
        /// Body statements
        body: Vec<Stmt>,
    },
    /// `while (cond) { body }`
    While {
        /// Condition expression
        cond: Expr,
        /// Body statements
        body: Vec<Stmt>,
    },
    /// `for (setup; cond; step) { body }`
    For {
        /// Setup assignment
        setup: Box<Stmt>,
        /// Condition expression
        cond: Expr,
        /// Step compound assignment
        step: Box<Stmt>,
        /// Body statements
        body: Vec<Stmt>,
    },
    /// `return value;`
    Return(Expr),
    /// Bare call statement
    Call(SubCall),
}

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    Literal(i64),
    /// Variable reference
    Var(VarRef),
    /// Array element read `name[index]`
    Index {
        /// Array variable name
        name: String,
        /// Element index expression
        index: Box<Expr>,
    },
    /// Binary operator application (right-nested)
    Binary {
        /// Left operand (a term)
        lhs: Box<Expr>,
        /// Operator symbol
        op: String,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Unary operator application
    Unary {
        /// Operator symbol
        op: String,
        /// Operand
        operand: Box<Expr>,
    },
    /// Subroutine (or primitive intrinsic) call
    Call(SubCall),
    /// Array literal `[a, b, c]`
    Array(Vec<Expr>),
}

/// A call with its ordered argument expressions
#[derive(Debug, Clone, PartialEq)]
pub struct SubCall {
    /// Callee name
    pub name: String,
    /// Argument expressions
    pub args: Vec<Expr>,
}
