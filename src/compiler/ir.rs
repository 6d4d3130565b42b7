//! The symbolic intermediate representation.
//!
//! Instructions hold [`VarId`] handles throughout lowering; names and word
//! addresses only exist before and after this stage. Operator inlining and
//! assignment retargeting work by substituting handles inside instruction
//! ranges, never by rewriting the variable table.

use super::variables::VarId;

/// A value handle produced by expression lowering
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer literal; masked to the word width at codegen
    Literal(i64),
    /// A variable's current value
    Var(VarId),
    /// One extra indirection: the variable holds a word address and the value
    /// lives there (array-element access)
    Pointer(VarId),
    /// The variable's own word address
    Ref(VarId),
    /// Array-literal element handles
    List(Vec<Value>),
}

impl Value {
    /// The variable a scratch consumer would free: the handle's own variable,
    /// or the address-holding variable behind a pointer handle.
    pub fn backing_var(&self) -> Option<VarId> {
        match self {
            Value::Var(id) | Value::Pointer(id) | Value::Ref(id) => Some(*id),
            Value::Literal(_) | Value::List(_) => None,
        }
    }
}

/// One IR instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Opens a subroutine's body
    SubStart {
        /// Subroutine name
        name: String,
    },
    /// Closes a subroutine's body; for `main` this is the program halt, for
    /// any other subroutine an implicit return
    SubEnd {
        /// Subroutine name
        name: String,
    },
    /// `dest = value`
    Assign {
        /// Destination handle (variable or one-level pointer)
        dest: Value,
        /// Source handle
        value: Value,
    },
    /// Call a subroutine or a `__OP__` machine primitive
    CallSub {
        /// Callee name
        name: String,
        /// Argument handles in order
        args: Vec<Value>,
        /// Result destination
        dest: Value,
    },
    /// Copy the value into the result register and return to the caller
    Return {
        /// Returned value handle
        value: Value,
    },
    /// Conditional block entry; jumps past the matching end when `negated`
    /// is non-zero
    IfStart {
        /// Matching block id
        id: u32,
        /// Handle of the negated condition
        negated: Value,
    },
    /// Conditional block exit
    IfEnd {
        /// Matching block id
        id: u32,
    },
    /// Loop entry: an unconditional jump to the bottom re-check
    WhileStart {
        /// Matching block id
        id: u32,
    },
    /// Loop exit: a conditional backward jump to the top of the body
    WhileEnd {
        /// Matching block id
        id: u32,
        /// Handle of the re-checked condition
        cond: Value,
    },
}

/// Replaces `from` inside a single value handle
pub fn substitute_value(value: &mut Value, from: VarId, to: &Value) {
    match value {
        Value::Var(id) if *id == from => *value = to.clone(),
        Value::Pointer(id) if *id == from => {
            // A pointer handle can only be re-based onto another variable;
            // substituting anything else would change indirection depth.
            if let Value::Var(var) = to {
                *value = Value::Pointer(*var);
            }
        }
        Value::Ref(id) if *id == from => {
            if let Value::Var(var) = to {
                *value = Value::Ref(*var);
            }
        }
        Value::List(items) => {
            for item in items {
                substitute_value(item, from, to);
            }
        }
        _ => {}
    }
}

/// Replaces every occurrence of `from` with `to` across an instruction range
pub fn substitute(instrs: &mut [Instr], from: VarId, to: &Value) {
    for instr in instrs {
        match instr {
            Instr::Assign { dest, value } => {
                substitute_value(dest, from, to);
                substitute_value(value, from, to);
            }
            Instr::CallSub { args, dest, .. } => {
                for arg in args {
                    substitute_value(arg, from, to);
                }
                substitute_value(dest, from, to);
            }
            Instr::Return { value } => substitute_value(value, from, to),
            Instr::IfStart { negated, .. } => substitute_value(negated, from, to),
            Instr::WhileEnd { cond, .. } => substitute_value(cond, from, to),
            Instr::SubStart { .. }
            | Instr::SubEnd { .. }
            | Instr::IfEnd { .. }
            | Instr::WhileStart { .. } => {}
        }
    }
}

fn value_mentions(value: &Value, id: VarId) -> bool {
    match value {
        Value::Var(v) | Value::Pointer(v) | Value::Ref(v) => *v == id,
        Value::List(items) => items.iter().any(|item| value_mentions(item, id)),
        Value::Literal(_) => false,
    }
}

/// Counts every mention of `id` across an instruction range
pub fn mention_count(instrs: &[Instr], id: VarId) -> usize {
    let value_count = |value: &Value| usize::from(value_mentions(value, id));
    instrs
        .iter()
        .map(|instr| match instr {
            Instr::Assign { dest, value } => value_count(dest) + value_count(value),
            Instr::CallSub { args, dest, .. } => {
                args.iter().map(value_count).sum::<usize>() + value_count(dest)
            }
            Instr::Return { value } => value_count(value),
            Instr::IfStart { negated, .. } => value_count(negated),
            Instr::WhileEnd { cond, .. } => value_count(cond),
            Instr::SubStart { .. }
            | Instr::SubEnd { .. }
            | Instr::IfEnd { .. }
            | Instr::WhileStart { .. } => 0,
        })
        .sum()
}

/// The write destination of an instruction, if it has one
pub fn dest_of_mut(instr: &mut Instr) -> Option<&mut Value> {
    match instr {
        Instr::Assign { dest, .. } | Instr::CallSub { dest, .. } => Some(dest),
        _ => None,
    }
}

/// True when `id` is written exactly once, by the final instruction of the
/// range, and mentioned nowhere else. Under that shape the final destination
/// can be retargeted to another location without aliasing hazards.
pub fn sole_final_dest(instrs: &[Instr], id: VarId) -> bool {
    if mention_count(instrs, id) != 1 {
        return false;
    }
    match instrs.last() {
        Some(Instr::Assign { dest, .. }) | Some(Instr::CallSub { dest, .. }) => {
            matches!(dest, Value::Var(v) if *v == id)
        }
        _ => false,
    }
}
