//! Codegen: finalized IR to assembly text.
//!
//! Every variable already has a word offset, so this stage is a straight
//! translation plus two mechanisms of its own: the push/pop calling
//! convention over an explicit stack region, and two-pass label resolution.
//! Labels are pseudo-lines folded onto the preceding real instruction, so a
//! label operand resolves to `target_line - 1`, matching the machine's
//! write-PC-then-advance jump convention.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use super::highlevel::LoweredProgram;
use super::ir::{Instr, Value};
use crate::error::{Error, Result};
use crate::vm::Opcode;

/// The machine primitives callable as `__OP__` intrinsics. A `call_sub`
/// naming one of these emits the single opcode directly, with no call
/// machinery.
pub(crate) const PRIMITIVE_OPS: &[(&str, Opcode)] = &[
    ("__MNZ__", Opcode::Mnz),
    ("__MLZ__", Opcode::Mlz),
    ("__ADD__", Opcode::Add),
    ("__SUB__", Opcode::Sub),
    ("__AND__", Opcode::And),
    ("__OR__", Opcode::Or),
    ("__XOR__", Opcode::Xor),
    ("__ANT__", Opcode::Ant),
    ("__SL__", Opcode::Sl),
    ("__SRL__", Opcode::Srl),
    ("__SRA__", Opcode::Sra),
];

/// Whether `name` is a primitive intrinsic
pub(crate) fn is_primitive(name: &str) -> bool {
    PRIMITIVE_OPS.iter().any(|(n, _)| *n == name)
}

fn primitive(name: &str) -> Option<Opcode> {
    PRIMITIVE_OPS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, op)| op)
}

/// An assembly operand before label resolution
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Immediate value, or a plain destination address
    Imm(i64),
    /// Address dereferenced `depth` times (`A`/`B`/`C` prefixes)
    Ind { base: i64, depth: u8 },
    /// Named label, resolved in pass 1
    Label(String),
    /// Signed delta, evaluated against the final line number in pass 2
    Delta(i64),
}

/// One emitted item: a real instruction or a label pseudo-line
#[derive(Debug, Clone, PartialEq)]
enum LineItem {
    Label(String),
    Op(Opcode, Operand, Operand, Operand),
}

/// Translates finalized IR into assembly text
pub struct LowLevelCompiler<'a> {
    program: &'a LoweredProgram,
    lines: Vec<LineItem>,
    current_sub: usize,
}

impl<'a> LowLevelCompiler<'a> {
    pub fn new(program: &'a LoweredProgram) -> Self {
        LowLevelCompiler {
            program,
            lines: Vec::new(),
            current_sub: 0,
        }
    }

    /// Emits the whole program: a stack-pointer prologue, then every
    /// instruction in order, then the halt label.
    pub fn emit(mut self) -> Result<String> {
        let program = self.program;
        let sp = program.table.offset(program.stack)?;
        self.push_op(
            Opcode::Mlz,
            Operand::Imm(-1),
            Operand::Imm(program.stack_base as i64),
            Operand::Imm(sp as i64),
        );
        for instr in &program.instrs {
            self.emit_instr(instr)?;
        }
        self.lines.push(LineItem::Label("end".to_string()));
        self.resolve()
    }

    fn emit_instr(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::SubStart { name } => {
                self.current_sub = self
                    .program
                    .subs
                    .iter()
                    .position(|sub| sub.name == *name)
                    .ok_or_else(|| Error::internal(format!("unregistered subroutine `{name}`")))?;
                self.lines.push(LineItem::Label(format!("sub_{name}")));
                Ok(())
            }
            Instr::SubEnd { name } => {
                if name == "main" {
                    self.jump_to("end");
                } else {
                    self.pop_return_address()?;
                }
                Ok(())
            }
            Instr::Return { value } => {
                let result = self.program.table.offset(self.program.result)?;
                let value = self.read_operand(value)?;
                self.push_op(
                    Opcode::Mlz,
                    Operand::Imm(-1),
                    value,
                    Operand::Imm(result as i64),
                );
                if self.program.subs[self.current_sub].name == "main" {
                    self.jump_to("end");
                } else {
                    self.pop_return_address()?;
                }
                Ok(())
            }
            Instr::Assign { dest, value } => self.emit_assign(dest, value),
            Instr::CallSub { name, args, dest } => {
                if let Some(op) = primitive(name) {
                    if args.len() != 2 {
                        return Err(Error::internal(format!(
                            "primitive `{name}` takes 2 operands, got {}",
                            args.len()
                        )));
                    }
                    let a = self.read_operand(&args[0])?;
                    let b = self.read_operand(&args[1])?;
                    let c = self.write_operand(dest)?;
                    self.push_op(op, a, b, c);
                    Ok(())
                } else {
                    self.emit_call(name, args, dest)
                }
            }
            Instr::IfStart { id, negated } => {
                let cond = self.read_operand(negated)?;
                self.push_op(
                    Opcode::Mnz,
                    cond,
                    Operand::Label(format!("if_end_{id}")),
                    Operand::Imm(0),
                );
                Ok(())
            }
            Instr::IfEnd { id } => {
                self.lines.push(LineItem::Label(format!("if_end_{id}")));
                Ok(())
            }
            Instr::WhileStart { id } => {
                self.push_op(
                    Opcode::Mlz,
                    Operand::Imm(-1),
                    Operand::Label(format!("loop_end_{id}")),
                    Operand::Imm(0),
                );
                self.lines.push(LineItem::Label(format!("loop_top_{id}")));
                Ok(())
            }
            Instr::WhileEnd { id, cond } => {
                let cond = self.read_operand(cond)?;
                self.lines.push(LineItem::Label(format!("loop_end_{id}")));
                self.push_op(
                    Opcode::Mnz,
                    cond,
                    Operand::Label(format!("loop_top_{id}")),
                    Operand::Imm(0),
                );
                Ok(())
            }
        }
    }

    fn emit_assign(&mut self, dest: &Value, value: &Value) -> Result<()> {
        if let Value::List(elems) = value {
            // array literal: one write per element into the consecutive run
            let base = match dest {
                Value::Var(id) => self.program.table.offset(*id)?,
                _ => return Err(Error::internal("array literal assigned through a pointer")),
            };
            for (i, elem) in elems.iter().enumerate() {
                let elem = self.read_operand(elem)?;
                self.push_op(
                    Opcode::Mlz,
                    Operand::Imm(-1),
                    elem,
                    Operand::Imm(base as i64 + i as i64),
                );
            }
            return Ok(());
        }
        let value = self.read_operand(value)?;
        let dest = self.write_operand(dest)?;
        self.push_op(Opcode::Mlz, Operand::Imm(-1), value, dest);
        Ok(())
    }

    /// Expands a subroutine call: push the caller's locals onto the stack,
    /// copy the arguments into the callee's parameter slots, push a return
    /// label, jump; on return pop the locals back in reverse and copy the
    /// result register into the destination. Arrays handed over by address
    /// are shared with the callee, so their words stay out of the save set:
    /// restoring them would discard the callee's writes.
    fn emit_call(&mut self, name: &str, args: &[Value], dest: &Value) -> Result<()> {
        let program = self.program;
        let sp = program.table.offset(program.stack)? as i64;
        let callee = program
            .subs
            .iter()
            .find(|sub| sub.name == name)
            .ok_or_else(|| Error::UnknownSubroutine {
                name: name.to_string(),
            })?;
        let caller = &program.subs[self.current_sub];

        let by_ref: Vec<_> = args
            .iter()
            .filter_map(|arg| match arg {
                Value::Ref(id) => Some(*id),
                _ => None,
            })
            .collect();
        let mut saved = Vec::new();
        for &local in &caller.locals {
            if by_ref.contains(&local) {
                continue;
            }
            let info = program.table.get(local);
            let base = program.table.offset(local)?;
            for word in 0..info.size {
                saved.push(base as i64 + word as i64);
            }
        }
        for &addr in &saved {
            self.push_op(
                Opcode::Mlz,
                Operand::Imm(-1),
                Operand::Ind { base: addr, depth: 1 },
                Operand::Ind { base: sp, depth: 1 },
            );
            self.bump_sp(Opcode::Add, sp);
        }

        if args.len() != callee.params.len() {
            return Err(Error::internal(format!(
                "call to `{name}` passes {} arguments for {} parameters",
                args.len(),
                callee.params.len()
            )));
        }
        for (arg, &param) in args.iter().zip(&callee.params) {
            let arg = self.read_operand(arg)?;
            let slot = program.table.offset(param)? as i64;
            self.push_op(Opcode::Mlz, Operand::Imm(-1), arg, Operand::Imm(slot));
        }

        // the pop sequence starts two real lines past this push, and the
        // machine advances the program counter after a jump lands
        self.push_op(
            Opcode::Mlz,
            Operand::Imm(-1),
            Operand::Delta(2),
            Operand::Ind { base: sp, depth: 1 },
        );
        self.bump_sp(Opcode::Add, sp);
        self.jump_to(&format!("sub_{name}"));

        for &addr in saved.iter().rev() {
            self.bump_sp(Opcode::Sub, sp);
            self.push_op(
                Opcode::Mlz,
                Operand::Imm(-1),
                Operand::Ind { base: sp, depth: 2 },
                Operand::Imm(addr),
            );
        }

        let result = program.table.offset(program.result)? as i64;
        let dest = self.write_operand(dest)?;
        self.push_op(
            Opcode::Mlz,
            Operand::Imm(-1),
            Operand::Ind { base: result, depth: 1 },
            dest,
        );
        Ok(())
    }

    /// Pops the saved return address into the program counter
    fn pop_return_address(&mut self) -> Result<()> {
        let sp = self.program.table.offset(self.program.stack)? as i64;
        self.bump_sp(Opcode::Sub, sp);
        self.push_op(
            Opcode::Mlz,
            Operand::Imm(-1),
            Operand::Ind { base: sp, depth: 2 },
            Operand::Imm(0),
        );
        Ok(())
    }

    fn bump_sp(&mut self, op: Opcode, sp: i64) {
        self.push_op(
            op,
            Operand::Ind { base: sp, depth: 1 },
            Operand::Imm(1),
            Operand::Imm(sp),
        );
    }

    fn jump_to(&mut self, label: &str) {
        self.push_op(
            Opcode::Mlz,
            Operand::Imm(-1),
            Operand::Label(label.to_string()),
            Operand::Imm(0),
        );
    }

    fn push_op(&mut self, op: Opcode, a: Operand, b: Operand, c: Operand) {
        self.lines.push(LineItem::Op(op, a, b, c));
    }

    /// Renders a value handle as a read operand. A variable reads its own
    /// slot; a pointer handle reads through the address held there.
    fn read_operand(&self, value: &Value) -> Result<Operand> {
        let table = &self.program.table;
        match value {
            Value::Literal(n) => Ok(Operand::Imm(*n)),
            Value::Var(id) => Ok(Operand::Ind {
                base: table.offset(*id)? as i64,
                depth: 1,
            }),
            Value::Pointer(id) => Ok(Operand::Ind {
                base: table.offset(*id)? as i64,
                depth: 2,
            }),
            Value::Ref(id) => Ok(Operand::Imm(table.offset(*id)? as i64)),
            Value::List(_) => Err(Error::internal("array literal used as a read operand")),
        }
    }

    /// Renders a value handle as a destination; the machine supports at most
    /// one indirection level on writes.
    fn write_operand(&self, value: &Value) -> Result<Operand> {
        let table = &self.program.table;
        match value {
            Value::Var(id) => Ok(Operand::Imm(table.offset(*id)? as i64)),
            Value::Pointer(id) => Ok(Operand::Ind {
                base: table.offset(*id)? as i64,
                depth: 1,
            }),
            _ => Err(Error::internal("destination is not a storage location")),
        }
    }

    /// Two-pass resolution: pass 1 maps every label to the line number of the
    /// next real instruction; pass 2 drops the label pseudo-lines and renders
    /// numbered text, evaluating label operands as `target - 1` and deltas
    /// against the final line number.
    fn resolve(self) -> Result<String> {
        let mut labels: HashMap<&str, usize> = HashMap::new();
        let mut line = 0usize;
        for item in &self.lines {
            match item {
                LineItem::Label(name) => {
                    labels.insert(name, line);
                }
                LineItem::Op(..) => line += 1,
            }
        }

        let mut out = String::new();
        let mut line = 0usize;
        for item in &self.lines {
            if let LineItem::Op(op, a, b, c) = item {
                let a = render(a, line, &labels)?;
                let b = render(b, line, &labels)?;
                let c = render(c, line, &labels)?;
                writeln!(out, "{line}. {op} {a} {b} {c};")
                    .map_err(|e| Error::internal(e.to_string()))?;
                line += 1;
            }
        }
        debug!(lines = line, "assembly emitted");
        Ok(out)
    }
}

fn render(operand: &Operand, line: usize, labels: &HashMap<&str, usize>) -> Result<String> {
    match operand {
        Operand::Imm(n) => Ok(n.to_string()),
        Operand::Ind { base, depth } => {
            let prefix = match depth {
                1 => "A",
                2 => "B",
                3 => "C",
                _ => return Err(Error::internal(format!("indirection depth {depth}"))),
            };
            Ok(format!("{prefix}{base}"))
        }
        Operand::Label(name) => {
            let target = labels
                .get(name.as_str())
                .ok_or_else(|| Error::internal(format!("unresolved label `{name}`")))?;
            Ok((*target as i64 - 1).to_string())
        }
        Operand::Delta(n) => Ok((line as i64 + n).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fold_onto_the_preceding_instruction() {
        let mut labels = HashMap::new();
        labels.insert("top", 3usize);
        assert_eq!(render(&Operand::Label("top".to_string()), 0, &labels).unwrap(), "2");
    }

    #[test]
    fn deltas_evaluate_against_the_final_line_number() {
        let labels = HashMap::new();
        assert_eq!(render(&Operand::Delta(2), 5, &labels).unwrap(), "7");
        assert_eq!(render(&Operand::Delta(-4), 5, &labels).unwrap(), "1");
    }

    #[test]
    fn indirection_prefixes_render_by_depth() {
        let labels = HashMap::new();
        assert_eq!(render(&Operand::Ind { base: 7, depth: 1 }, 0, &labels).unwrap(), "A7");
        assert_eq!(render(&Operand::Ind { base: 7, depth: 3 }, 0, &labels).unwrap(), "C7");
    }
}
