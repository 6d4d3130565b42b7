//! Assembly loading and the fetch-execute loop.
//!
//! The machine decodes the whole program up front; load defects (a missing
//! terminator, an unknown mnemonic, a malformed operand) are fatal before any
//! execution. At run time nothing traps: arithmetic wraps into the word
//! width, unmapped addresses read as zero, and running the program counter
//! past the last line is the one intentional halt condition.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::memory::{mask, Memory};
use crate::error::{Error, Result};

/// Step ceiling used by callers that have no better bound
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

/// The machine's opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `dest = b` if `a` is non-zero
    Mnz,
    /// `dest = b` if `a` has its top bit set
    Mlz,
    Add,
    Sub,
    And,
    Or,
    Xor,
    /// `a & !b`
    Ant,
    /// Shift left
    Sl,
    /// Shift right, zero-filling
    Srl,
    /// Shift right, sign-extending
    Sra,
}

impl Opcode {
    /// The assembly mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mnz => "MNZ",
            Opcode::Mlz => "MLZ",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Ant => "ANT",
            Opcode::Sl => "SL",
            Opcode::Srl => "SRL",
            Opcode::Sra => "SRA",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for Opcode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "MNZ" => Ok(Opcode::Mnz),
            "MLZ" => Ok(Opcode::Mlz),
            "ADD" => Ok(Opcode::Add),
            "SUB" => Ok(Opcode::Sub),
            "AND" => Ok(Opcode::And),
            "OR" => Ok(Opcode::Or),
            "XOR" => Ok(Opcode::Xor),
            "ANT" => Ok(Opcode::Ant),
            "SL" => Ok(Opcode::Sl),
            "SRL" => Ok(Opcode::Srl),
            "SRA" => Ok(Opcode::Sra),
            _ => Err(()),
        }
    }
}

/// A decoded operand: an immediate, or a base address dereferenced `depth`
/// times before use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Imm(u16),
    Ind { addr: u16, depth: u8 },
}

/// One decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub a: Operand,
    pub b: Operand,
    pub c: Operand,
}

/// The virtual machine: a decoded program plus sparse memory. Address 0 is
/// the program counter.
#[derive(Debug)]
pub struct Machine {
    program: Vec<Instruction>,
    memory: Memory,
}

impl Machine {
    /// Decodes assembly text. Any malformed line is fatal here, before
    /// execution starts.
    pub fn load(text: &str) -> Result<Machine> {
        let mut program = Vec::new();
        for (line, raw) in text.lines().enumerate() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let body = raw
                .strip_suffix(';')
                .ok_or(Error::UnterminatedLine { line })?;
            // the leading "N." line number is decorative
            let body = match body.split_once('.') {
                Some((_, rest)) => rest,
                None => body,
            };
            let mut parts = body.split_whitespace();
            let mnemonic = parts.next().ok_or_else(|| Error::MalformedInstruction {
                line,
                message: "empty instruction".to_string(),
            })?;
            let op = mnemonic
                .parse::<Opcode>()
                .map_err(|()| Error::UnknownOpcode {
                    line,
                    mnemonic: mnemonic.to_string(),
                })?;
            let operands: Vec<&str> = parts.collect();
            if operands.len() != 3 {
                return Err(Error::MalformedInstruction {
                    line,
                    message: format!("expected 3 operands, found {}", operands.len()),
                });
            }
            let a = parse_operand(operands[0], line)?;
            let b = parse_operand(operands[1], line)?;
            let c = parse_operand(operands[2], line)?;
            if let Operand::Ind { depth, .. } = c {
                if depth > 1 {
                    return Err(Error::MalformedInstruction {
                        line,
                        message: "destinations allow at most one indirection level".to_string(),
                    });
                }
            }
            program.push(Instruction { op, a, b, c });
        }
        debug!(lines = program.len(), "program loaded");
        Ok(Machine {
            program,
            memory: Memory::new(),
        })
    }

    /// Current program counter
    pub fn pc(&self) -> u16 {
        self.memory.read(0)
    }

    /// Whether the program counter has run past the last line
    pub fn halted(&self) -> bool {
        self.pc() as usize >= self.program.len()
    }

    /// Executes one instruction. All operands are resolved against the
    /// current memory state before the effect applies; the program counter
    /// then advances by one. Returns false once halted.
    pub fn step(&mut self) -> bool {
        let pc = self.pc();
        if pc as usize >= self.program.len() {
            return false;
        }
        let instr = self.program[pc as usize];
        let a = self.resolve(instr.a);
        let b = self.resolve(instr.b);
        let dest = match instr.c {
            Operand::Imm(addr) => addr,
            Operand::Ind { addr, depth } => {
                let mut resolved = addr;
                for _ in 0..depth {
                    resolved = self.memory.read(resolved);
                }
                resolved
            }
        };
        let result = match instr.op {
            Opcode::Mnz => (a != 0).then_some(b),
            Opcode::Mlz => (a & 0x8000 != 0).then_some(b),
            Opcode::Add => Some(a.wrapping_add(b)),
            Opcode::Sub => Some(a.wrapping_sub(b)),
            Opcode::And => Some(a & b),
            Opcode::Or => Some(a | b),
            Opcode::Xor => Some(a ^ b),
            Opcode::Ant => Some(a & !b),
            Opcode::Sl => Some(if b >= 16 { 0 } else { ((a as u32) << b) as u16 }),
            Opcode::Srl => Some(if b >= 16 { 0 } else { a >> b }),
            Opcode::Sra => {
                let signed = a as i16;
                if b >= 16 {
                    Some(if signed < 0 { 0xFFFF } else { 0 })
                } else {
                    Some((signed >> b) as u16)
                }
            }
        };
        if let Some(value) = result {
            self.memory.write(dest, value);
        }
        let next = self.memory.read(0).wrapping_add(1);
        self.memory.write(0, next);
        true
    }

    /// Runs until the halt condition, failing once `limit` steps have been
    /// executed without halting. Returns the step count.
    pub fn run(&mut self, limit: u64) -> Result<u64> {
        let mut steps = 0;
        while !self.halted() {
            if steps >= limit {
                return Err(Error::ExecutionLimitExceeded { limit });
            }
            self.step();
            steps += 1;
        }
        debug!(steps, "execution halted");
        Ok(steps)
    }

    /// Reads a memory word
    pub fn read(&self, addr: u16) -> u16 {
        self.memory.read(addr)
    }

    /// Writes a memory word; tests use this to prime state before stepping
    pub fn poke(&mut self, addr: u16, value: u16) {
        self.memory.write(addr, value);
    }

    /// The final (or current) memory state
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Decoded program length in lines
    pub fn len(&self) -> usize {
        self.program.len()
    }

    /// Whether the program has no instructions
    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    fn resolve(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Imm(value) => value,
            Operand::Ind { addr, depth } => {
                let mut value = self.memory.read(addr);
                for _ in 1..depth {
                    value = self.memory.read(value);
                }
                value
            }
        }
    }
}

fn parse_operand(text: &str, line: usize) -> Result<Operand> {
    let (depth, rest) = match text.chars().next() {
        Some('A') => (1, &text[1..]),
        Some('B') => (2, &text[1..]),
        Some('C') => (3, &text[1..]),
        _ => (0, text),
    };
    let value: i64 = rest.parse().map_err(|_| Error::MalformedInstruction {
        line,
        message: format!("unparseable operand `{text}`"),
    })?;
    if depth == 0 {
        Ok(Operand::Imm(mask(value)))
    } else {
        Ok(Operand::Ind {
            addr: mask(value),
            depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numbered_lines_and_prefixes() {
        let machine = Machine::load("0. MLZ -1 37 1;\n1. ADD A1 B1 2;\n").unwrap();
        assert_eq!(machine.len(), 2);
    }

    #[test]
    fn missing_terminator_is_fatal() {
        match Machine::load("0. MLZ -1 37 1") {
            Err(Error::UnterminatedLine { line: 0 }) => {}
            other => panic!("expected unterminated line, got {other:?}"),
        }
    }

    #[test]
    fn unknown_mnemonic_is_fatal() {
        match Machine::load("0. MOV -1 37 1;") {
            Err(Error::UnknownOpcode { mnemonic, .. }) => assert_eq!(mnemonic, "MOV"),
            other => panic!("expected unknown opcode, got {other:?}"),
        }
    }

    #[test]
    fn pc_past_the_end_halts() {
        let mut machine = Machine::load("0. MLZ -1 9 1;").unwrap();
        assert!(machine.step());
        assert!(machine.halted());
        assert!(!machine.step());
        assert_eq!(machine.read(1), 9);
    }
}
