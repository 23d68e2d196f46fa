use std::fmt::Display;

use crate::vm::StackEntry;

/// Addressing mode for an instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// Relative to the current frame base.
    Stack(isize),
    Heap(usize),
    Register(usize),
    /// Read-only. Assigning to it faults.
    Constant(StackEntry),
}

/// The accumulator.
pub const AX: Accessor = Accessor::Register(0);

impl Accessor {
    pub fn number(n: f64) -> Self {
        Accessor::Constant(StackEntry::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Accessor::Constant(StackEntry::String(s.into()))
    }
}

impl Display for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accessor::Stack(offset) if *offset < 0 => write!(f, "BP-0x{:x}", offset.unsigned_abs()),
            Accessor::Stack(offset) => write!(f, "BP+0x{:x}", offset),
            Accessor::Heap(address) => write!(f, "M(0x{:x})", address),
            Accessor::Register(id) => write!(f, "%{}", id),
            Accessor::Constant(StackEntry::Number(n)) => write!(f, "#{}", n),
            Accessor::Constant(StackEntry::String(s)) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Mov(Accessor, Accessor),
    Push(Accessor),
    Pop(Accessor),
    /// Discards the top `n` stack entries.
    Drop(usize),

    // Binary operations write their result into the first operand.
    Add(Accessor, Accessor),
    Sub(Accessor, Accessor),
    Mul(Accessor, Accessor),
    Div(Accessor, Accessor),
    Mod(Accessor, Accessor),
    Less(Accessor, Accessor),
    LessEqual(Accessor, Accessor),
    Greater(Accessor, Accessor),
    GreaterEqual(Accessor, Accessor),
    Equal(Accessor, Accessor),
    NotEqual(Accessor, Accessor),
    And(Accessor, Accessor),
    Or(Accessor, Accessor),
    Concat(Accessor, Accessor),
    Not(Accessor),

    Call(usize),
    Result(Accessor),
    Exit(Accessor),
    Goto(usize),
    JumpUnless(Accessor, usize),

    New(usize),
    Release(usize),
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Mov(..) => "Mov",
            Instruction::Push(_) => "Push",
            Instruction::Pop(_) => "Pop",
            Instruction::Drop(_) => "Drop",
            Instruction::Add(..) => "Add",
            Instruction::Sub(..) => "Sub",
            Instruction::Mul(..) => "Mul",
            Instruction::Div(..) => "Div",
            Instruction::Mod(..) => "Mod",
            Instruction::Less(..) => "Less",
            Instruction::LessEqual(..) => "LessEqual",
            Instruction::Greater(..) => "Greater",
            Instruction::GreaterEqual(..) => "GreaterEqual",
            Instruction::Equal(..) => "Equal",
            Instruction::NotEqual(..) => "NotEqual",
            Instruction::And(..) => "And",
            Instruction::Or(..) => "Or",
            Instruction::Concat(..) => "Concat",
            Instruction::Not(_) => "Not",
            Instruction::Call(_) => "Call",
            Instruction::Result(_) => "Result",
            Instruction::Exit(_) => "Exit",
            Instruction::Goto(_) => "Goto",
            Instruction::JumpUnless(..) => "JumpUnless",
            Instruction::New(_) => "New",
            Instruction::Release(_) => "Release",
        }
    }

    fn target_mut(&mut self) -> Option<&mut usize> {
        match self {
            Instruction::Call(target)
            | Instruction::Goto(target)
            | Instruction::JumpUnless(_, target) => Some(target),
            _ => None,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t", self.mnemonic())?;
        match self {
            Instruction::Mov(dst, src)
            | Instruction::Add(dst, src)
            | Instruction::Sub(dst, src)
            | Instruction::Mul(dst, src)
            | Instruction::Div(dst, src)
            | Instruction::Mod(dst, src)
            | Instruction::Less(dst, src)
            | Instruction::LessEqual(dst, src)
            | Instruction::Greater(dst, src)
            | Instruction::GreaterEqual(dst, src)
            | Instruction::Equal(dst, src)
            | Instruction::NotEqual(dst, src)
            | Instruction::And(dst, src)
            | Instruction::Or(dst, src)
            | Instruction::Concat(dst, src) => write!(f, "{},{}", dst, src),
            Instruction::Push(accessor)
            | Instruction::Pop(accessor)
            | Instruction::Not(accessor)
            | Instruction::Result(accessor)
            | Instruction::Exit(accessor) => write!(f, "{}", accessor),
            Instruction::Drop(n) => write!(f, "{}", n),
            Instruction::Call(address) | Instruction::Goto(address) => {
                write!(f, "0x{:x}", address)
            }
            Instruction::JumpUnless(accessor, address) => write!(f, "{},0x{:x}", accessor, address),
            Instruction::New(address) | Instruction::Release(address) => {
                write!(f, "M(0x{:x})", address)
            }
        }
    }
}

/// A linear instruction stream, addressed by index.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Code {
    instructions: Vec<Instruction>,
    labels: Vec<(usize, String)>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction and returns its address.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, address: usize) -> Option<&Instruction> {
        self.instructions.get(address)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Names the block starting at `address` in the listing.
    pub fn label(&mut self, address: usize, name: &str) {
        self.labels.push((address, name.to_string()));
    }

    /// Points the branch or call at `address` to `target`.
    /// Returns `false` if that instruction does not take a target.
    pub fn patch(&mut self, address: usize, target: usize) -> bool {
        match self
            .instructions
            .get_mut(address)
            .and_then(Instruction::target_mut)
        {
            Some(slot) => {
                *slot = target;
                true
            }
            None => false,
        }
    }

    pub fn disassemble(&self) -> String {
        self.to_string()
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (address, instruction) in self.instructions.iter().enumerate() {
            for (_, name) in self.labels.iter().filter(|(at, _)| *at == address) {
                writeln!(f, "{}:", name)?;
            }
            writeln!(f, "{:04}\t{}", address, instruction)?;
        }
        Ok(())
    }
}
