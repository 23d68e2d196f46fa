mod flow;
mod heap;
mod stack;

use std::{cmp::Ordering, fmt::Display};

use crate::bytecode::{Accessor, Code, Instruction};

use self::{
    flow::Flow,
    heap::Heap,
    stack::{Stack, DEFAULT_STACK_SIZE},
};

/// A runtime value. Values are cloned, never shared, when copied between
/// locations.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEntry {
    Number(f64),
    String(String),
}

impl StackEntry {
    pub fn is_truthy(&self) -> bool {
        match self {
            StackEntry::Number(n) => *n != 0.0,
            StackEntry::String(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StackEntry::Number(_) => "number",
            StackEntry::String(_) => "string",
        }
    }

    fn boolean(b: bool) -> Self {
        StackEntry::Number(if b { 1.0 } else { 0.0 })
    }
}

impl Display for StackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackEntry::Number(n) => write!(f, "{}", n),
            StackEntry::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("{operation} requires {expected}, found {left} and {right}")]
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("Cannot reassign a constant accessor")]
    ConstantAssignment,
    #[error("Stack overflow ({0} entries)")]
    StackOverflow(usize),
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Stack offset {0} is outside the current frame")]
    StackOutOfBounds(isize),
    #[error("Heap address {0:#x} is already allocated")]
    DoubleAllocation(usize),
    #[error("Heap address {0:#x} is not allocated and cannot be released")]
    InvalidRelease(usize),
    #[error("Heap address {0:#x} used after release")]
    UseAfterRelease(usize),
    #[error("Register %{0} does not exist")]
    InvalidRegister(usize),
    #[error("Program counter {0:04} is outside the program")]
    PcOutOfBounds(usize),
    #[error("Result executed outside of a function call")]
    ReturnOutsideFunction,
    #[error("Step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
    #[error("Virtual machine is not running")]
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Halted,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of stack entries.
    pub stack_size: usize,
    pub step_limit: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            step_limit: None,
        }
    }
}

pub struct Vm<'a> {
    code: &'a Code,
    stack: Stack,
    heap: Heap,
    flow: Flow,
    accumulator: StackEntry,
    state: VmState,
    step_limit: Option<u64>,
    steps: u64,
}

impl<'a> Vm<'a> {
    pub fn new(code: &'a Code) -> Self {
        Self::with_config(code, VmConfig::default())
    }

    pub fn with_config(code: &'a Code, config: VmConfig) -> Self {
        Self {
            code,
            stack: Stack::new(config.stack_size),
            heap: Heap::new(),
            flow: Flow::new(),
            accumulator: StackEntry::Number(0.0),
            state: VmState::Running,
            step_limit: config.step_limit,
            steps: 0,
        }
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn accumulator(&self) -> &StackEntry {
        &self.accumulator
    }

    pub fn bp(&self) -> usize {
        self.stack.bp()
    }

    pub fn sp(&self) -> usize {
        self.stack.sp()
    }

    pub fn pc(&self) -> usize {
        self.flow.pc()
    }

    /// Runs until the program exits and returns the accumulator.
    pub fn run(&mut self) -> Result<StackEntry, RuntimeError> {
        while self.state == VmState::Running {
            self.step()?;
        }

        match self.state {
            VmState::Halted => {
                tracing::debug!(steps = self.steps, result = %self.accumulator, "halted");
                Ok(self.accumulator.clone())
            }
            _ => Err(RuntimeError::NotRunning),
        }
    }

    /// Executes one instruction. Any error moves the machine to `Faulted`.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        if self.state != VmState::Running {
            return Err(RuntimeError::NotRunning);
        }

        let result = self.execute();
        if let Err(error) = &result {
            tracing::debug!(pc = self.flow.pc(), %error, "faulted");
            self.state = VmState::Faulted;
        }
        result
    }

    fn execute(&mut self) -> Result<(), RuntimeError> {
        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(RuntimeError::StepLimitExceeded(limit));
            }
        }
        self.steps += 1;

        let code = self.code;
        let pc = self.flow.pc();
        let instruction = code.get(pc).ok_or(RuntimeError::PcOutOfBounds(pc))?;

        #[cfg(feature = "trace")]
        tracing::trace!(stack = %self.stack, "{:04}\t{}", pc, instruction);

        self.flow.advance();
        match instruction {
            Instruction::Mov(dst, src) => {
                let value = src.to_value(self)?;
                dst.assign(self, value)?;
            }
            Instruction::Push(src) => {
                let value = src.to_value(self)?;
                self.stack.push(value)?;
            }
            Instruction::Pop(dst) => {
                let value = self.stack.pop()?;
                dst.assign(self, value)?;
            }
            Instruction::Drop(n) => self.stack.drop(*n)?,
            Instruction::Add(dst, src) => self.binary_op(dst, src, arithmetic("Add", |a, b| a + b))?,
            Instruction::Sub(dst, src) => self.binary_op(dst, src, arithmetic("Sub", |a, b| a - b))?,
            Instruction::Mul(dst, src) => self.binary_op(dst, src, arithmetic("Mul", |a, b| a * b))?,
            Instruction::Div(dst, src) => self.binary_op(dst, src, arithmetic("Div", |a, b| a / b))?,
            Instruction::Mod(dst, src) => self.binary_op(dst, src, arithmetic("Mod", |a, b| a % b))?,
            Instruction::Less(dst, src) => {
                self.binary_op(dst, src, comparison("Less", Ordering::is_lt))?
            }
            Instruction::LessEqual(dst, src) => {
                self.binary_op(dst, src, comparison("LessEqual", Ordering::is_le))?
            }
            Instruction::Greater(dst, src) => {
                self.binary_op(dst, src, comparison("Greater", Ordering::is_gt))?
            }
            Instruction::GreaterEqual(dst, src) => {
                self.binary_op(dst, src, comparison("GreaterEqual", Ordering::is_ge))?
            }
            Instruction::Equal(dst, src) => {
                self.binary_op(dst, src, |a, b| Ok(StackEntry::boolean(a == b)))?
            }
            Instruction::NotEqual(dst, src) => {
                self.binary_op(dst, src, |a, b| Ok(StackEntry::boolean(a != b)))?
            }
            Instruction::And(dst, src) => self.binary_op(dst, src, |a, b| {
                Ok(StackEntry::boolean(a.is_truthy() && b.is_truthy()))
            })?,
            Instruction::Or(dst, src) => self.binary_op(dst, src, |a, b| {
                Ok(StackEntry::boolean(a.is_truthy() || b.is_truthy()))
            })?,
            Instruction::Concat(dst, src) => self.binary_op(dst, src, |a, b| match a {
                StackEntry::String(mut s) => {
                    s.push_str(&b.to_string());
                    Ok(StackEntry::String(s))
                }
                a => Err(type_mismatch("Concat", "a string destination", &a, &b)),
            })?,
            Instruction::Not(dst) => {
                let value = dst.to_value(self)?;
                dst.assign(self, StackEntry::boolean(!value.is_truthy()))?;
            }
            Instruction::Call(address) => {
                self.stack.push_frame()?;
                self.flow.call(*address);
            }
            Instruction::Result(src) => {
                let value = src.to_value(self)?;
                self.flow.ret()?;
                self.stack.pop_frame()?;
                self.accumulator = value;
            }
            Instruction::Exit(src) => {
                self.accumulator = src.to_value(self)?;
                self.state = VmState::Halted;
            }
            Instruction::Goto(address) => self.flow.jump(*address),
            Instruction::JumpUnless(src, address) => {
                if !src.to_value(self)?.is_truthy() {
                    self.flow.jump(*address);
                }
            }
            Instruction::New(address) => self.heap.allocate(*address)?,
            Instruction::Release(address) => self.heap.release(*address)?,
        }

        Ok(())
    }

    fn binary_op(
        &mut self,
        dst: &Accessor,
        src: &Accessor,
        op: impl Fn(StackEntry, StackEntry) -> Result<StackEntry, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let a = dst.to_value(self)?;
        let b = src.to_value(self)?;
        dst.assign(self, op(a, b)?)
    }

    fn register(&self, id: usize) -> Result<&StackEntry, RuntimeError> {
        match id {
            0 => Ok(&self.accumulator),
            _ => Err(RuntimeError::InvalidRegister(id)),
        }
    }

    fn register_mut(&mut self, id: usize) -> Result<&mut StackEntry, RuntimeError> {
        match id {
            0 => Ok(&mut self.accumulator),
            _ => Err(RuntimeError::InvalidRegister(id)),
        }
    }
}

impl Accessor {
    pub fn to_value(&self, vm: &Vm) -> Result<StackEntry, RuntimeError> {
        match self {
            Accessor::Stack(offset) => vm.stack.get(*offset).cloned(),
            Accessor::Heap(address) => vm.heap.load(*address).cloned(),
            Accessor::Register(id) => vm.register(*id).cloned(),
            Accessor::Constant(value) => Ok(value.clone()),
        }
    }

    pub fn assign(&self, vm: &mut Vm, value: StackEntry) -> Result<(), RuntimeError> {
        match self {
            Accessor::Stack(offset) => vm.stack.set(*offset, value),
            Accessor::Heap(address) => vm.heap.store(*address, value),
            Accessor::Register(id) => {
                *vm.register_mut(*id)? = value;
                Ok(())
            }
            Accessor::Constant(_) => Err(RuntimeError::ConstantAssignment),
        }
    }
}

fn type_mismatch(
    operation: &'static str,
    expected: &'static str,
    left: &StackEntry,
    right: &StackEntry,
) -> RuntimeError {
    RuntimeError::TypeMismatch {
        operation,
        expected,
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn arithmetic(
    operation: &'static str,
    f: impl Fn(f64, f64) -> f64,
) -> impl Fn(StackEntry, StackEntry) -> Result<StackEntry, RuntimeError> {
    move |a, b| match (&a, &b) {
        (StackEntry::Number(x), StackEntry::Number(y)) => Ok(StackEntry::Number(f(*x, *y))),
        _ => Err(type_mismatch(operation, "2 numbers", &a, &b)),
    }
}

/// Numbers compare numerically and strings lexicographically. NaN compares
/// false against everything.
fn comparison(
    operation: &'static str,
    f: impl Fn(Ordering) -> bool,
) -> impl Fn(StackEntry, StackEntry) -> Result<StackEntry, RuntimeError> {
    move |a, b| {
        let ordering = match (&a, &b) {
            (StackEntry::Number(x), StackEntry::Number(y)) => x.partial_cmp(y),
            (StackEntry::String(x), StackEntry::String(y)) => Some(x.cmp(y)),
            _ => return Err(type_mismatch(operation, "2 numbers or 2 strings", &a, &b)),
        };
        Ok(StackEntry::boolean(ordering.map_or(false, &f)))
    }
}
