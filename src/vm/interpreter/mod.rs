//! Interpreter - fetch/execute engine for simcpu programs
//!
//! A [`Machine`] owns one memory image, register file, stack and label
//! table. It is loaded exactly once and then stepped by [`Machine::cpu_cycle`]
//! until a `halt` executes or a runtime error escapes.
//!
//! Each opcode category lives in its own file:
//! - `ops_data`: copy, compute, test, push, pop
//! - `ops_control`: jump, jumpif, call, callif, back
//! - `ops_debug`: trace, traceoff, debug, longdebug

mod ops_control;
mod ops_data;
mod ops_debug;

pub use ops_debug::MachineReport;

use super::assembler::{Assembler, AssembledProgram, LabelTable};
use super::disasm;
use super::memory::Memory;
use super::operand::{Address, Operand, Target};
use super::register::RegisterFile;
use super::trace::{StdoutSink, TraceEvent, TraceSink};
use super::validator;
use super::word::{CapabilityCell, Word};
use super::Instruction;
use crate::config::MachineConfig;
use crate::error::{ConfigError, LoadError, LoadErrorKind, RuntimeError};
use serde::Serialize;
use std::fmt;

/// Result of executing a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepResult {
    /// Advance PC by one
    Continue,
    /// The instruction set PC itself
    Jumped,
    Halted,
}

/// Machine status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Flags {
    /// Result of the last `test`
    pub test: bool,
    /// Emit each instruction before it executes
    pub trace: bool,
    pub halted: bool,
}

/// One simulated processor.
pub struct Machine {
    name: String,
    config: MachineConfig,
    pub(crate) memory: Memory,
    pub(crate) registers: RegisterFile,
    pub(crate) stack: Vec<Word>,
    pub(crate) labels: LabelTable,
    pub(crate) pc: usize,
    pub(crate) flags: Flags,
    pub(crate) sink: Box<dyn TraceSink>,
    loaded: bool,
}

impl Machine {
    /// Machine with the default configuration, writing diagnostics to stdout.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), MachineConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(name.into(), config))
    }

    fn build(name: String, config: MachineConfig) -> Self {
        Self {
            memory: Memory::new(config.memory_size),
            registers: RegisterFile::new(config.register_count),
            stack: Vec::new(),
            labels: LabelTable::new(),
            pc: 0,
            flags: Flags::default(),
            sink: Box::new(StdoutSink),
            loaded: false,
            name,
            config,
        }
    }

    /// Builder-style sink replacement.
    pub fn with_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Replace the diagnostics sink, returning the previous one.
    pub fn set_sink(&mut self, sink: Box<dyn TraceSink>) -> Box<dyn TraceSink> {
        std::mem::replace(&mut self.sink, sink)
    }

    /// Load, run to completion, and hand back the machine for inspection.
    pub fn run_source(name: impl Into<String>, source: &str) -> crate::Result<Self> {
        let mut machine = Self::new(name);
        machine.load(source.lines(), 0)?;
        machine.run()?;
        Ok(machine)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Assemble `lines` into memory starting at `start_address`.
    ///
    /// All-or-nothing: on any error, memory and labels are left exactly as
    /// they were. A machine accepts one program for its lifetime.
    pub fn load<I, S>(&mut self, lines: I, start_address: usize) -> Result<(), LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.loaded {
            return Err(LoadError::AlreadyLoaded);
        }

        let program = Assembler::new().assemble(lines, start_address, &self.memory)?;
        self.install(&program)?;

        if self.config.validate_on_load {
            if let Err(e) = validator::validate(self, &program) {
                self.uninstall(&program);
                return Err(e);
            }
        }

        self.loaded = true;
        log::debug!(
            "[{}] loaded {} words, {} labels",
            self.name,
            program.words.len(),
            program.labels.len()
        );
        Ok(())
    }

    fn install(&mut self, program: &AssembledProgram) -> Result<(), LoadError> {
        for placed in &program.words {
            if self.memory.poke(placed.address, placed.word.clone()).is_err() {
                self.uninstall(program);
                return Err(LoadError::At {
                    line: placed.line,
                    text: placed.text.clone(),
                    kind: LoadErrorKind::OutOfMemory { address: placed.address },
                });
            }
        }
        self.labels = program.labels.clone();
        Ok(())
    }

    fn uninstall(&mut self, program: &AssembledProgram) {
        // The assembler only places into empty slots
        for placed in &program.words {
            if let Err(e) = self.memory.poke(placed.address, Word::Empty) {
                log::warn!("Failed to clear @{} after rejected load: {}", placed.address, e);
            }
        }
        self.labels = LabelTable::new();
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute one instruction.
    ///
    /// On error, PC still points at the faulting instruction.
    pub fn cpu_cycle(&mut self) -> Result<(), RuntimeError> {
        if self.flags.halted {
            return Ok(());
        }

        let address = self.pc;
        let instr = match self.memory.read(address)? {
            Word::Instruction(instr) => instr,
            _ => return Err(RuntimeError::NotAnInstruction { address }),
        };

        if self.flags.trace {
            let text = self.disassemble_at(address);
            self.sink.emit(TraceEvent::Instruction {
                machine: &self.name,
                address,
                text: &text,
            });
        }
        log::trace!("[{}] @{}: {}", self.name, address, instr);

        match self.execute(&instr)? {
            StepResult::Continue => self.pc += 1,
            StepResult::Jumped => {}
            StepResult::Halted => log::info!("[{}] halted at @{}", self.name, address),
        }
        Ok(())
    }

    /// Cycle until halted. Loops forever on a program that never halts.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while !self.flags.halted {
            self.cpu_cycle()?;
        }
        Ok(())
    }

    /// Execute at most `max_cycles` instructions, stopping early on halt.
    /// Returns the number of instructions executed.
    pub fn run_cycles(&mut self, max_cycles: usize) -> Result<usize, RuntimeError> {
        let mut executed = 0;
        while executed < max_cycles && !self.flags.halted {
            self.cpu_cycle()?;
            executed += 1;
        }
        Ok(executed)
    }

    pub(crate) fn execute(&mut self, instr: &Instruction) -> Result<StepResult, RuntimeError> {
        match instr {
            // Data ops (ops_data.rs)
            Instruction::Copy { target, value } => self.execute_copy(target, value),
            Instruction::Compute { target, func, values } => {
                self.execute_compute(target, func, values)
            }
            Instruction::Test { left, op, right } => self.execute_test(left, op, right),
            Instruction::Push(value) => self.execute_push(value),
            Instruction::Pop(target) => self.execute_pop(target),

            // Control ops (ops_control.rs)
            Instruction::Jump(target) => self.execute_jump(target),
            Instruction::JumpIf(target) => self.execute_jump_if(target),
            Instruction::Call(target) => self.execute_call(target),
            Instruction::CallIf(target) => self.execute_call_if(target),
            Instruction::Back => self.execute_back(),

            // Diagnostics (ops_debug.rs)
            Instruction::Trace => self.execute_trace(true),
            Instruction::TraceOff => self.execute_trace(false),
            Instruction::Debug(values) => self.execute_debug(values, false),
            Instruction::LongDebug(values) => self.execute_debug(values, true),

            Instruction::Halt => {
                self.flags.halted = true;
                Ok(StepResult::Halted)
            }
        }
    }

    // =========================================================================
    // Operand resolution
    // =========================================================================

    pub(crate) fn label_address(&self, name: &str) -> Result<usize, RuntimeError> {
        self.labels
            .resolve(name)
            .ok_or_else(|| RuntimeError::UndefinedLabel(name.to_string()))
    }

    pub(crate) fn resolve_address(&self, address: &Address) -> Result<usize, RuntimeError> {
        match address {
            Address::Literal(a) => self.memory.check(*a, false),
            Address::Label(name) => {
                let a = self.label_address(name)?;
                self.memory.check(a as i64, false)
            }
            Address::Register(r) => {
                let a = self.register_address(*r)?;
                self.memory.check(a, true)
            }
        }
    }

    /// Integer held in a register, for indirection.
    fn register_address(&self, register: usize) -> Result<i64, RuntimeError> {
        let word = self.registers.get(register)?;
        word.as_int()
            .ok_or_else(|| RuntimeError::NotAnAddress(word.to_string()))
    }

    pub(crate) fn resolve_value(&self, operand: &Operand) -> Result<Word, RuntimeError> {
        match operand {
            Operand::Register(r) => self.registers.get(*r).cloned(),
            Operand::Memory(address) => self.memory.read(self.resolve_address(address)?),
            Operand::Text(s) => Ok(Word::Text(s.clone())),
            Operand::Int(v) => Ok(Word::Int(*v)),
            Operand::Real(v) => Ok(Word::Real(*v)),
            Operand::Label(name) => Ok(Word::Int(self.label_address(name)? as i64)),
        }
    }

    pub(crate) fn store(&mut self, target: &Target, value: Word) -> Result<(), RuntimeError> {
        match target {
            Target::Register(r) => self.registers.set(*r, value),
            Target::Memory(address) => {
                let address = self.resolve_address(address)?;
                self.memory.write(address, value)
            }
        }
    }

    /// Resolve a value token as the program would.
    pub fn get_value(&self, token: &str) -> Result<Word, RuntimeError> {
        let operand =
            Operand::parse(token).ok_or_else(|| RuntimeError::InvalidOperand(token.to_string()))?;
        self.resolve_value(&operand)
    }

    /// Resolve an address token: a decimal integer, `R<n>` (indirect) or a
    /// label, optionally written with a leading `@`.
    pub fn get_address(&self, token: &str) -> Result<usize, RuntimeError> {
        let bare = token.strip_prefix('@').unwrap_or(token);
        let address =
            Address::parse(bare).ok_or_else(|| RuntimeError::InvalidOperand(token.to_string()))?;
        self.resolve_address(&address)
    }

    // =========================================================================
    // Host access
    // =========================================================================

    /// Read with program semantics: cells yield their inner value.
    pub fn read(&self, location: &str) -> Result<Word, RuntimeError> {
        self.memory.read(self.get_address(location)?)
    }

    /// Write with program semantics: read-only cells reject the write.
    pub fn write(&mut self, location: &str, value: impl Into<Word>) -> Result<(), RuntimeError> {
        let address = self.get_address(location)?;
        self.memory.write(address, value.into())
    }

    /// Replace a slot outright, returning what was there.
    pub fn poke(&mut self, location: &str, value: impl Into<Word>) -> Result<Word, RuntimeError> {
        let address = self.get_address(location)?;
        self.memory.poke(address, value.into())
    }

    /// Map a host-owned cell into memory. Keep a clone of `cell` to
    /// observe or drive it.
    pub fn install_cell(&mut self, location: &str, cell: CapabilityCell) -> Result<(), RuntimeError> {
        let address = self.get_address(location)?;
        log::debug!(
            "[{}] {} cell installed at @{}",
            self.name,
            cell.access().name(),
            address
        );
        self.memory.install_cell(address, cell)
    }

    pub fn remove_cell(&mut self, location: &str) -> Result<Option<CapabilityCell>, RuntimeError> {
        let address = self.get_address(location)?;
        self.memory.remove_cell(address)
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.flags.trace = enabled;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_halted(&self) -> bool {
        self.flags.halted
    }

    pub fn test_flag(&self) -> bool {
        self.flags.test
    }

    pub fn trace_flag(&self) -> bool {
        self.flags.trace
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn stack(&self) -> &[Word] {
        &self.stack
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Disassemble `start..end`, clamped to memory.
    pub fn disassemble(&self, start: usize, end: usize) -> String {
        disasm::disassemble_range(self.memory.as_slice(), start, end, &self.labels)
    }

    /// Disassemble the single slot at `address`.
    pub fn disassemble_at(&self, address: usize) -> String {
        let words = self.memory.as_slice();
        match words.get(address) {
            Some(word) => disasm::disassemble(std::slice::from_ref(word), address, &self.labels),
            None => String::new(),
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.disassemble(0, self.memory.size()))
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("pc", &self.pc)
            .field("flags", &self.flags)
            .field("registers", &self.registers)
            .field("stack", &self.stack)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}
