//! Program Validator - load-time dry run
//!
//! Executes every loaded instruction exactly once, in address order,
//! against a disposable copy of the machine's state:
//! - memory is swapped for a detached copy, so host cells are never touched
//! - registers, stack, PC and flags are saved and restored verbatim
//! - diagnostics output is silenced
//!
//! Before each instruction the stack is reset to a single filler word, so
//! `pop` and `back` never underflow and `push` never accumulates.
//!
//! Structural failures (undefined labels, bad registers, unsupported
//! functions, literal addresses outside memory) abort the load.
//! Value-dependent failures are logged and tolerated: the dry run only
//! sees load-time data.

use super::assembler::AssembledProgram;
use super::interpreter::{Flags, Machine};
use super::memory::Memory;
use super::register::RegisterFile;
use super::trace::{NullSink, TraceSink};
use super::word::Word;
use crate::error::{LoadError, LoadErrorKind};
use std::ops::{Deref, DerefMut};

const STACK_FILLER: Word = Word::Int(0);

/// Everything the dry run may disturb.
struct Snapshot {
    memory: Memory,
    registers: RegisterFile,
    stack: Vec<Word>,
    pc: usize,
    flags: Flags,
    sink: Box<dyn TraceSink>,
}

/// Scoped state swap. The saved state goes back into the machine when the
/// guard drops, whichever way the dry run exits.
struct StateSwap<'m> {
    machine: &'m mut Machine,
    saved: Option<Snapshot>,
}

impl<'m> StateSwap<'m> {
    fn new(machine: &'m mut Machine) -> Self {
        let working = machine.memory.detached();
        let saved = Snapshot {
            memory: std::mem::replace(&mut machine.memory, working),
            registers: machine.registers.clone(),
            stack: std::mem::take(&mut machine.stack),
            pc: machine.pc,
            flags: machine.flags,
            sink: machine.set_sink(Box::new(NullSink)),
        };
        Self {
            machine,
            saved: Some(saved),
        }
    }
}

impl Deref for StateSwap<'_> {
    type Target = Machine;

    fn deref(&self) -> &Machine {
        self.machine
    }
}

impl DerefMut for StateSwap<'_> {
    fn deref_mut(&mut self) -> &mut Machine {
        self.machine
    }
}

impl Drop for StateSwap<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.machine.memory = saved.memory;
            self.machine.registers = saved.registers;
            self.machine.stack = saved.stack;
            self.machine.pc = saved.pc;
            self.machine.flags = saved.flags;
            self.machine.sink = saved.sink;
        }
    }
}

/// Dry-run every instruction of `program`, already installed in `machine`.
pub(crate) fn validate(machine: &mut Machine, program: &AssembledProgram) -> Result<(), LoadError> {
    let mut instructions: Vec<_> = program.instructions().collect();
    instructions.sort_by_key(|(placed, _)| placed.address);

    let mut dry = StateSwap::new(machine);
    let mut tolerated = 0usize;

    for (placed, instr) in &instructions {
        dry.pc = placed.address;
        dry.stack.clear();
        dry.stack.push(STACK_FILLER);

        match dry.execute(instr) {
            Ok(_) => {}
            Err(e) if e.is_value_dependent() => {
                log::warn!(
                    "line {}: '{}' may fail at runtime: {}",
                    placed.line,
                    placed.text.trim(),
                    e
                );
                tolerated += 1;
            }
            Err(e) => {
                return Err(LoadError::At {
                    line: placed.line,
                    text: placed.text.clone(),
                    kind: LoadErrorKind::Validation(e),
                });
            }
        }
    }

    log::debug!(
        "[{}] validated {} instructions ({} value-dependent)",
        dry.name(),
        instructions.len(),
        tolerated
    );
    Ok(())
}
