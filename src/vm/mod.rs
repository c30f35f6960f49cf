//! simcpu VM - a small simulated processor
//!
//! Programs are line-oriented assembly text, loaded once into a fixed-size
//! word memory and executed one atomic cycle at a time.
//!
//! ## Machine model
//!
//! ```text
//! Memory     256 words (configurable)   instructions, data, host cells
//! Registers  R0..R3 (configurable)      general purpose
//! Stack      unbounded                  push/pop data AND call returns
//! Flags      test, trace, halted
//! ```
//!
//! ## Instruction set
//!
//! ```text
//! copy     target value                 target <- value
//! compute  target func v1 .. vn         left fold with + - * /
//! test     left op right                test flag <- left op right
//! jump     target                       PC <- target
//! jumpif   target                       jump if test flag set
//! call     target                       push PC+1, PC <- target
//! callif   target                       call if test flag set
//! back                                  PC <- pop
//! push     value
//! pop      target
//! trace / traceoff                      per-instruction output
//! debug / longdebug  values..           state report
//! halt
//! ```
//!
//! ## Example Assembly
//!
//! ```text
//! @200
//! tango:
//! =5
//!
//! @0
//! loop:
//!     compute @tango - @tango 1
//!     test @tango > 0
//!     jumpif loop
//!     halt
//! ```
//!
//! ## Host cells
//!
//! An embedding simulation exposes its state through [`CapabilityCell`]s
//! mapped into memory: read-only cells for sensors, read-write cells for
//! actuators. The host keeps a clone of each cell and sees program writes
//! immediately.

mod action;
mod assembler;
mod disasm;
mod instruction;
mod interpreter;
mod memory;
mod operand;
mod register;
mod trace;
mod validator;
mod word;

pub use action::{Action, Arity};
pub use assembler::{parse_literal, tokenize, AssembledProgram, Assembler, LabelTable, PlacedWord};
pub use disasm::disassemble;
pub use instruction::{ArithOp, Comparison, Instruction};
pub use interpreter::{Flags, Machine, MachineReport};
pub use memory::Memory;
pub use operand::{Address, Operand, Target};
pub use register::RegisterFile;
pub use trace::{BufferSink, LogSink, NullSink, StdoutSink, TraceEvent, TraceSink};
pub use word::{Access, CapabilityCell, Word};
