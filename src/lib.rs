//! # simcpu - a small simulated processor
//!
//! A text assembly language, a loader that assembles it into a fixed-size
//! word memory, and a deterministic interpreter that runs it one atomic
//! cycle at a time.
//!
//! ## Core Components
//!
//! - **Machine**: memory, registers, a shared call/data stack, flags
//! - **Assembler**: line-oriented source to a resident program image
//! - **Validator**: load-time dry run of every instruction against a
//!   throwaway copy of machine state
//! - **Capability cells**: host-owned memory-mapped values, read-only
//!   (sensors) or read-write (actuators)
//!
//! ## Example
//!
//! ```ignore
//! use simcpu::{CapabilityCell, Machine};
//!
//! let mut cpu = Machine::new("probe");
//! cpu.load(source.lines(), 0)?;
//!
//! let health = CapabilityCell::read_only(100);
//! cpu.install_cell("_health", health.clone())?;
//!
//! // One tick: a bounded number of cycles
//! cpu.run_cycles(16)?;
//! ```

// Error types
mod error;
pub use error::{ConfigError, LoadError, LoadErrorKind, Result, RuntimeError, SimError};

// Machine configuration
pub mod config;
pub use config::MachineConfig;

// VM - assembler, interpreter, validator, introspection
pub mod vm;
pub use vm::{
    // Core types
    Machine, MachineReport, Flags, Word, CapabilityCell, Access,
    Instruction, Action,
    // Assembly
    Assembler, AssembledProgram, LabelTable,
    // Introspection
    disassemble, TraceSink, TraceEvent, StdoutSink, LogSink, BufferSink, NullSink,
};

// Program loader - load .sasm files
pub mod loader;
pub use loader::{load_file, load_with_preamble, machine_from_file};

// Validation utilities
pub mod validate;
pub use validate::{
    validate_file, validate_directory,
    ValidationResult, ValidationError, ValidationSummary,
};
