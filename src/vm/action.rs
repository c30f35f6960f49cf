//! Action - Opcode definitions
//!
//! | Category | Actions                                   |
//! |----------|-------------------------------------------|
//! | Data     | copy, compute, test, push, pop            |
//! | Control  | jump, jumpif, call, callif, back, halt    |
//! | Debug    | trace, traceoff, debug, longdebug         |

use std::fmt;

/// Operation opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Copy,
    Compute,
    Test,
    Jump,
    JumpIf,
    Call,
    CallIf,
    Back,
    Push,
    Pop,
    Trace,
    TraceOff,
    Debug,
    LongDebug,
    Halt,
}

/// Accepted argument counts for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }

    pub fn describe(&self) -> &'static str {
        match *self {
            Arity::Exactly(0) => "no",
            Arity::Exactly(1) => "exactly 1",
            Arity::Exactly(2) => "exactly 2",
            Arity::Exactly(3) => "exactly 3",
            Arity::AtLeast(0) => "any number of",
            Arity::AtLeast(3) => "at least 3",
            _ => "a different number of",
        }
    }
}

impl Action {
    pub const ALL: [Action; 15] = [
        Action::Copy,
        Action::Compute,
        Action::Test,
        Action::Jump,
        Action::JumpIf,
        Action::Call,
        Action::CallIf,
        Action::Back,
        Action::Push,
        Action::Pop,
        Action::Trace,
        Action::TraceOff,
        Action::Debug,
        Action::LongDebug,
        Action::Halt,
    ];

    /// Assembler mnemonic
    pub const fn name(&self) -> &'static str {
        match self {
            Action::Copy => "copy",
            Action::Compute => "compute",
            Action::Test => "test",
            Action::Jump => "jump",
            Action::JumpIf => "jumpif",
            Action::Call => "call",
            Action::CallIf => "callif",
            Action::Back => "back",
            Action::Push => "push",
            Action::Pop => "pop",
            Action::Trace => "trace",
            Action::TraceOff => "traceoff",
            Action::Debug => "debug",
            Action::LongDebug => "longdebug",
            Action::Halt => "halt",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }

    pub const fn arity(&self) -> Arity {
        match self {
            Action::Copy => Arity::Exactly(2),
            Action::Compute => Arity::AtLeast(3),
            Action::Test => Arity::Exactly(3),
            Action::Jump | Action::JumpIf | Action::Call | Action::CallIf => Arity::Exactly(1),
            Action::Push | Action::Pop => Arity::Exactly(1),
            Action::Back | Action::Trace | Action::TraceOff | Action::Halt => Arity::Exactly(0),
            Action::Debug | Action::LongDebug => Arity::AtLeast(0),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
