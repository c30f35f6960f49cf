//! Error types for simcpu

use thiserror::Error;

/// Errors raised while a loaded program executes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Address outside `0..memory_size`
    #[error("address {address} out of bounds")]
    AddressOutOfBounds {
        address: i64,
        /// The address came from a register rather than the program text
        indirect: bool,
    },

    /// Program tried to overwrite a host-owned read-only cell
    #[error("write to read-only cell at @{address}")]
    ReadOnlyCell { address: usize },

    /// `pop` or `back` on an empty stack
    #[error("stack underflow")]
    StackUnderflow,

    #[error("unsupported function: {0}")]
    UnsupportedFunction(String),

    #[error("unsupported comparison: {0}")]
    UnsupportedComparison(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in '{0}'")]
    ArithmeticOverflow(String),

    /// Operation is not defined for the operand types
    #[error("type mismatch: {left} {op} {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("undefined label: {0}")]
    UndefinedLabel(String),

    #[error("invalid register R{0}")]
    InvalidRegister(usize),

    /// A word used as an address is not an integer
    #[error("not an address: {0}")]
    NotAnAddress(String),

    #[error("invalid value reference: {0}")]
    InvalidOperand(String),

    #[error("invalid target reference: {0}")]
    InvalidTarget(String),

    /// PC points at a slot that holds data or nothing
    #[error("no instruction at @{address}")]
    NotAnInstruction { address: usize },
}

impl RuntimeError {
    /// Whether this error depends on runtime data rather than on the
    /// program text.
    ///
    /// The load-time dry run executes against load-time data only, so it
    /// tolerates these and fails on everything else.
    pub fn is_value_dependent(&self) -> bool {
        match self {
            Self::AddressOutOfBounds { indirect, .. } => *indirect,
            Self::ReadOnlyCell { .. }
            | Self::StackUnderflow
            | Self::DivisionByZero
            | Self::ArithmeticOverflow(_)
            | Self::TypeMismatch { .. }
            | Self::NotAnAddress(_)
            | Self::NotAnInstruction { .. } => true,
            Self::UnsupportedFunction(_)
            | Self::UnsupportedComparison(_)
            | Self::UndefinedLabel(_)
            | Self::InvalidRegister(_)
            | Self::InvalidOperand(_)
            | Self::InvalidTarget(_) => false,
        }
    }
}

/// What went wrong on a particular source line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadErrorKind {
    #[error("unsupported command '{0}'")]
    UnsupportedCommand(String),

    #[error("{action} expects {expected} argument(s), got {found}")]
    Arity {
        action: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// Assignment target that is neither `R<n>` nor `@<addr>`
    #[error("{action}: invalid target '{token}'")]
    InvalidTarget { action: &'static str, token: String },

    #[error("invalid operand '{0}'")]
    InvalidOperand(String),

    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("redeclaration of label '{0}'")]
    DuplicateLabel(String),

    #[error("invalid label name '{0}'")]
    InvalidLabel(String),

    #[error("invalid origin '{0}'")]
    InvalidOrigin(String),

    #[error("out of memory at @{address}")]
    OutOfMemory { address: usize },

    #[error("memory not empty at @{address}")]
    SlotOccupied { address: usize },

    /// The load-time dry run hit a structural error
    #[error("validation failed: {0}")]
    Validation(RuntimeError),
}

/// Load failure. Loading is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("line {line}: {kind}\n  | {text}")]
    At {
        line: usize,
        text: String,
        kind: LoadErrorKind,
    },

    #[error("machine already holds a program")]
    AlreadyLoaded,
}

impl LoadError {
    /// Source line number, if the error is tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::At { line, .. } => Some(*line),
            Self::AlreadyLoaded => None,
        }
    }

    pub fn kind(&self) -> Option<&LoadErrorKind> {
        match self {
            Self::At { kind, .. } => Some(kind),
            Self::AlreadyLoaded => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// simcpu error type
#[derive(Debug, Error)]
pub enum SimError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
