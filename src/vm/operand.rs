//! Operand - addressing-mode syntax
//!
//! Tokens are classified once, at load time. Resolution to a concrete word
//! or address happens every time the instruction runs, because register
//! indirection is only known at execution.
//!
//! ```text
//! R<n>          register
//! @<n>          memory at literal address
//! @<label>      memory at label address
//! @R<n>         memory at the address held in register n
//! 'text'        text literal
//! 42  -1.5      numeric literals
//! <label>       the label's address as an integer
//! ```

use super::register::parse_register;
use std::fmt;

/// Where a memory reference points.
#[derive(Debug, Clone, PartialEq)]
pub enum Address {
    Literal(i64),
    Label(String),
    /// Register-indirect: use the integer held in the register
    Register(usize),
}

impl Address {
    /// Parse the part after `@`.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(v) = parse_int(text) {
            return Some(Address::Literal(v));
        }
        if let Some(r) = parse_register(text) {
            return Some(Address::Register(r));
        }
        if is_label_name(text) {
            return Some(Address::Label(text.to_string()));
        }
        None
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Literal(v) => write!(f, "{}", v),
            Address::Label(name) => write!(f, "{}", name),
            Address::Register(r) => write!(f, "R{}", r),
        }
    }
}

/// A value reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(usize),
    Memory(Address),
    Text(String),
    Int(i64),
    Real(f64),
    /// Bare label: resolves to the label's address
    Label(String),
}

impl Operand {
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(rest) = token.strip_prefix('\'') {
            let inner = rest.strip_suffix('\'')?;
            return Some(Operand::Text(inner.to_string()));
        }
        if let Some(rest) = token.strip_prefix('@') {
            return Address::parse(rest).map(Operand::Memory);
        }
        if let Some(r) = parse_register(token) {
            return Some(Operand::Register(r));
        }
        if let Some(v) = parse_int(token) {
            return Some(Operand::Int(v));
        }
        if let Some(v) = parse_real(token) {
            return Some(Operand::Real(v));
        }
        if is_label_name(token) {
            return Some(Operand::Label(token.to_string()));
        }
        None
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "R{}", r),
            Operand::Memory(addr) => write!(f, "@{}", addr),
            Operand::Text(s) => write!(f, "'{}'", s),
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Real(v) => write!(f, "{:?}", v),
            Operand::Label(name) => write!(f, "{}", name),
        }
    }
}

/// An assignable location: `R<n>` or `@<addr>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Register(usize),
    Memory(Address),
}

impl Target {
    pub fn parse(token: &str) -> Option<Self> {
        match Operand::parse(token)? {
            Operand::Register(r) => Some(Target::Register(r)),
            Operand::Memory(addr) => Some(Target::Memory(addr)),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Register(r) => write!(f, "R{}", r),
            Target::Memory(addr) => write!(f, "@{}", addr),
        }
    }
}

impl From<Target> for Operand {
    fn from(target: Target) -> Self {
        match target {
            Target::Register(r) => Operand::Register(r),
            Target::Memory(addr) => Operand::Memory(addr),
        }
    }
}

/// Label names: a letter or `_`, then letters, digits or `_`.
///
/// `R<digits>` is a register, never a label.
pub fn is_label_name(text: &str) -> bool {
    let mut chars = text.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    first_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && parse_register(text).is_none()
}

/// Decimal integer with optional sign.
pub fn parse_int(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Decimal real. Rejects `inf`/`nan` spellings so they stay label names.
pub fn parse_real(text: &str) -> Option<f64> {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
