//! Instruction - decoded instruction with typed operand tokens
//!
//! Operands are classified at load time but resolved on every execution.
//! Arithmetic functions and comparison operators are kept as written and
//! looked up when the instruction runs.

use super::action::Action;
use super::operand::{Operand, Target};
use crate::error::LoadErrorKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Copy {
        target: Target,
        value: Operand,
    },
    Compute {
        target: Target,
        func: String,
        values: Vec<Operand>,
    },
    Test {
        left: Operand,
        op: String,
        right: Operand,
    },
    Jump(Operand),
    JumpIf(Operand),
    Call(Operand),
    CallIf(Operand),
    Back,
    Push(Operand),
    Pop(Target),
    Trace,
    TraceOff,
    /// Arguments stay raw: each is resolved best-effort when rendered
    Debug(Vec<String>),
    LongDebug(Vec<String>),
    Halt,
}

impl Instruction {
    /// Build an instruction from its mnemonic's arguments.
    pub fn build(action: Action, args: &[String]) -> Result<Self, LoadErrorKind> {
        let arity = action.arity();
        if !arity.accepts(args.len()) {
            return Err(LoadErrorKind::Arity {
                action: action.name(),
                expected: arity.describe(),
                found: args.len(),
            });
        }

        let target = |token: &str| {
            Target::parse(token).ok_or_else(|| LoadErrorKind::InvalidTarget {
                action: action.name(),
                token: token.to_string(),
            })
        };

        let instr = match action {
            Action::Copy => Instruction::Copy {
                target: target(&args[0])?,
                value: operand(&args[1])?,
            },
            Action::Compute => Instruction::Compute {
                target: target(&args[0])?,
                func: args[1].clone(),
                values: args[2..].iter().map(|a| operand(a)).collect::<Result<_, _>>()?,
            },
            Action::Test => Instruction::Test {
                left: operand(&args[0])?,
                op: args[1].clone(),
                right: operand(&args[2])?,
            },
            Action::Jump => Instruction::Jump(operand(&args[0])?),
            Action::JumpIf => Instruction::JumpIf(operand(&args[0])?),
            Action::Call => Instruction::Call(operand(&args[0])?),
            Action::CallIf => Instruction::CallIf(operand(&args[0])?),
            Action::Back => Instruction::Back,
            Action::Push => Instruction::Push(operand(&args[0])?),
            Action::Pop => Instruction::Pop(target(&args[0])?),
            Action::Trace => Instruction::Trace,
            Action::TraceOff => Instruction::TraceOff,
            Action::Debug => Instruction::Debug(args.to_vec()),
            Action::LongDebug => Instruction::LongDebug(args.to_vec()),
            Action::Halt => Instruction::Halt,
        };
        Ok(instr)
    }

    pub fn action(&self) -> Action {
        match self {
            Instruction::Copy { .. } => Action::Copy,
            Instruction::Compute { .. } => Action::Compute,
            Instruction::Test { .. } => Action::Test,
            Instruction::Jump(_) => Action::Jump,
            Instruction::JumpIf(_) => Action::JumpIf,
            Instruction::Call(_) => Action::Call,
            Instruction::CallIf(_) => Action::CallIf,
            Instruction::Back => Action::Back,
            Instruction::Push(_) => Action::Push,
            Instruction::Pop(_) => Action::Pop,
            Instruction::Trace => Action::Trace,
            Instruction::TraceOff => Action::TraceOff,
            Instruction::Debug(_) => Action::Debug,
            Instruction::LongDebug(_) => Action::LongDebug,
            Instruction::Halt => Action::Halt,
        }
    }

    /// Arguments rendered back to source tokens.
    pub fn args(&self) -> Vec<String> {
        match self {
            Instruction::Copy { target, value } => vec![target.to_string(), value.to_string()],
            Instruction::Compute { target, func, values } => {
                let mut out = vec![target.to_string(), func.clone()];
                out.extend(values.iter().map(|v| v.to_string()));
                out
            }
            Instruction::Test { left, op, right } => {
                vec![left.to_string(), op.clone(), right.to_string()]
            }
            Instruction::Jump(label)
            | Instruction::JumpIf(label)
            | Instruction::Call(label)
            | Instruction::CallIf(label)
            | Instruction::Push(label) => vec![label.to_string()],
            Instruction::Pop(target) => vec![target.to_string()],
            Instruction::Debug(values) | Instruction::LongDebug(values) => values.clone(),
            Instruction::Back | Instruction::Trace | Instruction::TraceOff | Instruction::Halt => {
                Vec::new()
            }
        }
    }
}

fn operand(token: &str) -> Result<Operand, LoadErrorKind> {
    Operand::parse(token).ok_or_else(|| LoadErrorKind::InvalidOperand(token.to_string()))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action())?;
        for arg in self.args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// `compute` functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// `test` operators. `=` is equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
}

impl Comparison {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Comparison::Lt),
            ">" => Some(Comparison::Gt),
            "<=" => Some(Comparison::Le),
            ">=" => Some(Comparison::Ge),
            "!=" => Some(Comparison::Ne),
            "=" => Some(Comparison::Eq),
            _ => None,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Gt => ">",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Ne => "!=",
            Comparison::Eq => "=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::operand::Address;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_copy() {
        let instr = Instruction::build(Action::Copy, &args(&["R0", "5"])).unwrap();
        assert_eq!(
            instr,
            Instruction::Copy {
                target: Target::Register(0),
                value: Operand::Int(5),
            }
        );
        assert_eq!(instr.to_string(), "copy R0 5");
    }

    #[test]
    fn test_copy_target_must_be_assignable() {
        let err = Instruction::build(Action::Copy, &args(&["0", "R0"])).unwrap_err();
        assert!(matches!(err, LoadErrorKind::InvalidTarget { action: "copy", .. }));

        let err = Instruction::build(Action::Compute, &args(&["'x'", "+", "1"])).unwrap_err();
        assert!(matches!(err, LoadErrorKind::InvalidTarget { action: "compute", .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Instruction::build(Action::Test, &args(&["R0", "<"])).unwrap_err();
        assert!(matches!(err, LoadErrorKind::Arity { found: 2, .. }));
        assert!(Instruction::build(Action::Halt, &args(&["now"])).is_err());
    }

    #[test]
    fn test_compute_display() {
        let instr = Instruction::build(Action::Compute, &args(&["@tango", "-", "@tango", "1"])).unwrap();
        match &instr {
            Instruction::Compute { target, values, .. } => {
                assert_eq!(*target, Target::Memory(Address::Label("tango".into())));
                assert_eq!(values.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(instr.to_string(), "compute @tango - @tango 1");
    }

    #[test]
    fn test_debug_keeps_raw_args() {
        let instr = Instruction::build(Action::Debug, &args(&["'end of program'", "@999"])).unwrap();
        assert_eq!(instr.to_string(), "debug 'end of program' @999");
    }

    #[test]
    fn test_operators() {
        assert_eq!(ArithOp::parse("/"), Some(ArithOp::Div));
        assert_eq!(ArithOp::parse("%"), None);
        assert_eq!(Comparison::parse("="), Some(Comparison::Eq));
        assert_eq!(Comparison::parse("=="), None);
    }
}
