//! Control flow operation implementations for the Machine
//!
//! Every handler here sets PC itself when it transfers control and
//! reports [`StepResult::Jumped`] so the cycle skips the auto-increment.

use super::{Machine, StepResult};
use crate::error::RuntimeError;
use crate::vm::operand::Operand;
use crate::vm::word::Word;

impl Machine {
    /// Resolve a control-flow target to an in-bounds address.
    ///
    /// Accepts a label, an integer address, `R<n>` holding an address, or
    /// `@<addr>`, which names the address itself rather than its contents.
    fn resolve_jump(&self, target: &Operand) -> Result<usize, RuntimeError> {
        match target {
            Operand::Label(name) => {
                let address = self.label_address(name)?;
                self.memory.check(address as i64, false)
            }
            Operand::Int(address) => self.memory.check(*address, false),
            Operand::Register(r) => {
                let address = self.register_address(*r)?;
                self.memory.check(address, true)
            }
            Operand::Memory(address) => self.resolve_address(address),
            Operand::Text(_) | Operand::Real(_) => {
                Err(RuntimeError::InvalidTarget(target.to_string()))
            }
        }
    }

    pub(super) fn execute_jump(&mut self, target: &Operand) -> Result<StepResult, RuntimeError> {
        self.pc = self.resolve_jump(target)?;
        Ok(StepResult::Jumped)
    }

    /// The target is resolved even when the branch is not taken.
    pub(super) fn execute_jump_if(&mut self, target: &Operand) -> Result<StepResult, RuntimeError> {
        let address = self.resolve_jump(target)?;
        if !self.flags.test {
            return Ok(StepResult::Continue);
        }
        self.pc = address;
        Ok(StepResult::Jumped)
    }

    /// Push the return address (the next instruction) and transfer.
    pub(super) fn execute_call(&mut self, target: &Operand) -> Result<StepResult, RuntimeError> {
        let address = self.resolve_jump(target)?;
        self.stack.push(Word::Int(self.pc as i64 + 1));
        self.pc = address;
        Ok(StepResult::Jumped)
    }

    pub(super) fn execute_call_if(&mut self, target: &Operand) -> Result<StepResult, RuntimeError> {
        let address = self.resolve_jump(target)?;
        if !self.flags.test {
            return Ok(StepResult::Continue);
        }
        self.stack.push(Word::Int(self.pc as i64 + 1));
        self.pc = address;
        Ok(StepResult::Jumped)
    }

    /// Return to the address on top of the stack.
    pub(super) fn execute_back(&mut self) -> Result<StepResult, RuntimeError> {
        let top = self.stack.last().ok_or(RuntimeError::StackUnderflow)?;
        let address = top
            .as_int()
            .ok_or_else(|| RuntimeError::NotAnAddress(top.to_string()))?;
        self.pc = self.memory.check(address, true)?;
        self.stack.pop();
        Ok(StepResult::Jumped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, LoadErrorKind};
    use crate::vm::trace::NullSink;

    fn machine(source: &str) -> Machine {
        let mut m = Machine::new("control").with_sink(NullSink);
        m.load(source.lines(), 0).expect("load failed");
        m
    }

    #[test]
    fn test_jumpif_not_taken_advances() {
        let mut m = machine("test 1 > 2\njumpif end\ncopy R0 1\nend:\nhalt");
        m.run().unwrap();
        assert_eq!(m.get_value("R0").unwrap(), Word::Int(1));
    }

    #[test]
    fn test_jumpif_taken() {
        let mut m = machine("test 2 > 1\njumpif end\ncopy R0 1\nend:\nhalt");
        m.run_cycles(2).unwrap();
        assert_eq!(m.pc(), 3);
    }

    #[test]
    fn test_callif() {
        let mut m = machine("test 1 = 2\ncallif sub\nhalt\nsub:\nback");
        m.run_cycles(2).unwrap();
        assert_eq!(m.pc(), 2);
        assert!(m.stack().is_empty());

        let mut m = machine("test 1 = 1\ncallif sub\nhalt\nsub:\nback");
        m.run_cycles(2).unwrap();
        assert_eq!(m.pc(), 3);
        assert_eq!(m.stack(), &[Word::Int(2)]);
        m.run().unwrap();
        assert_eq!(m.pc(), 2);
    }

    #[test]
    fn test_nested_calls() {
        let source = r#"
    call outer
    halt
outer:
    push 'frame'
    call inner
    pop R1
    back
inner:
    copy R0 'deep'
    back
"#;
        let mut m = machine(source);
        m.run().unwrap();
        assert_eq!(m.get_value("R0").unwrap(), Word::Text("deep".into()));
        assert_eq!(m.get_value("R1").unwrap(), Word::Text("frame".into()));
        assert_eq!(m.pc(), 1);
        assert!(m.stack().is_empty());
    }

    #[test]
    fn test_jump_target_forms() {
        let mut m = machine("jump 3\nhalt\nhalt\njump @main\nmain:\ncopy R2 1\njump R2");
        m.run_cycles(3).unwrap();
        assert_eq!(m.pc(), 5);
        m.cpu_cycle().unwrap();
        assert_eq!(m.pc(), 1);
    }

    #[test]
    fn test_back_on_empty_stack() {
        let mut m = machine("back");
        assert_eq!(m.cpu_cycle(), Err(RuntimeError::StackUnderflow));
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn test_back_to_non_address() {
        let mut m = machine("push 'oops'\nback");
        m.cpu_cycle().unwrap();
        assert!(matches!(m.cpu_cycle(), Err(RuntimeError::NotAnAddress(_))));
        assert_eq!(m.stack().len(), 1);
    }

    #[test]
    fn test_undefined_jump_target_fails_load() {
        let mut m = Machine::new("control").with_sink(NullSink);
        let err = m.load(["test 1 > 2", "jumpif nowhere", "halt"], 0).unwrap_err();
        assert!(matches!(
            err,
            LoadError::At {
                line: 2,
                kind: LoadErrorKind::Validation(RuntimeError::UndefinedLabel(_)),
                ..
            }
        ));
    }

    #[test]
    fn test_jump_out_of_memory_fails_load() {
        let mut m = Machine::new("control").with_sink(NullSink);
        let err = m.load(["jump 999"], 0).unwrap_err();
        assert!(matches!(
            err.kind(),
            Some(LoadErrorKind::Validation(RuntimeError::AddressOutOfBounds { .. }))
        ));
        assert!(m.load(["jump 'text'"], 0).is_err());
    }
}
