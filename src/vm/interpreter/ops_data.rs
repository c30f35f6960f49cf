//! Data movement and arithmetic: copy, compute, test, push, pop

use super::{Machine, StepResult};
use crate::error::RuntimeError;
use crate::vm::instruction::{ArithOp, Comparison};
use crate::vm::operand::{Operand, Target};
use crate::vm::word::Word;
use std::cmp::Ordering;

impl Machine {
    pub(super) fn execute_copy(
        &mut self,
        target: &Target,
        value: &Operand,
    ) -> Result<StepResult, RuntimeError> {
        let value = self.resolve_value(value)?;
        self.store(target, value)?;
        Ok(StepResult::Continue)
    }

    /// Left fold: `v1 op v2 op ... vn`.
    pub(super) fn execute_compute(
        &mut self,
        target: &Target,
        func: &str,
        values: &[Operand],
    ) -> Result<StepResult, RuntimeError> {
        let op = ArithOp::parse(func)
            .ok_or_else(|| RuntimeError::UnsupportedFunction(func.to_string()))?;

        let mut words = values.iter().map(|v| self.resolve_value(v));
        let mut acc = words
            .next()
            .ok_or_else(|| RuntimeError::InvalidOperand(func.to_string()))??;
        for word in words {
            acc = arith(op, acc, word?)?;
        }

        self.store(target, acc)?;
        Ok(StepResult::Continue)
    }

    pub(super) fn execute_test(
        &mut self,
        left: &Operand,
        op: &str,
        right: &Operand,
    ) -> Result<StepResult, RuntimeError> {
        let cmp = Comparison::parse(op)
            .ok_or_else(|| RuntimeError::UnsupportedComparison(op.to_string()))?;
        let left = self.resolve_value(left)?;
        let right = self.resolve_value(right)?;
        self.flags.test = compare(cmp, &left, &right);
        Ok(StepResult::Continue)
    }

    pub(super) fn execute_push(&mut self, value: &Operand) -> Result<StepResult, RuntimeError> {
        let value = self.resolve_value(value)?;
        self.stack.push(value);
        Ok(StepResult::Continue)
    }

    /// The stack only shrinks once the store succeeded.
    pub(super) fn execute_pop(&mut self, target: &Target) -> Result<StepResult, RuntimeError> {
        let value = self.stack.last().cloned().ok_or(RuntimeError::StackUnderflow)?;
        self.store(target, value)?;
        self.stack.pop();
        Ok(StepResult::Continue)
    }
}

fn mismatch(op: &str, left: &Word, right: &Word) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op: op.to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

fn arith(op: ArithOp, left: Word, right: Word) -> Result<Word, RuntimeError> {
    match (&left, &right) {
        (Word::Int(a), Word::Int(b)) => int_arith(op, *a, *b),
        (Word::Int(_) | Word::Real(_), Word::Int(_) | Word::Real(_)) => {
            match (left.as_real(), right.as_real()) {
                (Some(a), Some(b)) => real_arith(op, a, b),
                _ => Err(mismatch(op.symbol(), &left, &right)),
            }
        }
        (Word::Text(a), Word::Text(b)) if op == ArithOp::Add => {
            Ok(Word::Text(format!("{}{}", a, b)))
        }
        _ => Err(mismatch(op.symbol(), &left, &right)),
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> Result<Word, RuntimeError> {
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            floor_div(a, b)
        }
    };
    result
        .map(Word::Int)
        .ok_or_else(|| RuntimeError::ArithmeticOverflow(format!("{} {} {}", a, op.symbol(), b)))
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn real_arith(op: ArithOp, a: f64, b: f64) -> Result<Word, RuntimeError> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a / b
        }
    };
    if !result.is_finite() {
        return Err(RuntimeError::ArithmeticOverflow(format!(
            "{:?} {} {:?}",
            a,
            op.symbol(),
            b
        )));
    }
    Ok(Word::Real(result))
}

/// `=` and `!=` are defined for every pair of words. Ordering is total:
/// words of different kinds order by kind, empty < number < text <
/// instruction < cell.
fn compare(cmp: Comparison, left: &Word, right: &Word) -> bool {
    match cmp {
        Comparison::Eq => return left == right,
        Comparison::Ne => return left != right,
        _ => {}
    }

    let ordering = match (left, right) {
        (Word::Int(a), Word::Int(b)) => Some(a.cmp(b)),
        (Word::Int(_) | Word::Real(_), Word::Int(_) | Word::Real(_)) => left
            .as_real()
            .zip(right.as_real())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Word::Text(a), Word::Text(b)) => Some(a.cmp(b)),
        (Word::Instruction(a), Word::Instruction(b)) => Some(a.to_string().cmp(&b.to_string())),
        _ => Some(kind_rank(left).cmp(&kind_rank(right))),
    };

    // NaN is unordered against everything
    let Some(ordering) = ordering else {
        return false;
    };
    match cmp {
        Comparison::Lt => ordering == Ordering::Less,
        Comparison::Gt => ordering == Ordering::Greater,
        Comparison::Le => ordering != Ordering::Greater,
        Comparison::Ge => ordering != Ordering::Less,
        Comparison::Eq => ordering == Ordering::Equal,
        Comparison::Ne => ordering != Ordering::Equal,
    }
}

fn kind_rank(word: &Word) -> u8 {
    match word {
        Word::Empty => 0,
        Word::Int(_) | Word::Real(_) => 1,
        Word::Text(_) => 2,
        Word::Instruction(_) => 3,
        Word::Cell(_) => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, LoadErrorKind};
    use crate::vm::trace::NullSink;

    fn run(source: &str) -> Result<Machine, RuntimeError> {
        let mut m = Machine::new("data").with_sink(NullSink);
        m.load(source.lines(), 0).expect("load failed");
        m.run()?;
        Ok(m)
    }

    fn r0(source: &str) -> Word {
        let m = run(source).expect("run failed");
        m.get_value("R0").unwrap()
    }

    #[test]
    fn test_compute_left_fold() {
        assert_eq!(r0("compute R0 - 10 3 2\nhalt"), Word::Int(5));
        assert_eq!(r0("compute R0 * 2 3 4\nhalt"), Word::Int(24));
        assert_eq!(r0("compute R0 + 7\nhalt"), Word::Int(7));
    }

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(r0("compute R0 / 7 2\nhalt"), Word::Int(3));
        assert_eq!(r0("compute R0 / -7 2\nhalt"), Word::Int(-4));
        assert_eq!(r0("compute R0 / 7 -2\nhalt"), Word::Int(-4));
        assert_eq!(r0("compute R0 / -8 2\nhalt"), Word::Int(-4));
    }

    #[test]
    fn test_real_promotion() {
        assert_eq!(r0("compute R0 / 7 2.0\nhalt"), Word::Real(3.5));
        assert_eq!(r0("compute R0 + 0.5 1\nhalt"), Word::Real(1.5));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run("compute R0 / 1 0\nhalt").unwrap_err(), RuntimeError::DivisionByZero);
        assert_eq!(run("compute R0 / 1.0 0.0\nhalt").unwrap_err(), RuntimeError::DivisionByZero);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = run("compute R0 + 9223372036854775807 1\nhalt").unwrap_err();
        assert!(matches!(err, RuntimeError::ArithmeticOverflow(_)));
        let err = run("compute R0 / -9223372036854775808 -1\nhalt").unwrap_err();
        assert!(matches!(err, RuntimeError::ArithmeticOverflow(_)));
    }

    #[test]
    fn test_text_arithmetic() {
        assert_eq!(r0("compute R0 + 'ab' 'cd'\nhalt"), Word::Text("abcd".into()));
        assert_eq!(
            run("compute R0 + 'ab' 1\nhalt").unwrap_err(),
            RuntimeError::TypeMismatch {
                op: "+".into(),
                left: "text".into(),
                right: "int".into(),
            }
        );
        assert!(run("compute R0 * 'ab' 'cd'\nhalt").is_err());
    }

    #[test]
    fn test_unsupported_function_fails_load() {
        let mut m = Machine::new("data").with_sink(NullSink);
        let err = m.load(["compute R0 % 5 2", "halt"], 0).unwrap_err();
        match err {
            LoadError::At { line: 1, kind: LoadErrorKind::Validation(e), .. } => {
                assert_eq!(e, RuntimeError::UnsupportedFunction("%".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comparisons() {
        let flag = |src: &str| run(&format!("{}\nhalt", src)).unwrap().test_flag();
        assert!(flag("test 1 < 2"));
        assert!(!flag("test 2 < 2"));
        assert!(flag("test 2 <= 2"));
        assert!(flag("test 3 > 2.5"));
        assert!(flag("test 2 >= 2.0"));
        assert!(flag("test 'abc' < 'abd'"));
        assert!(flag("test 1 != 2"));
    }

    #[test]
    fn test_equals_is_equality() {
        let m = run("copy R0 4\ntest R0 = 4\nhalt").unwrap();
        assert!(m.test_flag());
        assert_eq!(m.get_value("R0").unwrap(), Word::Int(4));

        assert!(run("test 2 = 2.0\nhalt").unwrap().test_flag());
        assert!(!run("test 'a' = 1\nhalt").unwrap().test_flag());
        assert!(run("test R1 = R2\nhalt").unwrap().test_flag());
    }

    #[test]
    fn test_ordering_mixed_types_is_total() {
        let mut m = run("test R0 < 5\nhalt").unwrap();
        assert!(m.test_flag());

        m = run("test 'a' < 1\nhalt").unwrap();
        assert!(!m.test_flag());

        m = run("test 'a' > 1\nhalt").unwrap();
        assert!(m.test_flag());

        m = run("test R0 >= R1\nhalt").unwrap();
        assert!(m.test_flag());
    }

    #[test]
    fn test_copy_through_register_indirection() {
        let m = run("copy R1 spot\ncopy @R1 'hi'\ncopy R0 @spot\nhalt\nspot:\n=0").unwrap();
        assert_eq!(m.get_value("R0").unwrap(), Word::Text("hi".into()));
    }

    #[test]
    fn test_pop_failure_keeps_stack() {
        let mut m = Machine::new("data").with_sink(NullSink);
        m.load(["push 5", "pop R9", "halt"], 0).unwrap_err();

        let mut m = Machine::with_config("data", Default::default())
            .unwrap()
            .with_sink(NullSink);
        m.load(["push 5", "pop @R0", "halt"], 0).unwrap();
        m.cpu_cycle().unwrap();
        assert!(matches!(m.cpu_cycle(), Err(RuntimeError::NotAnAddress(_))));
        assert_eq!(m.stack(), &[Word::Int(5)]);
        assert_eq!(m.pc(), 1);
    }
}
