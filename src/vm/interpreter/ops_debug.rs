//! Diagnostics: trace, traceoff, debug, longdebug
//!
//! None of these can fail. Values that do not resolve are shown with a
//! `**` marker in place of their value.

use super::{Flags, Machine, StepResult};
use crate::error::RuntimeError;
use crate::vm::trace::TraceEvent;
use crate::vm::word::Word;
use serde::Serialize;
use std::collections::BTreeMap;

const DEBUG_BANNER: &str = "----==| DEBUG |==----";
const UNRESOLVED_MARKER: &str = "**";

/// Post-mortem snapshot of machine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineReport {
    pub name: String,
    pub pc: usize,
    pub flags: Flags,
    pub registers: Vec<String>,
    pub stack: Vec<String>,
    pub labels: BTreeMap<String, usize>,
}

/// Source-literal form where one exists, so text shows its quotes.
fn render(word: &Word) -> String {
    word.literal().unwrap_or_else(|| word.to_string())
}

impl Machine {
    pub fn report(&self) -> MachineReport {
        MachineReport {
            name: self.name.clone(),
            pc: self.pc,
            flags: self.flags,
            registers: self.registers.iter().map(render).collect(),
            stack: self.stack.iter().map(render).collect(),
            labels: self
                .labels
                .iter()
                .map(|(name, address)| (name.to_string(), address))
                .collect(),
        }
    }

    /// Render the `debug` (or, with `long`, `longdebug`) report for the
    /// given value tokens.
    pub fn render_debug<S: AsRef<str>>(&self, values: &[S], long: bool) -> String {
        let report = self.report();
        let mut out = vec![
            DEBUG_BANNER.to_string(),
            format!(
                "NAME: {} TEST: {} PC: {} REGISTERS: [{}] STACK: [{}] INSTRUCTION:",
                report.name,
                report.flags.test,
                report.pc,
                report.registers.join(", "),
                report.stack.join(", ")
            ),
        ];

        if self.pc < self.memory.size() {
            out.push(self.disassemble_at(self.pc));
        } else {
            out.push("PROGRAM COUNTER OUTSIDE MEMORY".to_string());
        }

        let shown: Vec<String> = values
            .iter()
            .map(|token| {
                let token = token.as_ref();
                match self.get_value(token) {
                    Ok(word) => word.to_string(),
                    Err(_) => format!("{}{}", UNRESOLVED_MARKER, token),
                }
            })
            .collect();
        out.push(format!("DEBUG: {}", shown.join(", ")));

        if long {
            for (name, address) in self.labels.iter() {
                match self.memory.slot(address) {
                    Ok(word) => out.push(format!("{} = {}", name, word)),
                    Err(_) => out.push(format!("{} = @{}", name, address)),
                }
            }
            out.push("Memory disassembled".to_string());
            out.push(self.to_string());
        }

        out.join("\n")
    }

    pub(super) fn execute_trace(&mut self, enabled: bool) -> Result<StepResult, RuntimeError> {
        self.flags.trace = enabled;
        Ok(StepResult::Continue)
    }

    pub(super) fn execute_debug(
        &mut self,
        values: &[String],
        long: bool,
    ) -> Result<StepResult, RuntimeError> {
        let text = self.render_debug(values, long);
        self.sink.emit(TraceEvent::Report {
            machine: &self.name,
            text: &text,
        });
        Ok(StepResult::Continue)
    }
}
