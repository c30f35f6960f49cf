//! Trace and debug output.
//!
//! The machine never prints directly. `trace` mode and the `debug` /
//! `longdebug` instructions emit [`TraceEvent`]s into the machine's
//! [`TraceSink`]; the host picks where they go.

use std::sync::{Arc, Mutex};

/// Program-visible diagnostics output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent<'a> {
    /// Trace mode: an instruction about to execute, already disassembled.
    Instruction {
        machine: &'a str,
        address: usize,
        text: &'a str,
    },
    /// Rendered `debug` / `longdebug` report.
    Report { machine: &'a str, text: &'a str },
}

pub trait TraceSink: Send {
    fn emit(&mut self, event: TraceEvent<'_>);
}

/// Writes to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl TraceSink for StdoutSink {
    fn emit(&mut self, event: TraceEvent<'_>) {
        match event {
            TraceEvent::Instruction { text, .. } => println!("> {}", text),
            TraceEvent::Report { text, .. } => println!("{}", text),
        }
    }
}

/// Forwards to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn emit(&mut self, event: TraceEvent<'_>) {
        match event {
            TraceEvent::Instruction { machine, address, text } => {
                log::info!(target: "simcpu::trace", "[{}] @{}: {}", machine, address, text)
            }
            TraceEvent::Report { machine, text } => {
                log::info!(target: "simcpu::trace", "[{}]\n{}", machine, text)
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&mut self, _event: TraceEvent<'_>) {}
}

/// Collects output lines in memory. Clones share the same buffer, so a
/// host can keep one handle and give the other to the machine.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }

    pub fn clear(&self) {
        match self.lines.lock() {
            Ok(mut lines) => lines.clear(),
            Err(e) => e.into_inner().clear(),
        }
    }

    fn push(&self, text: String) {
        match self.lines.lock() {
            Ok(mut lines) => lines.extend(text.lines().map(str::to_string)),
            Err(e) => e.into_inner().extend(text.lines().map(str::to_string)),
        }
    }
}

impl TraceSink for BufferSink {
    fn emit(&mut self, event: TraceEvent<'_>) {
        match event {
            TraceEvent::Instruction { text, .. } => self.push(format!("> {}", text)),
            TraceEvent::Report { text, .. } => self.push(text.to_string()),
        }
    }
}
