//! Assembler - turns source lines into a resident program image
//!
//! ## Assembly Syntax
//!
//! ```text
//! # Comments start with a hash
//! @200            ; move the load cursor (no slot consumed)
//! tango:          ; label the current cursor address (no slot consumed)
//! =5              ; store a literal: integer, real or 'quoted text'
//!
//! @0
//! loop:
//!     compute @tango - @tango 1
//!     test @tango > 0
//!     jumpif loop
//!     halt
//! ```
//!
//! Operands are classified here but not resolved: a forward reference to a
//! label declared later in the source is fine.

use super::action::Action;
use super::instruction::Instruction;
use super::memory::Memory;
use super::operand::{is_label_name, parse_int, parse_real};
use super::word::Word;
use crate::error::{LoadError, LoadErrorKind};
use std::collections::{BTreeMap, HashSet};

const COMMENT_CHAR: char = '#';
const ORIGIN_CHAR: char = '@';
const LITERAL_CHAR: char = '=';
const LABEL_SUFFIX: char = ':';
const QUOTE: char = '\'';

/// Label name to resolved memory address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a label. Redeclaration is an error.
    pub fn declare(&mut self, name: &str, address: usize) -> Result<(), LoadErrorKind> {
        if self.labels.contains_key(name) {
            return Err(LoadErrorKind::DuplicateLabel(name.to_string()));
        }
        self.labels.insert(name.to_string(), address);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Every label pointing at `address`, sorted by name.
    pub fn labels_at(&self, address: usize) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter(move |&(_, &a)| a == address)
            .map(|(name, _)| name.as_str())
    }

    /// Labels sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(name, &a)| (name.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// One word placed by the loader, with the source line it came from.
#[derive(Debug, Clone)]
pub struct PlacedWord {
    pub address: usize,
    pub word: Word,
    pub line: usize,
    pub text: String,
}

/// Assembled program, not yet installed in a machine.
#[derive(Debug, Clone, Default)]
pub struct AssembledProgram {
    pub labels: LabelTable,
    pub words: Vec<PlacedWord>,
}

impl AssembledProgram {
    /// Placed instructions in source order.
    pub fn instructions(&self) -> impl Iterator<Item = (&PlacedWord, &Instruction)> {
        self.words
            .iter()
            .filter_map(|p| p.word.as_instruction().map(|i| (p, i)))
    }
}

/// What one source line asks for.
#[derive(Debug, Clone, PartialEq)]
enum Directive {
    Origin(usize),
    Label(String),
    Store(Word),
}

/// Line-oriented assembler.
pub struct Assembler {
    /// Current line number (for error reporting)
    line_number: usize,
    line_text: String,
    cursor: usize,
    labels: LabelTable,
    words: Vec<PlacedWord>,
    used: HashSet<usize>,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            line_number: 0,
            line_text: String::new(),
            cursor: 0,
            labels: LabelTable::new(),
            words: Vec::new(),
            used: HashSet::new(),
        }
    }

    /// Assemble `lines` starting at `start_address`.
    ///
    /// `memory` is only consulted for occupancy and size: slots that already
    /// hold something (such as host-installed cells) cannot be loaded over.
    pub fn assemble<I, S>(
        &mut self,
        lines: I,
        start_address: usize,
        memory: &Memory,
    ) -> Result<AssembledProgram, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.line_number = 0;
        self.line_text.clear();
        self.cursor = start_address;
        self.labels = LabelTable::new();
        self.words.clear();
        self.used.clear();

        for (idx, line) in lines.into_iter().enumerate() {
            self.line_number = idx + 1;
            self.line_text = line.as_ref().to_string();

            let directive = match parse_line(line.as_ref()) {
                Ok(Some(d)) => d,
                Ok(None) => continue,
                Err(kind) => return Err(self.error(kind)),
            };

            match directive {
                Directive::Origin(address) => {
                    log::debug!("line {}: origin @{}", self.line_number, address);
                    self.cursor = address;
                }
                Directive::Label(name) => {
                    log::debug!("line {}: label {} = @{}", self.line_number, name, self.cursor);
                    let address = self.cursor;
                    self.labels
                        .declare(&name, address)
                        .map_err(|kind| self.error(kind))?;
                }
                Directive::Store(word) => self.place(word, memory)?,
            }
        }

        log::debug!(
            "assembled {} words, {} labels",
            self.words.len(),
            self.labels.len()
        );

        Ok(AssembledProgram {
            labels: std::mem::take(&mut self.labels),
            words: std::mem::take(&mut self.words),
        })
    }

    fn place(&mut self, word: Word, memory: &Memory) -> Result<(), LoadError> {
        let address = self.cursor;
        if address >= memory.size() {
            return Err(self.error(LoadErrorKind::OutOfMemory { address }));
        }
        let occupied = memory.slot(address).map(|w| !w.is_empty()).unwrap_or(true);
        if occupied || self.used.contains(&address) {
            return Err(self.error(LoadErrorKind::SlotOccupied { address }));
        }
        self.used.insert(address);
        self.words.push(PlacedWord {
            address,
            word,
            line: self.line_number,
            text: self.line_text.clone(),
        });
        self.cursor += 1;
        Ok(())
    }

    /// Create an error at current line
    fn error(&self, kind: LoadErrorKind) -> LoadError {
        LoadError::At {
            line: self.line_number,
            text: self.line_text.clone(),
            kind,
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_line(raw: &str) -> Result<Option<Directive>, LoadErrorKind> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(COMMENT_CHAR) {
        return Ok(None);
    }

    if let Some(rest) = line.strip_prefix(ORIGIN_CHAR) {
        let address = rest
            .trim()
            .parse::<usize>()
            .map_err(|_| LoadErrorKind::InvalidOrigin(rest.to_string()))?;
        return Ok(Some(Directive::Origin(address)));
    }

    if let Some(rest) = line.strip_prefix(LITERAL_CHAR) {
        return parse_literal(rest.trim()).map(|w| Some(Directive::Store(w)));
    }

    if let Some(name) = line.strip_suffix(LABEL_SUFFIX) {
        let name = name.trim();
        if !is_label_name(name) {
            return Err(LoadErrorKind::InvalidLabel(name.to_string()));
        }
        return Ok(Some(Directive::Label(name.to_string())));
    }

    let mut tokens = tokenize(line)?;
    let mnemonic = tokens.remove(0);
    let action = Action::from_mnemonic(&mnemonic)
        .ok_or_else(|| LoadErrorKind::UnsupportedCommand(mnemonic.clone()))?;
    let instr = Instruction::build(action, &tokens)?;
    Ok(Some(Directive::Store(Word::Instruction(instr))))
}

/// Narrow literal grammar for `=` lines: integer, real, or quoted text.
pub fn parse_literal(text: &str) -> Result<Word, LoadErrorKind> {
    if let Some(v) = parse_int(text) {
        return Ok(Word::Int(v));
    }
    if let Some(v) = parse_real(text) {
        return Ok(Word::Real(v));
    }
    if text.len() >= 2 && text.starts_with(QUOTE) && text.ends_with(QUOTE) {
        return Ok(Word::Text(text[1..text.len() - 1].to_string()));
    }
    if text.starts_with(QUOTE) {
        return Err(LoadErrorKind::UnterminatedString);
    }
    Err(LoadErrorKind::InvalidLiteral(text.to_string()))
}

/// Split an instruction line on whitespace.
///
/// A token starting with `'` runs until a `'` that is followed by
/// whitespace or the end of the line; whitespace inside is kept as written.
pub fn tokenize(line: &str) -> Result<Vec<String>, LoadErrorKind> {
    let mut out = Vec::with_capacity(4);
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == QUOTE {
            chars.next();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                let at_boundary = chars.peek().map_or(true, |&(_, n)| n.is_whitespace());
                if c == QUOTE && at_boundary {
                    end = Some(i + c.len_utf8());
                    break;
                }
            }
            let end = end.ok_or(LoadErrorKind::UnterminatedString)?;
            out.push(line[start..end].to_string());
            continue;
        }

        let mut end = line.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() {
                end = i;
                break;
            }
            chars.next();
        }
        out.push(line[start..end].to_string());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::operand::{Address, Operand, Target};

    fn assemble(source: &str) -> Result<AssembledProgram, LoadError> {
        Assembler::new().assemble(source.lines(), 0, &Memory::new(256))
    }

    fn word_at(program: &AssembledProgram, address: usize) -> Word {
        let placed = program.words.iter().find(|p| p.address == address);
        placed.map(|p| p.word.clone()).unwrap_or_default()
    }

    #[test]
    fn test_assemble_simple() {
        let program = assemble("copy R0 5\nhalt").expect("Assembly failed");
        assert_eq!(program.words.len(), 2);
        assert_eq!(program.words[0].address, 0);
        assert_eq!(
            program.words[1].word,
            Word::Instruction(Instruction::Halt)
        );
    }

    #[test]
    fn test_origin_labels_and_literals() {
        let source = r#"
# Declare some variables at address 200 and up
@200
polka:
=0
tango:
=5
philip:
='two words'
ratio:
=1.5

@0
    copy @polka 'tango'
    halt
"#;
        let program = assemble(source).expect("Assembly failed");

        assert_eq!(program.labels.resolve("polka"), Some(200));
        assert_eq!(program.labels.resolve("tango"), Some(201));
        assert_eq!(program.labels.resolve("philip"), Some(202));
        assert_eq!(word_at(&program, 201), Word::Int(5));
        assert_eq!(word_at(&program, 202), Word::Text("two words".into()));
        assert_eq!(word_at(&program, 203), Word::Real(1.5));

        let (placed, copy) = program.instructions().next().unwrap();
        assert_eq!(placed.address, 0);
        assert_eq!(
            *copy,
            Instruction::Copy {
                target: Target::Memory(Address::Label("polka".into())),
                value: Operand::Text("tango".into()),
            }
        );
    }

    #[test]
    fn test_duplicate_label() {
        let err = assemble("x:\n=1\nx:\n=2").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.kind(), Some(&LoadErrorKind::DuplicateLabel("x".into())));
    }

    #[test]
    fn test_unsupported_command_reports_line() {
        let err = assemble("copy R0 1\n\nfrobnicate R0").unwrap_err();
        match err {
            LoadError::At { line, text, kind } => {
                assert_eq!(line, 3);
                assert_eq!(text, "frobnicate R0");
                assert_eq!(kind, LoadErrorKind::UnsupportedCommand("frobnicate".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_out_of_memory() {
        let err = Assembler::new()
            .assemble(["halt", "halt", "halt"], 0, &Memory::new(2))
            .unwrap_err();
        assert_eq!(err.kind(), Some(&LoadErrorKind::OutOfMemory { address: 2 }));
    }

    #[test]
    fn test_slot_reused_within_program() {
        let err = assemble("=1\n@0\n=2").unwrap_err();
        assert_eq!(err.kind(), Some(&LoadErrorKind::SlotOccupied { address: 0 }));
    }

    #[test]
    fn test_start_address() {
        let program = Assembler::new()
            .assemble(["start:", "halt"], 10, &Memory::new(16))
            .unwrap();
        assert_eq!(program.labels.resolve("start"), Some(10));
        assert_eq!(program.words[0].address, 10);
    }

    #[test]
    fn test_tokenize_quoted_strings() {
        assert_eq!(
            tokenize("debug 'Check out  the stack' R0").unwrap(),
            vec!["debug", "'Check out  the stack'", "R0"]
        );
        assert_eq!(tokenize("copy R0 'it's'").unwrap(), vec!["copy", "R0", "'it's'"]);
        assert_eq!(tokenize("debug 'open"), Err(LoadErrorKind::UnterminatedString));
        assert_eq!(tokenize("  halt  ").unwrap(), vec!["halt"]);
    }

    #[test]
    fn test_literal_grammar() {
        assert_eq!(parse_literal("-3"), Ok(Word::Int(-3)));
        assert_eq!(parse_literal("0.25"), Ok(Word::Real(0.25)));
        assert_eq!(parse_literal("''"), Ok(Word::Text(String::new())));
        assert_eq!(parse_literal("'oops"), Err(LoadErrorKind::UnterminatedString));
        assert!(matches!(
            parse_literal("__import__('os')"),
            Err(LoadErrorKind::InvalidLiteral(_))
        ));
        assert!(parse_literal("").is_err());
    }

    #[test]
    fn test_invalid_label_and_origin() {
        assert!(matches!(
            assemble("R1:").unwrap_err().kind(),
            Some(LoadErrorKind::InvalidLabel(_))
        ));
        assert!(matches!(
            assemble("@-4").unwrap_err().kind(),
            Some(LoadErrorKind::InvalidOrigin(_))
        ));
    }

    #[test]
    fn test_forward_reference_is_not_resolved_here() {
        let program = assemble("jump later\nlater:\nhalt").unwrap();
        assert_eq!(program.labels.resolve("later"), Some(1));
    }
}
