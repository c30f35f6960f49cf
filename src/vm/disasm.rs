//! Disassembler - renders memory back to loadable source
//!
//! Each slot is preceded by the labels that point at it. Runs of empty
//! slots collapse into a single `@<addr>` origin marker, so feeding the
//! output back to the loader reproduces the same label table and
//! instruction stream. A dump that runs to the end of memory also carries
//! the labels declared past the last slot.

use super::assembler::LabelTable;
use super::word::Word;

const INDENT: &str = "    ";

/// Disassemble `words`, the first of which lives at `start_address`.
pub fn disassemble(words: &[Word], start_address: usize, labels: &LabelTable) -> String {
    render(words, start_address, labels).join("\n")
}

/// Disassemble `memory[start..end]`. When the range reaches the end of
/// memory, labels at or beyond `memory.len()` follow under their own
/// origin markers.
pub(crate) fn disassemble_range(
    memory: &[Word],
    start: usize,
    end: usize,
    labels: &LabelTable,
) -> String {
    let end = end.min(memory.len());
    let start = start.min(end);
    let mut out = render(&memory[start..end], start, labels);

    if end == memory.len() {
        let mut tail: Vec<(usize, &str)> = labels
            .iter()
            .filter(|&(_, address)| address >= end)
            .map(|(name, address)| (address, name))
            .collect();
        tail.sort();

        let mut last = None;
        for (address, name) in tail {
            if last != Some(address) {
                out.push(format!("@{}", address));
                last = Some(address);
            }
            out.push(format!("{}:", name));
        }
    }

    out.join("\n")
}

fn render(words: &[Word], start_address: usize, labels: &LabelTable) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    // Multi-slot dumps always open with an origin marker
    let mut skipped_last = words.len() > 1;

    for (offset, word) in words.iter().enumerate() {
        let address = start_address + offset;
        let mut emit = |line: String, skipped: &mut bool| {
            if *skipped {
                out.push(format!("@{}", address));
            }
            out.push(line);
            *skipped = false;
        };

        for name in labels.labels_at(address) {
            emit(format!("{}:", name), &mut skipped_last);
        }

        match word {
            Word::Empty => skipped_last = true,
            Word::Instruction(instr) => emit(format!("{}{}", INDENT, instr), &mut skipped_last),
            Word::Cell(cell) => {
                // Host-owned, not loadable: the next slot needs a fresh origin
                emit(
                    format!("# {} cell = {}", cell.access().name(), cell.get()),
                    &mut skipped_last,
                );
                skipped_last = true;
            }
            literal => {
                let text = literal.literal().unwrap_or_else(|| literal.to_string());
                emit(format!("={}", text), &mut skipped_last);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::assembler::Assembler;
    use crate::vm::memory::Memory;
    use crate::vm::word::CapabilityCell;

    fn load(source: &str, memory_size: usize) -> (Memory, LabelTable) {
        let mut memory = Memory::new(memory_size);
        let program = Assembler::new().assemble(source.lines(), 0, &memory).unwrap();
        for placed in program.words {
            memory.poke(placed.address, placed.word).unwrap();
        }
        (memory, program.labels)
    }

    #[test]
    fn test_empty_runs_collapse_to_origin() {
        let (memory, labels) = load("halt\n@5\nx:\n=3", 8);
        let text = disassemble(memory.as_slice(), 0, &labels);
        assert_eq!(text, "@0\n    halt\n@5\nx:\n=3");
    }

    #[test]
    fn test_single_slot_has_no_marker() {
        let (memory, labels) = load("loop:\ncopy R0 1", 4);
        let text = disassemble(&memory.as_slice()[0..1], 0, &labels);
        assert_eq!(text, "loop:\n    copy R0 1");
    }

    #[test]
    fn test_roundtrip_preserves_program() {
        let source = "jump main\nhello:\n='Hello  there'\nratio:\n=2.0\n@10\nmain:\ncopy @hello R1\ncompute R0 * 1 2 3\nhalt";
        let (memory, labels) = load(source, 32);

        let text = disassemble(memory.as_slice(), 0, &labels);
        let (reloaded, relabels) = load(&text, 32);

        assert_eq!(relabels, labels);
        assert_eq!(reloaded.as_slice(), memory.as_slice());
    }

    #[test]
    fn test_roundtrip_keeps_labels_past_memory() {
        let source = "@254\nlast:\nhalt\n=1\nend:\n@300\nfar:\nalso_far:";
        let (memory, labels) = load(source, 256);
        assert_eq!(labels.resolve("end"), Some(256));

        let text = disassemble_range(memory.as_slice(), 0, 256, &labels);
        assert!(text.ends_with("@256\nend:\n@300\nalso_far:\nfar:"));

        let (reloaded, relabels) = load(&text, 256);
        assert_eq!(relabels, labels);
        assert_eq!(reloaded.as_slice(), memory.as_slice());
    }

    #[test]
    fn test_partial_range_skips_trailing_labels() {
        let (memory, labels) = load("halt\nhalt\nend:", 2);
        assert_eq!(disassemble_range(memory.as_slice(), 0, 1, &labels), "    halt");
        assert_eq!(
            disassemble_range(memory.as_slice(), 1, 2, &labels),
            "    halt\n@2\nend:"
        );
    }

    #[test]
    fn test_cell_rendered_as_comment() {
        let (mut memory, labels) = load("halt\n=1\n=2", 3);
        memory.poke(1, Word::Cell(CapabilityCell::read_only(7))).unwrap();

        let text = disassemble(memory.as_slice(), 0, &labels);
        assert_eq!(text, "@0\n    halt\n# read-only cell = 7\n@2\n=2");
    }
}
