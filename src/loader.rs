//! Program Loader - load simcpu programs from `.sasm` files
//!
//! # Usage
//!
//! ```ignore
//! use simcpu::{loader, Machine};
//!
//! let mut machine = Machine::new("probe");
//! loader::load_file(&mut machine, "programs/countdown.sasm")?;
//! machine.run()?;
//! ```
//!
//! An embedding host usually puts its memory map (labels for the cells
//! it will install) in a fixed preamble and chains the user's program
//! after it. Both halves go through a single load, so labels from either
//! are visible to the other. Reported line numbers count the preamble.

use crate::config::MachineConfig;
use crate::error::Result;
use crate::vm::Machine;
use std::path::Path;

/// Conventional extension for program files.
pub const SOURCE_EXTENSION: &str = "sasm";

/// Read program text from disk.
pub fn read_source(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    log::debug!("reading program {}", path.display());
    Ok(std::fs::read_to_string(path)?)
}

/// Load the program at `path` into `machine` at address 0.
pub fn load_file(machine: &mut Machine, path: impl AsRef<Path>) -> Result<()> {
    let source = read_source(path)?;
    machine.load(source.lines(), 0)?;
    Ok(())
}

/// Load `preamble` followed by the program at `path`, as one program.
pub fn load_with_preamble(machine: &mut Machine, preamble: &str, path: impl AsRef<Path>) -> Result<()> {
    let source = read_source(path)?;
    machine.load(preamble.lines().chain(source.lines()), 0)?;
    Ok(())
}

/// Build a machine named after the file stem and load the file into it.
pub fn machine_from_file(path: impl AsRef<Path>, config: &MachineConfig) -> Result<Machine> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    let mut machine = Machine::with_config(name, config.clone())?;
    load_file(&mut machine, path)?;
    Ok(machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::vm::{CapabilityCell, NullSink, Word};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn program_file(source: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", source).unwrap();
        file
    }

    #[test]
    fn test_load_file() {
        let file = program_file("copy R0 5\nhalt\n");
        let mut machine = Machine::new("file").with_sink(NullSink);
        load_file(&mut machine, file.path()).unwrap();
        machine.run().unwrap();
        assert_eq!(machine.get_value("R0").unwrap(), Word::Int(5));
    }

    #[test]
    fn test_load_missing_file() {
        let mut machine = Machine::new("file");
        let err = load_file(&mut machine, "/nonexistent/program.sasm").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
        assert!(!machine.is_loaded());
    }

    #[test]
    fn test_preamble_labels_visible_to_program() {
        let preamble = "@0\njump @_pgmstart\n@200\n_heading:\n=0\n_pgmstart:\n";
        let file = program_file("    copy @_heading 90\n    halt\n");

        let mut machine = Machine::new("bot").with_sink(NullSink);
        load_with_preamble(&mut machine, preamble, file.path()).unwrap();

        let heading = CapabilityCell::read_write(0);
        machine.install_cell("_heading", heading.clone()).unwrap();
        machine.run().unwrap();
        assert_eq!(heading.get(), Word::Int(90));
    }

    #[test]
    fn test_machine_from_file_uses_stem_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countdown.sasm");
        std::fs::write(&path, "copy R5 1\nhalt\n").unwrap();

        let config = MachineConfig {
            memory_size: 16,
            register_count: 8,
            ..MachineConfig::default()
        };
        let machine = machine_from_file(&path, &config).unwrap();
        assert_eq!(machine.name(), "countdown");
        assert_eq!(machine.memory().size(), 16);

        // R5 does not exist with the default register count
        assert!(matches!(
            machine_from_file(&path, &MachineConfig::default()),
            Err(SimError::Load(_))
        ));
    }
}
