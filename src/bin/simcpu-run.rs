//! simcpu-run - load and run a simcpu program
//!
//! # Usage
//!
//! ```bash
//! # Run until halt
//! simcpu-run programs/countdown.sasm
//!
//! # Trace every instruction, stop after 1000 cycles
//! simcpu-run --trace --cycles 1000 programs/countdown.sasm
//!
//! # Prepend a host memory map, use a custom machine size
//! simcpu-run --preamble robot.sasm --config simcpu.toml bot.sasm
//!
//! # Print the loaded program and exit
//! simcpu-run --disassemble programs/countdown.sasm
//! ```
//!
//! Set `RUST_LOG=debug` (or `trace`) for load and per-cycle logging.

use anyhow::{bail, Context};
use simcpu::{loader, Machine, MachineConfig};
use std::path::PathBuf;

struct Options {
    program: PathBuf,
    preamble: Option<PathBuf>,
    config: Option<PathBuf>,
    cycles: Option<usize>,
    trace: bool,
    disassemble: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let Some(options) = parse_args()? else {
        return Ok(());
    };

    let config = match &options.config {
        Some(path) => MachineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MachineConfig::from_env()?,
    };

    let name = options
        .program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    let mut machine = Machine::with_config(name, config)?;

    let loaded = match &options.preamble {
        Some(preamble_path) => {
            let preamble = loader::read_source(preamble_path)
                .with_context(|| format!("reading preamble {}", preamble_path.display()))?;
            loader::load_with_preamble(&mut machine, &preamble, &options.program)
        }
        None => loader::load_file(&mut machine, &options.program),
    };
    loaded.with_context(|| format!("loading {}", options.program.display()))?;

    if options.disassemble {
        println!("{}", machine);
        return Ok(());
    }

    machine.set_trace(options.trace);

    let outcome = match options.cycles {
        Some(limit) => machine.run_cycles(limit).map(|_| ()),
        None => machine.run(),
    };

    print_report(&machine);

    if let Err(e) = outcome {
        bail!("system halted at @{}: {}", machine.pc(), e);
    }
    if !machine.is_halted() {
        eprintln!("stopped after {} cycles without halting", options.cycles.unwrap_or(0));
    }
    Ok(())
}

fn parse_args() -> anyhow::Result<Option<Options>> {
    let mut args = std::env::args().skip(1);
    let mut program = None;
    let mut preamble = None;
    let mut config = None;
    let mut cycles = None;
    let mut trace = false;
    let mut disassemble = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-t" | "--trace" => trace = true,
            "-d" | "--disassemble" => disassemble = true,
            "-n" | "--cycles" => {
                let value = args.next().context("--cycles needs a number")?;
                cycles = Some(
                    value
                        .parse::<usize>()
                        .with_context(|| format!("invalid cycle count '{}'", value))?,
                );
            }
            "-c" | "--config" => {
                config = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            "-p" | "--preamble" => {
                preamble = Some(PathBuf::from(args.next().context("--preamble needs a path")?));
            }
            "--sample-config" => {
                print!("{}", MachineConfig::sample_config());
                return Ok(None);
            }
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            _ if arg.starts_with('-') => {
                print_help();
                bail!("unknown option: {}", arg);
            }
            _ if program.is_none() => program = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument: {}", arg),
        }
    }

    let Some(program) = program else {
        print_help();
        bail!("no program specified");
    };

    Ok(Some(Options {
        program,
        preamble,
        config,
        cycles,
        trace,
        disassemble,
    }))
}

fn print_report(machine: &Machine) {
    let report = machine.report();
    eprintln!("NAME: {}", report.name);
    eprintln!("PC: {}", report.pc);
    eprintln!(
        "FLAGS: test={} trace={} halted={}",
        report.flags.test, report.flags.trace, report.flags.halted
    );
    eprintln!("REGISTERS: [{}]", report.registers.join(", "));
    eprintln!("STACK: [{}]", report.stack.join(", "));
}

fn print_help() {
    eprintln!("simcpu-run - Run a simcpu assembly program");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    simcpu-run [OPTIONS] <PROGRAM>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -t, --trace            Print each instruction before it runs");
    eprintln!("    -n, --cycles <N>       Stop after N cycles even if not halted");
    eprintln!("    -c, --config <PATH>    Machine config (TOML)");
    eprintln!("    -p, --preamble <PATH>  Source loaded ahead of the program");
    eprintln!("    -d, --disassemble      Print the loaded program and exit");
    eprintln!("        --sample-config    Print a sample config file");
    eprintln!("    -h, --help             Print this help message");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    SIMCPU_MEMORY_SIZE     Words of memory (default 256)");
    eprintln!("    SIMCPU_REGISTERS       Register count (default 4)");
    eprintln!("    RUST_LOG               Log filter (default warn)");
}
