//! simcpu-validate - Load-time validation tool for .sasm files
//!
//! # Usage
//!
//! ```bash
//! # Validate all .sasm files in a directory
//! simcpu-validate path/to/programs
//!
//! # Programs written against a host memory map
//! simcpu-validate --preamble robot.sasm bots/
//!
//! # Verbose output with instruction/label counts
//! simcpu-validate -v path/to/programs
//! ```
//!
//! # Exit Codes
//!
//! - 0: All files validated successfully
//! - 1: One or more files failed to load
//! - 2: Invalid arguments or IO error

use simcpu::validate::{
    validate_directory_with_config, validate_file_with_config, ValidationResult,
    ValidationSummary,
};
use simcpu::MachineConfig;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut verbose = false;
    let mut preamble_path = None;
    let mut config_path = None;
    let mut paths = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "-p" | "--preamble" => match iter.next() {
                Some(p) => preamble_path = Some(p.clone()),
                None => {
                    eprintln!("Error: --preamble needs a path\n");
                    return ExitCode::from(2);
                }
            },
            "-c" | "--config" => match iter.next() {
                Some(p) => config_path = Some(p.clone()),
                None => {
                    eprintln!("Error: --config needs a path\n");
                    return ExitCode::from(2);
                }
            },
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown option: {}\n", arg);
                print_help();
                return ExitCode::from(2);
            }
            _ => paths.push(arg.clone()),
        }
    }

    if paths.is_empty() {
        eprintln!("Error: No path specified\n");
        print_help();
        return ExitCode::from(2);
    }

    let config = match &config_path {
        Some(path) => MachineConfig::load_from_file(path),
        None => MachineConfig::from_env(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let preamble = match &preamble_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                eprintln!("Error reading preamble {}: {}", path, e);
                return ExitCode::from(2);
            }
        },
        None => None,
    };

    let mut all_results = Vec::new();

    for path_str in &paths {
        let path = Path::new(path_str);

        if !path.exists() {
            eprintln!("Error: Path does not exist: {}", path.display());
            return ExitCode::from(2);
        }

        if path.is_file() {
            let result = validate_file_with_config(path, &config, preamble.as_deref());
            print_result(&result, verbose);
            all_results.push(result);
        } else if path.is_dir() {
            match validate_directory_with_config(path, &config, preamble.as_deref()) {
                Ok(results) => {
                    for result in &results {
                        print_result(result, verbose);
                    }
                    all_results.extend(results);
                }
                Err(e) => {
                    eprintln!("Error reading directory {}: {}", path.display(), e);
                    return ExitCode::from(2);
                }
            }
        }
    }

    let summary = ValidationSummary::from_results(&all_results);
    eprintln!();
    summary.print_report();

    if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_result(result: &ValidationResult, verbose: bool) {
    match result {
        ValidationResult::Ok { path, instructions, labels } => {
            if verbose {
                println!("+ {} ({} instrs, {} labels)", path.display(), instructions, labels);
            } else {
                println!("+ {}", path.display());
            }
        }
        ValidationResult::Err { path, error } => {
            eprintln!("x {}", path.display());
            if let Some(line) = error.line {
                eprintln!("  line {}: {}", line, error.message);
            } else {
                eprintln!("  {}", error.message);
            }
            if let Some(snippet) = &error.snippet {
                eprintln!("  | {}", snippet);
            }
        }
    }
}

fn print_help() {
    eprintln!("simcpu-validate - Validate .sasm assembly files");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    simcpu-validate [OPTIONS] <PATH>...");
    eprintln!();
    eprintln!("ARGS:");
    eprintln!("    <PATH>    File or directory to validate (recursive for directories)");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -v, --verbose          Show instruction/label counts");
    eprintln!("    -p, --preamble <PATH>  Source loaded ahead of each program");
    eprintln!("    -c, --config <PATH>    Machine config (TOML)");
    eprintln!("    -h, --help             Print this help message");
    eprintln!();
    eprintln!("EXIT CODES:");
    eprintln!("    0    All files validated successfully");
    eprintln!("    1    One or more files failed validation");
    eprintln!("    2    Invalid arguments or IO error");
}
