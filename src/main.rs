use std::ffi::OsString;
use std::fs::read_to_string;
use std::path::PathBuf;
use std::process::ExitCode;

use ala::{AlaError, Mnemonic, RunFlags};
use clap::{CommandFactory, Parser};
use log::{error, warn};
use strum::IntoEnumIterator;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

const EXTRA_HELP: &str = "\
Flags are case-insensitive and may be written with one dash, like -extra.

Extra instructions:
  CALL <label>  Records the current address and jumps to label
  RETURN        Returns to the last recorded address (by a CALL instruction)";

/// Options that take no part in running a program.
const INFO_OPTIONS: [&str; 5] = ["instructions", "instruction", "ascii", "help", "version"];

/// Interpreter for A Level assembly language
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None, after_help = EXTRA_HELP)]
struct Args {
    /// Source files, assembled in order into one program
    files: Vec<PathBuf>,
    /// Removes the jump limits, in case you want infinite loops
    #[arg(long)]
    no_jmp_limits: bool,
    /// OUT prints integers instead of characters
    #[arg(long)]
    print_numbers: bool,
    /// Adds the CALL and RETURN instructions
    #[arg(long)]
    extra: bool,
    /// Show the instruction list
    #[arg(long)]
    instructions: bool,
    /// Show info on a specific instruction
    #[arg(long, value_name = "MNEMONIC")]
    instruction: Option<String>,
    /// Show the printable characters in the ASCII table
    #[arg(long)]
    ascii: bool,
}

impl Args {
    fn flags(&self) -> RunFlags {
        let mut flags = RunFlags::empty();
        flags.set(RunFlags::NO_JMP_LIMITS, self.no_jmp_limits);
        flags.set(RunFlags::PRINT_NUMBERS, self.print_numbers);
        flags.set(RunFlags::EXTRA, self.extra);
        flags
    }
}

/// Rewrites `-Print-Numbers` style flags into the `--print-numbers` clap
/// expects, dropping the ones nobody knows about.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut args = args.into_iter();
    let mut out: Vec<OsString> = args.next().into_iter().collect();
    let mut positional_only = false;
    for arg in args {
        let Some(s) = arg.to_str() else {
            out.push(arg);
            continue;
        };
        if positional_only || !s.starts_with('-') || s.len() == 1 {
            out.push(arg);
            continue;
        }
        if s == "--" {
            positional_only = true;
            out.push(arg);
            continue;
        }
        if matches!(s, "-h" | "-V") {
            out.push(arg);
            continue;
        }
        let name = s.trim_start_matches('-');
        let (name, value) = name
            .split_once('=')
            .map_or((name, None), |(n, v)| (n, Some(v)));
        let known = RunFlags::from_flag_name(name).is_some()
            || INFO_OPTIONS.iter().any(|o| o.eq_ignore_ascii_case(name));
        if known {
            let mut long = format!("--{}", name.to_ascii_lowercase());
            if let Some(value) = value {
                long.push('=');
                long.push_str(value);
            }
            out.push(long.into());
        } else {
            warn!("Unknown flag '{name}' ignored");
        }
    }
    out
}

fn print_ascii() {
    for c in 32u8..=127 {
        if c == 127 {
            println!("DEL = {c}");
        } else {
            println!("{} = {c}", char::from(c));
        }
    }
}

fn print_instruction(name: &str) -> ExitCode {
    if let Some(mnemonic) = Mnemonic::parse(name.trim()) {
        println!("{}", mnemonic.describe());
        ExitCode::SUCCESS
    } else {
        eprintln!("ERROR: '{name}' is not a supported instruction");
        ExitCode::FAILURE
    }
}

fn read_sources(files: &[PathBuf]) -> Vec<(String, String)> {
    files
        .iter()
        .filter_map(|path| match read_to_string(path) {
            Ok(text) => Some((path.display().to_string(), text)),
            Err(e) => {
                error!("Could not open file '{}': {e}", path.display());
                None
            }
        })
        .collect()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse_from(normalize_args(std::env::args_os()));

    if args.ascii {
        print_ascii();
        return ExitCode::SUCCESS;
    }
    if args.instructions {
        for mnemonic in Mnemonic::iter() {
            println!("\n{}", mnemonic.describe());
        }
        return ExitCode::SUCCESS;
    }
    if let Some(name) = &args.instruction {
        return print_instruction(name);
    }
    if args.files.is_empty() {
        // Nothing to run, so show how to use it.
        return match Args::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let sources = read_sources(&args.files);
    let result = if sources.is_empty() {
        Err(AlaError::NoInputFiles)
    } else {
        let borrowed: Vec<(&str, &str)> = sources
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
            .collect();
        ala::run_sources(&borrowed, args.flags())
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(args: &[&str]) -> Vec<String> {
        normalize_args(args.iter().map(OsString::from))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn legacy_flags_become_long_flags() {
        assert_eq!(
            normalize(&["ala", "-Print-Numbers", "a.ala", "--EXTRA", "-no-jmp-limits"]),
            ["ala", "--print-numbers", "a.ala", "--extra", "--no-jmp-limits"]
        );
    }

    #[test]
    fn unknown_flags_are_dropped() {
        assert_eq!(normalize(&["ala", "-fast", "a.ala"]), ["ala", "a.ala"]);
    }

    #[test]
    fn info_options_keep_their_values() {
        assert_eq!(
            normalize(&["ala", "-instruction", "ldm", "-h"]),
            ["ala", "--instruction", "ldm", "-h"]
        );
        assert_eq!(normalize(&["ala", "-ASCII"]), ["ala", "--ascii"]);
        assert_eq!(
            normalize(&["ala", "--", "-weird.ala"]),
            ["ala", "--", "-weird.ala"]
        );
    }

    #[test]
    fn parsed_flags() {
        let args = Args::parse_from(normalize_args(
            ["ala", "-extra", "-print-numbers", "x.ala"].map(OsString::from),
        ));
        assert_eq!(args.flags(), RunFlags::EXTRA | RunFlags::PRINT_NUMBERS);
        assert_eq!(args.files, [PathBuf::from("x.ala")]);
    }
}
