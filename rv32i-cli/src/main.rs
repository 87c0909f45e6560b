//! Native CLI host (C7): the same assembler, linker and simulator a
//! browser-hosted front end would drive, wired to stdin/stdout instead of a
//! DOM, modeled on `johnrscott-riscvemu`'s `emulate` binary.

mod repl;
mod sink;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rv32i_image::LinkedProgram;
use rv32i_vm::Simulator;

use sink::StdoutSink;

#[derive(Parser)]
#[command(name = "rv32i", about = "Assembler, linker and simulator for the RV32I teaching toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble and link one or more source files, printing a disassembly listing.
    Assemble { files: Vec<PathBuf> },
    /// Assemble, link and run one or more source files to completion.
    Run { files: Vec<PathBuf> },
    /// Assemble and link, then drop into an interactive step/breakpoint debugger.
    Debug { files: Vec<PathBuf> },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Assemble { files } => load_and_link(&files).map(|linked| list(&linked)),
        Command::Run { files } => load_and_link(&files).map(run),
        Command::Debug { files } => load_and_link(&files).and_then(|linked| {
            repl::debug(linked).map_err(|e| format!("debugger error: {e}"))
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Assembles every file independently, reporting every accumulated
/// [`rv32i_asm::AssembleError`] across all of them before attempting to
/// link, since a unit that fails to assemble has nothing useful to link.
fn load_and_link(files: &[PathBuf]) -> Result<LinkedProgram, String> {
    if files.is_empty() {
        return Err("no source files given".to_owned());
    }

    let mut programs = Vec::with_capacity(files.len());
    let mut failed = false;

    for path in files {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        log::info!("assembling {}", path.display());
        let (program, errors) = rv32i_asm::assemble(&source);
        for error in &errors {
            eprintln!("{}: {error}", path.display());
        }
        if !errors.is_empty() {
            failed = true;
        }
        programs.push(program);
    }

    if failed {
        return Err("assembly failed".to_owned());
    }

    rv32i_link::link(programs).map_err(|e| format!("link error: {e}"))
}

fn list(linked: &LinkedProgram) {
    println!("entry offset: 0x{:08x}", linked.entry_offset);
    for (offset, word) in linked.text.chunks_exact(4).enumerate() {
        let raw = u32::from_le_bytes(word.try_into().unwrap());
        let addr = offset as u32 * 4;
        let text = rv32i_isa::disassemble(rv32i_isa::Word::new(raw));
        println!("{:>6}: 0x{:08x}  {}", addr, raw, text);
    }
    if !linked.data.is_empty() {
        println!("data: {} byte(s)", linked.data.len());
    }
}

fn run(linked: LinkedProgram) {
    let mut sim = Simulator::new(linked, Box::new(StdoutSink));
    sim.run();
    if let Some(err) = sim.last_error() {
        eprintln!("runtime error at pc 0x{:08x}: {err}", sim.get_pc());
    } else if let Some(code) = sim.exit_code() {
        std::process::exit(code);
    }
}
