//! minic CLI
//!
//! Command-line interface exposing each pipeline stage as a first-class
//! subcommand, plus the full `compile` pipeline.

use clap::{Parser as ClapParser, Subcommand};
use minic::CompileError;
use std::io::Read;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "minic")]
#[command(about = "Ahead-of-time compiler for a small expression-oriented language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: StageCommand,

    /// Emit progress and diagnostic logging to stderr.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum StageCommand {
    /// Print the token stream.
    Tokenize { source_file: Option<PathBuf> },
    /// Print the parsed module.
    Parse { source_file: Option<PathBuf> },
    /// Type check and print the annotated module.
    Typecheck { source_file: Option<PathBuf> },
    /// Run the bounded interpreter.
    Interpret { source_file: Option<PathBuf> },
    /// Print the lowered IR.
    Ir { source_file: Option<PathBuf> },
    /// Print the generated x86-64 assembly.
    Asm { source_file: Option<PathBuf> },
    /// Compile to a native executable named `compiled_program`.
    Compile { source_file: Option<PathBuf> },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if cli.verbose {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    }

    if let Err(e) = run(cli.command) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn run(command: StageCommand) -> Result<(), CompileError> {
    match command {
        StageCommand::Tokenize { source_file } => {
            let source = read_source(source_file.as_deref())?;
            for token in minic::tokenize(&source)? {
                println!("{token}");
            }
        }
        StageCommand::Parse { source_file } => {
            let source = read_source(source_file.as_deref())?;
            let module = minic::parse(&source)?;
            println!("{module:#?}");
        }
        StageCommand::Typecheck { source_file } => {
            let source = read_source(source_file.as_deref())?;
            let module = minic::typecheck(&source)?;
            println!("{module:#?}");
        }
        StageCommand::Interpret { source_file } => {
            let source = read_source(source_file.as_deref())?;
            let value = minic::interpret(&source)?;
            println!("{value}");
        }
        StageCommand::Ir { source_file } => {
            let source = read_source(source_file.as_deref())?;
            let ir = minic::generate_ir(&source)?;
            print!("{ir}");
        }
        StageCommand::Asm { source_file } => {
            let source = read_source(source_file.as_deref())?;
            let asm = minic::generate_asm(&source)?;
            print!("{asm}");
        }
        StageCommand::Compile { source_file } => {
            let source = read_source(source_file.as_deref())?;
            let output_path = PathBuf::from("compiled_program");
            minic::compile(&source, &output_path)?;
        }
    }
    Ok(())
}

fn read_source(path: Option<&std::path::Path>) -> Result<String, CompileError> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
