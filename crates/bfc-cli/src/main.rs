//! bfc - tape language compiler CLI

mod driver;
mod error;

use bfc_codegen::X86_64Linux;
use bfc_ir::{Options, OutputKind, DEFAULT_TAPE_CELLS};
use bfc_lexer::Lexer;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use driver::Session;
use error::Result;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "bfc")]
#[command(author = "Guilherme Mendes")]
#[command(version = "0.1.0")]
#[command(about = "Tape language compiler for x86-64 Linux", long_about = None)]
struct Cli {
    /// More log output (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Code generation settings shared by `emit` and `build`
#[derive(Args)]
struct CodegenArgs {
    /// Cell width: byte, word or dword
    #[arg(long, value_name = "NAME")]
    cell: Option<String>,

    /// Tape overflow policy: undefined, wrap or abort
    #[arg(long, value_name = "NAME")]
    memory: Option<String>,

    /// Produce a callable `_bf_<module>` object instead of a program
    #[arg(long)]
    lib: bool,

    /// Tape length in cells
    #[arg(long, value_name = "CELLS", default_value_t = DEFAULT_TAPE_CELLS, value_parser = parse_tape_cells)]
    tape: usize,
}

/// Pipeline stage shown by `bfc ir`
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Stage {
    /// Straight from the parser
    Parsed,
    /// After peephole optimization
    Optimized,
    /// After flow analysis (default)
    #[default]
    Flow,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates NASM assembly
    Emit {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        codegen: CodegenArgs,
    },

    /// Compiles to an executable (or object with --lib) using nasm and ld
    Build {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        codegen: CodegenArgs,

        /// Keep the generated assembly next to the output
        #[arg(long)]
        keep_asm: bool,
    },

    /// Shows the IR of a file (debug)
    Ir {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Stage to stop at
        #[arg(long, value_enum, default_value_t = Stage::Flow)]
        stage: Stage,

        /// Tape overflow policy used by flow analysis
        #[arg(long, value_name = "NAME")]
        memory: Option<String>,
    },

    /// Shows file tokens (debug)
    Lex {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Checks brackets without compiling
    Check {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn parse_tape_cells(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("the tape needs at least one cell".to_string()),
        Ok(cells) => Ok(cells),
        Err(e) => Err(e.to_string()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Emit {
            input,
            output,
            codegen,
        } => {
            let session = Session::load(&input)?;
            let module = session.parse()?;
            let options = codegen_options(&session, &codegen);
            let asm = driver::compile(module, &options);

            match output {
                Some(path) => driver::write_file(&path, &asm)?,
                None => print!("{}", asm),
            }
        }

        Commands::Build {
            input,
            output,
            codegen,
            keep_asm,
        } => {
            let session = Session::load(&input)?;
            let module = session.parse()?;
            let options = codegen_options(&session, &codegen);
            let output = output.unwrap_or_else(|| default_output(&input, options.output));

            let asm = driver::compile(module, &options);
            let backend = X86_64Linux::new(options);
            driver::assemble(&backend, &asm, &output, keep_asm)?;

            println!("{} {}", "Built".green().bold(), output.display());
        }

        Commands::Ir {
            input,
            stage,
            memory,
        } => {
            let session = Session::load(&input)?;
            let module = session.parse()?;
            let options = session.options(None, memory.as_deref());

            let module = match stage {
                Stage::Parsed => module,
                Stage::Optimized => driver::run_passes(module, &options, false),
                Stage::Flow => driver::run_passes(module, &options, true),
            };

            print!("{}", module);
            println!("; {} instructions", module.body.instruction_count());
        }

        Commands::Lex { input } => {
            let session = Session::load(&input)?;
            let tokens = Lexer::new(&session.source, session.file_id()).tokenize();

            for token in &tokens {
                println!(
                    "  {:4}:{:<3}  {:<6}  {}",
                    token.span.start.line,
                    token.span.start.column,
                    format!("{:?}", token.kind),
                    token.kind
                );
            }
            println!("\nTotal: {} tokens", tokens.len());
        }

        Commands::Check { input } => {
            let session = Session::load(&input)?;
            let module = session.parse()?;
            println!(
                "{}: {} instructions, no errors found",
                session.path.display(),
                module.body.instruction_count()
            );
        }
    }

    Ok(())
}

fn codegen_options(session: &Session, args: &CodegenArgs) -> Options {
    let output = if args.lib {
        OutputKind::Library
    } else {
        OutputKind::Executable
    };

    session
        .options(args.cell.as_deref(), args.memory.as_deref())
        .with_output(output)
        .with_tape_cells(args.tape)
}

/// `prog.b` builds `prog` (or `prog.o` for libraries) in the current directory
fn default_output(input: &Path, kind: OutputKind) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "a".to_string());

    match kind {
        OutputKind::Executable => PathBuf::from(stem),
        OutputKind::Library => PathBuf::from(format!("{stem}.o")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tape_cells_must_be_positive() {
        assert!(parse_tape_cells("0").is_err());
        assert!(parse_tape_cells("x").is_err());
        assert_eq!(parse_tape_cells("100"), Ok(100));
    }

    #[test]
    fn test_default_output() {
        let input = Path::new("dir/hello.b");
        assert_eq!(default_output(input, OutputKind::Executable), PathBuf::from("hello"));
        assert_eq!(default_output(input, OutputKind::Library), PathBuf::from("hello.o"));
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::try_parse_from([
            "bfc", "-vv", "build", "prog.b", "--cell", "word", "--memory", "abort", "--lib",
            "--keep-asm",
        ])
        .expect("valid arguments");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build {
                codegen, keep_asm, ..
            } => {
                assert_eq!(codegen.cell.as_deref(), Some("word"));
                assert_eq!(codegen.memory.as_deref(), Some("abort"));
                assert!(codegen.lib);
                assert!(keep_asm);
                assert_eq!(codegen.tape, DEFAULT_TAPE_CELLS);
            }
            _ => panic!("expected build"),
        }
    }
}
