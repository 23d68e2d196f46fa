use std::{io::Write, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use presta::{vm::VmConfig, Error, ErrorKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "presta", about = "Compile and run presta programs")]
struct Cli {
    #[command(flatten)]
    vm: VmArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a program and print its result
    Run(FileArgs),
    /// Print the token stream
    Tokens(FileArgs),
    /// Print the parsed program
    Ast(FileArgs),
    /// Print the generated instruction listing
    Asm(FileArgs),
    /// Evaluate one program per line
    Repl,
}

#[derive(Debug, Args)]
struct FileArgs {
    file: String,
}

#[derive(Debug, Args)]
struct VmArgs {
    /// Maximum number of stack entries
    #[arg(long, global = true, default_value_t = VmConfig::default().stack_size)]
    stack_size: usize,

    /// Abort after executing this many instructions
    #[arg(long, global = true)]
    step_limit: Option<u64>,
}

impl VmArgs {
    fn config(&self) -> VmConfig {
        VmConfig {
            stack_size: self.stack_size,
            step_limit: self.step_limit,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presta=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse();
    let config = args.vm.config();

    match args.command() {
        Command::Repl => repl_command(config),
        Command::Run(args) => with_source(args, |source| {
            let value = presta::run_with_config(source, config)?;
            println!("{value}");
            Ok(())
        }),
        Command::Tokens(args) => with_source(args, |source| {
            for token in presta::tokenize(source)? {
                println!(
                    "{:>4}:{:<4} {:<12} {}",
                    token.position.line,
                    token.position.column,
                    format!("{:?}", token.kind),
                    token.lexeme
                );
            }
            Ok(())
        }),
        Command::Ast(args) => with_source(args, |source| {
            println!("{}", presta::parse(source)?);
            Ok(())
        }),
        Command::Asm(args) => with_source(args, |source| {
            print!("{}", presta::compile(source)?);
            Ok(())
        }),
    }
}

fn repl_command(config: VmConfig) -> ExitCode {
    println!("Welcome to the presta REPL!");
    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    let mut input = String::new();
    loop {
        print!("> ");
        if let Err(e) = std::io::stdout().flush() {
            eprintln!("Failed to flush stdout: {e}");
            return ExitCode::FAILURE;
        }

        input.clear();
        match std::io::stdin().read_line(&mut input) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {e}");
                return ExitCode::FAILURE;
            }
        }

        let source = input.trim();
        if source.is_empty() {
            continue;
        }
        match presta::run_with_config(source, config) {
            Ok(value) => println!("{value}"),
            Err(e) => report(&e),
        }
    }
}

fn with_source(args: &FileArgs, f: impl FnOnce(&str) -> Result<(), Error>) -> ExitCode {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", args.file);
            return ExitCode::from(66);
        }
    };

    match f(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            match e.kind() {
                ErrorKind::Runtime => ExitCode::from(70),
                _ => ExitCode::from(65),
            }
        }
    }
}

fn report(error: &Error) {
    eprintln!("{} error: {}", error.kind(), error);
}
