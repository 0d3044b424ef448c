//! `metapath` command-line front end.

pub mod commands;
pub mod json;
pub mod util;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

pub use json::JsonDocumentLoader;

#[derive(Parser, Debug)]
#[command(name = "metapath", version, about = "Evaluate Metapath expressions against JSON documents")]
pub struct Cli {
    /// Raise the log level (repeat for more detail). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and evaluate an expression.
    Eval(commands::eval::EvalArgs),
    /// Compile an expression and report its static result type.
    Check(commands::check::CheckArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = match &cli.command {
        Command::Eval(args) => commands::eval::run(args)?,
        Command::Check(args) => commands::check::run(args)?,
    };
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a subscriber installed by an embedding process wins
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
