//! stepgraph CLI: compile sequential build plans into Tekton job graphs.

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "stepgraph",
    version,
    about = "Compile sequential build plans into Tekton job graphs with a shared artifact store"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: stepgraph::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    stepgraph::cli::logging::init(cli.verbose);
    if let Err(e) = stepgraph::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
