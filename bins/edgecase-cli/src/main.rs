mod commands;

use clap::{Parser, Subcommand};
use anyhow::Result;

#[derive(Parser)]
#[command(name = "edgecase-cli")]
#[command(about = "Edgecase CLI - Check functions against test cases and manage configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a function against test cases in an isolated runner process
    Run {
        /// File containing the function source
        #[arg(short, long)]
        code: String,

        /// JSON array of inputs (e.g. '[[1,2,3],[]]')
        #[arg(short, long)]
        inputs: String,

        /// JSON array of expected outputs (e.g. '[6,0]')
        #[arg(short, long)]
        outputs: String,

        /// Path to the edgecase-runner binary
        #[arg(short, long)]
        runner: Option<String>,

        /// Print the raw runner JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Initialize a new Edgecase project
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            code,
            inputs,
            outputs,
            runner,
            json,
        } => {
            commands::run_check(&code, &inputs, &outputs, runner.as_deref(), json).await?;
        }
        Commands::Init { path } => {
            commands::init_project(&path).await?;
        }
    }

    Ok(())
}
