//! ritquiz CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "ritquiz", version, about = "Adaptive RIT-scale quiz engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an adaptive test in the terminal
    Take {
        /// Item bank file (default: from config)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Student name
        #[arg(long)]
        name: Option<String>,

        /// Grade label (e.g. "Grade 7")
        #[arg(long)]
        grade: Option<String>,

        /// Strands to draw from (comma-separated)
        #[arg(long)]
        strands: Option<String>,

        /// Items in the session
        #[arg(long)]
        max_items: Option<u32>,

        /// Seed for reproducible item draws
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds to wait for each answer
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Use the bank even if some rows were rejected
        #[arg(long)]
        allow_partial_bank: bool,

        /// Also write an HTML report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate an item bank file
    Validate {
        /// Item bank file
        #[arg(long)]
        bank: PathBuf,
    },

    /// List stored session results
    History {
        /// Results file (default: from config)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render the report for a stored session
    Report {
        /// Session id or unique id prefix
        #[arg(long)]
        session: String,

        /// Results file (default: from config)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Output file
        #[arg(long)]
        output: PathBuf,

        /// Output format: html, markdown, json
        #[arg(long, default_value = "html")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run simulated test-takers and report how the estimate converges
    Simulate {
        /// Ability every simulated test-taker answers at
        #[arg(long, allow_hyphen_values = true)]
        true_ability: i32,

        /// Number of sessions
        #[arg(long, default_value = "100")]
        sessions: usize,

        /// Grade label (default: first configured grade)
        #[arg(long)]
        grade: Option<String>,

        /// Strands to draw from (default: all configured strands)
        #[arg(long)]
        strands: Option<String>,

        /// Items per session
        #[arg(long)]
        max_items: Option<u32>,

        /// Max concurrent sessions
        #[arg(long, default_value = "8")]
        parallelism: usize,

        /// Base seed
        #[arg(long)]
        seed: Option<u64>,

        /// Item bank file (default: from config)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Use the bank even if some rows were rejected
        #[arg(long)]
        allow_partial_bank: bool,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example item bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ritquiz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            bank,
            name,
            grade,
            strands,
            max_items,
            seed,
            timeout_secs,
            allow_partial_bank,
            report,
            config,
        } => {
            commands::take::execute(commands::take::TakeArgs {
                bank,
                name,
                grade,
                strands,
                max_items,
                seed,
                timeout_secs,
                allow_partial_bank,
                report,
                config,
            })
            .await
        }
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::History {
            results,
            format,
            config,
        } => commands::history::execute(results, format, config),
        Commands::Report {
            session,
            results,
            output,
            format,
            config,
        } => commands::report::execute(session, results, output, format, config),
        Commands::Simulate {
            true_ability,
            sessions,
            grade,
            strands,
            max_items,
            parallelism,
            seed,
            bank,
            allow_partial_bank,
            format,
            config,
        } => {
            commands::simulate::execute(commands::simulate::SimulateArgs {
                true_ability,
                sessions,
                grade,
                strands,
                max_items,
                parallelism,
                seed,
                bank,
                allow_partial_bank,
                format,
                config,
            })
            .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
