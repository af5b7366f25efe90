//! # SQL Agent
//!
//! Ask a SQLite database questions in plain language.
//!
//! `sql-agent` describes the database schema, asks an OpenAI-compatible
//! model for a single SQLite `SELECT` answering the question, checks the
//! reply against a textual safety gate, and only then runs it on a read-only
//! connection.
//!
//! # Quick Start
//!
//! ```bash
//! export LLM_API_KEY="sk-..."
//!
//! # Load sample data
//! sql-agent seed sample.sql
//!
//! # Ask a question
//! sql-agent ask "how many users signed up last month"
//!
//! # Inspect what the model would see
//! sql-agent ask "top 5 customers by revenue" --dry-run
//! sql-agent schema
//!
//! # Run SQL through the same gate
//! sql-agent run "SELECT COUNT(*) FROM users"
//! ```
//!
//! # Safety Gate
//!
//! A statement is executed only when, after trimming and dropping one
//! trailing `;`, it starts with `SELECT ` or `WITH `, contains none of
//! `INSERT UPDATE DELETE DROP CREATE ALTER REPLACE TRUNCATE ATTACH DETACH
//! PRAGMA VACUUM` anywhere (case-insensitive, literals included), and holds
//! at most one `;`. The executor re-checks before every run.
//!
//! # Exit Codes
//!
//! - `0` - Success, including refused statements and queries the database
//!   rejected (both are reported inline)
//! - `1` - Configuration, store or model backend errors
//!
//! # Modules
//!
//! - [`safety`](sql_agent::safety) - Read-only statement gate
//! - [`schema`](sql_agent::schema) - Schema introspection and rendering
//! - [`executor`](sql_agent::executor) - Gated read-only execution
//! - [`llm`](sql_agent::llm) - Prompting and SQL extraction
//! - [`store`](sql_agent::store) - `sqlite:///` targets and connections
//! - [`config`](sql_agent::config) - Configuration loading
//! - [`output`](sql_agent::output) - Result formatting
//! - [`error`](sql_agent::error) - Error taxonomy

use std::{io, process};

use clap::Parser;
use tokio::main;
use tracing_subscriber::EnvFilter;

use sql_agent::{
    app::{AskParams, AskResult, create_output_options, run_ask, run_schema, run_seed, run_sql},
    cli::{Cli, Commands, Format},
    config::Config,
    error::AgentResult,
    output::{format_prompt, format_report, format_schema}
};

#[main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> AgentResult<i32> {
    dotenv::dotenv().ok();
    let config = Config::load()?;

    match cli.command {
        Commands::Ask {
            question,
            model,
            output_format,
            dry_run,
            no_color
        } => {
            let opts = create_output_options(output_format, no_color);
            let params = AskParams {
                question,
                model,
                dry_run
            };
            match run_ask(params, config).await? {
                AskResult::DryRun(messages) => println!("{}", format_prompt(&messages, &opts)),
                AskResult::Completed(report) => println!("{}", format_report(&report, &opts))
            }
        }
        Commands::Schema => {
            let schema = run_schema(&config)?;
            let opts = create_output_options(Format::Text, true);
            println!("{}", format_schema(&schema, &opts));
        }
        Commands::Run {
            sql,
            output_format,
            no_color
        } => {
            let opts = create_output_options(output_format, no_color);
            let report = run_sql(&sql, &config)?;
            println!("{}", format_report(&report, &opts));
        }
        Commands::Seed { script } => {
            run_seed(&script, &config)?;
            println!("Loaded {}", script.display());
        }
    }

    Ok(0)
}
