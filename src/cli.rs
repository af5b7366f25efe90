use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SQL Agent - Ask questions about a SQLite database in plain language
#[derive(Parser, Debug)]
#[command(name = "sql-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate SQL from a natural language question and execute it if safe
    Ask {
        /// Natural language question
        question: String,

        /// Model name (overrides LLM_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Output format
        #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
        output_format: Format,

        /// Show the prompt that would be sent without calling the model
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    },

    /// Print the schema description given to the model
    Schema,

    /// Run a SQL statement through the safety gate and execute it if safe
    Run {
        /// SQL statement
        sql: String,

        /// Output format
        #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
        output_format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    },

    /// Load a SQL script into the database (creates the file if missing)
    Seed {
        /// Path to SQL script
        script: PathBuf
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
