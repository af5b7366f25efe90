use colored::Colorize;
use serde::Serialize;

use crate::{executor::ExecutionResult, llm::ChatMessage, schema::SchemaDescription};

pub const REFUSAL_NOTICE: &str = "Refusing to execute: only SELECT queries are allowed.";
pub const NO_RESULTS_NOTICE: &str = "No results.";

/// Output format for results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// What happened to a generated or supplied statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The safety gate declined to run it
    Refused,
    /// Ran and returned no rows
    NoResults { columns: Vec<String> },
    /// Ran and returned rows
    Rows(ExecutionResult),
    /// The store rejected it
    Failed { error: String }
}

/// Report of one `ask` or `run` invocation
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub sql:      String,
    pub is_safe:  bool,
    pub outcome:  Outcome
}

/// Format a query report based on output options
pub fn format_report(report: &QueryReport, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(report).unwrap_or_default(),
        OutputFormat::Text => format_text_report(report, opts)
    }
}

fn format_text_report(report: &QueryReport, opts: &OutputOptions) -> String {
    let mut output = String::new();
    if opts.colored {
        output.push_str(&"Generated SQL:".bold().to_string());
    } else {
        output.push_str("Generated SQL:");
    }
    output.push('\n');
    output.push_str(&report.sql);
    output.push_str("\n\n");
    match &report.outcome {
        Outcome::Refused => {
            if opts.colored {
                output.push_str(&REFUSAL_NOTICE.yellow().to_string());
            } else {
                output.push_str(REFUSAL_NOTICE);
            }
        }
        Outcome::NoResults { .. } => output.push_str(NO_RESULTS_NOTICE),
        Outcome::Rows(result) => output.push_str(&format_table(result)),
        Outcome::Failed { error } => {
            let line = format!("Error executing query: {}", error);
            if opts.colored {
                output.push_str(&line.red().to_string());
            } else {
                output.push_str(&line);
            }
        }
    }
    output
}

/// Pipe-delimited table with a dashed line under the header.
///
/// ```text
/// id | name
/// ---------
/// 1 | alice
/// ```
pub fn format_table(result: &ExecutionResult) -> String {
    let header = result.columns.join(" | ");
    let mut table = format!("{}\n{}", header, "-".repeat(header.chars().count()));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        table.push('\n');
        table.push_str(&cells.join(" | "));
    }
    table
}

/// Format the schema description
pub fn format_schema(schema: &SchemaDescription, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(schema).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(schema).unwrap_or_default(),
        OutputFormat::Text if schema.is_empty() => "(no tables)".to_string(),
        OutputFormat::Text => schema.render()
    }
}

/// Format the prompt shown by a dry run
pub fn format_prompt(messages: &[ChatMessage], opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(messages).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(messages).unwrap_or_default(),
        OutputFormat::Text => {
            let mut output = String::from("=== DRY RUN - Would send to LLM ===\n");
            for message in messages {
                let heading = format!("[{}]", message.role);
                output.push('\n');
                if opts.colored {
                    output.push_str(&heading.cyan().bold().to_string());
                } else {
                    output.push_str(&heading);
                }
                output.push('\n');
                output.push_str(&message.content);
                output.push('\n');
            }
            output
        }
    }
}
