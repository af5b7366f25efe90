//! Application logic for the SQL Agent CLI.
//!
//! This module contains the command logic separated from the main entry
//! point to enable testing. Configuration is resolved up front, so a missing
//! key or unsupported store URL fails before any network or store activity.

use std::{fs::read_to_string, path::Path, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::warn;

use crate::{
    cli::Format,
    config::{Config, RetryConfig},
    error::{AgentError, AgentResult, file_read_error},
    executor::run_read_only,
    llm::{ChatMessage, GeneratedQuery, LlmClient, build_messages},
    output::{OutputFormat, OutputOptions, Outcome, QueryReport},
    safety::is_read_only_select,
    schema::{SchemaDescription, describe_schema},
    store::{StoreTarget, execute_script}
};

/// Parameters for the ask command
#[derive(Debug, Clone)]
pub struct AskParams {
    pub question: String,
    pub model:    Option<String>,
    pub dry_run:  bool
}

/// Result of the ask command
#[derive(Debug, Clone)]
pub enum AskResult {
    /// Prompt that would have been sent
    DryRun(Vec<ChatMessage>),
    /// Generated SQL and what happened to it
    Completed(QueryReport)
}

/// Convert CLI format to internal OutputFormat
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Create output options from parameters
pub fn create_output_options(format: Format, no_color: bool) -> OutputOptions {
    OutputOptions {
        format:  convert_format(format),
        colored: !no_color
    }
}

/// Gate `sql` and execute it when it passes.
///
/// A refusal or a failure while executing is an outcome, not an error.
pub fn execute_checked(target: &StoreTarget, sql: &str) -> Outcome {
    if !is_read_only_select(sql) {
        return Outcome::Refused;
    }
    match run_read_only(target, sql, &[]) {
        Ok(result) if result.is_empty() => Outcome::NoResults {
            columns: result.columns
        },
        Ok(result) => Outcome::Rows(result),
        Err(AgentError::UnsafeQueryRejected { .. }) => Outcome::Refused,
        Err(AgentError::QueryExecutionError(msg)) => Outcome::Failed { error: msg },
        Err(e) => Outcome::Failed {
            error: e.to_string()
        }
    }
}

/// Delay before retry number `attempt` (1-based)
pub fn retry_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let mut delay = retry.initial_delay_ms;
    for _ in 1..attempt {
        delay = ((delay as f64 * retry.backoff_factor) as u64).min(retry.max_delay_ms);
    }
    Duration::from_millis(delay.min(retry.max_delay_ms))
}

/// Generate SQL, retrying retryable model failures per `retry`
pub async fn generate_with_retry(
    client: &LlmClient,
    question: &str,
    schema: &SchemaDescription,
    retry: &RetryConfig
) -> AgentResult<GeneratedQuery> {
    let mut attempt = 0;
    loop {
        match client.generate_sql(question, schema).await {
            Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                attempt += 1;
                let delay = retry_delay(retry, attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = retry.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying LLM request"
                );
                sleep(delay).await;
            }
            other => return other
        }
    }
}

/// Run the ask command
pub async fn run_ask(params: AskParams, config: Config) -> AgentResult<AskResult> {
    let settings = config.llm_settings(params.model)?;
    let target = config.store_target()?;
    let schema = describe_schema(&target)?;
    if params.dry_run {
        return Ok(AskResult::DryRun(build_messages(&params.question, &schema)));
    }
    let client = LlmClient::new(settings)?;
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Generating SQL with LLM...");
    pb.enable_steady_tick(Duration::from_millis(100));
    let generated = generate_with_retry(&client, &params.question, &schema, &config.retry).await;
    pb.finish_and_clear();
    let generated = generated?;
    let outcome = if generated.is_safe {
        execute_checked(&target, &generated.sql)
    } else {
        Outcome::Refused
    };
    Ok(AskResult::Completed(QueryReport {
        question: Some(params.question),
        sql: generated.sql,
        is_safe: generated.is_safe,
        outcome
    }))
}

/// Run the run command
pub fn run_sql(sql: &str, config: &Config) -> AgentResult<QueryReport> {
    let target = config.store_target()?;
    let outcome = execute_checked(&target, sql);
    Ok(QueryReport {
        question: None,
        sql: sql.trim().to_string(),
        is_safe: !matches!(outcome, Outcome::Refused),
        outcome
    })
}

/// Run the schema command
pub fn run_schema(config: &Config) -> AgentResult<SchemaDescription> {
    describe_schema(&config.store_target()?)
}

/// Run the seed command
pub fn run_seed(script: &Path, config: &Config) -> AgentResult<()> {
    let target = config.store_target()?;
    let sql = read_to_string(script)
        .map_err(|e| file_read_error(&script.display().to_string(), e))?;
    execute_script(&target, &sql)
}
