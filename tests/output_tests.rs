// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sql_agent::{
    executor::{ExecutionResult, Value},
    llm::build_messages,
    output::{
        NO_RESULTS_NOTICE, Outcome, OutputFormat, OutputOptions, QueryReport, REFUSAL_NOTICE,
        format_prompt, format_report, format_schema, format_table
    },
    schema::{ColumnDefinition, SchemaDescription, TableDefinition}
};

fn plain() -> OutputOptions {
    OutputOptions {
        format:  OutputFormat::Text,
        colored: false
    }
}

fn sample_result() -> ExecutionResult {
    ExecutionResult {
        columns: vec!["id".into(), "name".into()],
        rows:    vec![
            vec![Value::Integer(1), Value::from("alice")],
            vec![Value::Integer(2), Value::Null],
        ]
    }
}

fn report(outcome: Outcome) -> QueryReport {
    QueryReport {
        question: Some("who is there".into()),
        sql: "SELECT id, name FROM users;".into(),
        is_safe: !matches!(outcome, Outcome::Refused),
        outcome
    }
}

#[test]
fn test_output_format_default() {
    let format = OutputFormat::default();
    assert!(matches!(format, OutputFormat::Text));
}

#[test]
fn test_output_options_default() {
    let opts = OutputOptions::default();
    assert!(matches!(opts.format, OutputFormat::Text));
    assert!(opts.colored);
}

#[test]
fn test_format_table() {
    assert_eq!(
        format_table(&sample_result()),
        "id | name\n---------\n1 | alice\n2 | NULL"
    );
}

#[test]
fn test_report_rows_text() {
    let output = format_report(&report(Outcome::Rows(sample_result())), &plain());
    assert_eq!(
        output,
        "Generated SQL:\nSELECT id, name FROM users;\n\nid | name\n---------\n1 | alice\n2 | NULL"
    );
}

#[test]
fn test_report_refused_text() {
    let output = format_report(&report(Outcome::Refused), &plain());
    assert!(output.starts_with("Generated SQL:\n"));
    assert!(output.ends_with(REFUSAL_NOTICE));
}

#[test]
fn test_report_no_results_text() {
    let output = format_report(
        &report(Outcome::NoResults {
            columns: vec!["id".into()]
        }),
        &plain()
    );
    assert!(output.ends_with(NO_RESULTS_NOTICE));
}

#[test]
fn test_report_failed_text() {
    let output = format_report(
        &report(Outcome::Failed {
            error: "no such column: nope".into()
        }),
        &plain()
    );
    assert!(output.ends_with("Error executing query: no such column: nope"));
}

#[test]
fn test_report_json() {
    let opts = OutputOptions {
        format:  OutputFormat::Json,
        colored: false
    };
    let output = format_report(&report(Outcome::Rows(sample_result())), &opts);
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["is_safe"], true);
    assert_eq!(json["outcome"]["status"], "rows");
    assert_eq!(json["outcome"]["rows"][1][1], serde_json::Value::Null);
    assert_eq!(json["question"], "who is there");
}

#[test]
fn test_report_json_refused() {
    let opts = OutputOptions {
        format:  OutputFormat::Json,
        colored: false
    };
    let output = format_report(&report(Outcome::Refused), &opts);
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["is_safe"], false);
    assert_eq!(json["outcome"]["status"], "refused");
}

#[test]
fn test_report_yaml() {
    let opts = OutputOptions {
        format:  OutputFormat::Yaml,
        colored: false
    };
    let output = format_report(&report(Outcome::Refused), &opts);
    assert!(output.contains("status: refused"));
    assert!(output.contains("sql:"));
}

#[test]
fn test_format_schema_text_and_empty() {
    let schema = SchemaDescription::new(vec![TableDefinition {
        name:    "t".into(),
        columns: vec![ColumnDefinition::new("id", "INTEGER")]
    }]);
    assert_eq!(format_schema(&schema, &plain()), "CREATE TABLE t (id INTEGER);");
    assert_eq!(
        format_schema(&SchemaDescription::default(), &plain()),
        "(no tables)"
    );
}

#[test]
fn test_format_prompt_dry_run() {
    let messages = build_messages("how many users", &SchemaDescription::default());
    let output = format_prompt(&messages, &plain());
    assert!(output.contains("DRY RUN"));
    assert!(output.contains("[system]"));
    assert!(output.contains("[user]"));
    assert!(output.contains("Question: how many users"));
}
