//! Textual allow-list gate for model-sourced SQL.
//!
//! This is the single security boundary between generated text and the
//! store. It is a crude, case-insensitive substring filter rather than a
//! parser: it only ever lets through one statement that starts with
//! `SELECT` or `WITH` and mentions none of the [`DISALLOWED_KEYWORDS`].
//!
//! The substring rule over-rejects on purpose. A keyword inside a string
//! literal or an identifier (`'DROP'`, `created_at`, `last_update`) still
//! rejects the statement. It also does not try to see through comments or
//! lookalike characters.
//!
//! # Example
//!
//! ```
//! use sql_agent::safety::{Verdict, classify, is_read_only_select};
//!
//! assert!(is_read_only_select("SELECT * FROM users;"));
//! assert!(!is_read_only_select("SELECT 1; DELETE FROM x;"));
//! assert_eq!(classify("DROP TABLE users;"), Verdict::NotSelect);
//! ```

/// Keywords whose presence anywhere in the statement rejects it.
pub const DISALLOWED_KEYWORDS: [&str; 12] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "REPLACE", "TRUNCATE", "ATTACH",
    "DETACH", "PRAGMA", "VACUUM"
];

const STATEMENT_SEPARATOR: char = ';';

/// Outcome of classifying one SQL string, with the reason for a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Single read-only query
    Accepted,
    /// Nothing left after trimming
    Empty,
    /// Does not start with `SELECT ` or `WITH `
    NotSelect,
    /// Contains a keyword from [`DISALLOWED_KEYWORDS`]
    DisallowedKeyword(&'static str),
    /// More than one statement separator
    MultipleStatements
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }

    /// Short human-readable reason
    pub fn reason(self) -> String {
        match self {
            Self::Accepted => "accepted".to_string(),
            Self::Empty => "empty statement".to_string(),
            Self::NotSelect => "statement does not start with SELECT or WITH".to_string(),
            Self::DisallowedKeyword(kw) => format!("contains disallowed keyword {}", kw),
            Self::MultipleStatements => "contains more than one statement".to_string()
        }
    }
}

/// Classify `sql`, reporting the first rule it breaks.
pub fn classify(sql: &str) -> Verdict {
    let trimmed = sql.trim();
    let candidate = trimmed
        .strip_suffix(STATEMENT_SEPARATOR)
        .unwrap_or(trimmed)
        .trim();
    if candidate.is_empty() {
        return Verdict::Empty;
    }
    let upper = candidate.to_uppercase();
    if !(upper.starts_with("SELECT ") || upper.starts_with("WITH ")) {
        return Verdict::NotSelect;
    }
    if let Some(kw) = DISALLOWED_KEYWORDS.iter().find(|kw| upper.contains(**kw)) {
        return Verdict::DisallowedKeyword(*kw);
    }
    // Counted on the raw input, so `SELECT 1;;` is two separators.
    if sql.matches(STATEMENT_SEPARATOR).count() > 1 {
        return Verdict::MultipleStatements;
    }
    Verdict::Accepted
}

/// Whether `sql` is a single, side-effect-free read query.
///
/// Every path that runs model-sourced SQL calls this immediately before
/// execution, even when an earlier stage already did.
pub fn is_read_only_select(sql: &str) -> bool {
    classify(sql).is_accepted()
}
