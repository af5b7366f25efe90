//! # SQL Agent Library
//!
//! Natural-language questions to gated, read-only SQL over SQLite.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod output;
pub mod safety;
pub mod schema;
pub mod store;
