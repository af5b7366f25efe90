//! Backing store addressing and per-operation connections.
//!
//! Only file-based SQLite stores are supported, addressed as
//! `sqlite:///<path>`:
//!
//! | URL | File |
//! |-----|------|
//! | `sqlite:///./sample.db` | `./sample.db` |
//! | `sqlite:///data/app.db` | `data/app.db` |
//! | `sqlite:////var/lib/app.db` | `/var/lib/app.db` |
//! | `sqlite:///` | `./sample.db` |
//!
//! Connections are opened for the duration of one operation and released
//! when dropped. Nothing is pooled.

use std::{
    fs,
    path::{Path, PathBuf}
};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{AgentError, AgentResult, config_error, store_unavailable};

const SCHEME: &str = "sqlite";
const DEFAULT_PATH: &str = "./sample.db";

/// Parsed `sqlite:///` store location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    url:  String,
    path: PathBuf
}

impl StoreTarget {
    /// Parse a store URL, rejecting every scheme other than `sqlite`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for other schemes, a missing `://`, or a
    /// non-empty host part.
    pub fn parse(url: &str) -> AgentResult<Self> {
        let unsupported = || {
            config_error(format!(
                "Only sqlite URLs are supported, e.g., sqlite:///./sample.db (got '{}')",
                url
            ))
        };
        let (scheme, rest) = url.split_once("://").ok_or_else(unsupported)?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(unsupported());
        }
        let path = match rest.strip_prefix('/') {
            Some(path) => path,
            None if rest.is_empty() => "",
            None => {
                return Err(config_error(format!(
                    "sqlite URLs take no host, use sqlite:///<path> (got '{}')",
                    url
                )));
            }
        };
        let path = if path.is_empty() { DEFAULT_PATH } else { path };
        Ok(Self {
            url:  url.to_string(),
            path: PathBuf::from(path)
        })
    }

    /// Target for an explicit file path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            url: format!("sqlite:///{}", path.display()),
            path
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-only connection. A missing database file is an error.
    pub fn open_read_only(&self) -> AgentResult<Connection> {
        debug!(path = %self.path.display(), "opening read-only store connection");
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        )
        .map_err(|e| store_unavailable(&self.url, e))
    }

    /// Open a read-write connection, creating the file and its parent
    /// directories when missing.
    pub fn open_read_write(&self) -> AgentResult<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AgentError::StoreUnavailable {
                target:  self.url.clone(),
                message: format!("cannot create '{}': {}", parent.display(), e)
            })?;
        }
        debug!(path = %self.path.display(), "opening read-write store connection");
        Connection::open(&self.path).map_err(|e| store_unavailable(&self.url, e))
    }
}

/// Run an operator-supplied SQL script against the store.
///
/// This does not go through the safety gate: it is meant for loading sample
/// data, never for model output.
pub fn execute_script(target: &StoreTarget, script: &str) -> AgentResult<()> {
    let conn = target.open_read_write()?;
    conn.execute_batch(script)
        .map_err(|e| AgentError::QueryExecutionError(e.to_string()))
}
