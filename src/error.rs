//! Error taxonomy for check construction and invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring or running checks.
///
/// Only [`CheckError::File`] is ever swallowed, and only by
/// [`Check::run`](crate::check::Check::run), which turns it into a zero score.
/// Everything else propagates to whoever configured or invoked the check.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Construction-time misconfiguration: a required or referenced parameter
    /// is missing or malformed.
    #[error("parameter error: {0}")]
    Parameter(String),

    /// The invocation target failed the check's type/shape precondition.
    #[error("file error: {0}")]
    File(String),

    /// A vocabulary path could not be resolved.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// No check is registered under the requested name.
    #[error("registry error: {0}")]
    Registry(String),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CheckError {
    pub(crate) fn missing_args(check: &str, missing: &[&str]) -> Self {
        CheckError::Parameter(format!(
            "keyword arguments for {} must include: {}",
            check,
            missing
                .iter()
                .map(|m| format!("'{}'", m))
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
