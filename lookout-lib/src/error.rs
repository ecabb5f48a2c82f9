use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::telemetry::Subsystem;

/// Errors that can occur while loading configuration, booting telemetry or
/// serving HTTP helpers
#[derive(Error, Debug)]
pub enum LookoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to build {subsystem} exporter: {reason}")]
    Exporter { subsystem: Subsystem, reason: String },

    #[error("{subsystem} provider error: {reason}")]
    Provider { subsystem: Subsystem, reason: String },

    #[error("failed to instrument {subsystem}: {reason}")]
    Instrumentation { subsystem: Subsystem, reason: String },

    #[error("{name} shutdown failed: {source}")]
    Release {
        name: String,
        #[source]
        source: Box<LookoutError>,
    },

    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Logging setup error: {0}")]
    Logging(String),
}

impl LookoutError {
    /// Status code a handler should answer with when this error escapes it
    pub fn status_code(&self) -> StatusCode {
        match self {
            LookoutError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LookoutError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn exporter(subsystem: Subsystem, reason: impl fmt::Display) -> Self {
        LookoutError::Exporter { subsystem, reason: reason.to_string() }
    }

    pub(crate) fn provider(subsystem: Subsystem, reason: impl fmt::Display) -> Self {
        LookoutError::Provider { subsystem, reason: reason.to_string() }
    }

    pub(crate) fn instrumentation(subsystem: Subsystem, reason: impl fmt::Display) -> Self {
        LookoutError::Instrumentation { subsystem, reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, LookoutError>;

/// A joined error: every failure collected during startup and/or teardown,
/// reported together in the order it happened.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<LookoutError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, err: LookoutError) {
        self.errors.push(err);
    }

    /// Append every error of `other`, keeping its order. Joining never nests.
    pub fn extend(&mut self, other: MultiError) {
        self.errors.extend(other.errors);
    }

    /// Append the error side of `result`, if any
    pub fn absorb(&mut self, result: std::result::Result<(), MultiError>) {
        if let Err(other) = result {
            self.extend(other);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LookoutError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> std::result::Result<(), MultiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<LookoutError> for MultiError {
    fn from(err: LookoutError) -> Self {
        Self { errors: vec![err] }
    }
}

impl IntoIterator for MultiError {
    type Item = LookoutError;
    type IntoIter = std::vec::IntoIter<LookoutError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiError {
    type Item = &'a LookoutError;
    type IntoIter = std::slice::Iter<'a, LookoutError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
