//! Error categorisation for the cycle execution engine.
//!
//! Every failure mode named in the specification's error-handling design is
//! a variant here, so call sites get one consistent `Display` regardless of
//! where the failure originated.

use thiserror::Error;

/// The unit of failure for the whole engine, from scenario load down to a
/// single template lookup.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// Bad scenario configuration: caught before any step runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A template dialect (VAR/ENV/PATH/RESP) failed to resolve.
    #[error("{0}")]
    Template(String),

    /// A step's `if` guard evaluated to false.
    #[error("{0}")]
    ConditionNotSatisfied(String),

    /// Request construction, transport, or response-body read failure.
    #[error("{0}")]
    Transport(String),

    /// Filesystem failure opening/writing a log file or response body.
    #[error("log I/O error: {0}")]
    LogIo(String),

    /// Scenario file could not be read or parsed as JSON.
    #[error("failed to load scenario: {0}")]
    ScenarioLoad(String),
}

impl LoadError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::ScenarioLoad(e.to_string())
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_message() {
        let e = LoadError::configuration("\"loops\" must not be negative");
        assert_eq!(
            e.to_string(),
            "configuration error: \"loops\" must not be negative"
        );
    }
}
