//! Failures raised while assembling the runtime: validating [`CoreConfig`],
//! resolving host bridges and installing the logging subscriber.
//!
//! [`CoreConfig`]: crate::config::CoreConfig

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A `CoreConfig` field is out of range, e.g. a zero event buffer.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host did not register a required bridge and no desktop default
    /// could stand in for it.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A desktop default bridge was available but could not be built.
    #[error("Failed to create default {bridge}: {message}")]
    DefaultBridge { bridge: String, message: String },

    /// The log filter did not parse, or a global subscriber is already set.
    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_names_bridge() {
        let err = Error::CapabilityMissing {
            capability: "EngineFactory".to_string(),
            message: "register an audio engine".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Capability missing: EngineFactory - register an audio engine"
        );
    }

    #[test]
    fn test_default_bridge_failure_names_bridge() {
        let err = Error::DefaultBridge {
            bridge: "HttpClient".to_string(),
            message: "tls backend unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to create default HttpClient: tls backend unavailable"
        );
    }

    #[test]
    fn test_logging_error_is_distinct_from_config() {
        let err = Error::Logging("Invalid log filter: bad".to_string());
        assert!(!matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Logging error: Invalid log filter: bad");
    }
}
