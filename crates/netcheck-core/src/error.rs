//! Error taxonomy for the diagnostic engine.
//!
//! Only conditions that make the run itself impossible are errors here.
//! Network failures found by a check are verdicts, not `Err` values.

use netcheck_probe::ProbeError;

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fatal diagnostic errors that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticError {
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for diagnostic operations.
pub type Result<T> = std::result::Result<T, DiagnosticError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_converts() {
        let err: DiagnosticError = ProbeError::Launch {
            program: "dig".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(err.to_string().contains("unable to launch 'dig'"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid("timeout must be positive".to_string());
        assert_eq!(err.to_string(), "invalid config: timeout must be positive");
    }
}
