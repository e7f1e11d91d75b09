//! Error types for probe execution

use thiserror::Error;

/// Errors that abort a probe before it produces a result.
///
/// A probe that runs and exits nonzero is not an error; it is reported
/// through [`crate::ProbeResult`].
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Probe command has no executable
    #[error("probe '{name}' has an empty command")]
    EmptyCommand { name: String },

    /// Executable missing or not launchable
    #[error("unable to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error while collecting output
    #[error("IO error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    /// Name of the program that failed, if any.
    pub fn program(&self) -> Option<&str> {
        match self {
            ProbeError::EmptyCommand { .. } => None,
            ProbeError::Launch { program, .. } | ProbeError::Io { program, .. } => Some(program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_names_program() {
        let err = ProbeError::Launch {
            program: "curl".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.program(), Some("curl"));
        assert!(err.to_string().contains("unable to launch 'curl'"));
    }

    #[test]
    fn test_empty_command_has_no_program() {
        let err = ProbeError::EmptyCommand {
            name: "dns".to_string(),
        };
        assert!(err.program().is_none());
    }
}
