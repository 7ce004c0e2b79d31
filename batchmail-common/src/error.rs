//! Errors raised while loading a batch, before any network activity.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The batch document does not exist.
    #[error("File \"{}\" not found", .0.display())]
    NotFound(PathBuf),

    /// The batch document exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The batch document is not valid YAML or has the wrong shape.
    #[error("Failed to parse batch document: {0}")]
    Parse(String),

    /// A required value is missing or unusable.
    #[error("Invalid batch: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_path() {
        let error = ConfigError::NotFound(PathBuf::from("messages.yaml"));
        assert_eq!(error.to_string(), "File \"messages.yaml\" not found");
    }

    #[test]
    fn test_validation_display() {
        let error = ConfigError::validation("Field \"subject\" is required");
        assert_eq!(
            error.to_string(),
            "Invalid batch: Field \"subject\" is required"
        );
    }
}
