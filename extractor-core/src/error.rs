use thiserror::Error;

/// Run-level error taxonomy.
///
/// `Config`, `InputTable` and `Fetch` are user-actionable and map to exit
/// code 1 in the CLI; the passthrough variants are unexpected internal
/// failures and map to exit code 2.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Input Table Error: {0}")]
    InputTable(String),

    /// A single fetch failed; carries the already-classified user message.
    #[error("{0}")]
    Fetch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractorError {
    /// True for errors the user can act on (bad config, bad input table,
    /// rejected fetch parameters or credentials).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ExtractorError::Config(_) | ExtractorError::InputTable(_) | ExtractorError::Fetch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_are_classified() {
        assert!(ExtractorError::Config("missing token".into()).is_user_error());
        assert!(ExtractorError::InputTable("no location".into()).is_user_error());
        assert!(ExtractorError::Fetch("Error: boom".into()).is_user_error());
    }

    #[test]
    fn internal_errors_are_not_user_errors() {
        let err = ExtractorError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!err.is_user_error());
    }

    #[test]
    fn fetch_error_displays_bare_message() {
        let err = ExtractorError::Fetch("Authorization Error: Invalid API token".into());
        assert_eq!(err.to_string(), "Authorization Error: Invalid API token");
    }
}
