use thiserror::Error;

/// Unified error type for proxy selection
#[derive(Error, Debug)]
pub enum SelectorError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Record errors
    #[error("Incorrect proxy format: {0}")]
    InvalidFormat(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for selector operations
pub type Result<T> = std::result::Result<T, SelectorError>;

impl SelectorError {
    /// Check if this error comes from the data source rather than from the caller
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            SelectorError::Database(_) | SelectorError::DatabaseConnection(_)
        )
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for SelectorError {
    fn from(err: url::ParseError) -> Self {
        SelectorError::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SelectorError::InvalidFormat("missing ip".to_string()).to_string(),
            "Incorrect proxy format: missing ip"
        );
        assert_eq!(
            SelectorError::InvalidConfig("bad".to_string()).to_string(),
            "Invalid configuration: bad"
        );
    }

    #[test]
    fn test_error_source_helper() {
        assert!(SelectorError::DatabaseConnection("refused".to_string()).is_source_error());
        assert!(SelectorError::Database(sqlx::Error::RowNotFound).is_source_error());
        assert!(!SelectorError::InvalidFormat("x".to_string()).is_source_error());
    }

    #[test]
    fn test_url_error_maps_to_invalid_config() {
        let err: SelectorError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, SelectorError::InvalidConfig(_)));
    }
}
