use thiserror::Error;

/// Errors returned by tollgate operations.
#[derive(Debug, Error)]
pub enum TollgateError {
    #[error("config error: {0}")]
    Config(String),

    #[error("verification error: {0}")]
    Verification(String),

    #[error("settlement error: {0}")]
    Settlement(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_display_their_category() {
        assert_eq!(
            TollgateError::Verification("timed out".into()).to_string(),
            "verification error: timed out"
        );
        assert_eq!(
            TollgateError::Settlement("broadcast failed".into()).to_string(),
            "settlement error: broadcast failed"
        );
        assert_eq!(
            TollgateError::Http("facilitator authentication failed".into()).to_string(),
            "http error: facilitator authentication failed"
        );
    }
}
