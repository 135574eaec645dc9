/// Header carrying the client's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing API key")]
    Missing,
    #[error("invalid API key")]
    Invalid,
}

/// Validates the provided API key against the configured one.
///
/// The expected key is resolved once at startup. When no key is configured every request is
/// accepted.
pub fn validate_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match provided {
        None => Err(AuthError::Missing),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_key_configured() {
        assert_eq!(validate_api_key(None, None), Ok(()));
        assert_eq!(validate_api_key(None, Some("anything")), Ok(()));
    }

    #[test]
    fn requires_matching_key() {
        assert_eq!(validate_api_key(Some("s3cret"), Some("s3cret")), Ok(()));
        assert_eq!(validate_api_key(Some("s3cret"), None), Err(AuthError::Missing));
        assert_eq!(
            validate_api_key(Some("s3cret"), Some("guess")),
            Err(AuthError::Invalid)
        );
    }
}
