use thiserror::Error;

/// Result type for rate limiting operations
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Errors that can occur when constructing a rate limiter
///
/// Admission itself never fails: `wait` only blocks or returns. The only
/// error path is a bad configuration handed to a constructor or builder.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// Rate or capacity is missing, non-positive, or not representable
    #[error("Invalid rate limiter configuration: {0}")]
    InvalidConfiguration(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_field() {
        let err = RateLimitError::InvalidConfiguration("rate must be greater than 0");
        assert_eq!(err.to_string(), "Invalid rate limiter configuration: rate must be greater than 0");
    }
}
