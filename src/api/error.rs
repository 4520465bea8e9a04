use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a single API call. `Clone` so outcomes can sit in UI state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect failure, timeout, reset).
    #[error("{endpoint}: request failed: {message}")]
    Network { endpoint: &'static str, message: String },

    #[error("{endpoint}: server returned {status}: {body}")]
    Server {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint}: not found")]
    NotFound { endpoint: &'static str },

    /// 2xx response whose body did not match the expected shape.
    #[error("{endpoint}: malformed response: {message}")]
    Decode { endpoint: &'static str, message: String },
}

impl ApiError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiError::Network { endpoint, .. }
            | ApiError::Server { endpoint, .. }
            | ApiError::NotFound { endpoint }
            | ApiError::Decode { endpoint, .. } => endpoint,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Short label for the status line.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network { .. } => "network error",
            ApiError::Server { .. } => "server error",
            ApiError::NotFound { .. } => "not found",
            ApiError::Decode { .. } => "bad response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_endpoint_and_status() {
        let err = ApiError::Server {
            endpoint: "tweets/like",
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "tweets/like: server returned 500: boom");
        assert_eq!(err.endpoint(), "tweets/like");
        assert_eq!(err.kind(), "server error");
    }

    #[test]
    fn test_not_found_predicate() {
        assert!(ApiError::NotFound { endpoint: "users/get-user" }.is_not_found());
        let net = ApiError::Network {
            endpoint: "users/get-user",
            message: "connection refused".to_string(),
        };
        assert!(!net.is_not_found());
    }
}
