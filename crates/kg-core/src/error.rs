use thiserror::Error;

#[derive(Debug, Error)]
pub enum KgError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("too early — retry in {remaining_secs}s")]
    TooEarly { remaining_secs: i64 },

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl KgError {
    /// Maps to the status an HTTP boundary would use. `TooEarly` is
    /// deliberately mapped to 200 — callers surface it as a success
    /// envelope with `success: false`, not as an HTTP error (see the
    /// dead-letter retry contract).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::TooEarly { .. } => 200,
            Self::ServiceUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, KgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(KgError::validation("bad").http_status(), 400);
        assert_eq!(KgError::Unauthorized("no token".into()).http_status(), 401);
        assert_eq!(KgError::Forbidden("not allowed".into()).http_status(), 403);
        assert_eq!(KgError::not_found("epic/123").http_status(), 404);
        assert_eq!(KgError::conflict("dup".into()).http_status(), 409);
        assert_eq!(
            KgError::TooEarly { remaining_secs: 30 }.http_status(),
            200
        );
        assert_eq!(
            KgError::ServiceUnavailable("graph down".into()).http_status(),
            503
        );
    }
}
