use crate::store::StoreError;

/// Infrastructure and input failures. Policy rejections are never errors;
/// they come back as a `Decision`.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("attempt store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("attempt record {key} kept changing; gave up after {attempts} attempts")]
    ConcurrentUpdate { key: String, attempts: u32 },
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::InvalidRequest(_) => "invalid_request",
            GateError::StoreUnavailable(_) => "store_unavailable",
            GateError::ConcurrentUpdate { .. } => "concurrent_update",
        }
    }
}

impl From<validator::ValidationErrors> for GateError {
    fn from(errors: validator::ValidationErrors) -> Self {
        GateError::InvalidRequest(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            GateError::InvalidRequest("user_id is required".into()).code(),
            "invalid_request"
        );
        assert_eq!(
            GateError::from(StoreError::Timeout(Duration::from_millis(5))).code(),
            "store_unavailable"
        );
        assert_eq!(
            GateError::ConcurrentUpdate {
                key: "u/l/q".into(),
                attempts: 3
            }
            .code(),
            "concurrent_update"
        );
    }
}
