use thiserror::Error;

/// Errors that can end a monitoring run
///
/// Display strings lead with the error kind because the failure body carries
/// them verbatim in its `error` field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("ConfigurationError: {0}")]
    Configuration(String),

    #[error("LaunchError: {0}")]
    Launch(String),

    #[error("NavigationError: {0}")]
    Navigation(String),

    #[error("UnexpectedStatusError: expected HTTP 200 from {url}, received {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("MissingFieldError: no element matched selector '{selector}' for field '{field}'")]
    MissingField { field: String, selector: String },

    #[error("TimeoutError: {operation} did not complete within {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("CaptureError: {0}")]
    Capture(String),

    #[error("UploadError: {0}")]
    Upload(String),

    #[error("BrowserError: {0}")]
    Browser(String),
}

impl MonitorError {
    /// Build a configuration error naming every missing setting
    pub fn missing_settings(keys: &[&str]) -> Self {
        MonitorError::Configuration(format!(
            "missing required settings: {}",
            keys.join(", ")
        ))
    }

    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        MonitorError::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Configuration and launch failures end the run immediately;
    /// everything else is worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            MonitorError::Configuration(_) | MonitorError::Launch(_)
        )
    }
}

/// Implement From<chromiumoxide::error::CdpError> for MonitorError
impl From<chromiumoxide::error::CdpError> for MonitorError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        MonitorError::Browser(err.to_string())
    }
}

/// Implement From<reqwest::Error> for MonitorError
impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Upload(err.to_string())
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_not_retryable() {
        assert!(!MonitorError::Configuration("x".into()).is_retryable());
        assert!(!MonitorError::Launch("x".into()).is_retryable());
        assert!(MonitorError::Navigation("x".into()).is_retryable());
        assert!(MonitorError::Upload("x".into()).is_retryable());
        assert!(
            MonitorError::MissingField {
                field: "price".into(),
                selector: "[itemprop=price]".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn display_leads_with_error_kind() {
        let err = MonitorError::UnexpectedStatus {
            url: "https://shop.test/p/1".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "UnexpectedStatusError: expected HTTP 200 from https://shop.test/p/1, received 503"
        );
        assert!(
            MonitorError::missing_settings(&["APPWRITE_ENDPOINT", "APPWRITE_API_KEY"])
                .to_string()
                .ends_with("APPWRITE_ENDPOINT, APPWRITE_API_KEY")
        );
    }
}
