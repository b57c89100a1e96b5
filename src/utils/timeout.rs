//! Timeout validation and enforcement for browser operations

use std::future::Future;
use std::time::Duration;

use super::errors::{MonitorError, MonitorResult};

/// Maximum timeout for page navigation (5 minutes)
/// Covers slow storefronts behind heavy consent walls and CDNs
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000; // 5 minutes

/// Maximum timeout for selector waits, overlay probes and screenshots (60 seconds)
pub const MAX_INTERACTION_TIMEOUT_MS: u64 = 60_000; // 60 seconds

/// Validate timeout for navigation operations
///
/// # Arguments
/// * `name` - Configuration key, used in the error message
/// * `timeout_ms` - Configured timeout in milliseconds
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(MonitorError::Configuration)` - If timeout is zero or exceeds MAX_NAVIGATION_TIMEOUT_MS
pub fn validate_navigation_timeout(name: &str, timeout_ms: u64) -> MonitorResult<Duration> {
    validate(name, timeout_ms, MAX_NAVIGATION_TIMEOUT_MS)
}

/// Validate timeout for element and capture operations
pub fn validate_interaction_timeout(name: &str, timeout_ms: u64) -> MonitorResult<Duration> {
    validate(name, timeout_ms, MAX_INTERACTION_TIMEOUT_MS)
}

fn validate(name: &str, ms: u64, max_ms: u64) -> MonitorResult<Duration> {
    if ms == 0 || ms > max_ms {
        return Err(MonitorError::Configuration(format!(
            "{name} must be between 1 and {max_ms}ms ({:.1} minutes). Received: {ms}ms",
            max_ms as f64 / 60_000.0
        )));
    }
    Ok(Duration::from_millis(ms))
}

/// Run `fut` under `timeout`, mapping expiry to `MonitorError::Timeout`
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, fut: F) -> MonitorResult<T>
where
    F: Future<Output = MonitorResult<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| MonitorError::timeout(operation, timeout))?
}
