//! Selector polling for pages that render structured data after load
//!
//! Provides wait_for_selector() which polls for DOM elements with exponential backoff.

use std::time::Duration;

use crate::browser::MonitorPage;
use crate::utils::errors::{MonitorError, MonitorResult};

/// Wait for a selector to match at least one element
///
/// # Arguments
/// * `page` - The page to search in
/// * `selector` - CSS selector for the element
/// * `timeout` - Maximum time to wait for the element
///
/// # Returns
/// * `Ok(())` - The element was found
/// * `Err(MonitorError::Timeout)` - Timeout exceeded
/// * `Err(_)` - The page failed while being queried
///
/// # Polling Strategy
/// - Starts at 100ms intervals
/// - Doubles each retry (exponential backoff)
/// - Caps at 1 second maximum interval
/// - Total duration limited by timeout parameter
pub async fn wait_for_selector(
    page: &dyn MonitorPage,
    selector: &str,
    timeout: Duration,
) -> MonitorResult<()> {
    let start = tokio::time::Instant::now();
    let mut poll_interval = Duration::from_millis(100); // Start with 100ms
    let max_interval = Duration::from_secs(1); // Cap at 1 second

    loop {
        if page.exists(selector).await? {
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(MonitorError::timeout(
                format!("waiting for selector '{selector}'"),
                timeout,
            ));
        }

        // Never sleep past the deadline
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;

        // Double the interval, but cap at max_interval
        poll_interval = (poll_interval * 2).min(max_interval);
    }
}
