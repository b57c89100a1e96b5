// Shared utilities: errors, retry, timeouts, element polling
pub mod constants;
pub mod errors;
pub mod retry;
pub mod timeout;
mod wait_for_element;

pub use errors::{MonitorError, MonitorResult};
pub use retry::{AttemptOutcome, Backoff, RetryPolicy, with_retry};
pub use timeout::{validate_interaction_timeout, validate_navigation_timeout, with_timeout};
pub use wait_for_element::wait_for_selector;
