//! Browser infrastructure for launching Chrome and driving a single tab
//!
//! The pipeline only talks to the traits defined here. `ChromeLauncher`,
//! `ChromeSession` and `ChromePage` are the chromiumoxide implementations.

mod page;
mod wrapper;

pub use page::ChromePage;
pub use wrapper::{BrowserWrapper, ChromeLauncher, ChromeSession};

use async_trait::async_trait;

use crate::BrowserConfig;
use crate::navigation::{RequestFilter, WaitCondition};
use crate::target::PageOverrides;
use crate::utils::MonitorResult;

/// A browser tab as seen by the monitoring steps
#[async_trait]
pub trait MonitorPage: Send + Sync {
    /// Install cookie, header and user-agent overrides for `url`
    async fn apply_overrides(&self, url: &str, overrides: &PageOverrides) -> MonitorResult<()>;

    /// Block requests according to `filter` for the lifetime of the page
    async fn install_request_filter(&self, filter: &RequestFilter) -> MonitorResult<()>;

    /// Navigate to `url` and return the main document's HTTP status
    async fn goto(&self, url: &str, wait: WaitCondition) -> MonitorResult<u16>;

    /// Whether `selector` matches at least one element
    async fn exists(&self, selector: &str) -> MonitorResult<bool>;

    /// `attribute` of the first element matching `selector`.
    /// `None` when nothing matches or the attribute is absent.
    async fn attribute(&self, selector: &str, attribute: &str) -> MonitorResult<Option<String>>;

    async fn click(&self, selector: &str) -> MonitorResult<()>;

    /// PNG of the whole document, not just the viewport
    async fn screenshot_full_page(&self) -> MonitorResult<Vec<u8>>;

    async fn close(&self) -> MonitorResult<()>;
}

/// A running browser owned by exactly one monitoring run
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> MonitorResult<Box<dyn MonitorPage>>;

    /// Close the browser process. Must tolerate repeated calls.
    async fn close(&mut self) -> MonitorResult<()>;
}

/// Starts browser sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, config: &BrowserConfig) -> MonitorResult<Box<dyn BrowserSession>>;
}
