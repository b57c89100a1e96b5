//! Browser lifecycle management
//!
//! Launches chromiumoxide browser instances and owns their handler task and
//! temporary profile directory until the session is closed.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{BrowserSession, ChromePage, MonitorPage, SessionLauncher};
use crate::BrowserConfig;
use crate::utils::{MonitorError, MonitorResult};

/// Wrapper for Browser and its event handler task
///
/// Ensures handler is properly cleaned up when browser is dropped.
/// Handler MUST be aborted to prevent it running indefinitely after
/// browser is closed.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser, wait for the process to exit, then remove the profile
    ///
    /// `close()` alone leaves a zombie Chrome process; `wait()` reaps it and
    /// releases the file handles so the temp directory can be removed.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.cleanup_temp_dir();
    }

    /// Clean up temp directory (blocking operation)
    ///
    /// MUST be called AFTER `browser.wait()` completes to ensure Chrome
    /// has released all file handles.
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop() kills the Chrome process

        if let Some(path) = self.user_data_dir.as_ref() {
            warn!(
                "BrowserWrapper dropped without shutdown. Temp directory will be orphaned: {}",
                path.display()
            );
        }
    }
}

/// chromiumoxide-backed session
pub struct ChromeSession {
    wrapper: Option<BrowserWrapper>,
}

impl ChromeSession {
    pub fn new(wrapper: BrowserWrapper) -> Self {
        Self {
            wrapper: Some(wrapper),
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> MonitorResult<Box<dyn MonitorPage>> {
        let wrapper = self
            .wrapper
            .as_ref()
            .ok_or_else(|| MonitorError::Browser("browser session already closed".into()))?;

        let page = wrapper
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| MonitorError::Browser(format!("failed to create page: {e}")))?;

        Ok(Box::new(ChromePage::new(page)))
    }

    async fn close(&mut self) -> MonitorResult<()> {
        if let Some(mut wrapper) = self.wrapper.take() {
            info!("Shutting down browser");
            wrapper.shutdown().await;
        }
        Ok(())
    }
}

/// Launches Chrome through `browser_setup`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self, config: &BrowserConfig) -> MonitorResult<Box<dyn BrowserSession>> {
        // Unique profile per run, no state shared between invocations
        let user_data_dir = std::env::temp_dir().join(format!(
            "storefront_monitor_{}_{}",
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        ));

        let (browser, handler) =
            crate::browser_setup::launch_browser(config, user_data_dir.clone())
                .await
                .map_err(|e| MonitorError::Launch(format!("{e:#}")))?;

        Ok(Box::new(ChromeSession::new(BrowserWrapper::new(
            browser,
            handler,
            user_data_dir,
        ))))
    }
}
