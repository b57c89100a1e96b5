//! Browser session manager
//!
//! Every run acquires its own browser and releases it on every exit path.
//!
//! # Release Guarantees
//!
//! - `Session::release()` closes the browser and waits for the process to
//!   exit. Calling it again is a no-op.
//! - A `Session` dropped without release (e.g. the run future was cancelled
//!   by an outer timeout) still tears the browser down: the wrapper's Drop
//!   aborts the CDP handler and chromiumoxide kills the child process.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::BrowserConfig;
use crate::browser::{BrowserSession, MonitorPage, SessionLauncher};
use crate::utils::{MonitorError, MonitorResult};

pub struct SessionManager {
    launcher: Arc<dyn SessionLauncher>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self { launcher }
    }

    /// Launch a browser for one run
    ///
    /// # Errors
    /// `MonitorError::Launch` if the browser process cannot start.
    pub async fn acquire(&self, config: &BrowserConfig) -> MonitorResult<Session> {
        let start = Instant::now();
        let inner = self.launcher.launch(config).await.map_err(|e| match e {
            MonitorError::Launch(_) => e,
            other => MonitorError::Launch(other.to_string()),
        })?;
        info!("Browser session acquired in {}ms", start.elapsed().as_millis());
        Ok(Session { inner: Some(inner) })
    }
}

/// Exclusive handle on a running browser
pub struct Session {
    inner: Option<Box<dyn BrowserSession>>,
}

impl Session {
    /// Open a blank page. The caller owns it and must close it before release.
    pub async fn new_page(&self) -> MonitorResult<Box<dyn MonitorPage>> {
        match self.inner.as_ref() {
            Some(session) => session.new_page().await,
            None => Err(MonitorError::Browser("session already released".into())),
        }
    }

    /// Close the browser. Safe to call multiple times.
    pub async fn release(&mut self) {
        if let Some(mut session) = self.inner.take() {
            match session.close().await {
                Ok(()) => info!("Browser session released"),
                Err(e) => warn!("Browser session closed with error: {}", e),
            }
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!("Session dropped without release; browser is torn down without a clean close");
        }
    }
}
