//! Best-effort dismissal of consent banners and age gates

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::MonitorPage;
use crate::utils::wait_for_selector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentOverlay {
    /// Present while the overlay blocks the page
    pub selector: String,
    /// Control that dismisses it
    pub dismiss_selector: String,
    #[serde(default = "default_overlay_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_overlay_timeout_ms() -> u64 {
    3000
}

/// Click the overlay's dismiss control if the overlay shows up in time.
/// Never fails: a missing or stubborn overlay only gets logged.
pub async fn dismiss_overlay(page: &dyn MonitorPage, overlay: &ConsentOverlay) {
    let timeout = Duration::from_millis(overlay.timeout_ms);

    if let Err(e) = wait_for_selector(page, &overlay.selector, timeout).await {
        debug!("Consent overlay '{}' not present: {}", overlay.selector, e);
        return;
    }

    match tokio::time::timeout(timeout, page.click(&overlay.dismiss_selector)).await {
        Ok(Ok(())) => info!("Dismissed consent overlay via '{}'", overlay.dismiss_selector),
        Ok(Err(e)) => warn!(
            "Failed to dismiss consent overlay via '{}': {}",
            overlay.dismiss_selector, e
        ),
        Err(_) => warn!(
            "Dismissing consent overlay via '{}' timed out after {}ms",
            overlay.dismiss_selector, overlay.timeout_ms
        ),
    }
}
