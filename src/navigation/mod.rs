//! Navigation controller - loads the target page and validates the HTTP outcome

mod consent;
mod request_filter;

pub use consent::{ConsentOverlay, dismiss_overlay};
pub use request_filter::{BlockedResource, RequestFilter};

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::browser::MonitorPage;
use crate::target::MonitoringTarget;
use crate::utils::{MonitorError, MonitorResult};

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// The load event has fired
    #[default]
    DocumentReady,
    /// Load, then the network has gone quiet
    NetworkIdle,
}

/// Validated navigation settings for one run
#[derive(Debug, Clone)]
pub struct NavigationPolicy {
    pub wait_until: WaitCondition,
    pub timeout: Duration,
    pub request_filter: RequestFilter,
}

/// Outcome of a successful navigation. The document itself stays on the page
/// that was navigated, which the caller still owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoadResult {
    pub url: String,
    pub status: u16,
    pub load_duration: Duration,
}

/// One-time page setup before the first navigation attempt: overrides and
/// the request filter.
pub async fn prepare_page(
    page: &dyn MonitorPage,
    target: &MonitoringTarget,
    policy: &NavigationPolicy,
) -> MonitorResult<()> {
    page.apply_overrides(&target.url, &target.overrides).await?;
    if !policy.request_filter.is_empty() {
        page.install_request_filter(&policy.request_filter).await?;
    }
    Ok(())
}

/// Drive `page` to the target URL
///
/// Any status other than 200 fails with `UnexpectedStatus`. Expiry of the
/// navigation budget is reported as a navigation failure.
pub async fn navigate(
    page: &dyn MonitorPage,
    target: &MonitoringTarget,
    policy: &NavigationPolicy,
) -> MonitorResult<PageLoadResult> {
    let start = Instant::now();
    info!("Navigating to {} (wait: {:?})", target.url, policy.wait_until);

    let status = tokio::time::timeout(policy.timeout, page.goto(&target.url, policy.wait_until))
        .await
        .map_err(|_| {
            MonitorError::Navigation(format!(
                "timed out after {}ms loading {}",
                policy.timeout.as_millis(),
                target.url
            ))
        })??;

    if status != 200 {
        warn!("Unexpected HTTP status {} from {}", status, target.url);
        return Err(MonitorError::UnexpectedStatus {
            url: target.url.clone(),
            status,
        });
    }

    if let Some(overlay) = &target.consent_overlay {
        dismiss_overlay(page, overlay).await;
    }

    let load_duration = start.elapsed();
    info!("Loaded {} in {}ms", target.url, load_duration.as_millis());

    Ok(PageLoadResult {
        url: target.url.clone(),
        status,
        load_duration,
    })
}
