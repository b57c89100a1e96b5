//! chromiumoxide implementation of `MonitorPage`

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide_cdp::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide_cdp::cdp::browser_protocol::network::{
    CookieParam, ErrorReason, EventResponseReceived, Headers, ResourceType, SetBlockedUrLsParams,
    SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide_cdp::cdp::browser_protocol::page::{CaptureScreenshotFormat, EventLifecycleEvent};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::MonitorPage;
use crate::navigation::{RequestFilter, WaitCondition};
use crate::target::PageOverrides;
use crate::utils::{MonitorError, MonitorResult};

/// How long to keep draining buffered network events for the document response
/// once `goto` has returned
const DOCUMENT_RESPONSE_GRACE: Duration = Duration::from_secs(2);

/// A chromiumoxide tab plus the request interceptor tasks it owns
pub struct ChromePage {
    inner: Page,
    interceptors: Mutex<Vec<JoinHandle<()>>>,
}

impl ChromePage {
    pub fn new(inner: Page) -> Self {
        Self {
            inner,
            interceptors: Mutex::new(Vec::new()),
        }
    }

    fn abort_interceptors(&self) {
        for handle in self.interceptors.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        self.abort_interceptors();
    }
}

#[async_trait]
impl MonitorPage for ChromePage {
    async fn apply_overrides(&self, url: &str, overrides: &PageOverrides) -> MonitorResult<()> {
        if let Some(user_agent) = &overrides.user_agent {
            self.inner
                .execute(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await?;
        }

        if !overrides.headers.is_empty() {
            let headers = serde_json::to_value(&overrides.headers)
                .map_err(|e| MonitorError::Browser(format!("invalid header override: {e}")))?;
            self.inner
                .execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
                .await?;
        }

        if !overrides.cookies.is_empty() {
            let cookies = overrides
                .cookies
                .iter()
                .map(|cookie| {
                    let builder = CookieParam::builder()
                        .name(cookie.name.clone())
                        .value(cookie.value.clone());
                    match &cookie.domain {
                        Some(domain) => builder.domain(domain.clone()).path("/"),
                        None => builder.url(url),
                    }
                    .build()
                    .map_err(|e| MonitorError::Browser(format!("invalid cookie '{}': {e}", cookie.name)))
                })
                .collect::<MonitorResult<Vec<_>>>()?;
            self.inner.set_cookies(cookies).await?;
        }

        Ok(())
    }

    async fn install_request_filter(&self, filter: &RequestFilter) -> MonitorResult<()> {
        if !filter.blocked_url_patterns.is_empty() {
            self.inner
                .execute(SetBlockedUrLsParams::new(filter.blocked_url_patterns.clone()))
                .await?;
        }

        let patterns: Vec<RequestPattern> = filter
            .blocked_resource_types
            .iter()
            .map(|blocked| {
                RequestPattern::builder()
                    .resource_type(blocked.resource_type())
                    .build()
            })
            .collect();

        if patterns.is_empty() {
            return Ok(());
        }

        // Listener first so no paused request slips through before the loop starts
        let mut paused = self.inner.event_listener::<EventRequestPaused>().await?;
        self.inner
            .execute(EnableParams::builder().patterns(patterns).build())
            .await?;

        let page = self.inner.clone();
        let handle = tokio::spawn(async move {
            // Only blocked resource types are intercepted, so every paused request is failed
            while let Some(event) = paused.next().await {
                let params = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                if let Err(e) = page.execute(params).await {
                    trace!("Failed to block request {}: {}", event.request.url, e);
                }
            }
        });
        self.interceptors.lock().push(handle);

        info!(
            "Request filter installed: {} resource type(s), {} url pattern(s)",
            filter.blocked_resource_types.len(),
            filter.blocked_url_patterns.len()
        );
        Ok(())
    }

    async fn goto(&self, url: &str, wait: WaitCondition) -> MonitorResult<u16> {
        let mut responses = self.inner.event_listener::<EventResponseReceived>().await?;
        let mut lifecycle = match wait {
            WaitCondition::NetworkIdle => Some(self.inner.event_listener::<EventLifecycleEvent>().await?),
            WaitCondition::DocumentReady => None,
        };

        self.inner
            .goto(url)
            .await
            .map_err(|e| MonitorError::Navigation(format!("{url}: {e}")))?;

        let main_frame = self.inner.mainframe().await?;
        let status = tokio::time::timeout(DOCUMENT_RESPONSE_GRACE, async {
            while let Some(event) = responses.next().await {
                let is_main_document = event.r#type == ResourceType::Document
                    && (main_frame.is_none() || event.frame_id.as_ref() == main_frame.as_ref());
                if is_main_document {
                    return Some(event.response.status);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
        .ok_or_else(|| MonitorError::Navigation(format!("no document response received for {url}")))?;

        if let Some(events) = lifecycle.as_mut() {
            while let Some(event) = events.next().await {
                if event.name == "networkIdle" {
                    debug!("Network idle reached for {}", url);
                    break;
                }
            }
        }

        u16::try_from(status)
            .map_err(|_| MonitorError::Navigation(format!("invalid HTTP status {status} for {url}")))
    }

    async fn exists(&self, selector: &str) -> MonitorResult<bool> {
        let elements = self.inner.find_elements(selector).await?;
        Ok(!elements.is_empty())
    }

    async fn attribute(&self, selector: &str, attribute: &str) -> MonitorResult<Option<String>> {
        let elements = self.inner.find_elements(selector).await?;
        match elements.first() {
            Some(element) => Ok(element.attribute(attribute).await?),
            None => Ok(None),
        }
    }

    async fn click(&self, selector: &str) -> MonitorResult<()> {
        self.inner.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn screenshot_full_page(&self) -> MonitorResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.inner
            .screenshot(params)
            .await
            .map_err(|e| MonitorError::Capture(e.to_string()))
    }

    async fn close(&self) -> MonitorResult<()> {
        self.abort_interceptors();
        self.inner.clone().close().await?;
        Ok(())
    }
}
