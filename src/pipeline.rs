//! The monitoring run: session -> navigation -> extraction -> evidence -> report
//!
//! Navigation, extraction, the screenshot and its upload each run under
//! their own retry budget. Any failure after the session is up triggers one
//! best-effort error screenshot, then the page and session are released
//! before the report is built.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::browser::MonitorPage;
use crate::evidence::{self, EvidenceArtifact, EvidenceKind, ObjectStorage};
use crate::manager::SessionManager;
use crate::navigation::{self, NavigationPolicy};
use crate::page_extractor::{self, ExtractedFields, ExtractionPolicy};
use crate::report::{MonitoringReport, RunStage, StepAttempts, build_failure, build_success};
use crate::target::MonitoringTarget;
use crate::utils::{
    MonitorResult, RetryPolicy, validate_interaction_timeout, validate_navigation_timeout,
    with_retry,
};
use crate::{BrowserConfig, Config, Settings};

/// Everything one run needs, validated up front
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub target: MonitoringTarget,
    pub browser: BrowserConfig,
    pub navigation: NavigationPolicy,
    pub extraction: ExtractionPolicy,
    pub screenshot_timeout: Duration,
    pub retry: RetryPolicy,
    pub bucket_id: String,
}

impl RunPlan {
    /// # Errors
    /// `MonitorError::Configuration` for an unusable target or out-of-range timeouts.
    pub fn new(config: &Config, settings: &Settings) -> MonitorResult<Self> {
        config.target.validate()?;

        let mut browser = config.browser.clone();
        if browser.executable_path.is_none() {
            browser.executable_path = settings.chromium_path.clone();
        }

        Ok(Self {
            target: config.target.clone(),
            browser,
            navigation: NavigationPolicy {
                wait_until: config.navigation.wait_until,
                timeout: validate_navigation_timeout(
                    "navigation.timeout_ms",
                    config.navigation.timeout_ms,
                )?,
                request_filter: config.navigation.request_filter.clone(),
            },
            extraction: ExtractionPolicy {
                wait_for_selectors: config.extraction.wait_for_selectors,
                selector_timeout: validate_interaction_timeout(
                    "extraction.selector_timeout_ms",
                    config.extraction.selector_timeout_ms,
                )?,
            },
            screenshot_timeout: validate_interaction_timeout(
                "evidence.screenshot_timeout_ms",
                config.evidence.screenshot_timeout_ms,
            )?,
            retry: config.retry.policy(),
            bucket_id: settings.storage.bucket_id.clone(),
        })
    }
}

pub struct Pipeline {
    sessions: SessionManager,
    storage: Arc<dyn ObjectStorage>,
    plan: RunPlan,
}

impl Pipeline {
    pub fn new(sessions: SessionManager, storage: Arc<dyn ObjectStorage>, plan: RunPlan) -> Self {
        Self {
            sessions,
            storage,
            plan,
        }
    }

    /// Execute one monitoring run. Always returns a report.
    pub async fn run(&self) -> MonitoringReport {
        let started = Instant::now();
        let mut attempts = StepAttempts::default();

        let mut session = match self.sessions.acquire(&self.plan.browser).await {
            Ok(session) => session,
            Err(e) => {
                error!("Browser launch failed: {}", e);
                return build_failure(&e, RunStage::Idle, None, started.elapsed(), attempts);
            }
        };

        let page = match session.new_page().await {
            Ok(page) => page,
            Err(e) => {
                error!("Failed to open page: {}", e);
                session.release().await;
                return build_failure(
                    &e,
                    RunStage::SessionAcquired,
                    None,
                    started.elapsed(),
                    attempts,
                );
            }
        };

        let mut stage = RunStage::SessionAcquired;
        let outcome = self
            .run_stages(page.as_ref(), &mut stage, &mut attempts)
            .await;

        let error_artifact_id = match &outcome {
            Ok(_) => None,
            Err(e) => {
                error!("Monitoring run failed after {:?}: {}", stage, e);
                self.capture_error_evidence(page.as_ref()).await
            }
        };

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }
        session.release().await;

        match outcome {
            Ok((fields, artifact_id)) => {
                info!(
                    "Monitoring run succeeded: available={} screenshot={}",
                    fields.is_available, artifact_id
                );
                build_success(fields, artifact_id, started.elapsed(), attempts)
            }
            Err(e) => build_failure(&e, stage, error_artifact_id, started.elapsed(), attempts),
        }
    }

    async fn run_stages(
        &self,
        page: &dyn MonitorPage,
        stage: &mut RunStage,
        attempts: &mut StepAttempts,
    ) -> MonitorResult<(ExtractedFields, String)> {
        let plan = &self.plan;
        let storage = self.storage.as_ref();
        let target = &plan.target;
        let bucket_id = plan.bucket_id.as_str();

        navigation::prepare_page(page, target, &plan.navigation).await?;

        let policy = &plan.navigation;
        let outcome = with_retry("navigation", &plan.retry, move |_| {
            navigation::navigate(page, target, policy)
        })
        .await;
        attempts.navigation = outcome.attempts();
        outcome.into_result()?;
        *stage = RunStage::Navigated;

        let policy = &plan.extraction;
        let outcome = with_retry("extraction", &plan.retry, move |_| {
            page_extractor::extract(page, target, policy)
        })
        .await;
        attempts.extraction = outcome.attempts();
        let fields = outcome.into_result()?;
        *stage = RunStage::Extracted;

        let screenshot_timeout = plan.screenshot_timeout;
        let outcome = with_retry("screenshot", &plan.retry, move |_| {
            evidence::capture(page, screenshot_timeout)
        })
        .await;
        attempts.capture = outcome.attempts();
        let bytes = outcome.into_result()?;

        // One artifact for every upload attempt keeps the stored id stable
        let artifact = EvidenceArtifact::new(bytes, EvidenceKind::Success);
        let artifact = &artifact;
        let outcome = with_retry("evidence upload", &plan.retry, move |_| {
            evidence::persist(storage, bucket_id, artifact)
        })
        .await;
        attempts.upload = outcome.attempts();
        let artifact_id = outcome.into_result()?;
        *stage = RunStage::EvidenceCaptured;

        Ok((fields, artifact_id))
    }

    /// Single-shot screenshot of the failed page; every error is logged and dropped
    async fn capture_error_evidence(&self, page: &dyn MonitorPage) -> Option<String> {
        let bytes = match evidence::capture(page, self.plan.screenshot_timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Error screenshot capture failed: {}", e);
                return None;
            }
        };

        let artifact = EvidenceArtifact::new(bytes, EvidenceKind::Error);
        match evidence::persist(self.storage.as_ref(), &self.plan.bucket_id, &artifact).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Error screenshot upload failed: {}", e);
                None
            }
        }
    }
}
