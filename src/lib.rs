//! Synthetic monitoring of a single product page
//!
//! Loads the page in headless Chrome via chromiumoxide, reads schema.org
//! availability and price, stores a full-page screenshot and returns an
//! HTTP-shaped JSON report.

pub mod browser;
pub mod browser_setup;
pub mod evidence;
pub mod manager;
pub mod navigation;
pub mod page_extractor;
pub mod pipeline;
pub mod report;
pub mod target;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info};

use crate::navigation::{RequestFilter, WaitCondition};
use crate::utils::constants::{
    DEFAULT_CONFIG_FILE, ENV_CHROMIUM_PATH, ENV_MONITOR_CONFIG, ENV_MONITOR_ENV,
    ENV_STORAGE_API_KEY, ENV_STORAGE_BUCKET, ENV_STORAGE_ENDPOINT, ENV_STORAGE_PROJECT,
    ENV_TARGET_URL,
};

pub use browser::{BrowserSession, ChromeLauncher, MonitorPage, SessionLauncher};
pub use evidence::{AppwriteStorage, ObjectStorage, StorageSettings, StoredFile, UploadFile};
pub use manager::{Session, SessionManager};
pub use pipeline::{Pipeline, RunPlan};
pub use report::{InvocationResponse, MonitoringReport, RunStage, RunStatus};
pub use target::{FieldSelector, MonitoringTarget, PageOverrides};
pub use utils::{AttemptOutcome, MonitorError, MonitorResult, RetryPolicy, with_retry};

/// Tunables loaded from YAML. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: MonitoringTarget,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub evidence: EvidenceConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default)]
    pub wait_until: WaitCondition,

    /// Per attempt. Longer waits trade latency for reliability.
    #[serde(default = "default_navigation_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub request_filter: RequestFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_wait_for_selectors")]
    pub wait_for_selectors: bool,

    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default = "default_screenshot_timeout_ms")]
    pub screenshot_timeout_ms: u64,
}

/// Applied independently to navigation, extraction, the screenshot and its upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub backoff: utils::Backoff,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: std::time::Duration::from_millis(self.delay_ms),
            backoff: self.backoff,
        }
    }
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Pass `--no-sandbox`; containers are detected automatically
    #[serde(default)]
    pub no_sandbox: bool,

    /// Viewport and window dimensions
    #[serde(default)]
    pub window: WindowConfig,

    /// Overrides executable discovery
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}
fn default_wait_for_selectors() -> bool {
    true
}
fn default_selector_timeout_ms() -> u64 {
    10_000
}
fn default_screenshot_timeout_ms() -> u64 {
    15_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1920
}
fn default_window_height() -> u32 {
    1080
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            wait_until: WaitCondition::default(),
            timeout_ms: default_navigation_timeout_ms(),
            request_filter: RequestFilter::default(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            wait_for_selectors: default_wait_for_selectors(),
            selector_timeout_ms: default_selector_timeout_ms(),
        }
    }
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            screenshot_timeout_ms: default_screenshot_timeout_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
            backoff: utils::Backoff::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            no_sandbox: false,
            window: WindowConfig::default(),
            executable_path: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Load config from `MONITOR_CONFIG`, else `./monitor.yaml`, else defaults.
/// `MONITOR_TARGET_URL` overrides `target.url`.
pub fn load_yaml_config() -> anyhow::Result<Config> {
    resolve_config(
        std::env::var(ENV_MONITOR_CONFIG)
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from),
        std::env::var(ENV_TARGET_URL).ok(),
    )
}

/// An explicit config path must exist; only the implicit `./monitor.yaml`
/// may be absent.
pub fn resolve_config(
    explicit_path: Option<PathBuf>,
    target_url: Option<String>,
) -> anyhow::Result<Config> {
    let mut config = match explicit_path {
        Some(path) => load_config_from(&path)?,
        None => {
            let implicit = PathBuf::from(DEFAULT_CONFIG_FILE);
            if implicit.exists() {
                load_config_from(&implicit)?
            } else {
                Config::default()
            }
        }
    };

    if let Some(url) = target_url
        && !url.trim().is_empty()
    {
        config.target.url = url;
    }

    Ok(config)
}

pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    use anyhow::Context;

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Secrets and deployment settings from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub storage: StorageSettings,
    pub chromium_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> MonitorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as missing,
    /// and every missing key is named in the error.
    pub fn from_lookup<F>(lookup: F) -> MonitorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let required = [
            ENV_STORAGE_ENDPOINT,
            ENV_STORAGE_PROJECT,
            ENV_STORAGE_API_KEY,
            ENV_STORAGE_BUCKET,
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| read(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(MonitorError::missing_settings(&missing));
        }

        Ok(Self {
            storage: StorageSettings {
                endpoint: read(ENV_STORAGE_ENDPOINT).unwrap_or_default(),
                project_id: read(ENV_STORAGE_PROJECT).unwrap_or_default(),
                api_key: read(ENV_STORAGE_API_KEY).unwrap_or_default(),
                bucket_id: read(ENV_STORAGE_BUCKET).unwrap_or_default(),
            },
            chromium_path: read(ENV_CHROMIUM_PATH).map(PathBuf::from),
        })
    }
}

/// Whether failure bodies include stack detail (`MONITOR_ENV=development`)
pub fn debug_mode_from_env() -> bool {
    std::env::var(ENV_MONITOR_ENV)
        .map(|value| value.eq_ignore_ascii_case("development"))
        .unwrap_or(false)
}

/// Per-invocation context handed in by the host runtime
pub struct InvocationContext {
    pub invocation_id: String,
    /// Every log line of the run is emitted inside this span
    pub span: tracing::Span,
    pub include_stack: bool,
}

impl InvocationContext {
    pub fn new(target_url: &str, include_stack: bool) -> Self {
        let invocation_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "monitor_run",
            invocation_id = %invocation_id,
            target = %target_url
        );
        Self {
            invocation_id,
            span,
            include_stack,
        }
    }
}

/// Invocation entry point
///
/// Missing settings or an invalid configuration fail fast with a 500 before
/// any browser is launched.
pub async fn run_invocation<F>(
    ctx: &InvocationContext,
    config: &Config,
    settings: MonitorResult<Settings>,
    launcher: Arc<dyn SessionLauncher>,
    connect_storage: F,
) -> InvocationResponse
where
    F: FnOnce(&StorageSettings) -> MonitorResult<Arc<dyn ObjectStorage>>,
{
    async move {
        let prepared = settings.and_then(|settings| {
            let plan = RunPlan::new(config, &settings)?;
            let storage = connect_storage(&settings.storage)?;
            Ok((plan, storage))
        });

        let (plan, storage) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Invocation rejected: {}", e);
                return report::early_failure(&e, ctx.include_stack);
            }
        };

        info!("Starting monitoring run");
        let pipeline = Pipeline::new(SessionManager::new(launcher), storage, plan);
        let report = pipeline.run().await;
        info!(
            "Monitoring run finished with {:?} in {}ms",
            report.status,
            report.execution_time_ms()
        );
        report.into_response(ctx.include_stack)
    }
    .instrument(ctx.span.clone())
    .await
}
