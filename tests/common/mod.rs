//! In-memory browser and storage doubles for pipeline tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use storefront_monitor::navigation::{RequestFilter, WaitCondition};
use storefront_monitor::utils::{MonitorError, MonitorResult};
use storefront_monitor::{
    BrowserConfig, BrowserSession, Config, MonitorPage, ObjectStorage, PageOverrides,
    SessionLauncher, Settings, StorageSettings, StoredFile, UploadFile,
};

pub const TARGET_URL: &str = "https://shop.test/products/espresso-machine";

#[derive(Clone)]
pub enum GotoBehavior {
    Status(u16),
    Hang,
    Fail(String),
}

/// Scripted page. Clones share call counters.
#[derive(Clone)]
pub struct FakePage {
    pub goto: GotoBehavior,
    pub attributes: HashMap<(String, String), String>,
    pub selectors: HashSet<String>,
    pub fail_screenshot: bool,
    /// Screenshots that fail before capture starts working
    pub transient_screenshot_failures: Arc<AtomicUsize>,
    pub fail_attribute_reads: bool,
    pub fail_click: bool,
    pub click_calls: Arc<AtomicUsize>,
    pub goto_calls: Arc<AtomicUsize>,
    pub attribute_calls: Arc<AtomicUsize>,
    pub screenshot_calls: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl FakePage {
    /// Product page marked up with schema.org Offer data
    pub fn product(availability: &str, price: &str) -> Self {
        Self::blank()
            .with_attribute(r#"[itemprop="availability"]"#, "href", availability)
            .with_attribute(r#"[itemprop="price"]"#, "content", price)
    }

    pub fn blank() -> Self {
        Self {
            goto: GotoBehavior::Status(200),
            attributes: HashMap::new(),
            selectors: HashSet::new(),
            fail_screenshot: false,
            transient_screenshot_failures: Arc::new(AtomicUsize::new(0)),
            fail_attribute_reads: false,
            fail_click: false,
            click_calls: Arc::new(AtomicUsize::new(0)),
            goto_calls: Arc::new(AtomicUsize::new(0)),
            attribute_calls: Arc::new(AtomicUsize::new(0)),
            screenshot_calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_attribute(mut self, selector: &str, attribute: &str, value: &str) -> Self {
        self.selectors.insert(selector.to_string());
        self.attributes
            .insert((selector.to_string(), attribute.to_string()), value.to_string());
        self
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selectors.insert(selector.to_string());
        self
    }

    pub fn with_goto(mut self, goto: GotoBehavior) -> Self {
        self.goto = goto;
        self
    }
}

#[async_trait]
impl MonitorPage for FakePage {
    async fn apply_overrides(&self, _url: &str, _overrides: &PageOverrides) -> MonitorResult<()> {
        Ok(())
    }

    async fn install_request_filter(&self, _filter: &RequestFilter) -> MonitorResult<()> {
        Ok(())
    }

    async fn goto(&self, _url: &str, _wait: WaitCondition) -> MonitorResult<u16> {
        self.goto_calls.fetch_add(1, Ordering::SeqCst);
        match &self.goto {
            GotoBehavior::Status(status) => Ok(*status),
            GotoBehavior::Hang => std::future::pending().await,
            GotoBehavior::Fail(message) => Err(MonitorError::Navigation(message.clone())),
        }
    }

    async fn exists(&self, selector: &str) -> MonitorResult<bool> {
        Ok(self.selectors.contains(selector))
    }

    async fn attribute(&self, selector: &str, attribute: &str) -> MonitorResult<Option<String>> {
        self.attribute_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_attribute_reads {
            return Err(MonitorError::Browser("execution context was destroyed".into()));
        }
        Ok(self
            .attributes
            .get(&(selector.to_string(), attribute.to_string()))
            .cloned())
    }

    async fn click(&self, selector: &str) -> MonitorResult<()> {
        self.click_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_click || !self.selectors.contains(selector) {
            return Err(MonitorError::Browser(format!("no clickable element for '{selector}'")));
        }
        Ok(())
    }

    async fn screenshot_full_page(&self) -> MonitorResult<Vec<u8>> {
        self.screenshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_screenshot {
            return Err(MonitorError::Capture("target crashed".into()));
        }
        let pending = self.transient_screenshot_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_screenshot_failures
                .store(pending - 1, Ordering::SeqCst);
            return Err(MonitorError::Capture("renderer busy".into()));
        }
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn close(&self) -> MonitorResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeSession {
    page: FakePage,
    fail_new_page: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> MonitorResult<Box<dyn MonitorPage>> {
        if self.fail_new_page {
            return Err(MonitorError::Browser("failed to create target".into()));
        }
        Ok(Box::new(self.page.clone()))
    }

    async fn close(&mut self) -> MonitorResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out sessions over one scripted page
pub struct FakeLauncher {
    pub page: FakePage,
    pub fail_launch: bool,
    pub fail_new_page: bool,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail_launch: false,
            fail_new_page: false,
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn session_closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, _config: &BrowserConfig) -> MonitorResult<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(MonitorError::Launch("chrome exited with code 127".into()));
        }
        Ok(Box::new(FakeSession {
            page: self.page.clone(),
            fail_new_page: self.fail_new_page,
            closes: self.closes.clone(),
        }))
    }
}

/// Storage that rejects the first `failures` uploads
pub struct FakeStorage {
    failures: AtomicUsize,
    pub uploads: Mutex<Vec<(String, UploadFile)>>,
    pub calls: AtomicUsize,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            uploads: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn filenames(&self) -> Vec<String> {
        self.uploads
            .lock()
            .iter()
            .map(|(_, file)| file.filename.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn create_file(
        &self,
        _bucket_id: &str,
        file_id: &str,
        file: UploadFile,
    ) -> MonitorResult<StoredFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MonitorError::Upload("storage returned HTTP 503".into()));
        }
        self.uploads.lock().push((file_id.to_string(), file));
        Ok(StoredFile {
            id: file_id.to_string(),
        })
    }
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.target.url = TARGET_URL.to_string();
    config
}

pub fn settings() -> Settings {
    Settings {
        storage: StorageSettings {
            endpoint: "https://storage.test/v1".into(),
            project_id: "monitor".into(),
            api_key: "secret".into(),
            bucket_id: "screenshots".into(),
        },
        chromium_path: None,
    }
}
