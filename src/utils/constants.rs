//! Shared configuration constants for the monitor
//!
//! Default values used throughout the codebase to ensure consistency and
//! avoid magic numbers.

/// Chrome user agent string sent unless the target overrides it
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Lower-cased availability fragments that count as "available".
/// Back-ordered items are deliberately included.
pub const AVAILABLE_MARKERS: [&str; 2] = ["instock", "backorder"];

/// Logical field names the report knows how to surface
pub const FIELD_AVAILABILITY: &str = "availability";
pub const FIELD_PRICE: &str = "price";

/// MIME type of every screenshot artifact
pub const SCREENSHOT_MIME: &str = "image/png";

/// Environment keys for the storage collaborator (all required)
pub const ENV_STORAGE_ENDPOINT: &str = "APPWRITE_ENDPOINT";
pub const ENV_STORAGE_PROJECT: &str = "APPWRITE_PROJECT_ID";
pub const ENV_STORAGE_API_KEY: &str = "APPWRITE_API_KEY";
pub const ENV_STORAGE_BUCKET: &str = "APPWRITE_BUCKET_ID";

/// Optional browser executable override
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Debug flag: `development` adds stack detail to failure bodies
pub const ENV_MONITOR_ENV: &str = "MONITOR_ENV";

/// Config file location and target override
pub const ENV_MONITOR_CONFIG: &str = "MONITOR_CONFIG";
pub const ENV_TARGET_URL: &str = "MONITOR_TARGET_URL";
pub const DEFAULT_CONFIG_FILE: &str = "monitor.yaml";
