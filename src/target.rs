//! The page being monitored and what to read from it

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::navigation::ConsentOverlay;
use crate::utils::constants::{FIELD_AVAILABILITY, FIELD_PRICE};
use crate::utils::{MonitorError, MonitorResult};

/// Where a logical field lives in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelector {
    /// CSS selector; the first match is read
    pub selector: String,
    /// Attribute holding the value (`href` for schema.org links, `content` for meta)
    pub attribute: String,
}

impl FieldSelector {
    pub fn new(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: attribute.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieOverride {
    pub name: String,
    pub value: String,
    /// Scope the cookie to a domain instead of the target URL
    #[serde(default)]
    pub domain: Option<String>,
}

/// Request-level overrides applied before navigation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOverrides {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub cookies: Vec<CookieOverride>,
}

/// One product page to monitor. Built once per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringTarget {
    #[serde(default)]
    pub url: String,

    /// Logical field name -> location; every entry is required
    #[serde(default = "default_fields")]
    pub fields: BTreeMap<String, FieldSelector>,

    #[serde(default)]
    pub overrides: PageOverrides,

    /// Consent or age-gate overlay to dismiss after load
    #[serde(default)]
    pub consent_overlay: Option<ConsentOverlay>,

    /// Primary "add to cart" style control, reported as an auxiliary signal
    #[serde(default)]
    pub call_to_action: Option<String>,
}

impl Default for MonitoringTarget {
    fn default() -> Self {
        Self {
            url: String::new(),
            fields: default_fields(),
            overrides: PageOverrides::default(),
            consent_overlay: None,
            call_to_action: None,
        }
    }
}

/// schema.org Offer markup: `<link itemprop="availability" href=...>` and
/// `<meta itemprop="price" content=...>`
pub fn default_fields() -> BTreeMap<String, FieldSelector> {
    BTreeMap::from([
        (
            FIELD_AVAILABILITY.to_string(),
            FieldSelector::new(r#"[itemprop="availability"]"#, "href"),
        ),
        (
            FIELD_PRICE.to_string(),
            FieldSelector::new(r#"[itemprop="price"]"#, "content"),
        ),
    ])
}

impl MonitoringTarget {
    /// Check the target is something the pipeline can run against
    pub fn validate(&self) -> MonitorResult<()> {
        if self.url.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "no target URL configured (set target.url or MONITOR_TARGET_URL)".into(),
            ));
        }

        let parsed = url::Url::parse(&self.url)
            .map_err(|e| MonitorError::Configuration(format!("invalid target URL '{}': {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MonitorError::Configuration(format!(
                "target URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }

        if !self.fields.contains_key(FIELD_AVAILABILITY) {
            return Err(MonitorError::Configuration(format!(
                "field selectors must include '{FIELD_AVAILABILITY}'"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> MonitoringTarget {
        MonitoringTarget {
            url: url.into(),
            ..MonitoringTarget::default()
        }
    }

    #[test]
    fn accepts_https_product_page() {
        assert!(target("https://shop.test/products/widget").validate().is_ok());
    }

    #[test]
    fn rejects_missing_and_non_http_urls() {
        assert!(target("").validate().is_err());
        assert!(target("ftp://shop.test/widget").validate().is_err());
        assert!(target("not a url").validate().is_err());
    }

    #[test]
    fn availability_field_is_mandatory() {
        let mut t = target("https://shop.test/p");
        t.fields.remove(FIELD_AVAILABILITY);
        assert!(matches!(t.validate(), Err(MonitorError::Configuration(_))));
    }
}
