use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use super::availability::is_available;
use crate::browser::MonitorPage;
use crate::target::{FieldSelector, MonitoringTarget};
use crate::utils::constants::{FIELD_AVAILABILITY, FIELD_PRICE};
use crate::utils::{MonitorError, MonitorResult, wait_for_selector};

#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    /// Poll for each selector before reading it
    pub wait_for_selectors: bool,
    pub selector_timeout: Duration,
}

/// Raw field values read from the page plus the derived availability flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub values: BTreeMap<String, String>,
    pub is_available: bool,
    /// `Some` only when a call-to-action selector is configured
    pub call_to_action_available: Option<bool>,
}

impl ExtractedFields {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn availability(&self) -> Option<&str> {
        self.get(FIELD_AVAILABILITY)
    }

    pub fn price(&self) -> Option<&str> {
        self.get(FIELD_PRICE)
    }
}

/// Read every configured field from `page`
///
/// Fields are independent and read-only, so they are read concurrently and
/// joined; the first failure fails the extraction as a whole.
pub async fn extract(
    page: &dyn MonitorPage,
    target: &MonitoringTarget,
    policy: &ExtractionPolicy,
) -> MonitorResult<ExtractedFields> {
    let reads = target
        .fields
        .iter()
        .map(|(name, field)| read_field(page, name, field, policy));
    let values: BTreeMap<String, String> = try_join_all(reads).await?.into_iter().collect();

    let availability = values.get(FIELD_AVAILABILITY).map(String::as_str).unwrap_or_default();
    let is_available = is_available(availability);

    let call_to_action_available = match &target.call_to_action {
        Some(selector) => call_to_action_state(page, selector).await,
        None => None,
    };

    info!(
        "Extracted {} field(s), availability '{}' -> available={}",
        values.len(),
        availability,
        is_available
    );

    Ok(ExtractedFields {
        values,
        is_available,
        call_to_action_available,
    })
}

async fn read_field(
    page: &dyn MonitorPage,
    name: &str,
    field: &FieldSelector,
    policy: &ExtractionPolicy,
) -> MonitorResult<(String, String)> {
    if policy.wait_for_selectors {
        wait_for_selector(page, &field.selector, policy.selector_timeout).await?;
    }

    let value = page
        .attribute(&field.selector, &field.attribute)
        .await?
        .ok_or_else(|| MonitorError::MissingField {
            field: name.to_string(),
            selector: field.selector.clone(),
        })?;

    debug!("Field '{}' = '{}'", name, value);
    Ok((name.to_string(), value))
}

/// Present and not disabled. Lookup errors leave the signal unknown.
async fn call_to_action_state(page: &dyn MonitorPage, selector: &str) -> Option<bool> {
    let state = async {
        if !page.exists(selector).await? {
            return Ok::<_, MonitorError>(false);
        }
        Ok(page.attribute(selector, "disabled").await?.is_none())
    };

    match state.await {
        Ok(enabled) => Some(enabled),
        Err(e) => {
            warn!("Could not inspect call-to-action '{}': {}", selector, e);
            None
        }
    }
}
