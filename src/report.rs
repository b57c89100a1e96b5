//! Result reporter - the only output that crosses the invocation boundary

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use crate::page_extractor::ExtractedFields;
use crate::utils::MonitorError;

/// Progress of a monitoring run
///
/// `Idle -> SessionAcquired -> Navigated -> Extracted -> EvidenceCaptured`, after
/// which the report is built. A failure report records the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    SessionAcquired,
    Navigated,
    Extracted,
    EvidenceCaptured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
}

/// Attempts spent per retried step (0 = step not reached)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepAttempts {
    pub navigation: u32,
    pub extraction: u32,
    pub capture: u32,
    pub upload: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub message: String,
    /// Debug rendering, surfaced only in debug mode
    pub debug: String,
    pub stage: RunStage,
}

#[derive(Debug, Clone)]
pub struct MonitoringReport {
    pub status: RunStatus,
    pub fields: Option<ExtractedFields>,
    pub screenshot_id: Option<String>,
    pub error_screenshot_id: Option<String>,
    pub execution_time: Duration,
    pub attempts: StepAttempts,
    pub failure: Option<FailureDetail>,
}

/// HTTP-shaped payload returned to the host runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: Value,
}

impl InvocationResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Pretty JSON for stdout. Never fails; a rendering error yields a
    /// minimal 500 document instead.
    #[must_use]
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| render_fallback(&format!("failed to render response: {e}")))
    }
}

fn render_fallback(message: &str) -> String {
    json!({
        "statusCode": 500,
        "body": { "error": message },
    })
    .to_string()
}

pub fn build_success(
    fields: ExtractedFields,
    artifact_id: String,
    elapsed: Duration,
    attempts: StepAttempts,
) -> MonitoringReport {
    MonitoringReport {
        status: RunStatus::Success,
        fields: Some(fields),
        screenshot_id: Some(artifact_id),
        error_screenshot_id: None,
        execution_time: elapsed,
        attempts,
        failure: None,
    }
}

/// Failure report; extracted fields are never carried on failure
pub fn build_failure(
    error: &MonitorError,
    stage: RunStage,
    error_artifact_id: Option<String>,
    elapsed: Duration,
    attempts: StepAttempts,
) -> MonitoringReport {
    MonitoringReport {
        status: RunStatus::Failure,
        fields: None,
        screenshot_id: None,
        error_screenshot_id: error_artifact_id,
        execution_time: elapsed,
        attempts,
        failure: Some(FailureDetail {
            message: error.to_string(),
            debug: format!("{error:?} (stage: {stage:?}, attempts: {attempts:?})"),
            stage,
        }),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody<'a> {
    is_available: bool,
    availability: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_to_action_available: Option<bool>,
    fields: &'a BTreeMap<String, String>,
    execution_time_ms: u64,
    attempts: StepAttempts,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureBody<'a> {
    is_available: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_screenshot_id: Option<&'a str>,
    failed_stage: RunStage,
    execution_time_ms: u64,
    attempts: StepAttempts,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<&'a str>,
}

impl MonitoringReport {
    #[must_use]
    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time.as_millis() as u64
    }

    /// Render the HTTP-shaped response: 200 on success, 500 on failure.
    ///
    /// Never fails; a body that cannot be serialized degrades to
    /// `{"error": <message>}` with status 500.
    #[must_use]
    pub fn into_response(self, include_stack: bool) -> InvocationResponse {
        let execution_time_ms = self.execution_time_ms();

        let (status_code, rendered) = match (&self.fields, &self.failure) {
            (Some(fields), None) => (
                200,
                serde_json::to_value(SuccessBody {
                    is_available: fields.is_available,
                    availability: fields.availability(),
                    price: fields.price(),
                    screenshot_id: self.screenshot_id.as_deref(),
                    call_to_action_available: fields.call_to_action_available,
                    fields: &fields.values,
                    execution_time_ms,
                    attempts: self.attempts,
                }),
            ),
            (_, Some(failure)) => (
                500,
                serde_json::to_value(FailureBody {
                    is_available: false,
                    error: &failure.message,
                    error_screenshot_id: self.error_screenshot_id.as_deref(),
                    failed_stage: failure.stage,
                    execution_time_ms,
                    attempts: self.attempts,
                    stack: include_stack.then_some(failure.debug.as_str()),
                }),
            ),
            (None, None) => {
                return minimal_failure("report assembled without fields or failure detail");
            }
        };

        match rendered {
            Ok(body) => InvocationResponse { status_code, body },
            Err(e) => minimal_failure(&format!("failed to serialize report: {e}")),
        }
    }
}

/// Response for errors that happen before a run can start
#[must_use]
pub fn early_failure(error: &MonitorError, include_stack: bool) -> InvocationResponse {
    let mut body = json!({
        "isAvailable": false,
        "error": error.to_string(),
        "executionTimeMs": 0,
    });
    if include_stack {
        body["stack"] = Value::String(format!("{error:?}"));
    }
    InvocationResponse {
        status_code: 500,
        body,
    }
}

fn minimal_failure(message: &str) -> InvocationResponse {
    InvocationResponse {
        status_code: 500,
        body: json!({ "error": message }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ExtractedFields {
        ExtractedFields {
            values: BTreeMap::from([
                ("availability".to_string(), "http://schema.org/InStock".to_string()),
                ("price".to_string(), "549.99".to_string()),
            ]),
            is_available: true,
            call_to_action_available: None,
        }
    }

    #[test]
    fn success_body_shape() {
        let response = build_success(
            fields(),
            "file123".into(),
            Duration::from_millis(1234),
            StepAttempts { navigation: 1, extraction: 2, capture: 1, upload: 1 },
        )
        .into_response(false);

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["isAvailable"], true);
        assert_eq!(response.body["availability"], "http://schema.org/InStock");
        assert_eq!(response.body["price"], "549.99");
        assert_eq!(response.body["screenshotId"], "file123");
        assert_eq!(response.body["executionTimeMs"], 1234);
        assert_eq!(response.body["attempts"]["extraction"], 2);
        assert!(response.body.get("error").is_none());
        assert!(response.body.get("callToActionAvailable").is_none());
    }

    #[test]
    fn failure_body_hides_stack_unless_debug() {
        let error = MonitorError::Navigation("timed out after 30000ms loading https://shop.test".into());
        let report = build_failure(
            &error,
            RunStage::SessionAcquired,
            Some("err-shot".into()),
            Duration::from_millis(90_000),
            StepAttempts { navigation: 3, ..StepAttempts::default() },
        );

        let plain = report.clone().into_response(false);
        assert_eq!(plain.status_code, 500);
        assert_eq!(plain.body["isAvailable"], false);
        assert!(plain.body["error"].as_str().unwrap_or_default().starts_with("NavigationError: "));
        assert_eq!(plain.body["errorScreenshotId"], "err-shot");
        assert_eq!(plain.body["failedStage"], "session_acquired");
        assert!(plain.body.get("screenshotId").is_none());
        assert!(plain.body.get("stack").is_none());
        assert!(plain.body.get("price").is_none());

        let debug = report.into_response(true);
        assert!(debug.body["stack"].as_str().unwrap_or_default().contains("Navigation"));
    }

    #[test]
    fn rendered_response_is_json() {
        let response = early_failure(&MonitorError::Navigation("got \"503\" back".into()), false);
        let parsed: Value = serde_json::from_str(&response.to_json_pretty()).unwrap();
        assert_eq!(parsed["statusCode"], 500);
        assert_eq!(parsed["body"]["error"], "NavigationError: got \"503\" back");
    }

    #[test]
    fn fallback_escapes_quoted_messages() {
        let rendered = render_fallback(r#"key "a\b" must be a string"#);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["statusCode"], 500);
        assert_eq!(parsed["body"]["error"], r#"key "a\b" must be a string"#);
    }

    #[test]
    fn early_failure_names_missing_keys() {
        let response = early_failure(
            &MonitorError::missing_settings(&["APPWRITE_BUCKET_ID"]),
            false,
        );
        assert_eq!(response.status_code, 500);
        assert!(response.body["error"].as_str().unwrap_or_default().contains("APPWRITE_BUCKET_ID"));
    }
}
