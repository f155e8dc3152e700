//! Boundary normalization of provider status documents.
//!
//! The provider reports status under `status` or `state`, in mixed case,
//! with a vocabulary that has drifted between versions. Everything is
//! mapped to the closed [`JobStatus`] here, so no later stage compares
//! raw strings.

use genrelay_core::JobStatus;
use serde_json::Value;

use crate::normalizer;

/// Raw strings meaning the job finished successfully.
const SUCCESS_STATES: [&str; 3] = ["SUCCEEDED", "SUCCESS", "COMPLETED"];

/// Raw strings meaning the job failed.
const FAILURE_STATES: [&str; 2] = ["FAILED", "ERROR"];

/// Raw strings meaning the job has not started yet.
const PENDING_STATES: [&str; 3] = ["PENDING", "THROTTLED", "QUEUED"];

/// Fields that may carry a human-readable failure reason, in priority order.
const FAILURE_REASON_KEYS: [&str; 4] = ["failure", "error", "failureCode", "message"];

/// The provider reported success but no output reference could be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingOutput;

/// Read the raw status string, preferring `status` over `state`. A blank
/// `status` does not hide `state`.
pub fn raw_status(payload: &Value) -> Option<&str> {
    let field = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    };
    field("status").or_else(|| field("state"))
}

/// Normalize a status document.
///
/// Unknown or missing status strings are treated as still running, never
/// as success.
pub fn normalize(payload: &Value) -> Result<JobStatus, MissingOutput> {
    let status = raw_status(payload)
        .map(|s| s.trim().to_ascii_uppercase())
        .unwrap_or_default();

    if SUCCESS_STATES.contains(&status.as_str()) {
        return normalizer::extract(payload)
            .map(JobStatus::Succeeded)
            .ok_or(MissingOutput);
    }
    if FAILURE_STATES.contains(&status.as_str()) {
        return Ok(JobStatus::Failed(failure_reason(payload)));
    }
    if PENDING_STATES.contains(&status.as_str()) {
        return Ok(JobStatus::Pending);
    }
    Ok(JobStatus::Running)
}

/// Best human-readable failure reason in a status document.
pub fn failure_reason(payload: &Value) -> String {
    FAILURE_REASON_KEYS
        .iter()
        .find_map(|key| match payload.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .unwrap_or_else(|| "unknown failure".to_string())
}
