//! Translation between domain requests and Runway request/response bodies.
//!
//! [`build_task`] is the only place that knows the provider's field names
//! and units. Duration is sent as integer seconds and the ratio in `W:H`
//! pixel notation, matching API version `2024-11-06`.

use genrelay_core::{GenerationMode, JobRequest};
use serde_json::{json, Value};

/// Keys that may carry the task identifier in a creation response.
const TASK_ID_KEYS: [&str; 4] = ["id", "taskId", "task_id", "task"];

/// A provider call ready to send: endpoint path plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTask {
    pub endpoint: &'static str,
    pub payload: Value,
}

/// Endpoint path for each generation mode.
pub fn endpoint_for(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::TextToVideo => "text_to_video",
        GenerationMode::ImageToVideo => "image_to_video",
        GenerationMode::TextToImage => "text_to_image",
    }
}

/// Build the creation call for a request.
///
/// Deterministic: the same request always yields the same payload.
pub fn build_task(request: &JobRequest) -> ProviderTask {
    let mut payload = json!({
        "model": request.model_name(),
        "promptText": request.prompt_text(),
        "ratio": request.aspect_ratio().as_str(),
    });

    if let Some(duration) = request.duration() {
        payload["duration"] = json!(duration.seconds());
    }
    if let Some(image) = request.reference_image() {
        payload["promptImage"] = json!(image.to_data_uri());
    }
    if request.mode().produces_video() {
        payload["watermark"] = json!(false);
    }

    ProviderTask {
        endpoint: endpoint_for(request.mode()),
        payload,
    }
}

/// Pull the task identifier out of a creation response.
///
/// Accepts a string under any of `id`/`taskId`/`task_id`/`task`, an object
/// under those keys carrying its own `id`, and the same shapes nested one
/// level under `data`.
pub fn extract_task_id(body: &Value) -> Option<String> {
    find_task_id(body).or_else(|| body.get("data").and_then(find_task_id))
}

fn find_task_id(value: &Value) -> Option<String> {
    TASK_ID_KEYS.iter().find_map(|key| match value.get(*key)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(inner) => inner
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        _ => None,
    })
}
