//! Result normalizer: reduce a provider response to an [`OutputRef`].
//!
//! The provider has returned its output in several shapes over time. Each
//! shape is handled by one pure rule in [`RULES`]; [`extract`] applies them
//! in order and returns the first match. `None` means "succeeded without a
//! usable output", never "still running".

use genrelay_core::media::{decode_data_uri, extension_for_mime, is_data_uri};
use genrelay_core::OutputRef;
use serde_json::Value;

/// Keys checked for a top-level string locator.
const DIRECT_KEYS: [&str; 5] = ["output", "url", "uri", "video", "result"];

/// Keys checked inside the first element of an `output` array.
const ELEMENT_KEYS: [&str; 5] = ["url", "uri", "video", "output", "result"];

/// A single extraction rule.
pub type Rule = fn(&Value) -> Option<OutputRef>;

/// Extraction rules in priority order, with names for tracing.
pub const RULES: &[(&str, Rule)] = &[
    ("direct_string", direct_string),
    ("first_string_element", first_string_element),
    ("first_keyed_element", first_keyed_element),
    ("data_wrapper", data_wrapper),
];

/// Apply [`RULES`] in order and return the first match.
pub fn extract(payload: &Value) -> Option<OutputRef> {
    RULES.iter().find_map(|(name, rule)| {
        let output = rule(payload)?;
        tracing::debug!(rule = name, output = %output.describe(), "Extracted output reference");
        Some(output)
    })
}

/// Rule 1: a string locator directly under a well-known key.
pub fn direct_string(payload: &Value) -> Option<OutputRef> {
    DIRECT_KEYS
        .iter()
        .find_map(|key| payload.get(*key)?.as_str().and_then(locator_to_ref))
}

/// Rule 2: the first element of the `output` array, if it is a string.
pub fn first_string_element(payload: &Value) -> Option<OutputRef> {
    first_output_element(payload)?
        .as_str()
        .and_then(locator_to_ref)
}

/// Rule 3: the first element of the `output` array, if it is an object
/// carrying a string under one of [`ELEMENT_KEYS`].
pub fn first_keyed_element(payload: &Value) -> Option<OutputRef> {
    let element = first_output_element(payload)?;
    ELEMENT_KEYS
        .iter()
        .find_map(|key| element.get(*key)?.as_str().and_then(locator_to_ref))
}

/// Rule 4: rules 2 and 3 repeated one level under a `data` wrapper.
pub fn data_wrapper(payload: &Value) -> Option<OutputRef> {
    let inner = payload.get("data")?;
    first_string_element(inner).or_else(|| first_keyed_element(inner))
}

fn first_output_element(payload: &Value) -> Option<&Value> {
    payload.get("output")?.as_array()?.first()
}

/// Turn a locator string into an output reference.
///
/// Base64 data URIs are decoded into [`OutputRef::Bytes`]; any other
/// non-blank string (HTTP URL, bucket URI, relative path) is kept as an
/// [`OutputRef::Url`]. Blank strings are not locators.
fn locator_to_ref(locator: &str) -> Option<OutputRef> {
    let locator = locator.trim();
    if locator.is_empty() {
        return None;
    }
    if is_data_uri(locator) {
        return match decode_data_uri(locator) {
            Ok((mime, data)) => Some(OutputRef::Bytes {
                data,
                filename: format!("result.{}", extension_for_mime(&mime)),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring undecodable data URI in provider output");
                None
            }
        };
    }
    Some(OutputRef::Url(locator.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn url(s: &str) -> Option<OutputRef> {
        Some(OutputRef::Url(s.to_string()))
    }

    // -- Documented shapes --

    #[test]
    fn flat_string_array() {
        assert_eq!(extract(&json!({"output": ["https://x/1.mp4"]})), url("https://x/1.mp4"));
    }

    #[test]
    fn array_of_objects_with_url() {
        assert_eq!(
            extract(&json!({"output": [{"url": "https://x/2.mp4"}]})),
            url("https://x/2.mp4")
        );
    }

    #[test]
    fn array_of_objects_with_other_keys() {
        for key in ["uri", "video", "output", "result"] {
            let payload = json!({"output": [{ key: "https://x/k.mp4" }]});
            assert_eq!(extract(&payload), url("https://x/k.mp4"), "key {key}");
        }
    }

    #[test]
    fn data_wrapper_shape() {
        assert_eq!(
            extract(&json!({"data": {"output": ["https://x/3.mp4"]}})),
            url("https://x/3.mp4")
        );
        assert_eq!(
            extract(&json!({"data": {"output": [{"video": "https://x/4.mp4"}]}})),
            url("https://x/4.mp4")
        );
    }

    #[test]
    fn direct_string_field() {
        assert_eq!(extract(&json!({"output": "https://x/5.mp4"})), url("https://x/5.mp4"));
    }

    // -- No match --

    #[test]
    fn empty_or_missing_output_is_none() {
        assert_eq!(extract(&json!({"output": []})), None);
        assert_eq!(extract(&json!({"status": "SUCCEEDED"})), None);
        assert_eq!(extract(&json!({"output": null})), None);
    }

    #[test]
    fn blank_and_unkeyed_strings_are_ignored() {
        assert_eq!(extract(&json!({"id": "task-1", "output": ["   "]})), None);
        assert_eq!(extract(&json!({"output": [{"name": "https://x/6.mp4"}]})), None);
    }

    #[test]
    fn non_http_locators_are_kept() {
        assert_eq!(extract(&json!({"output": ["s3://bucket/v.mp4"]})), url("s3://bucket/v.mp4"));
        assert_eq!(extract(&json!({"output": ["/files/v.mp4"]})), url("/files/v.mp4"));
        assert_eq!(
            extract(&json!({"output": [{"url": "gs://b/v.mp4"}]})),
            url("gs://b/v.mp4")
        );
    }

    #[test]
    fn undecodable_data_uri_is_none() {
        assert_eq!(extract(&json!({"output": ["data:video/mp4;base64,%%%"]})), None);
    }

    #[test]
    fn only_first_element_is_considered() {
        assert_eq!(
            extract(&json!({"output": [{"thumb": "https://x/t.jpg"}, "https://x/7.mp4"]})),
            None
        );
    }

    // -- Ordering --

    #[test]
    fn earlier_rules_win() {
        let payload = json!({
            "output": ["https://x/top.mp4"],
            "data": {"output": ["https://x/nested.mp4"]},
        });
        assert_eq!(extract(&payload), url("https://x/top.mp4"));
    }

    // -- Byte payloads --

    #[test]
    fn data_uri_becomes_bytes() {
        assert_eq!(
            extract(&json!({"output": ["data:image/png;base64,YWJj"]})),
            Some(OutputRef::Bytes {
                data: b"abc".to_vec(),
                filename: "result.png".into(),
            })
        );
    }

    // -- Idempotence on canonical input --

    #[test]
    fn extract_is_idempotent_on_canonical_input() {
        let refs = [
            OutputRef::Url("https://x/1.mp4".into()),
            OutputRef::Bytes {
                data: vec![1, 2, 3, 4],
                filename: "result.mp4".into(),
            },
        ];
        for output in refs {
            assert_eq!(extract(&output.canonical()), Some(output));
        }
    }

    // -- Individual rules --

    #[test]
    fn rules_are_independent() {
        let flat = json!({"output": ["https://x/a.mp4"]});
        assert_eq!(direct_string(&flat), None);
        assert_eq!(first_string_element(&flat), url("https://x/a.mp4"));
        assert_eq!(first_keyed_element(&flat), None);
        assert_eq!(data_wrapper(&flat), None);
    }
}
