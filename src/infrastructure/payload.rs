//! Structured payload extraction
//!
//! Bridges that speak a text protocol wrap script results in a markdown block:
//!
//! ```text
//! ### Result
//! {"found": true, ...}
//!
//! ### Ran Playwright code
//! ...
//! ```
//!
//! Sometimes the whole response is serialized once more into the text field
//! (`{"content":[{"text": "..."}]}`). Everything that parses raw response text
//! lives here; the job flow only ever sees `serde_json::Value`.

use serde_json::Value as JsonValue;

use crate::error::PayloadError;
use crate::infrastructure::bridge::BridgeResponse;

const RESULT_MARKER: &str = "### Result\n";
const SECTION_BREAK: &str = "\n\n###";
const NESTED_ENVELOPE: &str = "{\"content\":[";

/// Pull the structured payload out of a bridge response.
///
/// Structured `data` wins when present; otherwise the first content item's text
/// is decoded. `Ok(None)` means the response carried nothing at all.
pub fn extract_payload(response: &BridgeResponse) -> Result<Option<JsonValue>, PayloadError> {
    if let Some(data) = response.data.as_ref().filter(|d| !d.is_null()) {
        return Ok(Some(data.clone()));
    }

    let Some(item) = response.content.as_ref().and_then(|c| c.first()) else {
        return Ok(None);
    };

    parse_result_text(&item.text).map(Some)
}

/// Decode one content text into JSON
pub fn parse_result_text(text: &str) -> Result<JsonValue, PayloadError> {
    let text = unwrap_nested_envelope(text)?;

    if let Some(start) = text.find(RESULT_MARKER) {
        let body = &text[start + RESULT_MARKER.len()..];
        let end = body.find(SECTION_BREAK).unwrap_or(body.len());
        return Ok(serde_json::from_str(body[..end].trim())?);
    }

    if text.contains("### Result") {
        // Marker present but the block is empty or malformed
        return Err(PayloadError::MissingResultBlock);
    }

    Ok(serde_json::from_str(text.trim())?)
}

fn unwrap_nested_envelope(text: &str) -> Result<String, PayloadError> {
    if !text.starts_with(NESTED_ENVELOPE) {
        return Ok(text.to_string());
    }

    let outer: JsonValue = serde_json::from_str(text)?;
    outer
        .pointer("/content/0/text")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or(PayloadError::MissingResultBlock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bridge::BridgeResponse;
    use serde_json::json;

    #[test]
    fn test_structured_data_wins() {
        let response = BridgeResponse {
            data: Some(json!({"manufacturer": "YAGEO"})),
            content: Some(vec![crate::infrastructure::bridge::ContentItem::text("garbage")]),
        };
        assert_eq!(
            extract_payload(&response).unwrap(),
            Some(json!({"manufacturer": "YAGEO"}))
        );
    }

    #[test]
    fn test_result_block_with_trailing_section() {
        let text = "### Result\n{\"found\": true, \"count\": 1}\n\n### Ran Playwright code\nawait page.evaluate()";
        let payload = extract_payload(&BridgeResponse::text(text)).unwrap();
        assert_eq!(payload, Some(json!({"found": true, "count": 1})));
    }

    #[test]
    fn test_result_block_at_end_of_text() {
        let payload = parse_result_text("### Result\n[1, 2, 3]\n").unwrap();
        assert_eq!(payload, json!([1, 2, 3]));
    }

    #[test]
    fn test_double_encoded_text() {
        let inner = "### Result\n{\"items\": [], \"totalItems\": 0}\n\n### Page state";
        let outer = json!({"content": [{"type": "text", "text": inner}]}).to_string();
        let payload = parse_result_text(&outer).unwrap();
        assert_eq!(payload["totalItems"], json!(0));
    }

    #[test]
    fn test_plain_json_text() {
        assert_eq!(parse_result_text(" {\"a\": 1} ").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_invalid_json_in_block() {
        let err = parse_result_text("### Result\n{not json}\n\n###").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJson(_)));
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(extract_payload(&BridgeResponse::default()).unwrap(), None);
        let null_data = BridgeResponse::data(JsonValue::Null);
        assert_eq!(extract_payload(&null_data).unwrap(), None);
    }
}
