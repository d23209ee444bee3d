//! Automation bridge - infrastructure layer
//!
//! The narrow operation-call interface every job goes through. The orchestrator
//! never talks to a browser directly: it holds `Arc<dyn Bridge>` pool members and
//! hands one to each running job.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::BridgeError;

/// Operation names understood by the bridges in this crate
pub mod ops {
    pub const NAVIGATE: &str = "browser_navigate";
    pub const WAIT_FOR: &str = "browser_wait_for";
    pub const EVALUATE: &str = "browser_evaluate";
    pub const SNAPSHOT: &str = "browser_snapshot";
}

/// One entry of a response's content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type", default = "ContentItem::default_kind")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Self::default_kind(),
            text: text.into(),
        }
    }

    fn default_kind() -> String {
        "text".to_string()
    }
}

/// Result of one bridge call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub data: Option<JsonValue>,
    pub content: Option<Vec<ContentItem>>,
}

impl BridgeResponse {
    pub fn data(value: JsonValue) -> Self {
        Self {
            data: Some(value),
            content: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: None,
            content: Some(vec![ContentItem::text(text)]),
        }
    }

    /// True when structured data carries an explicit `"success": false`
    pub fn reports_failure(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get("success"))
            .and_then(JsonValue::as_bool)
            == Some(false)
    }
}

/// A handle to one isolated (or shared) browser automation target
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Run one named operation
    async fn call(&self, operation: &str, args: JsonValue) -> Result<BridgeResponse, BridgeError>;

    /// Release the underlying browser resources
    async fn close(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Creates the members of a bridge pool
#[async_trait]
pub trait BridgeFactory: Send + Sync {
    /// Short name used in logs and configuration errors
    fn name(&self) -> &str;

    /// Whether instances share no browser state with each other
    fn isolated(&self) -> bool;

    async fn provision(&self, slot: usize) -> Result<Arc<dyn Bridge>, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reports_failure() {
        assert!(BridgeResponse::data(json!({"success": false})).reports_failure());
        assert!(!BridgeResponse::data(json!({"success": true})).reports_failure());
        assert!(!BridgeResponse::text("### Result\n{}").reports_failure());
    }

    #[test]
    fn test_content_item_deserializes_without_type() {
        let item: ContentItem = serde_json::from_value(json!({"text": "hello"})).unwrap();
        assert_eq!(item, ContentItem::text("hello"));
    }
}
