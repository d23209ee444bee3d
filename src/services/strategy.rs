//! Job strategy - business capability layer
//!
//! Each job kind describes which actions to run and how to read what came back,
//! including whether an empty result means "genuinely nothing" or "page never
//! rendered". Strategies never touch a bridge; the job flow runs their actions.

use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::infrastructure::ops;
use crate::models::{Identifier, JobKind, JobSpec, JsonMap};

/// One bridge call in a job's action sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub operation: &'static str,
    pub args: JsonValue,
    /// Keep the extracted payload for interpretation
    pub capture: bool,
    /// Stop the sequence when the captured payload reports `success: false`
    pub stop_on_failure: bool,
    /// Pause after the call, for pages that react asynchronously
    pub settle: Option<Duration>,
    /// False for calls that change state on the site (e.g. a cart click).
    /// Once such a call has been issued, a failure ends the job without a retry.
    pub replayable: bool,
}

impl Action {
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(ops::NAVIGATE, json!({ "url": url.into(), "silent_mode": true }))
    }

    pub fn wait_for_text(text: &str) -> Self {
        Self::new(ops::WAIT_FOR, json!({ "text": text }))
    }

    pub fn wait_seconds(seconds: f64) -> Self {
        Self::new(ops::WAIT_FOR, json!({ "time": seconds }))
    }

    /// Evaluate a `() => {...}` function and capture its return value
    pub fn evaluate(function: impl Into<String>) -> Self {
        Self {
            capture: true,
            ..Self::new(ops::EVALUATE, json!({ "function": function.into() }))
        }
    }

    pub fn stop_on_failure(mut self) -> Self {
        self.stop_on_failure = true;
        self
    }

    pub fn settle(mut self, delay: Duration) -> Self {
        self.settle = Some(delay);
        self
    }

    /// Mark the call as unsafe to repeat
    pub fn once(mut self) -> Self {
        self.replayable = false;
        self
    }

    fn new(operation: &'static str, args: JsonValue) -> Self {
        Self {
            operation,
            args,
            capture: false,
            stop_on_failure: false,
            settle: None,
            replayable: true,
        }
    }
}

/// Outcome of the identifier resolution sub-step
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Catalog code found; `details` are reported alongside the job payload
    Resolved { code: String, details: JsonMap },
    /// Definitive: nothing matches, do not retry
    NotFound(String),
    /// The search page produced nothing readable, worth another attempt
    Unrendered(String),
}

/// Interpretation of a job's captured payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Data(JsonMap),
    /// Definitive negative result
    NotFound(String),
    /// Nothing meaningful extracted; treated as a page that failed to render
    Empty(String),
}

/// Kind-specific behaviour of a job
pub trait JobStrategy: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Whether the identifier must be mapped to a catalog code first
    fn needs_resolution(&self, spec: &JobSpec) -> bool {
        matches!(spec.identifier, Identifier::PartNumber(_))
    }

    fn resolution_actions(&self, _spec: &JobSpec) -> Vec<Action> {
        Vec::new()
    }

    fn interpret_resolution(&self, _spec: &JobSpec, _captured: &[JsonValue]) -> Resolution {
        Resolution::NotFound("identifier resolution is not supported for this job kind".to_string())
    }

    /// Main action sequence against `target` (the catalog code, query or cart)
    fn actions(&self, spec: &JobSpec, target: &str) -> Vec<Action>;

    fn interpret(&self, spec: &JobSpec, target: &str, captured: &[JsonValue]) -> Extraction;
}

/// URL layout of the storefront
#[derive(Debug, Clone)]
pub struct Site {
    base_url: String,
}

impl Site {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn product_url(&self, code: &str) -> String {
        format!("{}/product-detail/{}.html", self.base_url, code)
    }

    pub fn search_url(&self, query: &str, page: usize) -> String {
        let base = format!("{}/search", self.base_url);
        let page = page.to_string();
        let mut params = vec![("q", query)];
        if page != "1" {
            params.push(("page", page.as_str()));
        }
        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // base_url is not absolute; keep the raw form and let navigation fail
            Err(_) => format!("{base}?q={query}"),
        }
    }

    pub fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }
}

/// The object fields of a captured payload, if it is an object
pub(crate) fn as_object(value: Option<&JsonValue>) -> Option<&JsonMap> {
    value.and_then(JsonValue::as_object)
}

/// A string field that carries information (not empty and not `N/A`)
pub(crate) fn meaningful_str<'a>(fields: &'a JsonMap, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "N/A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_urls() {
        let site = Site::new("https://www.lcsc.com/");
        assert_eq!(
            site.product_url("C137394"),
            "https://www.lcsc.com/product-detail/C137394.html"
        );
        assert_eq!(site.cart_url(), "https://www.lcsc.com/cart");
        assert_eq!(
            site.search_url("10k 0603", 1),
            "https://www.lcsc.com/search?q=10k+0603"
        );
        assert_eq!(
            site.search_url("LM358", 2),
            "https://www.lcsc.com/search?q=LM358&page=2"
        );
    }

    #[test]
    fn test_evaluate_action_captures() {
        let action = Action::evaluate("() => 1").stop_on_failure();
        assert!(action.capture);
        assert!(action.stop_on_failure);
        assert_eq!(action.operation, ops::EVALUATE);
        assert!(!Action::navigate("https://x").capture);
        assert!(action.replayable);
        assert!(!Action::evaluate("() => 1").once().replayable);
    }
}
