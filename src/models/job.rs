use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub type JsonMap = Map<String, JsonValue>;

/// What a job does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    PricingLookup,
    CatalogSearch,
    CartAdd,
    CartList,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::PricingLookup => "pricing lookup",
            JobKind::CatalogSearch => "catalog search",
            JobKind::CartAdd => "cart add",
            JobKind::CartList => "cart list",
        };
        f.write_str(name)
    }
}

/// The lookup key of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Catalog code such as `C137394`
    CatalogCode(String),
    /// Manufacturer part number, resolved to a catalog code before use
    PartNumber(String),
    /// Free-text search query
    Keywords(String),
    /// The session's cart; no key needed
    Cart,
}

impl Identifier {
    /// Classify a bare item string: catalog codes stay codes, anything else is an MPN
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        if is_catalog_code(raw) {
            Identifier::CatalogCode(raw.to_ascii_uppercase())
        } else {
            Identifier::PartNumber(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::CatalogCode(s) | Identifier::PartNumber(s) | Identifier::Keywords(s) => s,
            Identifier::Cart => "cart",
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::CatalogCode(code) => write!(f, "{code}"),
            Identifier::PartNumber(mpn) => write!(f, "MPN {mpn}"),
            Identifier::Keywords(q) => write!(f, "\"{q}\""),
            Identifier::Cart => f.write_str("cart"),
        }
    }
}

/// Kind-specific parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParams {
    /// Quantity to put in the cart
    pub quantity: Option<u32>,
    /// Maximum number of search results kept
    pub limit: Option<usize>,
    /// Maximum number of search result pages visited
    pub max_pages: Option<usize>,
}

/// One unit of work; immutable once built
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Position in the input batch, unique within it
    pub index: usize,
    pub kind: JobKind,
    pub identifier: Identifier,
    pub params: JobParams,
    /// Input fields copied unchanged into the output record
    pub echo: JsonMap,
}

impl JobSpec {
    pub fn new(index: usize, kind: JobKind, identifier: Identifier) -> Self {
        Self {
            index,
            kind,
            identifier,
            params: JobParams::default(),
            echo: JsonMap::new(),
        }
    }

    pub fn with_params(mut self, params: JobParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_echo(mut self, echo: JsonMap) -> Self {
        self.echo = echo;
        self
    }

    /// Human label for logs, e.g. `C137394 (0Ω)`
    pub fn label(&self) -> String {
        match self.echo.get("value").and_then(JsonValue::as_str) {
            Some(value) if !value.is_empty() => format!("{} ({})", self.identifier, value),
            _ => self.identifier.to_string(),
        }
    }
}

/// Job outcome classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Meaningful data extracted
    Success,
    /// Recognized negative outcome, e.g. not found
    Failed,
    /// Transport fault or exhausted retries
    Error,
}

/// Result of executing one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    index: usize,
    status: JobStatus,
    payload: Option<JsonMap>,
    error_message: Option<String>,
    attempts: u32,
    echo: JsonMap,
}

impl JobResult {
    pub fn success(spec: &JobSpec, payload: JsonMap, attempts: u32) -> Self {
        Self {
            index: spec.index,
            status: JobStatus::Success,
            payload: Some(payload),
            error_message: None,
            attempts,
            echo: spec.echo.clone(),
        }
    }

    pub fn failed(spec: &JobSpec, message: impl Into<String>, attempts: u32) -> Self {
        Self::unsuccessful(spec, JobStatus::Failed, message.into(), attempts)
    }

    pub fn error(spec: &JobSpec, message: impl Into<String>, attempts: u32) -> Self {
        Self::unsuccessful(spec, JobStatus::Error, message.into(), attempts)
    }

    fn unsuccessful(spec: &JobSpec, status: JobStatus, message: String, attempts: u32) -> Self {
        Self {
            index: spec.index,
            status,
            payload: None,
            error_message: Some(message),
            attempts,
            echo: spec.echo.clone(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    pub fn payload(&self) -> Option<&JsonMap> {
        self.payload.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// External form: echoed input fields, payload fields, `success`, `status`,
    /// `attempts` and `error`. The index is not part of it.
    pub fn to_record(&self) -> JsonValue {
        let mut record = self.echo.clone();
        if let Some(payload) = &self.payload {
            for (key, value) in payload {
                record.insert(key.clone(), value.clone());
            }
        }
        record.insert("success".to_string(), JsonValue::Bool(self.is_success()));
        record.insert(
            "status".to_string(),
            serde_json::to_value(self.status).unwrap_or(JsonValue::Null),
        );
        record.insert("attempts".to_string(), JsonValue::from(self.attempts));
        if let Some(message) = &self.error_message {
            record.insert("error".to_string(), JsonValue::String(message.clone()));
        }
        JsonValue::Object(record)
    }
}

fn catalog_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[Cc]\d+$").expect("valid catalog code pattern"))
}

fn product_url_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(C\d+)\.html").expect("valid product url pattern"))
}

/// `C` followed by digits
pub fn is_catalog_code(raw: &str) -> bool {
    catalog_code_re().is_match(raw.trim())
}

/// Catalog code embedded in a product-detail URL
/// (`.../product-detail/Chip-Resistor_YAGEO-RC0603_C137394.html`)
pub fn catalog_code_from_url(url: &str) -> Option<String> {
    product_url_code_re()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_with_value() -> JobSpec {
        let echo = json!({"lcsc_code": "C137394", "value": "0Ω"});
        JobSpec::new(
            4,
            JobKind::PricingLookup,
            Identifier::CatalogCode("C137394".to_string()),
        )
        .with_echo(echo.as_object().unwrap().clone())
    }

    #[test]
    fn test_classify_identifier() {
        assert_eq!(
            Identifier::classify(" c137394 "),
            Identifier::CatalogCode("C137394".to_string())
        );
        assert_eq!(
            Identifier::classify("RC1206FR-070RL"),
            Identifier::PartNumber("RC1206FR-070RL".to_string())
        );
    }

    #[test]
    fn test_catalog_code_from_url_skips_mpn_fragments() {
        let url = "https://www.lcsc.com/product-detail/Chip-Resistor_YAGEO-RC0603_C137394.html";
        assert_eq!(catalog_code_from_url(url), Some("C137394".to_string()));
        assert_eq!(catalog_code_from_url("https://www.lcsc.com/search?q=x"), None);
    }

    #[test]
    fn test_success_record_merges_payload_and_drops_index() {
        let spec = spec_with_value();
        let payload = json!({"manufacturer": "YAGEO", "pricing": []});
        let result = JobResult::success(&spec, payload.as_object().unwrap().clone(), 1);

        let record = result.to_record();
        assert_eq!(record["lcsc_code"], "C137394");
        assert_eq!(record["value"], "0Ω");
        assert_eq!(record["manufacturer"], "YAGEO");
        assert_eq!(record["success"], true);
        assert_eq!(record["status"], "success");
        assert_eq!(record["attempts"], 1);
        assert!(record.get("index").is_none());
        assert!(record.get("error").is_none());
    }

    #[test]
    fn test_failed_record_carries_error() {
        let result = JobResult::failed(&spec_with_value(), "MPN not found in LCSC catalog", 1);
        let record = result.to_record();
        assert_eq!(record["success"], false);
        assert_eq!(record["status"], "failed");
        assert_eq!(record["error"], "MPN not found in LCSC catalog");
        assert_eq!(result.index(), 4);
    }

    #[test]
    fn test_label_includes_value() {
        assert_eq!(spec_with_value().label(), "C137394 (0Ω)");
        let bare = JobSpec::new(0, JobKind::CartList, Identifier::Cart);
        assert_eq!(bare.label(), "cart");
    }
}
