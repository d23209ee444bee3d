//! Pricing lookup
//!
//! Reads manufacturer, description, stock and price breaks from a product page.
//! Part numbers go through the search resolver first.

use serde_json::{json, Value as JsonValue};

use super::resolver;
use super::scripts;
use super::strategy::{as_object, meaningful_str, Action, Extraction, JobStrategy, Resolution, Site};
use crate::models::{JobKind, JobSpec, JsonMap};

/// Text that only appears once the product attributes have rendered
const READY_MARKER: &str = "Standard Packaging";

pub struct PricingStrategy {
    site: Site,
}

impl PricingStrategy {
    pub fn new(site: Site) -> Self {
        Self { site }
    }
}

impl JobStrategy for PricingStrategy {
    fn kind(&self) -> JobKind {
        JobKind::PricingLookup
    }

    fn resolution_actions(&self, spec: &JobSpec) -> Vec<Action> {
        resolver::resolution_actions(&self.site, spec.identifier.as_str())
    }

    fn interpret_resolution(&self, _spec: &JobSpec, captured: &[JsonValue]) -> Resolution {
        resolver::interpret_resolution(captured)
    }

    fn actions(&self, _spec: &JobSpec, target: &str) -> Vec<Action> {
        vec![
            Action::navigate(self.site.product_url(target)),
            Action::wait_for_text(READY_MARKER),
            Action::evaluate(scripts::PRODUCT_DETAILS),
        ]
    }

    fn interpret(&self, _spec: &JobSpec, target: &str, captured: &[JsonValue]) -> Extraction {
        let Some(details) = as_object(captured.last()) else {
            return Extraction::Empty("product page returned no data".to_string());
        };

        let pricing: Vec<JsonValue> = details
            .get("pricing")
            .and_then(JsonValue::as_array)
            .map(|rows| rows.iter().take(6).cloned().collect())
            .unwrap_or_default();
        let manufacturer = meaningful_str(details, "manufacturer");
        let description = meaningful_str(details, "description");

        if manufacturer.is_none() && description.is_none() && pricing.is_empty() {
            return Extraction::Empty("page did not render product details".to_string());
        }

        let field = |value: Option<&str>| json!(value.unwrap_or("N/A"));
        let mut payload = JsonMap::new();
        payload.insert("lcsc_code".to_string(), json!(target));
        payload.insert("manufacturer".to_string(), field(manufacturer));
        payload.insert("description".to_string(), field(description));
        payload.insert("stock".to_string(), field(meaningful_str(details, "stock")));
        payload.insert("pricing".to_string(), JsonValue::Array(pricing));
        Extraction::Data(payload)
    }
}
