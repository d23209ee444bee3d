//! Manufacturer part number → catalog code

use serde_json::{json, Value as JsonValue};

use super::scripts;
use super::strategy::{as_object, meaningful_str, Action, Resolution, Site};
use crate::models::{catalog_code_from_url, JsonMap};

pub const NOT_IN_CATALOG: &str = "MPN not found in LCSC catalog";
pub const NO_CODE_IN_RESULTS: &str = "Could not extract LCSC code from search results";

/// Search for the part number and read the first hit
pub fn resolution_actions(site: &Site, mpn: &str) -> Vec<Action> {
    vec![
        Action::navigate(site.search_url(mpn, 1)),
        Action::wait_seconds(5.0),
        Action::evaluate(scripts::FIRST_SEARCH_HIT),
    ]
}

pub fn interpret_resolution(captured: &[JsonValue]) -> Resolution {
    let Some(hit) = as_object(captured.last()) else {
        return Resolution::Unrendered("search page returned no readable result".to_string());
    };

    if !hit.get("found").and_then(JsonValue::as_bool).unwrap_or(false) {
        return Resolution::NotFound(NOT_IN_CATALOG.to_string());
    }

    let first = hit
        .get("results")
        .and_then(JsonValue::as_array)
        .and_then(|results| results.first())
        .and_then(JsonValue::as_object);
    let Some(first) = first else {
        return Resolution::NotFound(NOT_IN_CATALOG.to_string());
    };

    let code = first
        .get("productUrl")
        .and_then(JsonValue::as_str)
        .and_then(catalog_code_from_url);
    let Some(code) = code else {
        return Resolution::NotFound(NO_CODE_IN_RESULTS.to_string());
    };

    let mut details = JsonMap::new();
    if let Some(mpn) = meaningful_str(first, "mpn") {
        details.insert("resolved_mpn".to_string(), json!(mpn));
    }
    if let Some(manufacturer) = meaningful_str(first, "manufacturer") {
        details.insert("resolved_manufacturer".to_string(), json!(manufacturer));
    }
    Resolution::Resolved { code, details }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_hit_resolves_to_catalog_code() {
        let captured = vec![json!({
            "found": true,
            "results": [{
                "mpn": "RC0603FR-0710KL",
                "manufacturer": "YAGEO",
                "productUrl": "https://www.lcsc.com/product-detail/Chip-Resistor_YAGEO-RC0603FR-0710KL_C98220.html"
            }]
        })];

        match interpret_resolution(&captured) {
            Resolution::Resolved { code, details } => {
                assert_eq!(code, "C98220");
                assert_eq!(details["resolved_manufacturer"], "YAGEO");
                assert_eq!(details["resolved_mpn"], "RC0603FR-0710KL");
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn test_no_hits_is_definitive() {
        let captured = vec![json!({"found": false, "message": "No product links found"})];
        assert_eq!(
            interpret_resolution(&captured),
            Resolution::NotFound(NOT_IN_CATALOG.to_string())
        );
    }

    #[test]
    fn test_hit_without_code_is_definitive() {
        let captured = vec![json!({
            "found": true,
            "results": [{"mpn": "X", "productUrl": "https://www.lcsc.com/product-detail/weird"}]
        })];
        assert_eq!(
            interpret_resolution(&captured),
            Resolution::NotFound(NO_CODE_IN_RESULTS.to_string())
        );
    }

    #[test]
    fn test_unreadable_page_is_transient() {
        assert!(matches!(interpret_resolution(&[]), Resolution::Unrendered(_)));
        assert!(matches!(
            interpret_resolution(&[JsonValue::Null]),
            Resolution::Unrendered(_)
        ));
    }

    #[test]
    fn test_resolution_actions_search_then_read() {
        let site = Site::new("https://www.lcsc.com");
        let actions = resolution_actions(&site, "LM358");
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].args["url"], "https://www.lcsc.com/search?q=LM358");
        assert!(actions[2].capture);
    }
}
