//! Catalog keyword search across one or more result pages

use std::collections::HashSet;

use serde_json::{json, Value as JsonValue};

use super::scripts;
use super::strategy::{Action, Extraction, JobStrategy, Site};
use crate::models::{JobKind, JobSpec, JsonMap};

pub const NO_MATCHES: &str = "No matching products found";

/// Seconds given to the result list to render
const RESULTS_RENDER_SECS: f64 = 3.0;

pub struct SearchStrategy {
    site: Site,
    default_limit: usize,
    default_max_pages: usize,
}

impl SearchStrategy {
    pub fn new(site: Site, default_limit: usize, default_max_pages: usize) -> Self {
        Self {
            site,
            default_limit,
            default_max_pages,
        }
    }

    fn limit(&self, spec: &JobSpec) -> usize {
        spec.params.limit.unwrap_or(self.default_limit).max(1)
    }

    fn max_pages(&self, spec: &JobSpec) -> usize {
        spec.params.max_pages.unwrap_or(self.default_max_pages).max(1)
    }
}

impl JobStrategy for SearchStrategy {
    fn kind(&self) -> JobKind {
        JobKind::CatalogSearch
    }

    /// The query is used verbatim, even when it looks like a part number
    fn needs_resolution(&self, _spec: &JobSpec) -> bool {
        false
    }

    fn actions(&self, spec: &JobSpec, target: &str) -> Vec<Action> {
        (1..=self.max_pages(spec))
            .flat_map(|page| {
                [
                    Action::navigate(self.site.search_url(target, page)),
                    Action::wait_seconds(RESULTS_RENDER_SECS),
                    Action::evaluate(scripts::SEARCH_RESULTS).stop_on_failure(),
                ]
            })
            .collect()
    }

    fn interpret(&self, spec: &JobSpec, target: &str, captured: &[JsonValue]) -> Extraction {
        let limit = self.limit(spec);
        let mut seen = HashSet::new();
        let mut products = Vec::new();
        let mut no_results = false;

        for page in captured {
            no_results |= page.get("noResults").and_then(JsonValue::as_bool).unwrap_or(false);
            let Some(found) = page.get("products").and_then(JsonValue::as_array) else {
                continue;
            };
            for product in found {
                let code = product.get("lcsc_code").and_then(JsonValue::as_str);
                if code.is_some_and(|c| !seen.insert(c.to_string())) {
                    continue;
                }
                if products.len() < limit {
                    products.push(product.clone());
                }
            }
        }

        if products.is_empty() {
            return if no_results {
                Extraction::NotFound(NO_MATCHES.to_string())
            } else {
                Extraction::Empty("search page did not render any results".to_string())
            };
        }

        let mut payload = JsonMap::new();
        payload.insert("query".to_string(), json!(target));
        payload.insert("count".to_string(), json!(products.len()));
        payload.insert("pages_searched".to_string(), json!(captured.len()));
        payload.insert("products".to_string(), JsonValue::Array(products));
        Extraction::Data(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identifier, JobParams};

    fn strategy() -> SearchStrategy {
        SearchStrategy::new(Site::new("https://www.lcsc.com"), 20, 1)
    }

    fn spec(limit: Option<usize>, max_pages: Option<usize>) -> JobSpec {
        JobSpec::new(0, JobKind::CatalogSearch, Identifier::Keywords("10k 0603".to_string()))
            .with_params(JobParams {
                limit,
                max_pages,
                ..JobParams::default()
            })
    }

    fn product(code: &str) -> JsonValue {
        json!({"lcsc_code": code, "mpn": format!("MPN-{code}"), "manufacturer": "YAGEO"})
    }

    #[test]
    fn test_one_page_triple_per_page() {
        let actions = strategy().actions(&spec(None, Some(3)), "10k 0603");
        assert_eq!(actions.len(), 9);
        assert_eq!(actions[6].args["url"], "https://www.lcsc.com/search?q=10k+0603&page=3");
        assert!(actions[8].stop_on_failure);
    }

    #[test]
    fn test_pages_merge_dedupe_and_limit() {
        let captured = vec![
            json!({"success": true, "products": [product("C1"), product("C2")], "noResults": false}),
            json!({"success": true, "products": [product("C2"), product("C3"), product("C4")], "noResults": false}),
        ];
        let Extraction::Data(payload) = strategy().interpret(&spec(Some(3), Some(2)), "10k", &captured) else {
            panic!("expected data");
        };
        let codes: Vec<&str> = payload["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["lcsc_code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["C1", "C2", "C3"]);
        assert_eq!(payload["count"], 3);
        assert_eq!(payload["pages_searched"], 2);
    }

    #[test]
    fn test_explicit_no_results_is_definitive() {
        let captured = vec![json!({"success": false, "products": [], "noResults": true})];
        assert_eq!(
            strategy().interpret(&spec(None, None), "zzz", &captured),
            Extraction::NotFound(NO_MATCHES.to_string())
        );
    }

    #[test]
    fn test_blank_page_is_empty() {
        let captured = vec![json!({"success": false, "products": [], "noResults": false})];
        assert!(matches!(
            strategy().interpret(&spec(None, None), "10k", &captured),
            Extraction::Empty(_)
        ));
    }
}
