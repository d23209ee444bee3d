//! Cart operations against the logged-in session

use std::time::Duration;

use serde_json::{json, Value as JsonValue};

use super::resolver;
use super::scripts;
use super::strategy::{as_object, Action, Extraction, JobStrategy, Resolution, Site};
use crate::models::{JobKind, JobSpec, JsonMap};

const ADD_BUTTON_TEXT: &str = "Add To Cart";
const CART_RENDER_SECS: f64 = 2.0;

/// Set the quantity on a product page and press "Add To Cart"
pub struct CartAddStrategy {
    site: Site,
    default_quantity: u32,
}

impl CartAddStrategy {
    pub fn new(site: Site, default_quantity: u32) -> Self {
        Self {
            site,
            default_quantity,
        }
    }

    fn quantity(&self, spec: &JobSpec) -> u32 {
        spec.params.quantity.unwrap_or(self.default_quantity)
    }
}

impl JobStrategy for CartAddStrategy {
    fn kind(&self) -> JobKind {
        JobKind::CartAdd
    }

    fn resolution_actions(&self, spec: &JobSpec) -> Vec<Action> {
        resolver::resolution_actions(&self.site, spec.identifier.as_str())
    }

    fn interpret_resolution(&self, _spec: &JobSpec, captured: &[JsonValue]) -> Resolution {
        resolver::interpret_resolution(captured)
    }

    fn actions(&self, spec: &JobSpec, target: &str) -> Vec<Action> {
        vec![
            Action::navigate(self.site.product_url(target)).settle(Duration::from_secs(1)),
            Action::wait_for_text(ADD_BUTTON_TEXT),
            Action::evaluate(scripts::set_quantity(self.quantity(spec)))
                .stop_on_failure()
                .settle(Duration::from_millis(500)),
            Action::evaluate(scripts::CLICK_ADD_TO_CART)
                .once()
                .settle(Duration::from_millis(500)),
        ]
    }

    fn interpret(&self, spec: &JobSpec, target: &str, captured: &[JsonValue]) -> Extraction {
        let failure = captured.iter().find_map(|step| {
            let fields = step.as_object()?;
            match fields.get("success").and_then(JsonValue::as_bool) {
                Some(true) => None,
                _ => Some(
                    fields
                        .get("error")
                        .and_then(JsonValue::as_str)
                        .unwrap_or("page did not respond")
                        .to_string(),
                ),
            }
        });
        if let Some(message) = failure {
            return Extraction::Empty(message);
        }
        // set quantity + click
        if captured.len() < 2 {
            return Extraction::Empty("add to cart did not complete".to_string());
        }

        let mut payload = JsonMap::new();
        payload.insert("lcsc_code".to_string(), json!(target));
        payload.insert("quantity".to_string(), json!(self.quantity(spec)));
        payload.insert("added".to_string(), json!(true));
        Extraction::Data(payload)
    }
}

/// Read the current cart contents
pub struct CartListStrategy {
    site: Site,
}

impl CartListStrategy {
    pub fn new(site: Site) -> Self {
        Self { site }
    }
}

impl JobStrategy for CartListStrategy {
    fn kind(&self) -> JobKind {
        JobKind::CartList
    }

    fn needs_resolution(&self, _spec: &JobSpec) -> bool {
        false
    }

    fn actions(&self, _spec: &JobSpec, _target: &str) -> Vec<Action> {
        vec![
            Action::navigate(self.site.cart_url()),
            Action::wait_seconds(CART_RENDER_SECS),
            Action::evaluate(scripts::CART_CONTENTS),
        ]
    }

    fn interpret(&self, _spec: &JobSpec, _target: &str, captured: &[JsonValue]) -> Extraction {
        let Some(cart) = as_object(captured.last()) else {
            return Extraction::Empty("cart page returned no data".to_string());
        };
        if !cart.get("rendered").and_then(JsonValue::as_bool).unwrap_or(false) {
            return Extraction::Empty("cart page did not render".to_string());
        }

        let items = cart.get("items").cloned().unwrap_or_else(|| json!([]));
        let total_items = items.as_array().map_or(0, Vec::len);

        let mut payload = JsonMap::new();
        payload.insert("items".to_string(), items);
        payload.insert(
            "cartTotal".to_string(),
            cart.get("cartTotal").cloned().unwrap_or_else(|| json!("N/A")),
        );
        payload.insert("totalItems".to_string(), json!(total_items));
        Extraction::Data(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identifier, JobParams};

    fn site() -> Site {
        Site::new("https://www.lcsc.com")
    }

    fn add_spec(quantity: Option<u32>) -> JobSpec {
        JobSpec::new(0, JobKind::CartAdd, Identifier::CatalogCode("C137394".to_string()))
            .with_params(JobParams {
                quantity,
                ..JobParams::default()
            })
    }

    #[test]
    fn test_cart_add_actions_use_quantity() {
        let strategy = CartAddStrategy::new(site(), 100);
        let actions = strategy.actions(&add_spec(Some(25)), "C137394");
        assert_eq!(actions.len(), 4);
        assert_eq!(actions[0].settle, Some(Duration::from_secs(1)));
        assert!(actions[2].args["function"].as_str().unwrap().contains("'25'"));
        assert!(actions[2].stop_on_failure);
        assert!(actions[2].replayable);
        // a second click adds the item twice
        assert!(!actions[3].replayable);

        let defaulted = strategy.actions(&add_spec(None), "C137394");
        assert!(defaulted[2].args["function"].as_str().unwrap().contains("'100'"));
    }

    #[test]
    fn test_cart_add_success() {
        let strategy = CartAddStrategy::new(site(), 100);
        let captured = vec![
            json!({"success": true, "value": "25"}),
            json!({"success": true, "clicked": true}),
        ];
        let Extraction::Data(payload) = strategy.interpret(&add_spec(Some(25)), "C137394", &captured) else {
            panic!("expected data");
        };
        assert_eq!(payload["quantity"], 25);
        assert_eq!(payload["added"], true);
    }

    #[test]
    fn test_cart_add_missing_input_is_transient() {
        let strategy = CartAddStrategy::new(site(), 100);
        let captured = vec![json!({"success": false, "error": "Quantity input not found"})];
        assert_eq!(
            strategy.interpret(&add_spec(None), "C137394", &captured),
            Extraction::Empty("Quantity input not found".to_string())
        );
    }

    #[test]
    fn test_cart_list_payload() {
        let strategy = CartListStrategy::new(site());
        let spec = JobSpec::new(0, JobKind::CartList, Identifier::Cart);
        let captured = vec![json!({
            "rendered": true,
            "items": [{"lcscCode": "C137394", "quantity": "100"}],
            "cartTotal": "$0.21",
            "totalItems": 1
        })];
        let Extraction::Data(payload) = strategy.interpret(&spec, "cart", &captured) else {
            panic!("expected data");
        };
        assert_eq!(payload["totalItems"], 1);
        assert_eq!(payload["cartTotal"], "$0.21");
    }

    #[test]
    fn test_cart_list_unrendered() {
        let strategy = CartListStrategy::new(site());
        let spec = JobSpec::new(0, JobKind::CartList, Identifier::Cart);
        let captured = vec![json!({"rendered": false, "items": []})];
        assert!(matches!(
            strategy.interpret(&spec, "cart", &captured),
            Extraction::Empty(_)
        ));
    }
}
