use serde_json::Value as JsonValue;

const TABLE_WIDTH: usize = 120;

/// Render a cart snapshot (`items`, `cartTotal`, `totalItems`) as a fixed-width table
pub fn cart_table(cart: &JsonValue) -> String {
    let total_items = cart.get("totalItems").and_then(JsonValue::as_u64).unwrap_or(0);
    let cart_total = text(cart, "cartTotal");

    let mut out = String::new();
    out.push_str(&"=".repeat(TABLE_WIDTH));
    out.push('\n');
    out.push_str(&format!("LCSC Cart Summary - {total_items} items\n"));
    out.push_str(&"=".repeat(TABLE_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "{:<12} {:<20} {:<15} {:<8} {:<12} {:<12} Description\n",
        "LCSC Code", "MPN", "Manufacturer", "Qty", "Unit Price", "Ext Price"
    ));
    out.push_str(&"-".repeat(TABLE_WIDTH));
    out.push('\n');

    let items = cart
        .get("items")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for item in items {
        out.push_str(&format!(
            "{:<12} {:<20} {:<15} {:<8} {:<12} {:<12} {}\n",
            text(item, "lcscCode"),
            text(item, "mpn"),
            text(item, "manufacturer"),
            text(item, "quantity"),
            text(item, "unitPrice"),
            text(item, "extPrice"),
            truncate_text(&text(item, "description"), 30),
        ));
    }

    out.push_str(&"-".repeat(TABLE_WIDTH));
    out.push('\n');
    out.push_str(&format!("{:>85}Cart Total: {}\n", "", cart_total));
    out.push_str(&"=".repeat(TABLE_WIDTH));
    out.push('\n');
    out
}

fn text(value: &JsonValue, key: &str) -> String {
    match value.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Shorten long text for table and log display
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cart_table_lists_items_and_total() {
        let cart = json!({
            "items": [{
                "lcscCode": "C137394",
                "mpn": "RC1206FR-070RL",
                "manufacturer": "YAGEO",
                "description": "1206 Chip Resistor - Surface Mount 0Ω ±1% 250mW",
                "quantity": "100",
                "unitPrice": "$0.0021",
                "extPrice": "$0.21"
            }],
            "cartTotal": "$0.21",
            "totalItems": 1
        });

        let table = cart_table(&cart);
        assert!(table.contains("LCSC Cart Summary - 1 items"));
        assert!(table.contains("C137394"));
        assert!(table.contains("1206 Chip Resistor - Surfac..."));
        assert!(table.contains("Cart Total: $0.21"));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 30), "short");
        assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
    }
}
