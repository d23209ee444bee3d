//! Services layer
//!
//! Kind-specific capabilities: what to do on the page and how to read the result.
//! Nothing here holds a bridge or sleeps; the workflow layer runs the actions.

pub mod cart;
pub mod pricing;
pub mod resolver;
pub mod scripts;
pub mod search;
pub mod strategy;

use std::sync::Arc;

use crate::config::Config;
use crate::models::JobKind;

pub use cart::{CartAddStrategy, CartListStrategy};
pub use pricing::PricingStrategy;
pub use search::SearchStrategy;
pub use strategy::{Action, Extraction, JobStrategy, Resolution, Site};

/// Strategy for a job kind, configured from `config`
pub fn strategy_for(kind: JobKind, config: &Config) -> Arc<dyn JobStrategy> {
    let site = Site::new(config.base_url.clone());
    match kind {
        JobKind::PricingLookup => Arc::new(PricingStrategy::new(site)),
        JobKind::CatalogSearch => Arc::new(SearchStrategy::new(
            site,
            config.search_limit,
            config.search_max_pages,
        )),
        JobKind::CartAdd => Arc::new(CartAddStrategy::new(site, config.default_quantity)),
        JobKind::CartList => Arc::new(CartListStrategy::new(site)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_for_every_kind() {
        let config = Config::default();
        for kind in [
            JobKind::PricingLookup,
            JobKind::CatalogSearch,
            JobKind::CartAdd,
            JobKind::CartList,
        ] {
            assert_eq!(strategy_for(kind, &config).kind(), kind);
        }
    }
}
