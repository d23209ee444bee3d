use std::sync::Arc;

use serde_json::json;

use lcsc_bulk::browser::LaunchOptions;
use lcsc_bulk::infrastructure::{ops, BridgeFactory, HeadlessChromeFactory, SessionChromeFactory};
use lcsc_bulk::models::{cart_list_spec, parse_batch};
use lcsc_bulk::utils::logging;
use lcsc_bulk::{Config, JobKind, Orchestrator};

#[tokio::test]
#[ignore] // needs Chrome and network access: cargo test -- --ignored
async fn test_pricing_lookup_live() {
    logging::init(None).unwrap();
    let config = Config {
        max_concurrent: 2,
        ..Config::from_env().unwrap()
    };

    let batch = json!([
        {"lcsc_code": "C137394", "value": "0Ω"},
        {"mpn": "RC0603FR-0710KL", "value": "10k"}
    ]);
    let jobs = parse_batch(&batch.to_string(), JobKind::PricingLookup, &config).unwrap();

    let factory = Arc::new(HeadlessChromeFactory::new(LaunchOptions::from_config(&config)));
    let report = Orchestrator::new(config, factory).run(jobs, None).await.unwrap();

    assert_eq!(report.total(), 2);
    assert!(report.succeeded() >= 1, "{:#}", report.document());
}

#[tokio::test]
#[ignore]
async fn test_headless_bridge_evaluates_scripts() {
    logging::init(None).unwrap();
    let config = Config::from_env().unwrap();
    let factory = HeadlessChromeFactory::new(LaunchOptions::from_config(&config));

    let bridge = factory.provision(0).await.unwrap();
    bridge
        .call(ops::NAVIGATE, json!({"url": "about:blank"}))
        .await
        .unwrap();
    let response = bridge
        .call(ops::EVALUATE, json!({"function": "() => ({ answer: 6 * 7 })"}))
        .await
        .unwrap();

    assert_eq!(response.data.unwrap()["answer"], 42);
    bridge.close().await.unwrap();
}

#[tokio::test]
#[ignore] // needs Chrome started with --remote-debugging-port and a logged-in LCSC session
async fn test_list_cart_in_logged_in_session() {
    logging::init(None).unwrap();
    let config = Config {
        max_concurrent: 1,
        ..Config::from_env().unwrap()
    };

    let factory = Arc::new(SessionChromeFactory::new(config.browser_debug_port));
    let report = Orchestrator::new(config, factory)
        .run(vec![cart_list_spec()], None)
        .await
        .unwrap();

    assert_eq!(report.total(), 1);
}
