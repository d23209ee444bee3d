pub mod bridge;
pub mod chrome;
pub mod payload;

pub use bridge::{ops, Bridge, BridgeFactory, BridgeResponse, ContentItem};
pub use chrome::{ChromeBridge, HeadlessChromeFactory, SessionChromeFactory};
pub use payload::extract_payload;
