pub mod connection;
pub mod headless;

pub use connection::connect_to_browser;
pub use headless::{launch_isolated_browser, LaunchOptions};
