use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::BridgeError;

/// Fixed launch settings shared by every pool member
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub request_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
    /// Each slot gets its own profile directory below this one
    pub profile_root: PathBuf,
}

impl LaunchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            request_timeout: Duration::from_millis(config.navigation_timeout_ms),
            chrome_executable: config.chrome_executable.clone(),
            profile_root: std::env::temp_dir()
                .join(format!("lcsc-bulk-profiles-{}", std::process::id())),
        }
    }

    pub fn profile_dir(&self, slot: usize) -> PathBuf {
        self.profile_root.join(format!("slot-{slot}"))
    }
}

/// Launch one browser process with its own profile, so no cookies, cache or
/// storage leak between pool slots.
///
/// Returns the browser and the task draining its CDP event stream.
pub async fn launch_isolated_browser(
    options: &LaunchOptions,
    slot: usize,
) -> Result<(Browser, JoinHandle<()>), BridgeError> {
    info!("🚀 Launching browser for slot {}", slot);

    let launch_failed = |message: String| {
        error!("Failed to launch browser for slot {}: {}", slot, message);
        BridgeError::LaunchFailed { slot, message }
    };

    let profile_dir = options.profile_dir(slot);
    std::fs::create_dir_all(&profile_dir).map_err(|e| launch_failed(e.to_string()))?;
    debug!("Slot {} profile: {}", slot, profile_dir.display());

    let mut builder = BrowserConfig::builder()
        .user_data_dir(&profile_dir)
        .window_size(options.viewport_width, options.viewport_height)
        .viewport(Viewport {
            width: options.viewport_width,
            height: options.viewport_height,
            ..Viewport::default()
        })
        .request_timeout(options.request_timeout)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--no-first-run",
        ]);

    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(executable) = &options.chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(launch_failed)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| launch_failed(e.to_string()))?;

    // Drain browser events in the background
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    // Give the target list a moment to settle
    sleep(Duration::from_millis(300)).await;

    debug!("Browser for slot {} is up", slot);
    Ok((browser, handler_task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dirs_are_distinct_per_slot() {
        let options = LaunchOptions::from_config(&Config::default());
        assert_ne!(options.profile_dir(0), options.profile_dir(1));
        assert!(options.profile_dir(3).starts_with(&options.profile_root));
    }

    #[test]
    fn test_options_follow_config() {
        let config = Config {
            headless: false,
            viewport_width: 1280,
            navigation_timeout_ms: 5_000,
            ..Config::default()
        };
        let options = LaunchOptions::from_config(&config);
        assert!(!options.headless);
        assert_eq!(options.viewport_width, 1280);
        assert_eq!(options.request_timeout, Duration::from_secs(5));
    }
}
