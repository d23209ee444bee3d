use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::BridgeError;

/// Attach to an already running browser through its remote debugging port.
///
/// Used for cart operations, which need the user's logged-in session. Every
/// connection shares that browser's cookies and storage.
pub async fn connect_to_browser(port: u16) -> Result<(Browser, JoinHandle<()>), BridgeError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("Connecting to browser: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("Failed to connect to browser: {}", e);
        BridgeError::ConnectionFailed {
            port,
            message: e.to_string(),
        }
    })?;
    debug!("Browser connection established");

    // Drain browser events in the background
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Give the target list a moment to settle
    sleep(Duration::from_millis(300)).await;

    Ok((browser, handler_task))
}
