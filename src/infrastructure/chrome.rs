//! Chrome bridge - infrastructure layer
//!
//! Owns exactly one page (and, for launched instances, the browser process behind
//! it) and exposes it through the `Bridge` operation interface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use serde_json::{json, Value as JsonValue};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::browser::{connect_to_browser, launch_isolated_browser, LaunchOptions};
use crate::error::BridgeError;
use crate::infrastructure::bridge::{ops, Bridge, BridgeFactory, BridgeResponse};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Bridge over a single chromiumoxide page
pub struct ChromeBridge {
    label: String,
    page: Page,
    /// Present only when this bridge launched the browser itself
    browser: Mutex<Option<Browser>>,
    handler_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    profile_dir: Option<PathBuf>,
    /// Connection handle for attached tabs; never closed by us
    _connection: Option<Browser>,
}

impl ChromeBridge {
    /// Bridge that owns its browser process and closes it on `close()`
    pub fn owned(
        label: impl Into<String>,
        browser: Browser,
        page: Page,
        handler_task: JoinHandle<()>,
        profile_dir: PathBuf,
    ) -> Self {
        Self {
            label: label.into(),
            page,
            browser: Mutex::new(Some(browser)),
            handler_task: std::sync::Mutex::new(Some(handler_task)),
            profile_dir: Some(profile_dir),
            _connection: None,
        }
    }

    /// Bridge over a tab in someone else's browser; `close()` only closes the tab
    pub fn attached(
        label: impl Into<String>,
        connection: Browser,
        page: Page,
        handler_task: JoinHandle<()>,
    ) -> Self {
        Self {
            label: label.into(),
            page,
            browser: Mutex::new(None),
            handler_task: std::sync::Mutex::new(Some(handler_task)),
            profile_dir: None,
            _connection: Some(connection),
        }
    }

    async fn navigate(&self, args: &JsonValue) -> Result<BridgeResponse, BridgeError> {
        let url = str_arg(ops::NAVIGATE, args, "url")?;
        debug!("[{}] navigate {}", self.label, url);
        self.page
            .goto(url)
            .await
            .map_err(|e| BridgeError::operation_failed(ops::NAVIGATE, e))?;
        Ok(BridgeResponse::data(json!({ "success": true, "url": url })))
    }

    /// Waits for `time` seconds, or until `text` appears in the page body, or until
    /// `selector` matches. Text and selector waits poll until the caller's timeout.
    async fn wait_for(&self, args: &JsonValue) -> Result<BridgeResponse, BridgeError> {
        if let Some(seconds) = args.get("time").and_then(JsonValue::as_f64) {
            sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
            return Ok(BridgeResponse::data(json!({ "success": true })));
        }

        let probe = if let Some(text) = args.get("text").and_then(JsonValue::as_str) {
            format!(
                "document.body ? document.body.innerText.includes({}) : false",
                encode(text)
            )
        } else if let Some(selector) = args.get("selector").and_then(JsonValue::as_str) {
            format!("document.querySelector({}) !== null", encode(selector))
        } else {
            return Err(BridgeError::invalid_arguments(
                ops::WAIT_FOR,
                "expected one of 'time', 'text' or 'selector'",
            ));
        };

        loop {
            let found = self
                .page
                .evaluate(probe.as_str())
                .await
                .map_err(|e| BridgeError::operation_failed(ops::WAIT_FOR, e))?
                .value()
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            if found {
                return Ok(BridgeResponse::data(json!({ "success": true })));
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, args: &JsonValue) -> Result<BridgeResponse, BridgeError> {
        let function = str_arg(ops::EVALUATE, args, "function")?;
        let result = self
            .page
            .evaluate(format!("({})()", function))
            .await
            .map_err(|e| BridgeError::operation_failed(ops::EVALUATE, e))?;
        let value = result.value().cloned().unwrap_or(JsonValue::Null);
        Ok(BridgeResponse::data(value))
    }

    async fn snapshot(&self) -> Result<BridgeResponse, BridgeError> {
        let failed = |e: chromiumoxide::error::CdpError| BridgeError::operation_failed(ops::SNAPSHOT, e);
        let url = self.page.url().await.map_err(failed)?;
        let title = self.page.get_title().await.map_err(failed)?;
        let html = self.page.content().await.map_err(failed)?;
        Ok(BridgeResponse::data(json!({
            "url": url,
            "title": title,
            "html": html,
        })))
    }
}

#[async_trait]
impl Bridge for ChromeBridge {
    async fn call(&self, operation: &str, args: JsonValue) -> Result<BridgeResponse, BridgeError> {
        match operation {
            ops::NAVIGATE => self.navigate(&args).await,
            ops::WAIT_FOR => self.wait_for(&args).await,
            ops::EVALUATE => self.evaluate(&args).await,
            ops::SNAPSHOT => self.snapshot().await,
            other => Err(BridgeError::UnsupportedOperation {
                operation: other.to_string(),
            }),
        }
    }

    async fn close(&self) -> Result<(), BridgeError> {
        let mut browser = self.browser.lock().await;
        let result = match browser.take() {
            Some(mut browser) => {
                debug!("[{}] closing browser", self.label);
                let closed = browser
                    .close()
                    .await
                    .map(|_| ())
                    .map_err(|e| BridgeError::operation_failed("close", e));
                if let Err(e) = browser.wait().await {
                    warn!("[{}] browser process did not exit cleanly: {}", self.label, e);
                }
                closed
            }
            None => self
                .page
                .clone()
                .close()
                .await
                .map_err(|e| BridgeError::operation_failed("close", e)),
        };

        if let Ok(mut task) = self.handler_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        if let Some(dir) = &self.profile_dir {
            let _ = std::fs::remove_dir_all(dir);
        }
        result
    }
}

/// Launches one isolated headless browser per pool slot
pub struct HeadlessChromeFactory {
    options: LaunchOptions,
}

impl HeadlessChromeFactory {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BridgeFactory for HeadlessChromeFactory {
    fn name(&self) -> &str {
        "headless-chrome"
    }

    fn isolated(&self) -> bool {
        true
    }

    async fn provision(&self, slot: usize) -> Result<Arc<dyn Bridge>, BridgeError> {
        let (mut browser, handler_task) = launch_isolated_browser(&self.options, slot).await?;
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(BridgeError::PageCreationFailed {
                    message: e.to_string(),
                });
            }
        };
        Ok(Arc::new(ChromeBridge::owned(
            format!("slot {slot}"),
            browser,
            page,
            handler_task,
            self.options.profile_dir(slot),
        )))
    }
}

/// Opens a tab per pool slot in the user's logged-in browser
pub struct SessionChromeFactory {
    port: u16,
}

impl SessionChromeFactory {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl BridgeFactory for SessionChromeFactory {
    fn name(&self) -> &str {
        "session-chrome"
    }

    fn isolated(&self) -> bool {
        false
    }

    async fn provision(&self, slot: usize) -> Result<Arc<dyn Bridge>, BridgeError> {
        let (browser, handler_task) = connect_to_browser(self.port).await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BridgeError::PageCreationFailed {
                message: e.to_string(),
            })?;
        Ok(Arc::new(ChromeBridge::attached(
            format!("session tab {slot}"),
            browser,
            page,
            handler_task,
        )))
    }
}

fn str_arg<'a>(operation: &str, args: &'a JsonValue, key: &str) -> Result<&'a str, BridgeError> {
    args.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| BridgeError::invalid_arguments(operation, format!("missing string '{key}'")))
}

fn encode(text: &str) -> String {
    JsonValue::from(text).to_string()
}
