//! [`RenderSession`] over a Chromium page driven through the DevTools protocol.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{RenderError, RenderResult};
use crate::traits::render::RenderSession;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const VIEWPORT: (u32, u32) = (1366, 900);

impl From<CdpError> for RenderError {
    fn from(e: CdpError) -> Self {
        RenderError::Protocol(e.to_string())
    }
}

/// One browser with a single page.
///
/// Call [`ChromiumSession::close`] when done; dropping the session leaves
/// the browser process to be reaped by chromiumoxide's kill-on-drop.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Start a browser and open a blank page.
    pub async fn launch(headless: bool) -> RenderResult<Self> {
        let mut builder = BrowserConfig::builder().window_size(VIEWPORT.0, VIEWPORT.1);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The handler must be polled for any command to complete.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!(headless, "Browser launched");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Close the browser and stop the handler task.
    pub async fn close(self) -> RenderResult<()> {
        let mut browser = self.browser.into_inner();
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "Failed to wait for browser exit");
        }
        self.handler.abort();
        debug!("Browser closed");
        Ok(())
    }

    async fn eval_bool(&self, script: String) -> RenderResult<bool> {
        let result = self.page.evaluate(script).await?;
        result
            .into_value::<bool>()
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }
}

/// JS string literal for `selector`.
fn js_string(selector: &str) -> String {
    serde_json::Value::String(selector.to_string()).to_string()
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn goto(&self, url: &str) -> RenderResult<()> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };

        match tokio::time::timeout(NAVIGATION_TIMEOUT, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {:?}", NAVIGATION_TIMEOUT),
            }),
        }
    }

    async fn current_url(&self) -> RenderResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> RenderResult<String> {
        Ok(self.page.content().await?)
    }

    async fn exists(&self, selector: &str) -> RenderResult<bool> {
        self.eval_bool(format!(
            "document.querySelector({}) !== null",
            js_string(selector)
        ))
        .await
    }

    async fn fill(&self, selector: &str, text: &str) -> RenderResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| RenderError::ElementNotFound {
                selector: selector.to_string(),
            })?;

        element.click().await?;
        self.page
            .evaluate(format!(
                "(() => {{ const el = document.querySelector({}); if (el) el.value = ''; }})()",
                js_string(selector)
            ))
            .await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> RenderResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| RenderError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element.press_key("Enter").await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> RenderResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| RenderError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element.click().await?;
        Ok(())
    }

    async fn scroll(&self, selector: &str, delta_y: i64) -> RenderResult<()> {
        let scrolled = self
            .eval_bool(format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.scrollBy(0, {}); return true; }})()",
                js_string(selector),
                delta_y
            ))
            .await?;

        if scrolled {
            Ok(())
        } else {
            Err(RenderError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }

    async fn attribute_values(
        &self,
        selector: &str,
        attribute: &str,
    ) -> RenderResult<Vec<Option<String>>> {
        // One round trip: the feed recycles nodes, so per-node lookups can
        // race against removal.
        let result = self
            .page
            .evaluate(attribute_harvest_script(selector, attribute))
            .await?;
        result
            .into_value::<Vec<Option<String>>>()
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }
}

/// Script returning `attribute` of every element matching `selector`.
fn attribute_harvest_script(selector: &str, attribute: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({}), el => el.getAttribute({}))",
        js_string(selector),
        js_string(attribute)
    )
}
