//! Headless Chromium fetcher
//!
//! One browser process serves the whole run; every fetch gets its own tab,
//! closed on every exit path. Images, media, fonts and stylesheets are failed
//! at the request stage, and script URLs the page loads while rendering are
//! appended to the returned content so endpoint extraction sees them. Only
//! available with the `browser` feature.

use super::fetcher::PageFetcher;
use crate::error::{ReconError, Result};
use crate::models::{FetchResult, ScanConfig};
use async_trait::async_trait;

/// Appends script URLs to page content, one quoted URL per line
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn append_scripts(content: &mut String, scripts: &[String]) {
    for script in scripts {
        content.push_str("\n\"");
        content.push_str(script);
        content.push('"');
    }
}

#[cfg(feature = "browser")]
mod imp {
    use super::*;
    use chromiumoxide::cdp::browser_protocol::fetch::{
        ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams,
        RequestPattern, RequestStage,
    };
    use chromiumoxide::cdp::browser_protocol::network::{
        ErrorReason, Headers, ResourceType, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
    };
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use std::ops::Deref;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    /// Closes its tab when dropped unless it was closed explicitly
    struct PageGuard {
        page: Page,
        url: String,
        closed: bool,
    }

    impl PageGuard {
        fn new(page: Page, url: &str) -> Self {
            Self {
                page,
                url: url.to_string(),
                closed: false,
            }
        }

        async fn close(mut self) {
            self.closed = true;
            if let Err(e) = self.page.clone().close().await {
                warn!("Failed to close tab for {}: {e}", self.url);
            }
        }
    }

    impl Deref for PageGuard {
        type Target = Page;

        fn deref(&self) -> &Page {
            &self.page
        }
    }

    impl Drop for PageGuard {
        fn drop(&mut self) {
            if self.closed {
                return;
            }
            let page = self.page.clone();
            let url = std::mem::take(&mut self.url);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!("Tab cleanup failed for {url}: {e}");
                    }
                });
            }
        }
    }

    /// Resource types failed at the request stage
    pub(super) fn is_blocked(resource_type: &ResourceType) -> bool {
        matches!(
            resource_type,
            ResourceType::Image | ResourceType::Media | ResourceType::Font | ResourceType::Stylesheet
        )
    }

    /// Fetcher rendering pages in headless Chromium
    pub struct BrowserFetcher {
        browser: Browser,
        handler: JoinHandle<()>,
        timeout: Duration,
    }

    impl BrowserFetcher {
        /// Launches the shared browser process
        pub async fn launch(config: &ScanConfig) -> Result<Self> {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .window_size(1920, 1080)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--ignore-certificate-errors");
            if config.visible {
                builder = builder.with_head();
            }
            if let Some(ref proxy) = config.proxy {
                builder = builder.arg(format!("--proxy-server={proxy}"));
            }
            let browser_config = builder
                .build()
                .map_err(|e| ReconError::BrowserError(format!("Browser config error: {e}")))?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| ReconError::BrowserError(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!("Browser handler event error: {e}");
                    }
                }
            });

            info!("Headless browser launched");
            Ok(Self {
                browser,
                handler,
                timeout: Duration::from_secs(config.timeout_secs.max(1)),
            })
        }

        async fn load(
            &self,
            page: &Page,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<FetchResult> {
            let cdp = |e: chromiumoxide::error::CdpError| ReconError::BrowserError(e.to_string());

            let mut extra = serde_json::Map::new();
            for (name, value) in headers {
                if name.eq_ignore_ascii_case("user-agent") {
                    page.execute(SetUserAgentOverrideParams::new(value.clone()))
                        .await
                        .map_err(cdp)?;
                } else {
                    extra.insert(name.clone(), serde_json::Value::String(value.clone()));
                }
            }
            if !extra.is_empty() {
                page.execute(SetExtraHttpHeadersParams::new(Headers::new(
                    serde_json::Value::Object(extra),
                )))
                .await
                .map_err(cdp)?;
            }

            let pattern = RequestPattern::builder()
                .url_pattern("*")
                .request_stage(RequestStage::Request)
                .build();
            let mut paused = page
                .event_listener::<EventRequestPaused>()
                .await
                .map_err(cdp)?;
            page.execute(EnableParams::builder().pattern(pattern).build())
                .await
                .map_err(cdp)?;

            let scripts = Arc::new(Mutex::new(Vec::<String>::new()));
            let interceptor = {
                let page = page.clone();
                let scripts = Arc::clone(&scripts);
                tokio::spawn(async move {
                    while let Some(event) = paused.next().await {
                        let blocked = is_blocked(&event.resource_type);
                        if event.resource_type == ResourceType::Script {
                            scripts
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .push(event.request.url.clone());
                        }
                        let outcome = if blocked {
                            page.execute(FailRequestParams::new(
                                event.request_id.clone(),
                                ErrorReason::BlockedByClient,
                            ))
                            .await
                            .map(|_| ())
                        } else {
                            page.execute(ContinueRequestParams::new(event.request_id.clone()))
                                .await
                                .map(|_| ())
                        };
                        if let Err(e) = outcome {
                            debug!("Request interception failed for {}: {e}", event.request.url);
                        }
                    }
                })
            };

            let navigation = async {
                page.goto(url)
                    .await
                    .map_err(|_| ReconError::NavigationError(url.to_string()))?;
                let status = page
                    .wait_for_navigation_response()
                    .await
                    .ok()
                    .flatten()
                    .and_then(|request| request.response.as_ref().map(|r| r.status as u16))
                    .unwrap_or(0);
                let content = page.content().await.map_err(cdp)?;
                let title = page.get_title().await.ok().flatten();
                Ok::<_, ReconError>((status, content, title))
            };
            let outcome = tokio::time::timeout(self.timeout, navigation).await;
            interceptor.abort();

            let (status, mut content, title) = outcome.map_err(|_| ReconError::FetchTimeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            })??;

            let captured = std::mem::take(&mut *scripts.lock().unwrap_or_else(|e| e.into_inner()));
            append_scripts(&mut content, &captured);
            debug!("Rendered {url}: {status}, {} bytes, {} scripts", content.len(), captured.len());

            let mut result = FetchResult::new(url, status, content, "text/html");
            if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
                if !result.is_javascript {
                    result.title = title.trim().to_string();
                }
            }
            Ok(result)
        }
    }

    #[async_trait]
    impl PageFetcher for BrowserFetcher {
        async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResult> {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| ReconError::BrowserError(e.to_string()))?;
            let guard = PageGuard::new(page, url);
            let result = self.load(&guard, url, headers).await;
            guard.close().await;
            result
        }
    }

    impl Drop for BrowserFetcher {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }
}

#[cfg(feature = "browser")]
pub use imp::BrowserFetcher;

/// Stub used when the crate is built without the `browser` feature
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher;

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub async fn launch(_config: &ScanConfig) -> Result<Self> {
        Err(ReconError::BrowserError(
            "Browser rendering requires the 'browser' feature flag. \
             Compile with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, _headers: &[(String, String)]) -> Result<FetchResult> {
        Err(ReconError::BrowserError(format!(
            "cannot render {url} without the 'browser' feature"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::extractor::extract_candidates;

    #[test]
    fn test_captured_scripts_are_extractable() {
        let mut content = "<html><body><p>app shell</p></body></html>".to_string();
        let scripts = vec![
            "https://app.example.com/static/js/main.3f2a.js".to_string(),
            "https://cdn.example.com/vendor/chunk.js".to_string(),
        ];
        append_scripts(&mut content, &scripts);

        assert!(content.ends_with("\n\"https://cdn.example.com/vendor/chunk.js\""));
        let found = extract_candidates(&content);
        for script in &scripts {
            assert!(found.contains(script), "{script} not extracted");
        }
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_blocked_resource_types() {
        use chromiumoxide::cdp::browser_protocol::network::ResourceType;

        for blocked in [
            ResourceType::Image,
            ResourceType::Media,
            ResourceType::Font,
            ResourceType::Stylesheet,
        ] {
            assert!(imp::is_blocked(&blocked), "{blocked:?} should be blocked");
        }
        for allowed in [
            ResourceType::Document,
            ResourceType::Script,
            ResourceType::Xhr,
            ResourceType::Fetch,
        ] {
            assert!(!imp::is_blocked(&allowed), "{allowed:?} should load");
        }
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_launch_without_feature_fails() {
        let result = BrowserFetcher::launch(&ScanConfig::default()).await;
        assert!(matches!(result, Err(ReconError::BrowserError(_))));
    }
}
