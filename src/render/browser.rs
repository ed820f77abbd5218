use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::RequestPausedDecision;
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::FailRequest;
use headless_chrome::protocol::cdp::Network::ErrorReason;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use crate::config::{RenderSettings, ACCEPT, ACCEPT_LANGUAGE, VIEWPORT};
use crate::error::{AppError, Result};
use crate::render::artifacts::ArtifactWriter;
use crate::render::{PageRenderer, RenderRequest, RenderedContent, RendererFactory};

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollBy(0, document.body.scrollHeight)";

/// Sub-resources that never carry match data.
const BLOCKED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico", ".css", ".woff", ".woff2", ".ttf",
    ".otf", ".eot", ".mp4", ".webm",
];

/// Analytics, ad and third-party asset hosts.
const BLOCKED_HOST_MARKERS: &[&str] = &[
    "googleapis.com",
    "googletagmanager.com",
    "google-analytics.com",
    "doubleclick.net",
    "facebook.net",
];

/// Host label used by ad servers (`ads.example.net`, `cdn.ads.example.com`).
const AD_HOST_LABEL: &str = "ads";

/// True when a request to `url` can be aborted without affecting extraction.
pub fn should_block(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let without_query = lower.split(['?', '#']).next().unwrap_or(&lower);
    let (host, path) = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').unwrap_or((rest, "")),
        None => ("", without_query),
    };

    BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || BLOCKED_HOST_MARKERS.iter().any(|marker| host.contains(marker))
        || host.split(['.', ':']).any(|label| label == AD_HOST_LABEL)
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Launches one headless Chrome per cycle.
pub struct ChromeRendererFactory {
    settings: RenderSettings,
}

impl ChromeRendererFactory {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }
}

impl RendererFactory for ChromeRendererFactory {
    type Renderer = ChromeRenderer;

    fn launch(&self) -> Result<ChromeRenderer> {
        let s = &self.settings;
        // The browser exits if it sees no CDP traffic for this long; settle
        // delays alone must never trip it.
        let idle_timeout = s.navigation_timeout + s.marker_timeout + s.scroll_settle + Duration::from_secs(60);

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some(VIEWPORT))
            .ignore_certificate_errors(true)
            .path(s.chrome_path.clone())
            .idle_browser_timeout(idle_timeout)
            .args(vec![OsStr::new("--disable-web-security"), OsStr::new("--no-http2")])
            .build()
            .map_err(|e| AppError::BrowserLaunch(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(options).map_err(|e| AppError::BrowserLaunch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::BrowserLaunch(format!("failed to open tab: {e}")))?;

        tab.set_default_timeout(s.navigation_timeout);
        tab.set_user_agent(&s.user_agent, Some(ACCEPT_LANGUAGE), None)
            .map_err(|e| AppError::BrowserLaunch(format!("failed to set user agent: {e}")))?;
        let headers = HashMap::from([("Accept-Language", ACCEPT_LANGUAGE), ("Accept", ACCEPT)]);
        tab.set_extra_http_headers(headers)
            .map_err(|e| AppError::BrowserLaunch(format!("failed to set headers: {e}")))?;

        if s.block_resources {
            enable_blocking(&tab)?;
        }

        info!(block_resources = s.block_resources, "Browser session started");
        Ok(ChromeRenderer {
            _browser: browser,
            tab,
            scroll_settle: s.scroll_settle,
            artifacts: s.artifacts_dir.as_deref().map(ArtifactWriter::new),
        })
    }
}

fn enable_blocking(tab: &Arc<Tab>) -> Result<()> {
    fn setup_err(e: impl std::fmt::Display) -> AppError {
        AppError::BrowserLaunch(format!("request interception: {e}"))
    }

    tab.enable_fetch(None, None).map_err(setup_err)?;
    tab.enable_request_interception(Arc::new(
        |_transport: Arc<Transport>, _session: SessionId, event: RequestPausedEvent| {
            if should_block(&event.params.request.url) {
                debug!(url = %event.params.request.url, "Blocked sub-resource");
                RequestPausedDecision::Fail(FailRequest {
                    request_id: event.params.request_id,
                    error_reason: ErrorReason::BlockedByClient,
                })
            } else {
                RequestPausedDecision::Continue(None)
            }
        },
    ))
    .map_err(setup_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// One browser and one tab, reused across every sport in the cycle. Dropping
/// it shuts Chrome down.
pub struct ChromeRenderer {
    _browser: Browser,
    tab: Arc<Tab>,
    scroll_settle: Duration,
    artifacts: Option<ArtifactWriter>,
}

impl PageRenderer for ChromeRenderer {
    fn render(&mut self, req: &RenderRequest<'_>) -> Result<RenderedContent> {
        info!(sport = %req.sport, "Navigating to {}", req.url);
        self.tab
            .navigate_to(req.url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| AppError::navigation(req.sport, e))?;

        let marker_found = match self
            .tab
            .wait_for_element_with_custom_timeout(req.wait_selector, req.timeout)
        {
            Ok(_) => {
                debug!(sport = %req.sport, "{} found", req.wait_selector);
                true
            }
            Err(e) => {
                warn!(sport = %req.sport, "{} not found within {:?}: {e}", req.wait_selector, req.timeout);
                false
            }
        };

        if let Err(e) = self.tab.evaluate(SCROLL_TO_BOTTOM_JS, false) {
            warn!(sport = %req.sport, "Scroll failed: {e}");
        }
        std::thread::sleep(self.scroll_settle);

        let html = self
            .tab
            .get_content()
            .map_err(|e| AppError::navigation(req.sport, e))?;

        if let Some(artifacts) = &self.artifacts {
            match self
                .tab
                .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            {
                Ok(png) => artifacts.save_screenshot(req.sport, &png),
                Err(e) => warn!(sport = %req.sport, "Screenshot failed: {e}"),
            }
            artifacts.save_html(req.sport, &html);
        }

        Ok(RenderedContent { html, marker_found })
    }
}
