//! Page rendering. A `RendererFactory` opens one browser session per cycle;
//! the session renders each sport page in turn and is closed when dropped.
//!
//! Implementations are blocking and are driven from `spawn_blocking`.

pub mod artifacts;
pub mod browser;

use std::time::Duration;

use crate::error::Result;

pub use browser::ChromeRendererFactory;

#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub sport: &'a str,
    pub url: &'a str,
    /// Marker that signals the dynamic content has rendered.
    pub wait_selector: &'a str,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderedContent {
    pub html: String,
    /// False when the marker never appeared; `html` is whatever was there.
    pub marker_found: bool,
}

pub trait PageRenderer {
    fn render(&mut self, req: &RenderRequest<'_>) -> Result<RenderedContent>;
}

pub trait RendererFactory: Send + Sync + 'static {
    type Renderer: PageRenderer;

    /// Starts a session. Errors here are `AppError::BrowserLaunch`.
    fn launch(&self) -> Result<Self::Renderer>;
}
