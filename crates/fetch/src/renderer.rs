// Stract is an open source web search engine.
// Copyright (C) 2024 Stract ApS
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Dynamic-render fallback contract (§4.6 step 6, §4.12). The spec only
//! fixes the *contract* for headless rendering, the same way §1 treats LLM
//! inference as an external collaborator -- so this crate ships a trait and
//! a no-op default, and leaves a real headless-browser implementation
//! (Playwright or similar) as a feature-gated external collaborator.

use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("dynamic rendering is not supported by this renderer")]
    Unsupported,
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
    #[error("render failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
pub trait DynamicRenderer: Send + Sync {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, RenderError>;
}

/// Default renderer: always reports [`RenderError::Unsupported`], so the
/// fetcher keeps the static HTML it already has. A real implementation
/// (out of scope for the core, per §1) would drive a headless browser with
/// `wait_until=networkidle` and the given timeout.
#[derive(Debug, Default)]
pub struct NullRenderer;

#[async_trait::async_trait]
impl DynamicRenderer for NullRenderer {
    async fn render(&self, _url: &Url, _timeout: Duration) -> Result<RenderedPage, RenderError> {
        Err(RenderError::Unsupported)
    }
}

/// App-shell markers that suggest a page only renders its content via
/// client-side JS (§4.6 step 6).
const APP_SHELL_MARKERS: &[&str] = &[
    "data-reactroot",
    "#/",
    "window.__initial_state__",
    "<app-root",
    "ng-app",
    "id=\"app\"",
];

pub fn looks_like_app_shell(html: &str) -> bool {
    let lower = html.to_lowercase();
    APP_SHELL_MARKERS.iter().any(|marker| lower.contains(marker))
}

pub const DYNAMIC_RENDER_MIN_TEXT_LEN: usize = 1500;
pub const DYNAMIC_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_app_shell_markers() {
        assert!(looks_like_app_shell("<div data-reactroot></div>"));
        assert!(looks_like_app_shell("<script>window.__INITIAL_STATE__ = {}</script>"));
        assert!(!looks_like_app_shell("<html><body>hello</body></html>"));
    }

    #[tokio::test]
    async fn null_renderer_always_unsupported() {
        let renderer = NullRenderer;
        let url = Url::parse("https://example.com").unwrap();
        let err = renderer.render(&url, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RenderError::Unsupported));
    }
}
