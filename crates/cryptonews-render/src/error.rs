use thiserror::Error;

/// Errors from launching the browser or rendering a single article.
///
/// `headless_chrome` reports failures as `anyhow::Error`, which cannot be a
/// `#[source]`; its message is kept in `reason` instead.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {reason}")]
    Launch { reason: String },

    /// The content marker did not appear in time, or the whole render
    /// exceeded its outer deadline.
    #[error("timed out after {waited_secs}s waiting for content on {url}")]
    Timeout { url: String, waited_secs: u64 },

    /// DNS, TLS or other navigation failure reported by the browser.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page loaded but the document response was an HTTP error.
    #[error("navigation to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("browser error on {url}: {reason}")]
    Browser { url: String, reason: String },

    #[error("invalid CSS selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
