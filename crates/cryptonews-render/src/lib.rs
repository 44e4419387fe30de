//! Headless-browser article rendering and extraction.
//!
//! [`ChromeRenderer`] launches Chrome, loads each article page in a reused tab
//! and waits for the content marker; [`Extractor`] turns the rendered document
//! into an [`ArticleExtraction`](cryptonews_core::ArticleExtraction) without
//! needing a browser.

pub mod chrome;
pub mod error;
pub mod extract;

pub use chrome::{ChromeRenderer, ChromeSession};
pub use error::RenderError;
pub use extract::Extractor;
