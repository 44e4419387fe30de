//! Pure extraction over a rendered article document.

use cryptonews_core::{ArticleExtraction, RenderSettings};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::RenderError;

/// Compiled selectors for the content marker and the outbound source link.
#[derive(Debug, Clone)]
pub struct Extractor {
    content_css: String,
    content: Selector,
    source_link: Selector,
}

impl Extractor {
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSelector`] if either selector does not parse.
    pub fn new(content_selector: &str, source_link_selector: &str) -> Result<Self, RenderError> {
        Ok(Self {
            content_css: content_selector.to_string(),
            content: parse_selector(content_selector)?,
            source_link: parse_selector(source_link_selector)?,
        })
    }

    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSelector`] if either configured selector
    /// does not parse.
    pub fn from_settings(settings: &RenderSettings) -> Result<Self, RenderError> {
        Self::new(&settings.content_selector, &settings.source_link_selector)
    }

    /// The raw CSS of the content marker, as handed to the browser's wait.
    #[must_use]
    pub fn content_selector(&self) -> &str {
        &self.content_css
    }

    /// Reads the marker's text and the outbound link from `html`.
    ///
    /// Relative links resolve against `page_url`. Both fields are `None` when
    /// their element is missing, blank, or the link cannot be made absolute.
    #[must_use]
    pub fn extract(&self, html: &str, page_url: &str) -> ArticleExtraction {
        let document = Html::parse_document(html);

        let content = document
            .select(&self.content)
            .next()
            .map(rendered_text)
            .filter(|text| !text.is_empty());

        let source_link = document
            .select(&self.source_link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| resolve_href(page_url, href));

        ArticleExtraction {
            content,
            source_link,
        }
    }
}

/// Elements whose content is never rendered as text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Block-level elements: their content starts and ends on its own line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "pre",
    "section",
    "table",
    "tr",
    "ul",
];

/// Approximates the browser's `innerText` for `element`: whitespace inside
/// inline runs collapses to one space, block elements sit on their own
/// lines, paragraphs are separated by a blank line and `<br>` breaks the line.
fn rendered_text(element: ElementRef<'_>) -> String {
    let mut text = RenderedText::default();
    text.walk(element);
    text.out
}

#[derive(Default)]
struct RenderedText {
    out: String,
    pending_breaks: usize,
    pending_space: bool,
}

impl RenderedText {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.push_text(text);
            } else if let Some(child) = ElementRef::wrap(child) {
                self.push_element(child);
            }
        }
    }

    fn push_element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if HIDDEN_ELEMENTS.contains(&name) {
            return;
        }
        if name == "br" {
            self.pending_breaks += 1;
            return;
        }

        let breaks = match name {
            "p" => 2,
            "td" | "th" => {
                self.pending_space = true;
                0
            }
            _ if BLOCK_ELEMENTS.contains(&name) => 1,
            _ => 0,
        };
        self.request_breaks(breaks);
        self.walk(element);
        self.request_breaks(breaks);
    }

    fn request_breaks(&mut self, breaks: usize) {
        self.pending_breaks = self.pending_breaks.max(breaks);
    }

    fn push_text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                self.pending_space = true;
            }
            // Leading separators are dropped, trailing ones never flushed.
            if !self.out.is_empty() {
                if self.pending_breaks > 0 {
                    self.out.extend(std::iter::repeat_n('\n', self.pending_breaks));
                } else if self.pending_space {
                    self.out.push(' ');
                }
            }
            self.out.push_str(word);
            self.pending_breaks = 0;
            self.pending_space = false;
        }
        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, RenderError> {
    Selector::parse(css).map_err(|e| RenderError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let resolved = match Url::parse(page_url) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
