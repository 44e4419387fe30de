//! Scrape-and-persist pipeline: feed headlines, render each article, store
//! new rows.

mod adapters;
pub mod cancel;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod ports;
#[cfg(test)]
mod testing;

pub use cancel::CancelToken;
pub use error::IngestError;
pub use job::IngestJob;
pub use pipeline::{FeedQuery, IngestReport, Pipeline};
pub use ports::{ArticleRenderer, HeadlineSource, NewsStore, RenderSession};
