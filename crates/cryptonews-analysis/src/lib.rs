//! Chat-completion gateway behind the `/analyze` and `/chat` endpoints.

pub mod client;
pub mod error;

pub use client::{AnalysisClient, ChatMessage, ChatRole, ANALYST_SYSTEM_PROMPT};
pub use error::AnalysisError;
