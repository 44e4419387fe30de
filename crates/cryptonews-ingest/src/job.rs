use std::sync::{Mutex, PoisonError};

use crate::cancel::CancelToken;
use crate::error::IngestError;
use crate::pipeline::{IngestReport, Pipeline};

/// Single-flight wrapper around [`Pipeline`].
///
/// A trigger that finds a run in progress is rejected with
/// [`IngestError::AlreadyRunning`] rather than queued.
#[derive(Debug)]
pub struct IngestJob {
    pipeline: Pipeline,
    in_flight: tokio::sync::Mutex<()>,
    current: Mutex<Option<CancelToken>>,
}

impl IngestJob {
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            in_flight: tokio::sync::Mutex::new(()),
            current: Mutex::new(None),
        }
    }

    /// Runs the pipeline unless a run is already in flight.
    ///
    /// # Errors
    ///
    /// [`IngestError::AlreadyRunning`], or whatever the pipeline run returns.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!("ingest: run already in progress, skipping trigger");
            return Err(IngestError::AlreadyRunning);
        };

        let token = CancelToken::new();
        let _current = CurrentRun::register(&self.current, token.clone());
        self.pipeline.run(&token).await
    }

    /// Signals the in-flight run, if any, to stop after its current article.
    /// Returns whether a run was signalled.
    pub fn cancel(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }
}

/// Publishes the in-flight run's token and clears it on every exit path,
/// including the run future being dropped mid-article.
struct CurrentRun<'a> {
    slot: &'a Mutex<Option<CancelToken>>,
}

impl<'a> CurrentRun<'a> {
    fn register(slot: &'a Mutex<Option<CancelToken>>, token: CancelToken) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Self { slot }
    }
}

impl Drop for CurrentRun<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
