//! StreamRenderer - sends one analysis request and renders the streamed answer.
//!
//! Each call to [`StreamRenderer::analyze`] is one operation: it issues the
//! request, decodes the body chunk by chunk and republishes the accumulated
//! answer after every chunk, stopping at the first sentinel sighting or at
//! end-of-stream. At most one operation is active per renderer; a call made
//! while another is running returns [`Outcome::Busy`] without doing anything.

use crate::decoder::Utf8Decoder;
use crate::error::Result;
use crate::presenter::Presenter;
use crate::transport::Transport;
use crate::types::{AnalyzeRequest, ImageInput, Outcome, Snapshot, StreamState};
use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct StreamRenderer {
    transport: Arc<dyn Transport>,
    sentinel: String,
    busy: AtomicBool,
}

/// Marks the renderer active for its lifetime and restores the control on drop
struct ActiveGuard<'s, 'p> {
    busy: &'s AtomicBool,
    presenter: &'p mut dyn Presenter,
}

impl Drop for ActiveGuard<'_, '_> {
    fn drop(&mut self) {
        self.presenter.finish();
        self.busy.store(false, Ordering::Release);
    }
}

impl StreamRenderer {
    pub fn new(transport: Arc<dyn Transport>, sentinel: impl Into<String>) -> Self {
        Self {
            transport,
            sentinel: sentinel.into(),
            busy: AtomicBool::new(false),
        }
    }

    /// Whether an analysis is currently running
    pub fn is_active(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one analysis, pushing every display state to `presenter`.
    ///
    /// Never returns an error: failures are shown in the answer region and
    /// reported as [`Outcome::Failed`].
    pub async fn analyze(
        &self,
        prompt: &str,
        input: &ImageInput,
        presenter: &mut dyn Presenter,
    ) -> Outcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Analysis already in progress, ignoring trigger");
            return Outcome::Busy;
        }

        let mut active = ActiveGuard {
            busy: &self.busy,
            presenter,
        };
        active.presenter.begin();

        let source = match input.resolve() {
            Ok(source) => source,
            Err(e) => {
                let message = e.to_string();
                active.presenter.show_message(&message);
                return Outcome::Invalid(message);
            }
        };

        let request = AnalyzeRequest::new(prompt, source);
        match self.stream(&request, &mut *active.presenter).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Analysis failed: {}", e);
                let message = format!("An error occurred: {}", e);
                active.presenter.show_message(&message);
                Outcome::Failed(message)
            }
        }
    }

    async fn stream(
        &self,
        request: &AnalyzeRequest,
        presenter: &mut dyn Presenter,
    ) -> Result<Outcome> {
        let mut body = self.transport.open(request).await?;
        let mut decoder = Utf8Decoder::new();
        let mut state = StreamState::new();
        let mut snapshot = Snapshot::new(request.prompt.clone(), String::new());
        let mut chunks = 0;

        while let Some(chunk) = body.next().await {
            let bytes = chunk?;
            chunks += 1;
            tracing::debug!("Chunk {}: {} bytes", chunks, bytes.len());

            state.push(&decoder.decode(&bytes), &self.sentinel);
            snapshot = Snapshot::new(request.prompt.clone(), state.answer(&self.sentinel));
            presenter.publish(&snapshot);

            if state.is_finished() {
                tracing::info!("End-of-answer marker received after {} chunks", chunks);
                break;
            }
        }

        let finished_by_sentinel = state.is_finished();
        if !finished_by_sentinel {
            let tail = decoder.finish();
            if !tail.is_empty() {
                state.push(&tail, &self.sentinel);
                snapshot = Snapshot::new(request.prompt.clone(), state.answer(&self.sentinel));
                presenter.publish(&snapshot);
            }
            state.finish();
            tracing::info!("Stream ended after {} chunks", chunks);
        }

        Ok(Outcome::Completed {
            snapshot,
            finished_by_sentinel,
            chunks,
        })
    }
}
