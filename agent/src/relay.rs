//! Forwards completion deltas to the caller as server-sent events.
//!
//! The relay pulls one delta per event it hands out, so a slow caller slows
//! the upstream read instead of growing a buffer. Dropping the relay (the
//! caller hung up) drops the upstream stream with it.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};

use crate::completion::DeltaStream;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    Delta(String),
    Done,
}

/// Logs how far the relay got, including when it is dropped early.
struct RelayProgress {
    relayed: usize,
    finished: bool,
}

impl Drop for RelayProgress {
    fn drop(&mut self) {
        if self.finished {
            tracing::debug!(relayed = self.relayed, "completion stream relayed");
        } else {
            tracing::info!(
                relayed = self.relayed,
                "caller disconnected; completion stream abandoned"
            );
        }
    }
}

/// Every delta in source order, then exactly one `Done`. An upstream error
/// ends the relay early but still emits `Done`.
pub fn relay(mut source: DeltaStream) -> impl Stream<Item = RelayFrame> + Send + 'static {
    async_stream::stream! {
        let mut progress = RelayProgress { relayed: 0, finished: false };

        while let Some(item) = source.next().await {
            match item {
                Ok(delta) => {
                    progress.relayed += 1;
                    yield RelayFrame::Delta(delta.into_inner());
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        relayed = progress.relayed,
                        "completion stream failed mid-relay"
                    );
                    break;
                }
            }
        }

        progress.finished = true;
        yield RelayFrame::Done;
    }
}

pub fn into_sse<S>(frames: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = RelayFrame> + Send + 'static,
{
    Sse::new(frames.map(|frame| {
        Ok(match frame {
            RelayFrame::Delta(data) => Event::default().data(data),
            RelayFrame::Done => Event::default().data(DONE_SENTINEL),
        })
    }))
}
