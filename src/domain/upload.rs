//! Client-streamed merge upload.
//!
//! A [`MergeUpload`] is the sending half of a merge: requests go in one at a
//! time and the terminal [`MergeSummary`] only becomes available after
//! [`MergeUpload::finish`]. The far side (an in-process merge task or an HTTP
//! request body) reads a [`MergeRequestStream`]. That stream only ends cleanly
//! when the sender finished explicitly; a sender dropped half-way surfaces as a
//! transport error, so an abandoned upload is never committed.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{ready, SinkExt, Stream, StreamExt};
use tokio::task::JoinHandle;

use super::cart::{MergeRequest, MergeSummary};
use super::errors::DomainError;

/// Requests buffered between the sender and the far side.
pub const UPLOAD_BUFFER: usize = 32;

type SummaryTask = JoinHandle<Result<MergeSummary, DomainError>>;

#[derive(Debug)]
enum Frame {
    Request(MergeRequest),
    End,
}

pub struct MergeUpload {
    sender: Option<mpsc::Sender<Frame>>,
    summary: Option<SummaryTask>,
}

impl MergeUpload {
    /// Opens an upload. `spawn` receives the request stream and returns the
    /// task that will produce the summary.
    pub fn open<F>(spawn: F) -> Self
    where
        F: FnOnce(MergeRequestStream) -> SummaryTask,
    {
        let (sender, receiver) = mpsc::channel(UPLOAD_BUFFER);
        let summary = spawn(MergeRequestStream {
            receiver: Some(receiver),
        });
        Self {
            sender: Some(sender),
            summary: Some(summary),
        }
    }

    /// Pushes one request, waiting for buffer capacity. If the far side has
    /// already given up, returns the error it gave up with.
    pub async fn send(&mut self, request: MergeRequest) -> Result<(), DomainError> {
        let delivered = match self.sender.as_mut() {
            Some(sender) => sender.send(Frame::Request(request)).await.is_ok(),
            None => false,
        };
        if delivered {
            return Ok(());
        }
        self.sender = None;
        Err(self.far_side_failure().await)
    }

    /// Closes the upload for writes and waits for the summary.
    pub async fn finish(mut self) -> Result<MergeSummary, DomainError> {
        if let Some(mut sender) = self.sender.take() {
            // A refused end marker means the far side already stopped; the
            // summary task carries the reason.
            let _ = sender.send(Frame::End).await;
        }
        match self.summary.take() {
            Some(task) => task
                .await
                .map_err(|e| DomainError::Transport(e.to_string()))?,
            None => Err(closed_early()),
        }
    }

    async fn far_side_failure(&mut self) -> DomainError {
        match self.summary.take() {
            Some(task) => match task.await {
                Ok(Err(err)) => err,
                Ok(Ok(_)) => closed_early(),
                Err(e) => DomainError::Transport(e.to_string()),
            },
            None => closed_early(),
        }
    }
}

impl Drop for MergeUpload {
    fn drop(&mut self) {
        if let Some(task) = self.summary.take() {
            task.abort();
        }
    }
}

fn closed_early() -> DomainError {
    DomainError::Transport("merge upload closed before completion".to_string())
}

/// The receiving half of a [`MergeUpload`].
#[derive(Debug)]
pub struct MergeRequestStream {
    receiver: Option<mpsc::Receiver<Frame>>,
}

impl Stream for MergeRequestStream {
    type Item = Result<MergeRequest, DomainError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(None);
        };
        match ready!(receiver.poll_next_unpin(cx)) {
            Some(Frame::Request(request)) => Poll::Ready(Some(Ok(request))),
            Some(Frame::End) => {
                self.receiver = None;
                Poll::Ready(None)
            }
            None => {
                self.receiver = None;
                Poll::Ready(Some(Err(DomainError::Transport(
                    "merge upload dropped before completion".to_string(),
                ))))
            }
        }
    }
}
