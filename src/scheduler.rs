//! Request scheduling seam.
//!
//! Network transport and prioritization live outside this crate. The scheduler
//! accepts a [`Request`] and either declines it (throttled, retried on a later
//! frame) or returns a [`PendingRequest`]. Completion may be produced on any
//! thread; it is observed on the render thread by polling once per frame.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// What a request fetches; schedulers may budget each kind separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Terrain,
    Imagery,
    TileContent,
}

/// Request descriptor handed to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    /// Distance from the camera, used as a priority hint (closer first).
    pub distance: f64,
    pub kind: RequestKind,
}

impl Request {
    pub fn new(url: impl Into<String>, distance: f64, kind: RequestKind) -> Self {
        Self {
            url: url.into(),
            distance,
            kind,
        }
    }
}

/// External request scheduler.
pub trait RequestScheduler {
    /// Returns `None` when the request is not admitted this frame.
    fn schedule(&mut self, request: Request) -> Option<PendingRequest<Vec<u8>>>;
}

/// Outcome of polling a [`PendingRequest`].
#[derive(Debug)]
pub enum Delivery<T> {
    Pending,
    Delivered(T),
    Failed(anyhow::Error),
}

/// Producer half of a pending request. Consumed by the single delivery.
#[derive(Debug)]
pub struct RequestSender<T> {
    tx: Sender<anyhow::Result<T>>,
}

impl<T> RequestSender<T> {
    pub fn deliver(self, value: T) {
        // The receiver is gone when its owner was dropped; nothing to report.
        let _ = self.tx.send(Ok(value));
    }

    pub fn fail(self, err: anyhow::Error) {
        let _ = self.tx.send(Err(err));
    }
}

/// In-flight request observed by its owner.
#[derive(Debug)]
pub struct PendingRequest<T> {
    rx: Receiver<anyhow::Result<T>>,
}

/// Creates a connected sender/pending pair.
pub fn pending_request<T>() -> (RequestSender<T>, PendingRequest<T>) {
    let (tx, rx) = mpsc::channel();
    (RequestSender { tx }, PendingRequest { rx })
}

impl<T> PendingRequest<T> {
    /// A request that completes on its first poll.
    pub fn resolved(value: T) -> Self {
        let (tx, pending) = pending_request();
        tx.deliver(value);
        pending
    }

    /// A request that fails on its first poll.
    pub fn rejected(err: anyhow::Error) -> Self {
        let (tx, pending) = pending_request();
        tx.fail(err);
        pending
    }

    pub fn poll(&mut self) -> Delivery<T> {
        match self.rx.try_recv() {
            Ok(Ok(value)) => Delivery::Delivered(value),
            Ok(Err(err)) => Delivery::Failed(err),
            Err(TryRecvError::Empty) => Delivery::Pending,
            Err(TryRecvError::Disconnected) => {
                Delivery::Failed(anyhow::anyhow!("request dropped before delivery"))
            }
        }
    }
}
