//! Response channel between background workers and the dispatch loop.
//!
//! Unbounded multi-producer, single-consumer FIFO. `push` never blocks a
//! worker; the loop drains with non-blocking `try_recv`. Items arrive in
//! completion order, not submission order.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// Items delivered from background workers to the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A successful AI reply. Eligible for speech synthesis.
    Reply(String),

    /// Error or status text rendered as an assistant turn but never
    /// spoken.
    Notice(String),

    /// Successfully transcribed voice input; re-enters the loop through
    /// the same path as typed text.
    Transcribed(String),

    /// A voice capture cycle ended (any outcome); the loop hides the
    /// listening indicator.
    CaptureEnded,
}

/// Producer half handed to each spawned worker.
#[derive(Debug, Clone)]
pub struct OutcomeSender {
    tx: Sender<WorkerEvent>,
}

impl OutcomeSender {
    /// Push one event. Never blocks; a send after the loop has shut down
    /// is silently dropped.
    pub fn push(&self, event: WorkerEvent) {
        let _ = self.tx.send(event);
    }
}

/// Consumer half owned by the dispatch loop.
#[derive(Debug)]
pub struct ResponseQueue {
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
}

impl ResponseQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> OutcomeSender {
        OutcomeSender {
            tx: self.tx.clone(),
        }
    }

    /// Non-blocking pop; `None` when no event is currently available.
    pub fn try_pop(&self) -> Option<WorkerEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Receiver for select-based waiting in the loop.
    pub fn receiver(&self) -> &Receiver<WorkerEvent> {
        &self.rx
    }
}

impl Default for ResponseQueue {
    fn default() -> Self {
        Self::new()
    }
}
