//! Progress side channel and cooperative cancellation for chunked batches.
//!
//! A [Progress] counts completed trials with atomics and, when built with
//! [Progress::channel], also forwards a [ProgressUpdate] over an mpsc channel
//! after every chunk. The trial loop never waits on the receiver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct Progress {
    completed: AtomicUsize,
    total: AtomicUsize,
    sender: Option<Mutex<Sender<ProgressUpdate>>>,
}

impl Progress {
    /// Counter only; nothing is sent anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter plus a receiver that sees one update per finished chunk.
    pub fn channel() -> (Self, Receiver<ProgressUpdate>) {
        let (sender, receiver) = mpsc::channel();
        let progress = Self {
            sender: Some(Mutex::new(sender)),
            ..Self::default()
        };
        (progress, receiver)
    }

    /// Resets the counter and announces `0 / total`.
    pub fn start(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.send(ProgressUpdate {
            completed: 0,
            total,
        });
    }

    pub fn advance(&self, trials: usize) {
        let completed = self.completed.fetch_add(trials, Ordering::SeqCst) + trials;
        self.send(ProgressUpdate {
            completed,
            total: self.total(),
        });
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.completed() as f64 / total as f64
        }
    }

    fn send(&self, update: ProgressUpdate) {
        if let Some(sender) = &self.sender {
            if let Ok(sender) = sender.lock() {
                // A dropped receiver only means nobody is listening.
                let _ = sender.send(update);
            }
        }
    }
}

/// Shared flag checked before each chunk starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
