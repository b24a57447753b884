//! Single-context executor for work that must run on the interactive thread.
//!
//! Worker threads hold an [`InteractiveHandle`] and post jobs; the thread that
//! owns the [`InteractiveExecutor`] drains them between frames. The executor is
//! `!Send`, so it cannot leave the thread that created it.

use std::marker::PhantomData;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A commit job run against the interactive state
pub type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interactive executor is gone")]
pub struct ExecutorClosed;

pub struct InteractiveExecutor<S> {
    tx: UnboundedSender<Job<S>>,
    rx: UnboundedReceiver<Job<S>>,
    // Pins the executor to its creating thread
    _local: PhantomData<*const ()>,
}

/// Cloneable, thread-safe poster for an [`InteractiveExecutor`]
pub struct InteractiveHandle<S> {
    tx: UnboundedSender<Job<S>>,
}

impl<S> Clone for InteractiveHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: 'static> InteractiveHandle<S> {
    /// Queue a job for the interactive thread. Never blocks.
    pub fn post<F>(&self, job: F) -> Result<(), ExecutorClosed>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx.send(Box::new(job)).map_err(|_| ExecutorClosed)
    }
}

impl<S: 'static> InteractiveExecutor<S> {
    pub fn new() -> Self {
        // Unbounded so posting from a worker never waits on the UI
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            _local: PhantomData,
        }
    }

    pub fn handle(&self) -> InteractiveHandle<S> {
        InteractiveHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every queued job in posting order; returns how many ran
    pub fn run_pending(&mut self, state: &mut S) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job(state);
            ran += 1;
        }
        ran
    }
}

impl<S: 'static> Default for InteractiveExecutor<S> {
    fn default() -> Self {
        Self::new()
    }
}
