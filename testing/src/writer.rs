//! Recording projection writer for subscription pump tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use cartstream_core::projection::Result;
use cartstream_core::{Event, ProjectionError, ProjectionWriter};
use futures::future::BoxFuture;

/// Projection writer that records every applied batch in memory.
///
/// The checkpoint lives in memory and advances to the batch maximum on each
/// apply, mirroring the transactional contract of a real writer. Set
/// [`fail_next_apply`] to make the next apply return an error, for testing
/// pump abort behavior.
///
/// [`fail_next_apply`]: RecordingWriter::fail_next_apply
pub struct RecordingWriter {
    name: &'static str,
    subscribed: &'static [&'static str],
    batches: Mutex<Vec<Vec<Event>>>,
    checkpoint: Mutex<i64>,
    fail_next: AtomicBool,
}

impl RecordingWriter {
    /// Create a writer subscribed to the given event types.
    #[must_use]
    pub const fn new(name: &'static str, subscribed: &'static [&'static str]) -> Self {
        Self {
            name,
            subscribed,
            batches: Mutex::new(Vec::new()),
            checkpoint: Mutex::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next `apply` call fail without advancing the checkpoint.
    pub fn fail_next_apply(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Every batch applied so far, in order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<Event>> {
        self.lock_batches().clone()
    }

    /// All applied events flattened into one position-ordered list.
    #[must_use]
    pub fn applied_events(&self) -> Vec<Event> {
        self.lock_batches().iter().flatten().cloned().collect()
    }

    fn lock_batches(&self) -> std::sync::MutexGuard<'_, Vec<Vec<Event>>> {
        self.batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_checkpoint(&self) -> std::sync::MutexGuard<'_, i64> {
        self.checkpoint
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ProjectionWriter for RecordingWriter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn subscribed_events(&self) -> &'static [&'static str] {
        self.subscribed
    }

    fn apply_migration(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Ok(()) })
    }

    fn latest_position(&self) -> BoxFuture<'_, Result<i64>> {
        Box::pin(async move { Ok(*self.lock_checkpoint()) })
    }

    fn apply<'a>(&'a self, events: &'a [Event]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(ProjectionError::EventProcessing(
                    "injected apply failure".to_string(),
                ));
            }

            let max_position = events.iter().map(|e| e.position).max().unwrap_or(0);
            self.lock_batches().push(events.to_vec());

            let mut checkpoint = self.lock_checkpoint();
            if max_position > *checkpoint {
                *checkpoint = max_position;
            }
            Ok(())
        })
    }
}
