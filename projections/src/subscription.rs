//! The catch-up loop: periodically drains new events from the log into one
//! projection writer.
//!
//! # Algorithm
//!
//! 1. Run the writer's migration once at start
//! 2. Read the persisted checkpoint
//! 3. Every `refresh_interval`, while behind the log's max position, slide a
//!    window of `batch_size + 1` positions forward: fetch the subscribed
//!    events inside `(last, next]`, apply them if any, and advance `last`
//!    to `next` regardless — filtered-out positions must not stall progress
//! 4. On shutdown, return cleanly
//!
//! A writer error aborts the whole pump; the failed batch never advanced
//! the checkpoint, so a restart resumes at the same position.

use std::time::Duration;

use cartstream_core::projection::Result;
use cartstream_core::{EventLog, ProjectionError, ProjectionWriter};
use tokio::sync::watch;

/// A single projection's subscription to the event log.
pub struct Subscription<W> {
    writer: W,
    batch_size: i64,
    refresh_interval: Duration,
}

impl<W: ProjectionWriter> Subscription<W> {
    /// Create a subscription.
    ///
    /// `batch_size` caps the events fetched per database round-trip; it is
    /// a performance knob, not a correctness boundary. `refresh_interval`
    /// is the wall-clock pause between catch-up waves.
    #[must_use]
    pub const fn new(writer: W, batch_size: i64, refresh_interval: Duration) -> Self {
        Self {
            writer,
            batch_size,
            refresh_interval,
        }
    }

    /// Run the catch-up loop until shutdown.
    ///
    /// Returns `Ok(())` on a shutdown signal — a clean stop, not an error.
    ///
    /// # Errors
    ///
    /// - [`ProjectionError::Migration`] / [`ProjectionError::Checkpoint`]
    ///   when startup fails
    /// - any writer or log error from a catch-up wave, after which the pump
    ///   has terminated and the checkpoint still marks the failed batch as
    ///   unprocessed
    pub async fn listen(
        &self,
        log: &dyn EventLog,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        self.writer.apply_migration().await?;
        let mut last_position = self.writer.latest_position().await?;

        tracing::info!(
            projection = self.writer.name(),
            position = last_position,
            "subscription started"
        );

        let mut ticker = tokio::time::interval(self.refresh_interval);
        // The first tick completes immediately; consume it so waves start
        // one interval in.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(
                            projection = self.writer.name(),
                            position = last_position,
                            "shutdown signal received"
                        );
                        return Ok(());
                    }
                }
                _ = ticker.tick() => {
                    last_position = self.refresh(log, last_position, &shutdown).await?;
                }
            }
        }
    }

    /// One catch-up wave: drain the log from `last_position` to its current
    /// max, window by window. Returns the new checkpoint position.
    ///
    /// # Errors
    ///
    /// Propagates log and writer failures; the caller treats them as fatal
    /// for the pump.
    pub async fn refresh(
        &self,
        log: &dyn EventLog,
        mut last_position: i64,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<i64> {
        let subscribed = self.writer.subscribed_events();
        if subscribed.is_empty() {
            return Err(ProjectionError::NoSubscribedEvents);
        }

        let max_position = log.max_position().await?;

        while last_position < max_position {
            if *shutdown.borrow() {
                return Ok(last_position);
            }

            // Clamp the window so the final batch never reads past the max
            // observed at the start of this wave.
            let next_position = (last_position + self.batch_size + 1).min(max_position);
            let events = log.range(last_position, next_position, subscribed).await?;

            if !events.is_empty() {
                self.writer.apply(&events).await?;
                metrics::counter!(
                    "projection.events_applied",
                    "projection" => self.writer.name()
                )
                .increment(events.len() as u64);
            }

            // Advance even when the window held no subscribed events.
            last_position = next_position;
        }

        tracing::info!(
            projection = self.writer.name(),
            position = last_position,
            "caught up"
        );
        Ok(last_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartstream_checkout::{
        CART, CART_CHECKED_OUT, CART_CREATED, ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART,
    };
    use cartstream_core::{Clock, Event};
    use cartstream_testing::{test_clock, InMemoryEventLog, RecordingWriter};

    const ITEM_EVENTS: &[&str] = &[ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART, CART_CHECKED_OUT];

    fn event(aggregate_id: i64, version_id: i32, event_type: &str, item_id: i64) -> Event {
        Event {
            position: 0,
            event_type: event_type.to_string(),
            aggregate_type: CART.to_string(),
            aggregate_id,
            at: test_clock().now(),
            version_id,
            data: serde_json::json!({ "item_id": item_id }),
        }
    }

    async fn seed_item_added_events(log: &InMemoryEventLog, total: i64) {
        // Spread events across cart ids 1..=10, each stream version-gapless.
        for n in 0..total {
            let cart_id = n % 10 + 1;
            let version = i32::try_from(n / 10 + 2).unwrap();
            log.append(vec![event(cart_id, version, ITEM_ADDED_TO_CART, n + 1)])
                .await
                .unwrap();
        }
    }

    fn subscription(batch_size: i64) -> Subscription<RecordingWriter> {
        Subscription::new(
            RecordingWriter::new("recording", ITEM_EVENTS),
            batch_size,
            Duration::from_millis(10),
        )
    }

    async fn run_refresh(
        sub: &Subscription<RecordingWriter>,
        log: &InMemoryEventLog,
        from: i64,
    ) -> Result<i64> {
        let (_tx, rx) = watch::channel(false);
        sub.refresh(log, from, &rx).await
    }

    #[tokio::test]
    async fn delivers_every_subscribed_event_in_order() {
        let log = InMemoryEventLog::new();
        seed_item_added_events(&log, 100).await;

        let sub = subscription(7);
        let position = run_refresh(&sub, &log, 0).await.unwrap();

        assert_eq!(position, log.max_position().await.unwrap());

        let applied = sub.writer.applied_events();
        assert_eq!(applied.len(), 100);
        let positions: Vec<i64> = applied.iter().map(|e| e.position).collect();
        assert_eq!(positions, (1..=100).collect::<Vec<i64>>());

        // The writer's checkpoint caught up to the log's max position.
        assert_eq!(sub.writer.latest_position().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn batches_respect_the_window_size() {
        let log = InMemoryEventLog::new();
        seed_item_added_events(&log, 20).await;

        let sub = subscription(7);
        run_refresh(&sub, &log, 0).await.unwrap();

        // Windows cover batch_size + 1 positions each: 8, 8, 4.
        let sizes: Vec<usize> = sub.writer.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![8, 8, 4]);
    }

    #[tokio::test]
    async fn filtered_out_positions_do_not_stall_progress() {
        let log = InMemoryEventLog::new();
        // Only cart.created events: none subscribed.
        for cart_id in 1..=30 {
            log.append(vec![Event {
                data: serde_json::json!({}),
                ..event(cart_id, 1, CART_CREATED, 0)
            }])
            .await
            .unwrap();
        }

        let sub = subscription(9);
        let position = run_refresh(&sub, &log, 0).await.unwrap();

        assert_eq!(position, 30);
        assert!(sub.writer.applied_events().is_empty());
    }

    #[tokio::test]
    async fn checkpoint_resumes_where_the_last_wave_stopped() {
        let log = InMemoryEventLog::new();
        seed_item_added_events(&log, 10).await;

        let sub = subscription(25);
        let position = run_refresh(&sub, &log, 0).await.unwrap();
        assert_eq!(position, 10);

        // New events arrive; the next wave starts from the checkpoint.
        log.append(vec![event(11, 1, CART_CREATED, 0)]).await.unwrap();
        log.append(vec![event(11, 2, ITEM_ADDED_TO_CART, 500)])
            .await
            .unwrap();

        let position = run_refresh(&sub, &log, position).await.unwrap();
        assert_eq!(position, 12);

        let applied = sub.writer.applied_events();
        assert_eq!(applied.len(), 11);
        assert_eq!(applied.last().unwrap().data["item_id"].as_i64(), Some(500));
    }

    #[tokio::test]
    async fn writer_error_aborts_the_pump() {
        let log = InMemoryEventLog::new();
        seed_item_added_events(&log, 5).await;

        let sub = subscription(25);
        sub.writer.fail_next_apply();

        let err = run_refresh(&sub, &log, 0).await.unwrap_err();
        assert!(matches!(err, ProjectionError::EventProcessing(_)));
        // The failed batch advanced nothing.
        assert_eq!(sub.writer.latest_position().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_subscription_list_is_rejected() {
        let log = InMemoryEventLog::new();
        let sub = Subscription::new(
            RecordingWriter::new("empty", &[]),
            25,
            Duration::from_millis(10),
        );

        let err = run_refresh(&sub, &log, 0).await.unwrap_err();
        assert!(matches!(err, ProjectionError::NoSubscribedEvents));
    }

    #[tokio::test]
    async fn listen_returns_cleanly_on_shutdown() {
        let log = InMemoryEventLog::new();
        seed_item_added_events(&log, 3).await;

        let (tx, rx) = watch::channel(false);
        let sub = subscription(25);

        let listen = sub.listen(&log, rx);
        tokio::pin!(listen);

        // Let the pump catch up, then signal shutdown.
        tokio::select! {
            result = &mut listen => panic!("pump stopped early: {result:?}"),
            () = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
        tx.send(true).unwrap();

        listen.await.unwrap();
        assert_eq!(sub.writer.applied_events().len(), 3);
    }
}
