//! In-memory event log for fast, deterministic tests.

use std::sync::Mutex;

use cartstream_core::{Event, EventLog, EventLogError};
use futures::future::BoxFuture;

/// In-memory [`EventLog`] implementation.
///
/// Assigns positions sequentially on append and enforces the same
/// per-aggregate `(aggregate_type, aggregate_id, version_id)` uniqueness as
/// the Postgres store, surfacing violations as [`EventLogError::Conflict`].
/// Appends are atomic: a batch with any invalid or conflicting event leaves
/// the log untouched.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored event in position order.
    #[must_use]
    pub fn all_events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, events: Vec<Event>) -> BoxFuture<'_, Result<(), EventLogError>> {
        Box::pin(async move {
            let mut log = self.lock();

            // Validate the whole batch before mutating anything.
            for (offset, event) in events.iter().enumerate() {
                event.validate()?;

                let duplicate = log
                    .iter()
                    .chain(events.iter().take(offset))
                    .any(|existing| {
                        existing.aggregate_type == event.aggregate_type
                            && existing.aggregate_id == event.aggregate_id
                            && existing.version_id == event.version_id
                    });
                if duplicate {
                    return Err(EventLogError::Conflict {
                        aggregate_type: event.aggregate_type.clone(),
                        aggregate_id: event.aggregate_id,
                        version_id: event.version_id,
                    });
                }
            }

            let mut position = log.last().map_or(0, |event| event.position);
            for mut event in events {
                position += 1;
                event.position = position;
                log.push(event);
            }
            Ok(())
        })
    }

    fn max_position(&self) -> BoxFuture<'_, Result<i64, EventLogError>> {
        Box::pin(async move { Ok(self.lock().last().map_or(0, |event| event.position)) })
    }

    fn range<'a>(
        &'a self,
        start_exclusive: i64,
        end_inclusive: i64,
        event_types: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Vec<Event>, EventLogError>> {
        Box::pin(async move {
            if event_types.is_empty() {
                return Err(EventLogError::EmptyTypeFilter);
            }

            Ok(self
                .lock()
                .iter()
                .filter(|event| {
                    event.position > start_exclusive
                        && event.position <= end_inclusive
                        && event_types.contains(&event.event_type.as_str())
                })
                .cloned()
                .collect())
        })
    }

    fn by_aggregate<'a>(
        &'a self,
        aggregate_type: &'a str,
        aggregate_id: i64,
    ) -> BoxFuture<'a, Result<Vec<Event>, EventLogError>> {
        Box::pin(async move {
            let mut events: Vec<Event> = self
                .lock()
                .iter()
                .filter(|event| {
                    event.aggregate_type == aggregate_type && event.aggregate_id == aggregate_id
                })
                .cloned()
                .collect();
            events.sort_by_key(|event| event.version_id);
            Ok(events)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(aggregate_id: i64, version_id: i32, event_type: &str) -> Event {
        Event {
            position: 0,
            event_type: event_type.to_string(),
            aggregate_type: "cart".to_string(),
            aggregate_id,
            at: Utc::now(),
            version_id,
            data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_positions() {
        let log = InMemoryEventLog::new();
        log.append(vec![event(1, 1, "cart.created"), event(1, 2, "cart.item_added")])
            .await
            .unwrap();
        log.append(vec![event(2, 1, "cart.created")]).await.unwrap();

        let positions: Vec<i64> = log.all_events().iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(log.max_position().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_version_is_a_conflict() {
        let log = InMemoryEventLog::new();
        log.append(vec![event(1, 1, "cart.created")]).await.unwrap();

        let err = log
            .append(vec![event(1, 1, "cart.created")])
            .await
            .unwrap_err();
        assert!(matches!(err, EventLogError::Conflict { version_id: 1, .. }));
    }

    #[tokio::test]
    async fn conflicting_batch_is_rejected_whole() {
        let log = InMemoryEventLog::new();
        log.append(vec![event(1, 1, "cart.created")]).await.unwrap();

        let err = log
            .append(vec![event(1, 2, "cart.item_added"), event(1, 2, "cart.item_added")])
            .await
            .unwrap_err();
        assert!(matches!(err, EventLogError::Conflict { .. }));
        assert_eq!(log.all_events().len(), 1);
    }

    #[tokio::test]
    async fn range_is_exclusive_inclusive_and_filtered() {
        let log = InMemoryEventLog::new();
        log.append(vec![
            event(1, 1, "cart.created"),
            event(1, 2, "cart.item_added"),
            event(1, 3, "cart.item_added"),
            event(1, 4, "cart.checked_out"),
        ])
        .await
        .unwrap();

        let events = log.range(1, 3, &["cart.item_added"]).await.unwrap();
        let positions: Vec<i64> = events.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![2, 3]);
    }

    #[tokio::test]
    async fn range_rejects_empty_filter() {
        let log = InMemoryEventLog::new();
        let err = log.range(0, 10, &[]).await.unwrap_err();
        assert!(matches!(err, EventLogError::EmptyTypeFilter));
    }

    #[tokio::test]
    async fn by_aggregate_orders_by_version() {
        let log = InMemoryEventLog::new();
        log.append(vec![event(1, 1, "cart.created")]).await.unwrap();
        log.append(vec![event(2, 1, "cart.created")]).await.unwrap();
        log.append(vec![event(1, 2, "cart.item_added")]).await.unwrap();

        let events = log.by_aggregate("cart", 1).await.unwrap();
        let versions: Vec<i32> = events.iter().map(|e| e.version_id).collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
