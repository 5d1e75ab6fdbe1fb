//! Cart repository: load-by-replay and atomic persistence.

use std::sync::Arc;

use cartstream_core::{Clock, EventLog, SystemClock};
use futures::future::BoxFuture;

use crate::aggregate::CartAggregate;
use crate::error::CheckoutError;
use crate::CART;

/// Repository contract for cart aggregates.
///
/// Dyn-compatible so the use-case layer can hold an
/// `Arc<dyn CartRepository>` and tests can substitute the in-memory log.
pub trait CartRepository: Send + Sync {
    /// Load a cart by replaying its events.
    ///
    /// Returns `Ok(None)` when the stream has no events — absence is not an
    /// error.
    fn get(&self, cart_id: i64) -> BoxFuture<'_, Result<Option<CartAggregate>, CheckoutError>>;

    /// Initialize a fresh cart and persist its creation event.
    fn create(&self, cart_id: i64) -> BoxFuture<'_, Result<CartAggregate, CheckoutError>>;

    /// Persist the aggregate's uncommitted events atomically, then commit
    /// the aggregate.
    fn save<'a>(
        &'a self,
        cart: &'a mut CartAggregate,
    ) -> BoxFuture<'a, Result<(), CheckoutError>>;
}

/// Cart repository over the append-only event log.
pub struct EventLogCartRepository {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
}

impl EventLogCartRepository {
    /// Create a repository stamping new events with the system clock.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self::with_clock(log, Arc::new(SystemClock))
    }

    /// Create a repository with an injected clock.
    #[must_use]
    pub fn with_clock(log: Arc<dyn EventLog>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock }
    }
}

impl CartRepository for EventLogCartRepository {
    fn get(&self, cart_id: i64) -> BoxFuture<'_, Result<Option<CartAggregate>, CheckoutError>> {
        Box::pin(async move {
            let events = self.log.by_aggregate(CART, cart_id).await?;
            if events.is_empty() {
                return Ok(None);
            }

            let mut cart = CartAggregate::with_clock(cart_id, self.clock.clone());
            cart.replay(events)?;
            Ok(Some(cart))
        })
    }

    fn create(&self, cart_id: i64) -> BoxFuture<'_, Result<CartAggregate, CheckoutError>> {
        Box::pin(async move {
            let mut cart = CartAggregate::with_clock(cart_id, self.clock.clone());
            cart.init()?;
            self.save(&mut cart).await?;
            Ok(cart)
        })
    }

    fn save<'a>(
        &'a self,
        cart: &'a mut CartAggregate,
    ) -> BoxFuture<'a, Result<(), CheckoutError>> {
        Box::pin(async move {
            for event in cart.uncommitted_events() {
                event
                    .validate()
                    .map_err(cartstream_core::EventLogError::from)?;
            }

            // Either every uncommitted event persists or none do.
            self.log.append(cart.uncommitted_events().to_vec()).await?;
            cart.commit();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CART_CHECKED_OUT, CART_CREATED, ITEM_ADDED_TO_CART, ITEM_REMOVED_FROM_CART};
    use cartstream_testing::InMemoryEventLog;

    fn repository() -> (EventLogCartRepository, Arc<InMemoryEventLog>) {
        let log = Arc::new(InMemoryEventLog::new());
        (EventLogCartRepository::new(log.clone()), log)
    }

    #[tokio::test]
    async fn get_on_empty_stream_is_none() {
        let (repo, _) = repository();
        assert!(repo.get(1001).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_persists_the_creation_event() {
        let (repo, log) = repository();

        let cart = repo.create(1001).await.unwrap();
        assert_eq!(cart.id, 1001);
        assert!(cart.uncommitted_events().is_empty());

        let events = log.all_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, CART_CREATED);
        assert_eq!(events[0].version_id, 1);
    }

    #[tokio::test]
    async fn replay_reconstructs_observable_state() {
        let (repo, _) = repository();

        let mut cart = repo.create(1001).await.unwrap();
        cart.add(42).unwrap();
        cart.add(43).unwrap();
        cart.remove(42).unwrap();
        cart.checkout().unwrap();
        repo.save(&mut cart).await.unwrap();

        let loaded = repo.get(1001).await.unwrap().unwrap();
        assert_eq!(loaded.contents, cart.contents);
        assert_eq!(loaded.checked_out, cart.checked_out);
        assert_eq!(loaded.current_version(), 5);
        // Replay must not leave anything to re-save.
        assert!(loaded.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn happy_path_persists_the_expected_event_sequence() {
        let (repo, log) = repository();

        let mut cart = repo.create(1001).await.unwrap();
        cart.add(42).unwrap();
        cart.add(43).unwrap();
        cart.remove(42).unwrap();
        cart.checkout().unwrap();
        repo.save(&mut cart).await.unwrap();

        assert_eq!(cart.contents, vec![43]);
        assert!(cart.checked_out);

        let events = log.all_events();
        let summary: Vec<(&str, i32)> = events
            .iter()
            .map(|e| (e.event_type.as_str(), e.version_id))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CART_CREATED, 1),
                (ITEM_ADDED_TO_CART, 2),
                (ITEM_ADDED_TO_CART, 3),
                (ITEM_REMOVED_FROM_CART, 4),
                (CART_CHECKED_OUT, 5),
            ]
        );
        assert_eq!(events[1].data["item_id"].as_i64(), Some(42));
        assert_eq!(events[2].data["item_id"].as_i64(), Some(43));
        assert_eq!(events[3].data["item_id"].as_i64(), Some(42));
    }

    #[tokio::test]
    async fn remove_missing_item_persists_nothing() {
        let (repo, log) = repository();

        let mut cart = repo.create(1001).await.unwrap();
        cart.remove(99).unwrap();
        repo.save(&mut cart).await.unwrap();

        assert_eq!(log.all_events().len(), 1);
    }

    #[tokio::test]
    async fn rejected_command_after_checkout_persists_nothing_extra() {
        let (repo, log) = repository();

        let mut cart = repo.create(1001).await.unwrap();
        cart.checkout().unwrap();
        repo.save(&mut cart).await.unwrap();

        assert!(cart.add(1).is_err());
        repo.save(&mut cart).await.unwrap();

        let events = log.all_events();
        let types: Vec<&str> = events
            .iter()
            .map(|e| e.event_type.as_str())
            .collect();
        assert_eq!(types, vec![CART_CREATED, CART_CHECKED_OUT]);
    }

    #[tokio::test]
    async fn concurrent_writer_loses_with_a_conflict() {
        let (repo, _) = repository();
        repo.create(1001).await.unwrap();

        let mut first = repo.get(1001).await.unwrap().unwrap();
        let mut second = repo.get(1001).await.unwrap().unwrap();

        first.add(42).unwrap();
        repo.save(&mut first).await.unwrap();

        second.add(43).unwrap();
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn saved_versions_are_gapless_across_sessions() {
        let (repo, log) = repository();

        let mut cart = repo.create(1001).await.unwrap();
        cart.add(1).unwrap();
        repo.save(&mut cart).await.unwrap();

        let mut reloaded = repo.get(1001).await.unwrap().unwrap();
        reloaded.add(2).unwrap();
        reloaded.checkout().unwrap();
        repo.save(&mut reloaded).await.unwrap();

        let versions: Vec<i32> = log
            .by_aggregate(CART, 1001)
            .await
            .unwrap()
            .iter()
            .map(|e| e.version_id)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4]);
    }
}
