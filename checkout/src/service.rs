//! Use-case layer: the operations the HTTP surface calls into.

use std::sync::Arc;

use crate::aggregate::CartAggregate;
use crate::error::CheckoutError;
use crate::repository::CartRepository;

/// Cart use cases: each loads the aggregate, runs one command, and saves.
///
/// There is no retry loop around a version conflict — the losing writer's
/// command fails and the caller decides whether to re-fetch and retry.
pub struct CheckoutService {
    repository: Arc<dyn CartRepository>,
}

impl CheckoutService {
    /// Create the service over a repository.
    #[must_use]
    pub fn new(repository: Arc<dyn CartRepository>) -> Self {
        Self { repository }
    }

    /// Load a cart, creating it on first access.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn cart_details(&self, cart_id: i64) -> Result<CartAggregate, CheckoutError> {
        match self.repository.get(cart_id).await? {
            Some(cart) => Ok(cart),
            None => self.repository.create(cart_id).await,
        }
    }

    /// Add an item to an existing cart.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NotFound`] when the cart has no history
    /// - [`CheckoutError::AddToCheckedOut`] on a terminal cart
    pub async fn add_item(
        &self,
        cart_id: i64,
        item_id: i64,
    ) -> Result<CartAggregate, CheckoutError> {
        let mut cart = self
            .repository
            .get(cart_id)
            .await?
            .ok_or(CheckoutError::NotFound(cart_id))?;

        cart.add(item_id)?;
        self.repository.save(&mut cart).await?;
        Ok(cart)
    }

    /// Remove an item from an existing cart. Removing an item the cart does
    /// not hold succeeds and persists nothing.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NotFound`] when the cart has no history
    /// - [`CheckoutError::RemoveFromCheckedOut`] on a terminal cart
    pub async fn remove_item(
        &self,
        cart_id: i64,
        item_id: i64,
    ) -> Result<CartAggregate, CheckoutError> {
        let mut cart = self
            .repository
            .get(cart_id)
            .await?
            .ok_or(CheckoutError::NotFound(cart_id))?;

        cart.remove(item_id)?;
        self.repository.save(&mut cart).await?;
        Ok(cart)
    }

    /// Check an existing cart out.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NotFound`] when the cart has no history
    /// - [`CheckoutError::AlreadyCheckedOut`] on a second checkout
    pub async fn checkout(&self, cart_id: i64) -> Result<CartAggregate, CheckoutError> {
        let mut cart = self
            .repository
            .get(cart_id)
            .await?
            .ok_or(CheckoutError::NotFound(cart_id))?;

        cart.checkout()?;
        self.repository.save(&mut cart).await?;
        Ok(cart)
    }
}
