//! Per-session cart storage.
//!
//! Each session owns one [`CartLines`]. Mutations go through moka's per-key
//! compute, so concurrent requests from the same session apply one at a time
//! while different sessions never contend. The store has no capacity bound:
//! a cart lives exactly as long as its session's inactivity window.

use std::future::ready;
use std::time::Duration;

use itu_shop_core::{CartError, CartLines, ProductCode, SessionId, validate_quantity};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::{debug, instrument};

/// Session-keyed cart store.
#[derive(Clone)]
pub struct CartStore {
    carts: Cache<SessionId, CartLines>,
}

impl CartStore {
    /// Create a store whose carts expire after `idle` without access.
    ///
    /// Pass the session inactivity window so a cart never outlives, or is
    /// dropped before, the session that owns it.
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        let carts = Cache::builder().time_to_idle(idle).build();

        Self { carts }
    }

    /// Snapshot of a session's cart; empty if it has none.
    pub async fn get(&self, session: SessionId) -> CartLines {
        self.carts.get(&session).await.unwrap_or_default()
    }

    /// Add `quantity` of `code`, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] before touching the store.
    #[instrument(skip(self), fields(session = %session, code = %code))]
    pub async fn add(
        &self,
        session: SessionId,
        code: ProductCode,
        quantity: i64,
    ) -> Result<CartLines, CartError> {
        validate_quantity(quantity)?;

        let lines = self
            .mutate(session, &code, true, |lines| {
                lines.add(code.clone(), quantity).map(|_| ())
            })
            .await?;

        debug!(items = lines.item_count(), "Added to cart");
        Ok(lines)
    }

    /// Set the quantity of an existing line; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] above the maximum and
    /// [`CartError::NotFound`] if the line does not exist.
    #[instrument(skip(self), fields(session = %session, code = %code))]
    pub async fn update(
        &self,
        session: SessionId,
        code: &ProductCode,
        quantity: i64,
    ) -> Result<CartLines, CartError> {
        if quantity > 0 {
            validate_quantity(quantity)?;
        }

        let lines = self
            .mutate(session, code, false, |lines| {
                lines.update(code, quantity).map(|_| ())
            })
            .await?;

        debug!(items = lines.item_count(), "Updated cart line");
        Ok(lines)
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the line does not exist.
    #[instrument(skip(self), fields(session = %session, code = %code))]
    pub async fn remove(
        &self,
        session: SessionId,
        code: &ProductCode,
    ) -> Result<CartLines, CartError> {
        let lines = self
            .mutate(session, code, false, |lines| lines.remove(code).map(|_| ()))
            .await?;

        debug!(items = lines.item_count(), "Removed cart line");
        Ok(lines)
    }

    /// Apply `apply` to the session's cart under the entry's compute lock.
    ///
    /// A missing cart is created only when `create` is set; otherwise it is
    /// reported as [`CartError::NotFound`] for `code`. On error nothing is
    /// written.
    async fn mutate<F>(
        &self,
        session: SessionId,
        code: &ProductCode,
        create: bool,
        apply: F,
    ) -> Result<CartLines, CartError>
    where
        F: FnOnce(&mut CartLines) -> Result<(), CartError>,
    {
        let result = self
            .carts
            .entry(session)
            .and_try_compute_with(|entry| {
                let current = match entry {
                    Some(entry) => Some(entry.into_value()),
                    None if create => Some(CartLines::new()),
                    None => None,
                };
                let outcome = current
                    .ok_or_else(|| CartError::NotFound(code.clone()))
                    .and_then(|mut lines| apply(&mut lines).map(|()| Op::Put(lines)));
                ready(outcome)
            })
            .await?;

        Ok(match result {
            CompResult::Inserted(entry)
            | CompResult::ReplacedWith(entry)
            | CompResult::Unchanged(entry)
            | CompResult::Removed(entry) => entry.into_value(),
            CompResult::StillNone(_) => CartLines::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> CartStore {
        CartStore::new(Duration::from_secs(60))
    }

    fn code(s: &str) -> ProductCode {
        ProductCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_add_creates_cart() {
        let store = store();
        let session = SessionId::generate();

        let lines = store.add(session, code("P1"), 2).await.unwrap();

        assert_eq!(lines.quantity(&code("P1")), Some(2));
        assert_eq!(store.get(session).await, lines);
    }

    #[tokio::test]
    async fn test_invalid_add_does_not_create_cart() {
        let store = store();
        let session = SessionId::generate();

        assert!(matches!(
            store.add(session, code("P1"), 0).await,
            Err(CartError::InvalidQuantity { .. })
        ));
        assert!(store.carts.get(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_update_without_cart_is_not_found() {
        let store = store();
        let session = SessionId::generate();

        assert_eq!(
            store.update(session, &code("P1"), 3).await,
            Err(CartError::NotFound(code("P1")))
        );
        assert_eq!(
            store.remove(session, &code("P1")).await,
            Err(CartError::NotFound(code("P1")))
        );
    }

    #[tokio::test]
    async fn test_update_above_max_rejected_before_lookup() {
        let store = store();
        let session = SessionId::generate();

        assert!(matches!(
            store.update(session, &code("P1"), 11).await,
            Err(CartError::InvalidQuantity { got: 11, .. })
        ));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store();
        let alice = SessionId::generate();
        let bob = SessionId::generate();

        store.add(alice, code("P1"), 1).await.unwrap();
        store.add(bob, code("P2"), 4).await.unwrap();
        store.remove(bob, &code("P2")).await.unwrap();

        assert_eq!(store.get(alice).await.quantity(&code("P1")), Some(1));
        assert!(store.get(bob).await.is_empty());
        assert_eq!(
            store.remove(bob, &code("P1")).await,
            Err(CartError::NotFound(code("P1")))
        );
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = store();
        let session = SessionId::generate();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add(session, code("P1"), 1).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.get(session).await.quantity(&code("P1")), Some(10));
    }

    #[tokio::test]
    async fn test_cart_survives_while_session_is_alive() {
        let store = store();
        let session = SessionId::generate();
        store.add(session, code("P1"), 1).await.unwrap();

        for _ in 0..500 {
            store.add(SessionId::generate(), code("P2"), 1).await.unwrap();
        }
        store.carts.run_pending_tasks().await;

        assert_eq!(store.get(session).await.quantity(&code("P1")), Some(1));
        let lines = store.update(session, &code("P1"), 4).await.unwrap();
        assert_eq!(store.get(session).await, lines);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cart_unchanged() {
        let store = store();
        let session = SessionId::generate();
        store.add(session, code("P1"), 2).await.unwrap();

        assert!(store.remove(session, &code("P9")).await.is_err());

        assert_eq!(store.get(session).await.quantity(&code("P1")), Some(2));
        assert_eq!(store.get(session).await.len(), 1);
    }
}
