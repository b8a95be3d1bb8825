use async_trait::async_trait;
use dashmap::DashMap;

use crate::{errors::ServiceError, models::cart::Cart};

/// Short-lived, session-keyed cart storage. The checkout core only ever reads
/// and clears through this seam; it never touches ambient session state.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the cart for the session, or an empty cart if none exists.
    async fn read(&self, session: &str) -> Result<Cart, ServiceError>;

    async fn write(&self, session: &str, cart: Cart) -> Result<(), ServiceError>;

    async fn clear(&self, session: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: DashMap<String, Cart>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn read(&self, session: &str) -> Result<Cart, ServiceError> {
        Ok(self
            .carts
            .get(session)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn write(&self, session: &str, cart: Cart) -> Result<(), ServiceError> {
        self.carts.insert(session.to_string(), cart);
        Ok(())
    }

    async fn clear(&self, session: &str) -> Result<(), ServiceError> {
        self.carts.remove(session);
        Ok(())
    }
}
