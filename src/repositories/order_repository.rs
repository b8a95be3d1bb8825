use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{errors::ServiceError, models::order::Order};

/// Abstract durable store for the order aggregate. Updates are version
/// checked so concurrent writers to the same order are serialized: one wins,
/// the other observes [`ServiceError::ConcurrentModification`] and must
/// reload.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order together with its lines as one atomic unit,
    /// assigning the id. Returns the stored copy.
    async fn create(&self, order: Order) -> Result<Order, ServiceError>;

    async fn get(&self, id: i64) -> Result<Option<Order>, ServiceError>;

    /// Writes the order back if `order.version` still matches the stored
    /// version, bumping it. A stale version yields `ConcurrentModification`.
    async fn update(&self, order: Order) -> Result<Order, ServiceError>;
}

/// In-memory repository used by the default wiring and the test suite. The
/// per-entry lock held across the version check and write gives the same
/// pre-or-post visibility a row-level database update would.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<i64, Order>,
    next_id: AtomicI64,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, mut order: Order) -> Result<Order, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        order.id = id;
        order.version = 1;
        self.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(&id).map(|entry| entry.clone()))
    }

    async fn update(&self, mut order: Order) -> Result<Order, ServiceError> {
        let mut entry = self
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order.id)))?;
        if entry.version != order.version {
            return Err(ServiceError::ConcurrentModification(order.id));
        }
        order.version += 1;
        *entry = order.clone();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{PaymentMethod, PaymentStatus, DEFAULT_NOTES};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn draft_order() -> Order {
        Order {
            id: 0,
            user_id: None,
            is_guest_order: true,
            first_name: String::new(),
            last_name: String::new(),
            email: "guest@example.com".into(),
            phone_number: String::new(),
            shipping_address: "12 Bean St".into(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            order_date: Utc::now(),
            total_price: dec!(76000),
            notes: DEFAULT_NOTES.into(),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            transaction_id: None,
            payment_response: None,
            lines: vec![],
            version: 0,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let repo = InMemoryOrderRepository::new();
        let first = repo.create(draft_order()).await.unwrap();
        let second = repo.create(draft_order()).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.version, 1);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        let created = repo.create(draft_order()).await.unwrap();

        let mut winner = created.clone();
        winner.payment_status = PaymentStatus::Approved;
        repo.update(winner).await.unwrap();

        let mut loser = created;
        loser.payment_status = PaymentStatus::Rejected;
        let err = repo.update(loser).await.unwrap_err();
        assert!(matches!(err, ServiceError::ConcurrentModification(1)));

        let stored = repo.get(1).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Approved);
    }
}
