use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::errors::ServiceError;

/// Minimal catalog view the cart needs when a line is added.
#[derive(Debug, Clone)]
pub struct CatalogProduct {
    pub name: String,
    pub price: Decimal,
}

/// Read-only catalog seam. Consulted exactly once per cart line, at
/// add-to-cart time; nothing downstream of the snapshot re-prices.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn price_at(&self, product_id: i64) -> Result<Option<CatalogProduct>, ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProductLookup {
    products: DashMap<i64, CatalogProduct>,
}

impl InMemoryProductLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product_id: i64, name: &str, price: Decimal) {
        self.products.insert(
            product_id,
            CatalogProduct {
                name: name.to_string(),
                price,
            },
        );
    }
}

#[async_trait]
impl ProductLookup for InMemoryProductLookup {
    async fn price_at(&self, product_id: i64) -> Result<Option<CatalogProduct>, ServiceError> {
        Ok(self.products.get(&product_id).map(|entry| entry.clone()))
    }
}
