use std::sync::Arc;

use tracing::instrument;

use crate::{
    errors::ServiceError,
    models::cart::Cart,
    repositories::{CartStore, ProductLookup},
};

/// Session cart mutations. This is the only place live catalog pricing is
/// read; every price downstream of here is a frozen copy.
pub struct CartService {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductLookup>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, products: Arc<dyn ProductLookup>) -> Self {
        Self { carts, products }
    }

    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        session: &str,
        product_id: i64,
        quantity: i32,
        selected_options: &str,
    ) -> Result<Cart, ServiceError> {
        let product = self
            .products
            .price_at(product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut cart = self.carts.read(session).await?;
        if quantity <= 0 {
            cart.remove_line(product_id, selected_options);
        } else {
            cart.add_line(product_id, &product.name, product.price, quantity, selected_options);
        }
        self.carts.write(session, cart.clone()).await?;
        Ok(cart)
    }

    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        session: &str,
        product_id: i64,
        quantity: i32,
    ) -> Result<Cart, ServiceError> {
        let mut cart = self.carts.read(session).await?;
        if !cart.set_quantity(product_id, quantity.max(1)) {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not in the cart",
                product_id
            )));
        }
        self.carts.write(session, cart.clone()).await?;
        Ok(cart)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        session: &str,
        product_id: i64,
        selected_options: &str,
    ) -> Result<Cart, ServiceError> {
        let mut cart = self.carts.read(session).await?;
        cart.remove_line(product_id, selected_options);
        self.carts.write(session, cart.clone()).await?;
        Ok(cart)
    }

    pub async fn get(&self, session: &str) -> Result<Cart, ServiceError> {
        self.carts.read(session).await
    }

    pub async fn count(&self, session: &str) -> Result<i32, ServiceError> {
        Ok(self.carts.read(session).await?.item_count())
    }
}
