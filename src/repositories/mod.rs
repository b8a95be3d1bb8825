pub mod cart_store;
pub mod order_repository;
pub mod product_lookup;

pub use cart_store::{CartStore, InMemoryCartStore};
pub use order_repository::{InMemoryOrderRepository, OrderRepository};
pub use product_lookup::{CatalogProduct, InMemoryProductLookup, ProductLookup};
