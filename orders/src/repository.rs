use crate::error::OrderResult;
use crate::model::{Address, ModelId, NewAddress, Order, Product};
use async_trait::async_trait;

/// A stock movement tied to one product. Positive quantities; the direction
/// is decided by the operation (reserve vs. release).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: ModelId,
    pub quantity: i32,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_products(&self, ids: &[ModelId]) -> OrderResult<Vec<Product>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order and apply its stock reservations in a single
    /// database transaction. Each reservation is a conditional decrement
    /// that fails (and aborts the whole transaction) when the product's
    /// stock would go negative, so a failed reservation never leaves a
    /// persisted order behind.
    async fn create_order(
        &self,
        order: &Order,
        reservations: &[StockAdjustment],
    ) -> OrderResult<Order>;

    async fn get_order(&self, id: ModelId) -> OrderResult<Option<Order>>;

    /// `user` filters to that customer's orders; `include_deleted` is the
    /// staff view of soft-deleted history.
    async fn list_orders(
        &self,
        user: Option<ModelId>,
        include_deleted: bool,
    ) -> OrderResult<Vec<Order>>;

    /// Save an updated order and release the given stock in the same
    /// transaction (used by cancellation and refund).
    async fn save_order(&self, order: &Order, released: &[StockAdjustment]) -> OrderResult<Order>;
}

#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Insert an address; when it is marked default, the user's other
    /// defaults are unset inside the same transaction.
    async fn create_address(&self, user_id: ModelId, address: &NewAddress)
        -> OrderResult<Address>;

    async fn get_address(&self, id: ModelId) -> OrderResult<Option<Address>>;

    async fn list_addresses(&self, user_id: ModelId) -> OrderResult<Vec<Address>>;
}
