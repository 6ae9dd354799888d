pub mod api;
pub mod entities;
pub mod notify;
pub mod order_store;
pub mod payment;
