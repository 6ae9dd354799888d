pub mod error;
pub mod model;
pub mod notify;
pub mod payment;
pub mod repository;
pub mod service;
pub mod status;
