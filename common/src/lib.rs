//! Common utilities shared across the storefront workspace
//!
//! This crate provides shared functionality used by the other members:
//!
//! - Typed configuration loaded from YAML (with `!include` merging)
//! - Shared test utilities and error types for router/service tests

pub mod config;
pub mod yaml_include;

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_id, generate_unique_test_id};
