/// Centralized test utilities for the storefront workspace
///
/// Shared error types, request builders, and id generators used by the
/// router and service tests to avoid duplicating plumbing across crates.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique string identifier for test isolation.
///
/// # Arguments
/// * `prefix` - A string prefix to identify the test type (e.g., "ORD", "ADDR")
pub fn generate_unique_id(prefix: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, timestamp, counter)
}

/// Generate a unique numeric test ID suitable for ModelId usage.
pub fn generate_unique_test_id() -> i64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst) as i64;

    (timestamp % 100_000) * 1_000_000 + counter
}

// =============================================================================
// UNIFIED TEST ERROR HANDLING
// =============================================================================

/// Unified error type for test failures across the workspace test suites.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Mock failure: {message}")]
    MockFailure { message: String },

    #[error("Assertion failed: {message}")]
    AssertionFailure { message: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: http::Error,
    },

    #[error("Order not found: {id}")]
    OrderNotFound { id: i64 },

    #[error("Generic test error: {message}")]
    Generic { message: String },
}

impl TestError {
    pub fn mock_failure(message: impl Into<String>) -> Self {
        Self::MockFailure {
            message: message.into(),
        }
    }

    pub fn assertion_failure(message: impl Into<String>) -> Self {
        Self::AssertionFailure {
            message: message.into(),
        }
    }

    pub fn order_not_found(id: i64) -> Self {
        Self::OrderNotFound { id }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

/// Alias for the standard test result type
pub type TestResult<T = ()> = Result<T, TestError>;

pub mod test_utils {
    use super::*;

    /// Safe HTTP request builder that returns TestError
    pub fn build_request(
        method: &str,
        uri: &str,
        body: Option<String>,
    ) -> TestResult<http::Request<String>> {
        let mut builder = http::Request::builder().uri(uri).method(method);

        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }

        let request = builder
            .body(body.unwrap_or_default())
            .map_err(TestError::from)?;

        Ok(request)
    }

    /// Safe JSON serialization that returns TestError
    pub fn serialize_json<T: serde::Serialize>(value: &T) -> TestResult<String> {
        serde_json::to_string(value).map_err(TestError::from)
    }

    /// Safe response status check
    pub fn check_status_code(
        actual: http::StatusCode,
        expected: http::StatusCode,
    ) -> TestResult<()> {
        if actual != expected {
            return Err(TestError::assertion_failure(format!(
                "Status code mismatch: expected {}, got {}",
                expected, actual
            )));
        }
        Ok(())
    }
}
