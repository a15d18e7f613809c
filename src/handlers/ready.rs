//! Readiness endpoint
//!
//! Always answers `ok` and touches no instrument.

/// Readiness handler
pub async fn handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_handler_returns_ok() {
        assert_eq!(handler().await, "ok");
    }
}
