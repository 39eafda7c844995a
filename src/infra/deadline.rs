//! Per-call deadlines for network operations.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::{GatewayError, Result};

/// Run `fut`, failing with [`GatewayError::Timeout`] if it does not finish
/// within `deadline`. `None` waits indefinitely.
///
/// The inner future is dropped on expiry, which cancels the underlying
/// request for transports that support it.
pub async fn with_deadline<T, F>(operation: &str, deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(after) = deadline else {
        return fut.await;
    };

    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, ?after, "Network call exceeded its deadline");
            Err(GatewayError::Timeout {
                operation: operation.to_string(),
                after,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let result: Result<()> = with_deadline(
            "ledger submit",
            Some(Duration::from_secs(30)),
            std::future::pending(),
        )
        .await;

        match result {
            Err(GatewayError::Timeout { operation, after }) => {
                assert_eq!(operation, "ledger submit");
                assert_eq!(after, Duration::from_secs(30));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<()> = with_deadline("query", Some(Duration::from_secs(1)), async {
            Err(GatewayError::Internal("boom".into()))
        })
        .await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));
    }

    #[tokio::test]
    async fn test_no_deadline() {
        let value = with_deadline("query", None, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
