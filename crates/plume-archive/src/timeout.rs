use std::future::Future;
use std::time::Duration;

use crate::error::{ArchiveError, ArchiveResult};

/// Run an archive operation, failing with [`ArchiveError::Timeout`] if it
/// does not complete within `timeout`. With no timeout the operation runs
/// unbounded.
pub async fn within<T, F>(timeout: Option<Duration>, path: &str, op: F) -> ArchiveResult<T>
where
    F: Future<Output = ArchiveResult<T>>,
{
    match timeout {
        None => op.await,
        Some(after) => match tokio::time::timeout(after, op).await {
            Ok(result) => result,
            Err(_) => Err(ArchiveError::Timeout {
                path: path.to_string(),
                after,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_passes_result_through() {
        let ok: ArchiveResult<u8> = within(None, "/x", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: ArchiveResult<u8> =
            within(None, "/x", async { Err(ArchiveError::NotFound("/x".into())) }).await;
        assert!(err.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn slow_operation_is_classified_as_timeout() {
        let result: ArchiveResult<()> = within(Some(Duration::from_millis(10)), "/slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("/slow"));
    }

    #[tokio::test]
    async fn fast_operation_beats_timeout() {
        let result = within(Some(Duration::from_secs(5)), "/fast", async { Ok("done") }).await;
        assert_eq!(result.unwrap(), "done");
    }
}
