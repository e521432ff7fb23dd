//! Timeout and cancellation for collaborator calls

use picforge_common::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a guarded call is, for error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Completion,
    Collaborator,
}

/// Run `fut` until it finishes, times out, or `cancel` fires.
///
/// Completion timeouts surface as [`AppError::CompletionTimeout`]; any other
/// call surfaces as [`AppError::Timeout`] naming `operation`.
pub async fn bounded<T, F>(
    operation: &str,
    kind: CallKind,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timeout_ms = timeout.as_millis() as u64;

    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(AppError::Cancelled),

        outcome = tokio::time::timeout(timeout, fut) => match outcome {
            Ok(result) => result,
            Err(_) => Err(match kind {
                CallKind::Completion => AppError::CompletionTimeout { timeout_ms },
                CallKind::Collaborator => AppError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms,
                },
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picforge_common::ErrorCode;

    #[tokio::test]
    async fn test_passes_through_result() {
        let cancel = CancellationToken::new();
        let value = bounded("retrieval", CallKind::Collaborator, Duration::from_secs(1), &cancel, async {
            Ok::<_, AppError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_completion_timeout_is_distinct() {
        let cancel = CancellationToken::new();
        let err = bounded("intent", CallKind::Completion, Duration::from_millis(10), &cancel, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CompletionTimeout);
    }

    #[tokio::test]
    async fn test_collaborator_timeout_names_operation() {
        let cancel = CancellationToken::new();
        let err = bounded("classify", CallKind::Collaborator, Duration::from_millis(10), &cancel, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CollaboratorTimeout);
        assert!(err.to_string().contains("classify"));
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bounded("retrieval", CallKind::Collaborator, Duration::from_secs(5), &cancel, async {
            Ok::<_, AppError>(1)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }
}
