use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;

/// Drive `fut` until it completes or `cancel` fires.
///
/// On cancellation the in-flight future is dropped, which aborts the backend
/// call it wraps.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, GatewayError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(GatewayError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Like [`cancellable`], but also stops when the owning session's `lifetime`
/// token fires.
pub(crate) async fn cancellable_within<F: Future>(
    cancel: &CancellationToken,
    lifetime: &CancellationToken,
    fut: F,
) -> Result<F::Output, GatewayError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(GatewayError::Cancelled),
        () = lifetime.cancelled() => Err(GatewayError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let out = cancellable(&token, async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn pre_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { 7 }).await;
        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_pending_work() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let result = cancellable(&token, tokio::time::sleep(Duration::from_secs(60))).await;
        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }

    #[tokio::test]
    async fn lifetime_token_cancels_too() {
        let call = CancellationToken::new();
        let lifetime = CancellationToken::new();
        lifetime.cancel();
        let result = cancellable_within(&call, &lifetime, async { 1 }).await;
        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }
}
