use std::future::Future;
use std::time::Duration;

/// Outcome of racing a future against a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raced<T> {
    Completed(T),
    TimedOut,
}

/// Run `fut` until it finishes or `deadline` elapses, whichever comes first.
///
/// The losing branch is dropped before this returns, so a request that misses
/// the deadline is cancelled and can never deliver a result afterwards.
pub async fn race_with_deadline<F>(deadline: Duration, fut: F) -> Raced<F::Output>
where
    F: Future,
{
    tokio::select! {
        output = fut => Raced::Completed(output),
        _ = tokio::time::sleep(deadline) => Raced::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fast_future_completes() {
        let result = race_with_deadline(Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            7
        })
        .await;

        assert_eq!(result, Raced::Completed(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_is_cancelled() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        let result = race_with_deadline(Duration::from_secs(1), async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            "late"
        })
        .await;

        assert_eq!(result, Raced::TimedOut);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
