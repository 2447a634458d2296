//! Cancellation handed explicitly into the collector loop.
//!
//! A [`CancelHandle`] is held by whoever decides to stop (the signal task in
//! the binary, a test), the [`CancelToken`] by the loop doing blocking reads.

use std::future::Future;

use tokio::sync::watch;

/// Requests cancellation.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle and token.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancellation is requested.
    ///
    /// Never completes if the handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Races a future against cancellation, returns `None` if cancelled.
///
/// Cancellation is checked first, so an already cancelled token never polls `fut`.
pub async fn race_with_cancellation<T, F>(fut: F, token: &mut CancelToken) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = fut => Some(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn race_returns_none_when_cancelled() {
        let (handle, mut token) = cancellation();
        handle.cancel();
        assert!(token.is_cancelled());
        let result = race_with_cancellation(std::future::pending::<()>(), &mut token).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn race_returns_result_when_not_cancelled() {
        let (_handle, mut token) = cancellation();
        let result = race_with_cancellation(async { 7 }, &mut token).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn cancel_wakes_a_pending_race() {
        let (handle, mut token) = cancellation();
        let waiter = tokio::spawn(async move {
            race_with_cancellation(std::future::pending::<()>(), &mut token).await
        });
        tokio::task::yield_now().await;
        handle.cancel();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropped_handle_is_not_cancellation() {
        let (handle, mut token) = cancellation();
        let other = handle.token();
        drop(handle);
        assert!(!other.is_cancelled());
        let result = race_with_cancellation(async { "read" }, &mut token).await;
        assert_eq!(result, Some("read"));
    }
}
