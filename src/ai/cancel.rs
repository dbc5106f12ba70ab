use std::future::Future;
use tokio::sync::watch;

use super::{ChatError, ChatResult};

/// Caller side of a cancellation pair. Dropping it never cancels.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by a send at every await point and before each buffered record.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that can never fire.
    pub fn never() -> Self {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// `Err(Cancelled)` once the token has fired. Used between callbacks, where
    /// there is no await point for `run` to race against.
    pub fn check(&self) -> ChatResult<()> {
        if self.is_cancelled() {
            return Err(ChatError::Cancelled);
        }
        Ok(())
    }

    /// Resolves once the token is cancelled; pending forever if the handle is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Race `fut` against cancellation.
    pub async fn run<F: Future>(&mut self, fut: F) -> ChatResult<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ChatError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn run_returns_output_when_not_cancelled() {
        let mut token = CancelToken::never();
        let out = token.run(async { 7 }).await.unwrap();
        assert_eq!(out, 7);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_future() {
        let (handle, mut token) = CancelToken::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });
        let result = token.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(ChatError::Cancelled)));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_token_wins_immediately() {
        let (handle, mut token) = CancelToken::new();
        handle.cancel();
        let result = token.run(async { 1 }).await;
        assert!(matches!(result, Err(ChatError::Cancelled)));
    }

    #[test]
    fn check_reflects_cancellation() {
        let (handle, token) = CancelToken::new();
        assert!(token.check().is_ok());
        handle.cancel();
        assert!(matches!(token.check(), Err(ChatError::Cancelled)));
    }
}
