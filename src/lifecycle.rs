// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cancellation signals for background tasks
//!
//! A [`CancellationSource`] owns a signal; any number of [`Cancellation`]
//! tokens observe it. Tokens are cheap to clone and can be awaited from
//! inside `tokio::select!` or used to wrap a future with [`Cancellation::run`].

use std::future::Future;

use tokio::sync::watch;

use crate::errors::{SubscriptionError, SubscriptionResult};

/// Owner side of a cancellation signal
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// New token observing this source
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// Token that is never cancelled
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal fires; pends forever if its source is gone
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let source_dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if source_dropped {
            std::future::pending::<()>().await;
        }
    }

    /// Drive `fut` to completion unless the signal fires first
    pub async fn run<F>(&self, fut: F) -> SubscriptionResult<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(SubscriptionError::Cancelled),
            output = fut => Ok(output),
        }
    }
}
