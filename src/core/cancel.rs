//! Explicit cancellation token for the resolution phase.
//!
//! The build invoker holds a `CancelSource`; every in-flight resolver and
//! fetch holds a cheap `CancelToken` clone and races its network-bound
//! work against `cancelled()`. A cancelled task unwinds without committing
//! partial memo or cache entries.

use std::sync::LazyLock;

use tokio::sync::watch;

/// Shared sender behind every never-cancelled token; lives for the process
/// so the channel can never close.
static NEVER: LazyLock<watch::Sender<bool>> = LazyLock::new(|| watch::channel(false).0);

/// Owner side of a cancellation signal
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

/// Cheap, cloneable view of a cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Signal cancellation to every outstanding token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Token that can never be cancelled (for builds without an abort signal).
    pub fn never() -> Self {
        Self {
            rx: NEVER.subscribe(),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is signalled.
    ///
    /// Also resolves if the `CancelSource` is dropped, treating a vanished
    /// owner as an abort.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
