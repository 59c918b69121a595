//! Cooperative cancellation shared between a caller and a pipeline run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use postforge_shared::{PostforgeError, Result};

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

/// A clonable cancellation flag.
///
/// Stages check it before every model call and race it against in-flight
/// calls. Tripping it is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<Inner>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any waiters.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag has been tripped.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PostforgeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the flag is tripped.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Run `fut` unless the flag trips first.
    pub async fn race<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(PostforgeError::Cancelled),
            out = fut => out,
        }
    }
}
