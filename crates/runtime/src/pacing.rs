use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Cooperative pause inserted between units of work.
///
/// A zero delay still hands control back to the scheduler once, so other tasks
/// on a single-threaded runtime get a turn between chunks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn pause(&self) {
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Like [`Pacer::pause`], but returns `false` as soon as `cancel` fires.
    pub async fn pause_or_cancel(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.pause() => true,
        }
    }
}
