//! Cancellation-context tree rooted at process lifetime.
//!
//! Every download owns a `CancelContext` derived from a parent via
//! `child()`; cancelling a parent cancels every descendant, but a child can
//! be cancelled on its own (e.g. a single `read_stream` call timing out)
//! without affecting siblings. This replaces the coroutine-style
//! "goroutine reads from a context.Done() channel" pattern with an explicit,
//! ownable value any task can poll or await.

use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct CancelContext(CancellationToken);

impl CancelContext {
    pub fn root() -> Self {
        Self(CancellationToken::new())
    }

    /// Derives a scope that is cancelled whenever `self` is cancelled, but
    /// can also be cancelled independently.
    pub fn child(&self) -> Self {
        Self(self.0.child_token())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}
