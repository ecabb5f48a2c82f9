//! Cancellation and deadline plumbing handed to every initializer and
//! release function.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{LookoutError, Result};

/// Cancellable context with an optional deadline.
///
/// Cloning shares the cancellation token; cancelling any clone cancels all of
/// them. Nothing here imposes a timeout on its own: a context without a
/// deadline waits as long as the callee decides to.
#[derive(Debug, Clone)]
pub struct LifecycleContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl LifecycleContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self { token: CancellationToken::new(), deadline: None }
    }

    /// No deadline when `timeout` is too large to represent as an `Instant`
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::background(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().child_with_deadline(deadline)
    }

    /// Derived context: cancelled when `self` is, and never outlives its deadline
    pub fn child(&self) -> Self {
        Self { token: self.token.child_token(), deadline: self.deadline }
    }

    /// Derived context with a tighter deadline (the earlier of the two wins)
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self { token: self.token.child_token(), deadline: Some(deadline) }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token for async code that wants to `select!` on cancellation
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// `Err` once the context is cancelled or past its deadline
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(LookoutError::Cancelled);
        }
        if self.is_expired() {
            return Err(LookoutError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Time a blocking call may spend before it has to give up.
    ///
    /// Zero once cancelled or expired, the time left until the deadline
    /// otherwise, and `default` when there is no deadline.
    pub fn budget(&self, default: Duration) -> Duration {
        if self.is_cancelled() {
            return Duration::ZERO;
        }
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => default,
        }
    }
}

impl Default for LifecycleContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let ctx = LifecycleContext::background();
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.budget(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_propagates_to_children() {
        let parent = LifecycleContext::background();
        let child = parent.child();
        parent.cancel();

        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(LookoutError::Cancelled)));
        assert_eq!(child.budget(Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = LifecycleContext::background();
        parent.child().cancel();
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = LifecycleContext::with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(LookoutError::DeadlineExceeded)));
        assert_eq!(ctx.budget(Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_huge_timeout_has_no_deadline() {
        let ctx = LifecycleContext::with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_child_keeps_earlier_deadline() {
        let parent = LifecycleContext::with_timeout(Duration::from_secs(1));
        let child = parent.child_with_deadline(Instant::now() + Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
        assert!(child.budget(Duration::from_secs(60)) <= Duration::from_secs(1));
    }
}
