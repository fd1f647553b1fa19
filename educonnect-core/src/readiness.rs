//! Readiness of the remote connection.
//!
//! The gate resolves exactly once, to either `Ready` or `Failed`. Waiters
//! suspend on the resolution event instead of re-polling; a wait that
//! times out leaves the gate untouched so the next caller tries again.

use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    NotStarted,
    Ready,
    Failed,
}

#[derive(Debug)]
pub struct ReadinessGate {
    state: watch::Sender<ReadinessState>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReadinessState::NotStarted);
        Self { state }
    }

    pub fn state(&self) -> ReadinessState {
        *self.state.borrow()
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    /// Resolves the gate as ready. Returns `false` if it was already
    /// resolved, in which case nothing changes.
    pub fn mark_ready(&self) -> bool {
        self.resolve(ReadinessState::Ready)
    }

    /// Resolves the gate as failed. Returns `false` if it was already
    /// resolved, in which case nothing changes.
    pub fn mark_failed(&self) -> bool {
        self.resolve(ReadinessState::Failed)
    }

    fn resolve(&self, next: ReadinessState) -> bool {
        let resolved = self.state.send_if_modified(|current| {
            if *current == ReadinessState::NotStarted {
                *current = next;
                true
            } else {
                false
            }
        });
        if resolved {
            tracing::debug!("Readiness resolved: {:?}", next);
        }
        resolved
    }

    /// Waits until the gate resolves or `timeout` elapses. Returns `true`
    /// only if the gate resolved to `Ready`.
    ///
    /// Returns immediately when the gate has already resolved.
    pub async fn await_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        match *rx.borrow_and_update() {
            ReadinessState::Ready => return true,
            ReadinessState::Failed => return false,
            ReadinessState::NotStarted => {}
        }

        let resolved = tokio::time::timeout(timeout, async {
            rx.wait_for(|state| *state != ReadinessState::NotStarted)
                .await
                .map(|state| *state)
        })
        .await;

        match resolved {
            Ok(Ok(state)) => state == ReadinessState::Ready,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::debug!("Timed out after {:?} waiting for remote", timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_starts_not_started() {
        let gate = ReadinessGate::new();
        assert_eq!(gate.state(), ReadinessState::NotStarted);
        assert!(!gate.is_ready());
    }

    #[test]
    fn test_first_writer_wins() {
        let gate = ReadinessGate::new();
        assert!(gate.mark_ready());
        assert!(!gate.mark_failed());
        assert!(!gate.mark_ready());
        assert_eq!(gate.state(), ReadinessState::Ready);

        let gate = ReadinessGate::new();
        assert!(gate.mark_failed());
        assert!(!gate.mark_ready());
        assert_eq!(gate.state(), ReadinessState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_when_already_ready_is_immediate() {
        let gate = ReadinessGate::new();
        gate.mark_ready();

        let start = Instant::now();
        assert!(gate.await_ready(Duration::from_secs(10)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_when_already_failed_is_immediate() {
        let gate = ReadinessGate::new();
        gate.mark_failed();

        let start = Instant::now();
        assert!(!gate.await_ready(Duration::from_secs(10)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_times_out_and_stays_unresolved() {
        let gate = ReadinessGate::new();

        let start = Instant::now();
        assert!(!gate.await_ready(Duration::from_millis(500)).await);
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(gate.state(), ReadinessState::NotStarted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_wakes_on_resolution() {
        let gate = Arc::new(ReadinessGate::new());
        let resolver = Arc::clone(&gate);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            resolver.mark_ready();
        });

        let start = Instant::now();
        assert!(gate.await_ready(Duration::from_secs(10)).await);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_reports_failure() {
        let gate = Arc::new(ReadinessGate::new());
        let resolver = Arc::clone(&gate);
        tokio::spawn(async move {
            resolver.mark_failed();
        });

        assert!(!gate.await_ready(Duration::from_secs(10)).await);
    }
}
