use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Granularity at which interruptible sleeps re-check the cancel flag.
///
/// Keeps stop latency well under a second regardless of how long the
/// requested delay is.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Shared cooperative-cancellation flag.
///
/// The only piece of run state mutated from outside the worker thread. A stop
/// request sets the flag; the worker observes it between actions and inside
/// interruptible sleeps. Cloning is cheap and shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; returns immediately.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can back a fresh run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sleep for `duration`, waking early if `cancel` fires.
///
/// Returns `true` if the full duration elapsed, `false` if the sleep was cut
/// short by cancellation.
pub fn sleep_interruptible(duration: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert!(sleep_interruptible(Duration::from_millis(30), &token));
    }

    #[test]
    fn sleep_exits_early_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        let completed = sleep_interruptible(Duration::from_secs(10), &token);
        handle.join().unwrap();
        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
