use std::time::{Duration, Instant};

/// Identifies one polling run; echoed back by the content view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(pub u64);

/// One tweet-page lookup. `epoch` is fixed at creation and anchors the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupSession {
    pub token: SessionToken,
    pub epoch: Instant,
    pub period: Duration,
    pub timeout: Duration,
}

impl LookupSession {
    pub fn new(token: SessionToken, epoch: Instant, period: Duration, timeout: Duration) -> Self {
        Self {
            token,
            epoch,
            period,
            timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.epoch + self.timeout
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.epoch)
    }
}
