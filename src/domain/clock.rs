use chrono::{DateTime, Utc};
use mockall::automock;

/// Source of "now" for everything that stamps or compares times.
/// Injected so subscription windows and cache expiry are testable.
#[automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
