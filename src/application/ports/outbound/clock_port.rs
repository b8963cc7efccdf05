//! Clock port - source of the current time
//!
//! Rate limiting and idempotency retention read time through this trait so
//! tests can move time forward explicitly.

use chrono::{DateTime, Utc};

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
