//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp stamped on signals when received and on jobs when created.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Milliseconds elapsed between `since` and now. Negative if `since` is in the future.
#[must_use]
pub fn elapsed_ms(since: Timestamp) -> i64 {
    (now() - since).num_milliseconds()
}
