//! Bounds for numeric settings.

/// Storage account names need at least 3 characters; with a short prefix a
/// suffix below this length makes collisions likely.
pub const MIN_SUFFIX_LENGTH: usize = 4;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

pub const DEFAULT_MAX_WAIT_SECS: u64 = 30 * 60;
pub const MAX_WAIT_LIMIT_SECS: u64 = 4 * 60 * 60;
