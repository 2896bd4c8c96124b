//! TTL policy and resolution
//!
//! Every write resolves the record's remaining lifetime in seconds. A custom
//! policy always wins; otherwise a cookie expiration time is converted to
//! whole seconds (rounded up); otherwise a fixed fallback applies.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::session::SessionRecord;

/// Fallback session lifetime when nothing else determines one: one day.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;

/// Signature for user-supplied TTL callbacks
pub type TtlFn = dyn Fn(&SessionRecord) -> i64 + Send + Sync;

/// How a record's remaining lifetime is determined on write
#[derive(Clone)]
pub enum TtlPolicy {
    /// Fixed lifetime in seconds, used when the record has no cookie expiry
    Fixed(i64),
    /// Callback invoked for every record; its result is used verbatim
    Custom(Arc<TtlFn>),
}

impl TtlPolicy {
    /// Wrap a closure as a custom policy
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&SessionRecord) -> i64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_SESSION_TTL_SECS)
    }
}

impl fmt::Debug for TtlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(secs) => f.debug_tuple("Fixed").field(secs).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Resolve the TTL to stamp on a record at write time
///
/// Precedence: a custom policy is consulted first and its result returned
/// verbatim, even when the record carries a cookie expiry. Without one, a
/// cookie expiration time yields the remaining seconds until that instant,
/// which is zero or negative for an already-expired record. A fixed policy
/// only applies to records with no expiry of their own. `None` means no
/// policy and no expiry were available at all.
pub fn resolve(policy: Option<&TtlPolicy>, record: &SessionRecord) -> Option<i64> {
    resolve_at(policy, record, Utc::now())
}

/// Resolve against an explicit clock instead of the current time
pub fn resolve_at(
    policy: Option<&TtlPolicy>,
    record: &SessionRecord,
    now: DateTime<Utc>,
) -> Option<i64> {
    if let Some(TtlPolicy::Custom(f)) = policy {
        return Some(f(record));
    }
    if let Some(expires) = record.expires() {
        return Some(ceil_seconds((expires - now).num_milliseconds()));
    }
    match policy {
        Some(TtlPolicy::Fixed(secs)) => Some(*secs),
        _ => None,
    }
}

/// Milliseconds to whole seconds, rounding away from zero for positive
/// remainders so a session never expires early
fn ceil_seconds(ms: i64) -> i64 {
    if ms > 0 {
        (ms + 999) / 1000
    } else {
        ms / 1000
    }
}
