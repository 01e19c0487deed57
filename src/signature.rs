//! Author/committer signatures
//!
//! Signatures are copied out of the engine into plain values and shared as
//! [`SignatureBox`]es, so a commit can hand the same decoded signature to
//! many callers without re-reading native memory.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::native::{raw, RefCountedBox};

/// a shared, reference-counted signature
pub type SignatureBox = RefCountedBox<Signature>;

/// Who made a commit or tag, and when.
///
/// The time is kept the way git stores it (seconds plus a minute offset), so
/// a signature whose time chrono cannot represent still round-trips intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    name: String,
    email: String,
    seconds: i64,
    offset_minutes: i32,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, time: DateTime<FixedOffset>) -> Self {
        Self::from_parts(name, email, time.timestamp(), time.offset().local_minus_utc() / 60)
    }

    /// a signature from raw git time: seconds since the epoch and the
    /// offset in minutes east of UTC
    pub fn from_parts(
        name: impl Into<String>,
        email: impl Into<String>,
        seconds: i64,
        offset_minutes: i32,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            seconds,
            offset_minutes,
        }
    }

    /// a signature stamped with the current time in UTC
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name, email, Utc::now().fixed_offset())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// when the signature was made, in the signer's own time zone; `None`
    /// if the stored time is outside what chrono can represent
    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        self.time_zone()?.timestamp_opt(self.seconds, 0).single()
    }

    pub fn time_zone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.offset_minutes.checked_mul(60)?)
    }

    /// seconds since the epoch
    pub fn timestamp(&self) -> i64 {
        self.seconds
    }

    /// offset from UTC in minutes, as git records it
    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    /// copy a signature out of native memory
    ///
    /// # Safety
    /// `sig` must be null or point to a live `git_signature`.
    pub(crate) unsafe fn from_native(sig: *const raw::git_signature) -> Option<Self> {
        if sig.is_null() {
            return None;
        }

        let sig = &*sig;
        let name = crate::native::owned_str(sig.name);
        let email = crate::native::owned_str(sig.email);

        Some(Self::from_parts(name, email, sig.when.time, sig.when.offset))
    }
}
