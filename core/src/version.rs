//! Version stamps for optimistic concurrency control.
//!
//! Every record that can be modified by more than one operator carries a
//! `Version`. Writers state the version they observed; a mismatch means the
//! record changed underneath them and the write is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version number for optimistic concurrency control.
///
/// Versions start at 1 when a record is first stored and increment by 1 for
/// each accepted modification. `Version::INITIAL` (0) marks "never stored".
///
/// # Examples
///
/// ```
/// use merchant_console_core::version::Version;
///
/// let v1 = Version::INITIAL.next();
/// assert_eq!(v1, Version::new(1));
/// assert_eq!(v1.value(), 1);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a record that has never been stored.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    ///
    /// Saturates at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Check if this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}
