//! Resource-accounting primitives: time points, durations, byte counts and
//! account identifiers. All arithmetic that could overflow a `u64` counter
//! saturates instead of panicking, since these values are derived from
//! attacker-influenced transaction content.

use std::{
    fmt,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

/// Word size net usage is rounded to.
pub const NET_USAGE_WORD_SIZE: u64 = 8;

/// A wall-clock moment, in microseconds since an arbitrary but shared epoch.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimePoint(pub u64);

impl TimePoint {
    pub const ZERO: TimePoint = TimePoint(0);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, d: Microseconds) -> TimePoint {
        if d.0 >= 0 {
            TimePoint(self.0.saturating_add(d.0 as u64))
        } else {
            TimePoint(self.0.saturating_sub(d.0.unsigned_abs()))
        }
    }

    pub fn saturating_sub(self, d: Microseconds) -> TimePoint {
        self.saturating_add(Microseconds(-d.0))
    }

    /// Elapsed time between `self` and an earlier `other`, as a signed
    /// duration (negative if `self` precedes `other`).
    pub fn since(self, other: TimePoint) -> Microseconds {
        Microseconds(self.0 as i64 - other.0 as i64)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

impl Add<Microseconds> for TimePoint {
    type Output = TimePoint;
    fn add(self, rhs: Microseconds) -> TimePoint {
        self.saturating_add(rhs)
    }
}

impl Sub<TimePoint> for TimePoint {
    type Output = Microseconds;
    fn sub(self, rhs: TimePoint) -> Microseconds {
        self.since(rhs)
    }
}

/// A signed duration in microseconds. Signed because the original computes
/// negative deltas transiently (e.g. `billed_time` before the timer's first
/// `resume`).
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Microseconds(pub i64);

impl Microseconds {
    pub const ZERO: Microseconds = Microseconds(0);

    pub fn from_milliseconds(ms: i64) -> Microseconds {
        Microseconds(ms.saturating_mul(1_000))
    }

    pub fn from_seconds(secs: i64) -> Microseconds {
        Microseconds(secs.saturating_mul(1_000_000))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn max(self, other: Microseconds) -> Microseconds {
        Microseconds(self.0.max(other.0))
    }

    pub fn min(self, other: Microseconds) -> Microseconds {
        Microseconds(self.0.min(other.0))
    }
}

impl fmt::Display for Microseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

impl Add for Microseconds {
    type Output = Microseconds;
    fn add(self, rhs: Microseconds) -> Microseconds {
        Microseconds(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Microseconds {
    type Output = Microseconds;
    fn sub(self, rhs: Microseconds) -> Microseconds {
        Microseconds(self.0.saturating_sub(rhs.0))
    }
}

/// A byte count: net bandwidth usage, RAM deltas, serialized record sizes.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Bytes(pub u64);

impl Bytes {
    pub const ZERO: Bytes = Bytes(0);

    pub fn saturating_add(self, rhs: Bytes) -> Bytes {
        Bytes(self.0.saturating_add(rhs.0))
    }

    pub fn min(self, other: Bytes) -> Bytes {
        Bytes(self.0.min(other.0))
    }

    /// Rounds down to the nearest multiple of the net-usage word size.
    pub fn round_down_to_word(self) -> Bytes {
        Bytes((self.0 / NET_USAGE_WORD_SIZE) * NET_USAGE_WORD_SIZE)
    }

    /// Rounds up to the nearest multiple of the net-usage word size.
    pub fn round_up_to_word(self) -> Bytes {
        Bytes(((self.0 + NET_USAGE_WORD_SIZE - 1) / NET_USAGE_WORD_SIZE) * NET_USAGE_WORD_SIZE)
    }

    pub fn is_multiple_of_word(self) -> bool {
        self.0 % NET_USAGE_WORD_SIZE == 0
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// Ceiling-divide `numerator * num / den`, used for the prunable-data
/// discount in the input-transaction init variant.
pub fn ceil_mul_div(value: u64, num: u64, den: u64) -> u64 {
    if den == 0 {
        return value;
    }
    let scaled = value.saturating_mul(num);
    (scaled.saturating_add(den - 1)) / den
}

/// Opaque account identifier. EOSIO packs account names into a base32 `u64`;
/// the packing/unpacking scheme itself is canonical-serialization machinery
/// and stays out of scope here, so this is a plain newtype the collaborators
/// are free to interpret.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AccountName(pub u64);

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_point_add_sub_roundtrip() {
        let start = TimePoint(1_000);
        let later = start + Microseconds(500);
        assert_eq!(later, TimePoint(1_500));
        assert_eq!(later - start, Microseconds(500));
    }

    #[test]
    fn time_point_saturates_at_zero() {
        let start = TimePoint(10);
        assert_eq!(start.saturating_sub(Microseconds(100)), TimePoint::ZERO);
    }

    #[test]
    fn bytes_round_down_and_up() {
        assert_eq!(Bytes(97).round_down_to_word(), Bytes(96));
        assert_eq!(Bytes(96).round_down_to_word(), Bytes(96));
        assert_eq!(Bytes(97).round_up_to_word(), Bytes(104));
        assert!(Bytes(96).is_multiple_of_word());
        assert!(!Bytes(97).is_multiple_of_word());
    }

    #[test]
    fn ceil_mul_div_matches_expected() {
        // 100 prunable bytes at 1/2 discount rounds up to 50.
        assert_eq!(ceil_mul_div(100, 1, 2), 50);
        // 101 prunable bytes at 1/2 discount ceils to 51.
        assert_eq!(ceil_mul_div(101, 1, 2), 51);
    }
}
