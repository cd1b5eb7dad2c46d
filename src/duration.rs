//!
//! A picosecond-resolution virtual duration.
//!

use crate::error::SimError;
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::time::Duration as ExternDuration;

const PICOS_PER_NANO: i64 = 1_000;
const PICOS_PER_MICRO: i64 = 1_000 * PICOS_PER_NANO;
const PICOS_PER_MILLI: i64 = 1_000 * PICOS_PER_MICRO;
const PICOS_PER_SEC: i64 = 1_000 * PICOS_PER_MILLI;
const PICOS_PER_MIN: i64 = 60 * PICOS_PER_SEC;
const PICOS_PER_HOUR: i64 = 60 * PICOS_PER_MIN;
const PICOS_PER_DAY: i64 = 24 * PICOS_PER_HOUR;

///
/// A signed, immutable span of virtual time with picosecond resolution.
///
/// Two `SimDuration`s are equal, ordered and hashed purely by their
/// picosecond count. Construction never panics: all named constructors
/// accept any `i64` and simply multiply it into picoseconds, so overflow
/// is the caller's responsibility exactly as it is for `i64` arithmetic
/// elsewhere.
///
#[derive(Copy, Clone, Eq)]
pub struct SimDuration {
    picos: i64,
}

impl SimDuration {
    /// The zero duration.
    pub const ZERO: SimDuration = SimDuration { picos: 0 };

    /// The smallest representable duration.
    pub const MIN: SimDuration = SimDuration { picos: i64::MIN };

    /// The largest representable duration.
    pub const MAX: SimDuration = SimDuration { picos: i64::MAX };

    /// Constructs a duration directly from a picosecond count.
    #[must_use]
    pub const fn from_picos(picos: i64) -> Self {
        Self { picos }
    }

    /// Constructs a duration from whole days.
    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        Self::from_picos(days * PICOS_PER_DAY)
    }

    /// Constructs a duration from whole hours.
    #[must_use]
    pub const fn from_hours(hours: i64) -> Self {
        Self::from_picos(hours * PICOS_PER_HOUR)
    }

    /// Constructs a duration from whole minutes.
    #[must_use]
    pub const fn from_minutes(minutes: i64) -> Self {
        Self::from_picos(minutes * PICOS_PER_MIN)
    }

    /// Constructs a duration from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self::from_picos(secs * PICOS_PER_SEC)
    }

    /// Constructs a duration from whole milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self::from_picos(millis * PICOS_PER_MILLI)
    }

    /// Constructs a duration from whole microseconds.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self::from_picos(micros * PICOS_PER_MICRO)
    }

    /// Constructs a duration from whole nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self::from_picos(nanos * PICOS_PER_NANO)
    }

    ///
    /// Constructs a duration from the sum of the given named parts.
    ///
    /// This mirrors the constructor of [`Duration`](std::time::Duration)
    /// but accepts all eight named units at once, each independently
    /// signed, rather than forcing the caller to add several
    /// single-unit durations together.
    ///
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        days: i64,
        hours: i64,
        minutes: i64,
        secs: i64,
        millis: i64,
        micros: i64,
        nanos: i64,
        picos: i64,
    ) -> Self {
        Self::from_picos(
            days * PICOS_PER_DAY
                + hours * PICOS_PER_HOUR
                + minutes * PICOS_PER_MIN
                + secs * PICOS_PER_SEC
                + millis * PICOS_PER_MILLI
                + micros * PICOS_PER_MICRO
                + nanos * PICOS_PER_NANO
                + picos,
        )
    }

    /// The total length of this duration in picoseconds.
    #[must_use]
    pub const fn as_picos(&self) -> i64 {
        self.picos
    }

    /// This duration as a whole number of picoseconds, truncated toward
    /// zero.
    #[must_use]
    pub const fn in_picoseconds(&self) -> i64 {
        self.picos
    }

    /// This duration as a whole number of nanoseconds, truncated toward
    /// zero.
    #[must_use]
    pub const fn in_nanoseconds(&self) -> i64 {
        self.picos / PICOS_PER_NANO
    }

    /// This duration as a whole number of microseconds, truncated toward
    /// zero.
    #[must_use]
    pub const fn in_microseconds(&self) -> i64 {
        self.picos / PICOS_PER_MICRO
    }

    /// This duration as a whole number of milliseconds, truncated toward
    /// zero.
    #[must_use]
    pub const fn in_milliseconds(&self) -> i64 {
        self.picos / PICOS_PER_MILLI
    }

    /// This duration as a whole number of seconds, truncated toward
    /// zero.
    #[must_use]
    pub const fn in_seconds(&self) -> i64 {
        self.picos / PICOS_PER_SEC
    }

    /// This duration as a whole number of minutes, truncated toward
    /// zero.
    #[must_use]
    pub const fn in_minutes(&self) -> i64 {
        self.picos / PICOS_PER_MIN
    }

    /// This duration as a whole number of hours, truncated toward zero.
    #[must_use]
    pub const fn in_hours(&self) -> i64 {
        self.picos / PICOS_PER_HOUR
    }

    /// This duration as a whole number of days, truncated toward zero.
    #[must_use]
    pub const fn in_days(&self) -> i64 {
        self.picos / PICOS_PER_DAY
    }

    /// The total length of this duration as a floating-point number of
    /// seconds. Lossy for very large or very precise durations.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.picos as f64 / PICOS_PER_SEC as f64
    }

    /// Whether this duration is strictly negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.picos < 0
    }

    /// Whether this duration is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.picos == 0
    }

    /// The absolute value of this duration.
    #[must_use]
    pub const fn abs(&self) -> Self {
        Self::from_picos(self.picos.abs())
    }

    /// Clamps this duration to be non-negative, returning `ZERO` if it
    /// was negative.
    #[must_use]
    pub const fn non_negative(&self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            *self
        }
    }

    /// Adds two durations, returning `None` on `i64` overflow instead of
    /// panicking.
    #[must_use]
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.picos.checked_add(rhs.picos).map(Self::from_picos)
    }

    /// Subtracts two durations, returning `None` on `i64` overflow
    /// instead of panicking.
    #[must_use]
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.picos.checked_sub(rhs.picos).map(Self::from_picos)
    }

    ///
    /// Truncated integer division of one duration by another, yielding
    /// how many (possibly fractional, truncated) `rhs`-sized steps fit
    /// into `self`.
    ///
    /// Fails with [`SimError::DivisionByZero`] rather than panicking when
    /// `rhs` is zero, since the dividend here is usually derived from a
    /// user-controlled schedule rather than a compile-time constant.
    ///
    pub fn checked_div_duration(&self, rhs: Self) -> Result<i64, SimError> {
        if rhs.picos == 0 {
            return Err(SimError::DivisionByZero);
        }
        Ok(self.picos / rhs.picos)
    }
}

// OPS

impl Add for SimDuration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_picos(self.picos + rhs.picos)
    }
}

impl AddAssign for SimDuration {
    fn add_assign(&mut self, rhs: Self) {
        self.picos += rhs.picos;
    }
}

impl Sub for SimDuration {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_picos(self.picos - rhs.picos)
    }
}

impl SubAssign for SimDuration {
    fn sub_assign(&mut self, rhs: Self) {
        self.picos -= rhs.picos;
    }
}

impl Neg for SimDuration {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::from_picos(-self.picos)
    }
}

impl Mul<f64> for SimDuration {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::from_picos((self.picos as f64 * rhs).round() as i64)
    }
}

impl Div<f64> for SimDuration {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::from_picos((self.picos as f64 / rhs).round() as i64)
    }
}

impl Sum for SimDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

// CMP / HASH

impl PartialEq for SimDuration {
    fn eq(&self, other: &Self) -> bool {
        self.picos == other.picos
    }
}

impl PartialOrd for SimDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimDuration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.picos.cmp(&other.picos)
    }
}

impl Hash for SimDuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.picos.hash(state);
    }
}

impl Default for SimDuration {
    fn default() -> Self {
        Self::ZERO
    }
}

// INTEROP with std::time::Duration ("extern duration"), microsecond granularity.

impl From<ExternDuration> for SimDuration {
    fn from(value: ExternDuration) -> Self {
        Self::from_picos(value.as_micros() as i64 * PICOS_PER_MICRO)
    }
}

impl PartialEq<ExternDuration> for SimDuration {
    fn eq(&self, other: &ExternDuration) -> bool {
        *self == Self::from(*other)
    }
}

impl PartialOrd<ExternDuration> for SimDuration {
    fn partial_cmp(&self, other: &ExternDuration) -> Option<Ordering> {
        self.partial_cmp(&Self::from(*other))
    }
}

// FMT

impl Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.picos < 0;
        let mag = self.picos.unsigned_abs();

        let micros_total = mag / 1_000_000;
        let sub_micro_picos = mag % 1_000_000;

        let secs_total = micros_total / 1_000_000;
        let micros = micros_total % 1_000_000;

        let mins_total = secs_total / 60;
        let secs = secs_total % 60;

        let hours = mins_total / 60;
        let mins = mins_total % 60;

        if negative {
            write!(f, "-")?;
        }
        write!(f, "{hours}:{mins:02}:{secs:02}.{micros:06}")?;
        if sub_micro_picos != 0 {
            write!(f, ".{sub_micro_picos:06}")?;
        }
        Ok(())
    }
}

impl Debug for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimDuration({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_construction_and_arithmetic() {
        let a = SimDuration::from_nanos(1) + SimDuration::from_picos(1) + SimDuration::from_micros(1);
        assert_eq!(a.to_string(), "0:00:00.000001.001001");
    }

    #[test]
    fn ordering_and_equality_by_picos() {
        let a = SimDuration::from_secs(1);
        let b = SimDuration::from_millis(1000);
        assert_eq!(a, b);
        assert!(SimDuration::from_secs(2) > a);
    }

    #[test]
    fn negation_and_abs() {
        let a = SimDuration::from_secs(5);
        assert_eq!(-a, SimDuration::from_secs(-5));
        assert_eq!((-a).abs(), a);
        assert!((-a).is_negative());
    }

    #[test]
    fn scalar_multiplication_rounds() {
        let a = SimDuration::from_picos(3) * 1.5;
        assert_eq!(a.as_picos(), 5);
    }

    #[test]
    fn truncated_division_by_zero_errs() {
        let a = SimDuration::from_secs(1);
        assert_eq!(
            a.checked_div_duration(SimDuration::ZERO),
            Err(SimError::DivisionByZero)
        );
        assert_eq!(
            a.checked_div_duration(SimDuration::from_millis(300)),
            Ok(3)
        );
    }

    #[test]
    fn extern_duration_lifting() {
        let extern_dur = ExternDuration::from_micros(42);
        let lifted = SimDuration::from(extern_dur);
        assert_eq!(lifted.as_picos(), 42_000_000);
        assert_eq!(lifted, extern_dur);
    }

    #[test]
    fn whole_unit_accessors_truncate_toward_zero() {
        let a = SimDuration::new(1, 2, 3, 4, 5, 6, 7, 8);
        assert_eq!(a.in_days(), 1);
        assert_eq!(a.in_hours(), 26);
        assert_eq!(a.in_minutes(), 1563);
        assert_eq!(a.in_seconds(), a.as_picos() / PICOS_PER_SEC);

        let b = -SimDuration::from_nanos(1) - SimDuration::from_picos(500);
        assert_eq!(b.in_nanoseconds(), -1);
    }

    #[test]
    fn display_without_sub_micro_remainder() {
        let a = SimDuration::new(0, 1, 2, 3, 4, 0, 0, 0);
        assert_eq!(a.to_string(), "1:02:03.004000");
    }
}
