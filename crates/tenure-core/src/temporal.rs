//! # Temporal Policy: Calendar Days in One Operational Timezone
//!
//! Student-product intervals are stored as calendar dates, not instants.
//! Both ends are inclusive: an interval `[2024-01-01, 2024-05-31]` grants
//! the entitlement from the first moment of January 1st through the last
//! moment of May 31st, measured in the operational timezone.
//!
//! ## Day-Boundary Invariant
//!
//! There is exactly one place where an instant becomes a date:
//! [`BusinessCalendar::date_of`]. The calendar carries a single fixed UTC
//! offset configured at engine construction. Splitting, cancellation and
//! chain resolution all compare dates produced by the same calendar, so
//! "the day before the effective date" means the same thing at every call
//! site.
//!
//! ## Clock
//!
//! "Now" is read through the [`Clock`] trait so tests can pin the current
//! date. Production code uses [`SystemClock`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

use crate::error::CoreError;

/// Largest offset accepted by [`BusinessCalendar`]: ±18 hours.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Maps instants to calendar dates in the operational timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    utc_offset_minutes: i32,
}

impl BusinessCalendar {
    /// A calendar anchored at UTC.
    pub const UTC: Self = Self {
        utc_offset_minutes: 0,
    };

    /// Create a calendar with a fixed offset from UTC, in minutes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the offset exceeds ±18 hours.
    pub fn with_offset_minutes(utc_offset_minutes: i32) -> Result<Self, CoreError> {
        if utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES.unsigned_abs() {
            return Err(CoreError::InvalidConfig(format!(
                "utc offset {utc_offset_minutes} minutes is outside ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        Ok(Self { utc_offset_minutes })
    }

    /// The configured offset, in minutes east of UTC.
    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    /// The chrono offset for this calendar.
    pub fn offset(&self) -> FixedOffset {
        // Range is checked at construction; east_opt only fails beyond ±24h.
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// The calendar date of `instant` in the operational timezone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        (instant + Duration::minutes(i64::from(self.utc_offset_minutes))).date_naive()
    }

    /// Today's date according to `clock`.
    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        self.date_of(clock.now())
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::UTC
    }
}

/// The calendar day before `date`.
///
/// Saturates at [`NaiveDate::MIN`]; dates that close to the boundary never
/// occur in billing data.
pub fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(NaiveDate::MIN)
}

/// The calendar day after `date`. Saturates at [`NaiveDate::MAX`].
pub fn day_after(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

// ─── Clock ──────────────────────────────────────────────────────────

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating-system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A clock frozen at midday UTC on `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        Self(DateTime::from_naive_utc_and_offset(noon, Utc))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
