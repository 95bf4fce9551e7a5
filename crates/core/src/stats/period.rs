use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DomainError;

/// Years a `YYYY-MM` month can carry.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// A calendar month, written `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let in_range = (MIN_YEAR..=MAX_YEAR).contains(&year) && (1..=12).contains(&month);
        in_range.then_some(Self { year, month })
    }

    /// Normalizes a zero-based month index that may run past either end of
    /// the year, the way calendar arithmetic rolls over. Years saturate at
    /// the supported range.
    pub fn from_index(year: i32, month0: i32) -> Self {
        let year = year.saturating_add(month0.div_euclid(12)).clamp(MIN_YEAR, MAX_YEAR);
        let month = month0.rem_euclid(12) as u32 + 1;
        Self { year, month }
    }

    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self { year: at.year(), month: at.month() }
    }

    pub fn next(self) -> Self {
        Self::from_index(self.year, self.month as i32)
    }

    pub fn offset(self, months: i32) -> Self {
        Self::from_index(self.year, (self.month as i32 - 1).saturating_add(months))
    }

    pub fn first_instant(self) -> DateTime<Utc> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default();
        Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
    }

    /// Last representable instant of the month.
    pub fn last_instant(self) -> DateTime<Utc> {
        let (year, month) = match self.month {
            12 => (self.year.saturating_add(1), 1),
            month => (self.year, month + 1),
        };
        let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
        Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)) - TimeDelta::nanoseconds(1)
    }

    pub fn contains(self, at: &DateTime<Utc>) -> bool {
        Self::of(at) == self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid =
            || DomainError::InvariantViolation(format!("`{value}` is not a YYYY-MM month"));
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Reporting period selected on the statistics screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Period {
    CurrentMonth,
    LastMonth,
    Quarter,
    Year,
    Custom { month: u32, year: i32 },
}

/// Inclusive `[start, end]` window of creation dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }
}

impl Period {
    /// Resolves the window `offset` whole periods before the current one.
    ///
    /// Windows that include today end at `now`; past windows end on the last
    /// instant of their final day.
    pub fn window(self, offset: u32, now: DateTime<Utc>) -> PeriodWindow {
        let offset = i32::try_from(offset).unwrap_or(i32::MAX);
        let this_month = YearMonth::of(&now);
        let closed = |first: YearMonth, last: YearMonth| PeriodWindow {
            start: first.first_instant(),
            end: last.last_instant(),
        };

        match self {
            Self::CurrentMonth if offset == 0 => {
                PeriodWindow { start: this_month.first_instant(), end: now }
            }
            Self::CurrentMonth => {
                let month = this_month.offset(offset.saturating_neg());
                closed(month, month)
            }
            Self::LastMonth => {
                let month = this_month.offset((-1i32).saturating_sub(offset));
                closed(month, month)
            }
            Self::Quarter => {
                let back = offset.saturating_mul(3);
                let month0 = (this_month.month as i32 - 1).saturating_sub(back);
                let first = YearMonth::from_index(this_month.year, month0.div_euclid(3) * 3);
                if offset == 0 {
                    PeriodWindow { start: first.first_instant(), end: now }
                } else {
                    closed(first, first.offset(2))
                }
            }
            Self::Year => {
                let first = YearMonth::from_index(this_month.year.saturating_sub(offset), 0);
                if offset == 0 {
                    PeriodWindow { start: first.first_instant(), end: now }
                } else {
                    closed(first, first.offset(11))
                }
            }
            Self::Custom { month, year } => {
                let month0 = i32::try_from(month).unwrap_or(i32::MAX).saturating_sub(1);
                let month = YearMonth::from_index(year, month0.saturating_sub(offset));
                closed(month, month)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Utc};

    use super::{Period, YearMonth};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 14, 16, 30, 0).unwrap()
    }

    #[test]
    fn current_month_runs_to_now_then_closes_past_months() {
        let current = Period::CurrentMonth.window(0, now());
        assert_eq!(current.start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(current.end, now());

        let previous = Period::CurrentMonth.window(1, now());
        assert_eq!(previous.start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(previous.contains(&Utc.with_ymd_and_hms(2025, 1, 31, 22, 0, 0).unwrap()));
        assert!(!previous.contains(&Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn last_month_crosses_year_boundary() {
        let window = Period::LastMonth.window(1, now());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert!(window.contains(&Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn quarter_offsets_roll_into_previous_year() {
        let current = Period::Quarter.window(0, now());
        assert_eq!(current.start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let previous = Period::Quarter.window(1, now());
        assert_eq!(previous.start, Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
        assert!(previous.contains(&Utc.with_ymd_and_hms(2024, 12, 31, 12, 0, 0).unwrap()));
        assert!(!previous.contains(&Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn year_and_custom_windows() {
        let last_year = Period::Year.window(1, now());
        assert_eq!(last_year.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(last_year.contains(&Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap()));

        let custom = Period::Custom { month: 1, year: 2025 }.window(1, now());
        assert_eq!(custom.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn year_month_parses_and_rolls_over() {
        let month: YearMonth = "2024-08".parse().expect("valid month");
        assert_eq!(month, YearMonth { year: 2024, month: 8 });
        assert_eq!(month.offset(5), YearMonth { year: 2025, month: 1 });
        assert_eq!(month.offset(-8), YearMonth { year: 2023, month: 12 });
        assert_eq!(month.to_string(), "2024-08");
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("août".parse::<YearMonth>().is_err());
    }

    #[test]
    fn out_of_range_years_are_refused() {
        assert!("2147483647-12".parse::<YearMonth>().is_err());
        assert!("0000-01".parse::<YearMonth>().is_err());
        assert!("10000-01".parse::<YearMonth>().is_err());
        assert!("9999-12".parse::<YearMonth>().is_ok());
    }

    #[test]
    fn extreme_custom_periods_saturate_instead_of_overflowing() {
        let window = Period::Custom { month: 12, year: i32::MAX }.window(0, now());
        assert_eq!(window.start, Utc.with_ymd_and_hms(9999, 12, 1, 0, 0, 0).unwrap());
        assert!(window.contains(&Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()));

        let window = Period::Custom { month: 1, year: i32::MIN }.window(u32::MAX, now());
        assert_eq!(window.start.year(), 1);
        assert!(window.start <= window.end);
        let _ = Period::Year.window(u32::MAX, now());
        let _ = Period::Quarter.window(u32::MAX, now());
    }
}
