//! Recurrence rules and the due-date advancer for recurring tasks.
//!
//! | Rule                | Next due date                                          |
//! |---------------------|--------------------------------------------------------|
//! | `Daily{interval}`   | `interval` days later                                  |
//! | `Weekly{interval}`  | `7 * interval` days later                              |
//! | `Monthly{interval}` | `interval` calendar months later, day clamped to month end |
//! | `Custom{days}`      | nearest listed weekday strictly after today, else +7 days |

use chrono::{DateTime, Datelike, Duration, Months, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HomestockError, Result};

/// How a completed recurring task's due date moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "lowercase")]
pub enum Recurrence {
    Daily {
        #[serde(default = "one")]
        interval: u32,
    },
    Weekly {
        #[serde(default = "one")]
        interval: u32,
    },
    Monthly {
        #[serde(default = "one")]
        interval: u32,
    },
    Custom {
        #[serde(default)]
        days: WeekdaySet,
    },
}

fn one() -> u32 {
    1
}

/// Upper bound on `interval` for daily, weekly and monthly rules.
pub const MAX_INTERVAL: u32 = 1000;

/// Stored timestamps are four-digit-year RFC 3339; nothing may advance past
/// the end of this year.
pub const LAST_YEAR: i32 = 9999;

impl Recurrence {
    /// Intervals must lie in `1..=MAX_INTERVAL`; custom rules have no interval.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Daily { interval } | Self::Weekly { interval } | Self::Monthly { interval } => {
                if interval == 0 {
                    Err(HomestockError::validation("recurrence interval must be at least 1"))
                } else if interval > MAX_INTERVAL {
                    Err(HomestockError::validation(format!(
                        "recurrence interval must be at most {MAX_INTERVAL}"
                    )))
                } else {
                    Ok(())
                }
            }
            Self::Custom { .. } => Ok(()),
        }
    }
}

/// Compute the next due date after `current` under `rule`.
///
/// Time of day is preserved. Monthly overflow clamps to the last day of the
/// target month (Jan 31 + 1 month = Feb 29 in a leap year). A result past
/// [`LAST_YEAR`] is rejected rather than stored.
pub fn next_due_date(current: DateTime<Utc>, rule: &Recurrence) -> Result<DateTime<Utc>> {
    let next = match *rule {
        Recurrence::Daily { interval } => Duration::try_days(i64::from(interval))
            .and_then(|step| current.checked_add_signed(step)),
        Recurrence::Weekly { interval } => Duration::try_weeks(i64::from(interval))
            .and_then(|step| current.checked_add_signed(step)),
        Recurrence::Monthly { interval } => current.checked_add_months(Months::new(interval)),
        Recurrence::Custom { days } => {
            Duration::try_days(i64::from(days.days_until_next(current.weekday())))
                .and_then(|step| current.checked_add_signed(step))
        }
    };
    next.filter(|due| due.year() <= LAST_YEAR).ok_or_else(|| {
        HomestockError::validation(format!("next due date would fall after year {LAST_YEAR}"))
    })
}

/// A set of weekdays, serialised as a sorted list of indices with Sunday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn new() -> Self {
        Self(0)
    }

    /// Build from Sunday-based indices; anything outside 0..=6 is rejected.
    pub fn from_indices(indices: &[u8]) -> Result<Self> {
        let mut set = Self::new();
        for &i in indices {
            if i > 6 {
                return Err(HomestockError::validation(format!(
                    "weekday index {i} out of range 0-6"
                )));
            }
            set.0 |= 1 << i;
        }
        Ok(set)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    fn contains_index(&self, index: u8) -> bool {
        self.0 & (1 << index) != 0
    }

    pub fn indices(&self) -> Vec<u8> {
        (0..7).filter(|&i| self.contains_index(i)).collect()
    }

    /// Smallest offset in 1..=7 landing on a member day. The starting day is
    /// only reachable at offset 7; an empty set also yields 7.
    pub fn days_until_next(&self, from: Weekday) -> u32 {
        let start = from.num_days_from_sunday();
        (1..=7)
            .find(|d| self.contains_index(((start + d) % 7) as u8))
            .unwrap_or(7)
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::new();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.indices().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let indices = Vec::<u8>::deserialize(deserializer)?;
        WeekdaySet::from_indices(&indices).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn daily_adds_interval_days() {
        let next = next_due_date(at(2024, 1, 1), &Recurrence::Daily { interval: 3 }).unwrap();
        assert_eq!(next, at(2024, 1, 4));
    }

    #[test]
    fn weekly_adds_whole_weeks() {
        let next = next_due_date(at(2024, 1, 1), &Recurrence::Weekly { interval: 2 }).unwrap();
        assert_eq!(next, at(2024, 1, 15));
    }

    #[test]
    fn monthly_preserves_day_of_month() {
        let next = next_due_date(at(2024, 1, 15), &Recurrence::Monthly { interval: 1 }).unwrap();
        assert_eq!(next, at(2024, 2, 15));
        let next = next_due_date(at(2024, 11, 10), &Recurrence::Monthly { interval: 3 }).unwrap();
        assert_eq!(next, at(2025, 2, 10));
    }

    #[test]
    fn monthly_overflow_clamps_to_month_end() {
        let rule = Recurrence::Monthly { interval: 1 };
        assert_eq!(next_due_date(at(2024, 1, 31), &rule).unwrap(), at(2024, 2, 29));
        assert_eq!(next_due_date(at(2023, 1, 31), &rule).unwrap(), at(2023, 2, 28));
        assert_eq!(next_due_date(at(2024, 3, 31), &rule).unwrap(), at(2024, 4, 30));
    }

    #[test]
    fn custom_picks_nearest_following_weekday() {
        // 2024-01-01 is a Monday
        let rule = Recurrence::Custom {
            days: [Weekday::Wed].into_iter().collect(),
        };
        assert_eq!(next_due_date(at(2024, 1, 1), &rule).unwrap(), at(2024, 1, 3));
    }

    #[test]
    fn custom_never_returns_the_current_day() {
        // 2024-01-03 is a Wednesday
        let rule = Recurrence::Custom {
            days: [Weekday::Wed].into_iter().collect(),
        };
        assert_eq!(next_due_date(at(2024, 1, 3), &rule).unwrap(), at(2024, 1, 10));
    }

    #[test]
    fn custom_wraps_across_the_week_boundary() {
        // Friday -> next Monday/Tuesday set picks Monday
        let rule = Recurrence::Custom {
            days: [Weekday::Mon, Weekday::Tue].into_iter().collect(),
        };
        assert_eq!(next_due_date(at(2024, 1, 5), &rule).unwrap(), at(2024, 1, 8));
    }

    #[test]
    fn custom_with_no_days_defaults_to_a_week() {
        let rule = Recurrence::Custom {
            days: WeekdaySet::new(),
        };
        assert_eq!(next_due_date(at(2024, 1, 1), &rule).unwrap(), at(2024, 1, 8));
    }

    #[test]
    fn wire_format_is_tagged_by_frequency() {
        let rule: Recurrence =
            serde_json::from_str(r#"{"frequency":"custom","days":[3,0]}"#).unwrap();
        let expected = Recurrence::Custom {
            days: [Weekday::Sun, Weekday::Wed].into_iter().collect(),
        };
        assert_eq!(rule, expected);
        assert_eq!(
            serde_json::to_value(rule).unwrap(),
            serde_json::json!({"frequency": "custom", "days": [0, 3]})
        );

        let weekly: Recurrence = serde_json::from_str(r#"{"frequency":"weekly"}"#).unwrap();
        assert_eq!(weekly, Recurrence::Weekly { interval: 1 });
    }

    #[test]
    fn out_of_range_weekday_is_rejected() {
        assert!(serde_json::from_str::<Recurrence>(r#"{"frequency":"custom","days":[7]}"#).is_err());
        assert!(WeekdaySet::from_indices(&[9]).is_err());
    }

    #[test]
    fn zero_interval_fails_validation() {
        assert!(Recurrence::Daily { interval: 0 }.validate().is_err());
        assert!(Recurrence::Monthly { interval: 2 }.validate().is_ok());
        assert!(Recurrence::Custom { days: WeekdaySet::new() }.validate().is_ok());
    }

    #[test]
    fn oversized_interval_fails_validation() {
        assert!(Recurrence::Daily { interval: MAX_INTERVAL }.validate().is_ok());
        assert!(Recurrence::Daily { interval: 4_000_000_000 }.validate().is_err());
        assert!(Recurrence::Monthly { interval: MAX_INTERVAL + 1 }.validate().is_err());
    }

    #[test]
    fn huge_interval_is_an_error_not_a_panic() {
        let rule = Recurrence::Daily { interval: u32::MAX };
        assert!(next_due_date(at(2024, 1, 1), &rule).is_err());
        let rule = Recurrence::Weekly { interval: u32::MAX };
        assert!(next_due_date(at(2024, 1, 1), &rule).is_err());
    }

    #[test]
    fn advancing_past_year_9999_is_rejected() {
        let last_day = at(9999, 12, 31);
        for rule in [
            Recurrence::Daily { interval: 1 },
            Recurrence::Weekly { interval: 1 },
            Recurrence::Monthly { interval: 1 },
            Recurrence::Custom { days: WeekdaySet::new() },
        ] {
            assert!(next_due_date(last_day, &rule).is_err(), "{rule:?}");
        }
        assert_eq!(
            next_due_date(at(9999, 12, 30), &Recurrence::Daily { interval: 1 }).unwrap(),
            last_day
        );
    }
}
