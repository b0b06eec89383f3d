//! Keep-sets for a retention policy
//!
//! Given today's date the policy yields four sets of backup dates to keep.
//! An artifact survives if its date falls in any of them.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::classify::{classify, RetentionClass};

/// Oldest year any keep-set reaches back to
pub const FLOOR_YEAR: i32 = 2000;

/// How many of each class to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Keep every backup from the last N days
    pub daily: u32,
    /// Keep the N most recent Sundays
    pub weekly: u32,
    /// Keep the N most recent month ends
    pub monthly: u32,
    /// Keep the N most recent year ends
    pub yearly: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily: 14,
            weekly: 3,
            monthly: 3,
            yearly: 3,
        }
    }
}

/// Dates to keep, computed for one `today`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepSets {
    /// Dates on or after this are kept as daily backups
    pub daily_cutoff: NaiveDate,
    pub weekly: BTreeSet<NaiveDate>,
    pub monthly: BTreeSet<NaiveDate>,
    pub yearly: BTreeSet<NaiveDate>,
}

impl KeepSets {
    pub fn compute(policy: &RetentionPolicy, today: NaiveDate) -> Self {
        let daily_cutoff = today
            .checked_sub_days(Days::new(u64::from(policy.daily)))
            .unwrap_or(NaiveDate::MIN);

        Self {
            daily_cutoff,
            weekly: recent_sundays(today, policy.weekly),
            monthly: recent_month_ends(today, policy.monthly),
            yearly: recent_year_ends(today, policy.yearly),
        }
    }

    /// Whether a backup taken on `date` is retained
    pub fn keeps(&self, date: NaiveDate) -> bool {
        date >= self.daily_cutoff
            || self.weekly.contains(&date)
            || self.monthly.contains(&date)
            || self.yearly.contains(&date)
    }

    /// Class the date is retained under, if any. A date that is both recent
    /// and a period end reports its calendar class.
    pub fn reason(&self, date: NaiveDate) -> Option<RetentionClass> {
        let class = classify(date);
        let in_class_set = match class {
            RetentionClass::Weekly => self.weekly.contains(&date),
            RetentionClass::Monthly => self.monthly.contains(&date),
            RetentionClass::Yearly => self.yearly.contains(&date),
            RetentionClass::Daily => false,
        };
        if in_class_set {
            Some(class)
        } else if self.keeps(date) {
            Some(RetentionClass::Daily)
        } else {
            None
        }
    }
}

/// The `count` most recent Sundays on or before `today`, walking backward
fn recent_sundays(today: NaiveDate, count: u32) -> BTreeSet<NaiveDate> {
    let back = u64::from(today.weekday().num_days_from_sunday());
    let Some(mut sunday) = today.checked_sub_days(Days::new(back)) else {
        return BTreeSet::new();
    };

    let mut dates = BTreeSet::new();
    for _ in 0..count {
        if sunday.year() < FLOOR_YEAR {
            break;
        }
        dates.insert(sunday);
        match sunday.checked_sub_days(Days::new(7)) {
            Some(previous) => sunday = previous,
            None => break,
        }
    }
    dates
}

/// Last day of today's month and of the `count - 1` months before it
fn recent_month_ends(today: NaiveDate, count: u32) -> BTreeSet<NaiveDate> {
    let mut dates = BTreeSet::new();
    let Some(first_of_month) = today.with_day(1) else {
        return dates;
    };

    for k in 0..count {
        let month_end = first_of_month
            .checked_sub_months(Months::new(k))
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next_first| next_first.pred_opt());
        match month_end {
            Some(date) if date.year() >= FLOOR_YEAR => {
                dates.insert(date);
            }
            _ => break,
        }
    }
    dates
}

/// December 31 of today's year and of the `count - 1` years before it
fn recent_year_ends(today: NaiveDate, count: u32) -> BTreeSet<NaiveDate> {
    let mut dates = BTreeSet::new();
    for k in 0..count {
        let Some(year) = today.year().checked_sub(k as i32) else {
            break;
        };
        if year < FLOOR_YEAR {
            break;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year, 12, 31) {
            dates.insert(date);
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetentionPolicy::default();
        assert_eq!((policy.daily, policy.weekly, policy.monthly, policy.yearly), (14, 3, 3, 3));
    }

    #[test]
    fn test_keep_sets_for_midweek_today() {
        // Wednesday
        let sets = KeepSets::compute(&RetentionPolicy::default(), date(2025, 3, 12));

        assert_eq!(sets.daily_cutoff, date(2025, 2, 26));
        assert_eq!(
            sets.weekly.iter().copied().collect::<Vec<_>>(),
            vec![date(2025, 2, 23), date(2025, 3, 2), date(2025, 3, 9)]
        );
        assert_eq!(
            sets.monthly.iter().copied().collect::<Vec<_>>(),
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
        );
        assert_eq!(
            sets.yearly.iter().copied().collect::<Vec<_>>(),
            vec![date(2023, 12, 31), date(2024, 12, 31), date(2025, 12, 31)]
        );
    }

    #[test]
    fn test_sunday_today_counts_itself() {
        let sets = KeepSets::compute(&RetentionPolicy::default(), date(2025, 3, 9));
        assert!(sets.weekly.contains(&date(2025, 3, 9)));
        assert!(!sets.weekly.contains(&date(2025, 2, 16)));
    }

    #[test]
    fn test_month_end_walk_crosses_year() {
        let sets = KeepSets::compute(&RetentionPolicy::default(), date(2025, 1, 15));
        assert_eq!(
            sets.monthly.iter().copied().collect::<Vec<_>>(),
            vec![date(2024, 11, 30), date(2024, 12, 31), date(2025, 1, 31)]
        );
    }

    #[test]
    fn test_keeps_is_union() {
        let sets = KeepSets::compute(&RetentionPolicy::default(), date(2025, 3, 12));

        assert!(sets.keeps(date(2025, 3, 1)));
        assert!(sets.keeps(date(2025, 2, 26)));
        assert!(!sets.keeps(date(2025, 2, 25)));
        assert!(sets.keeps(date(2025, 2, 23)));
        assert!(!sets.keeps(date(2025, 2, 16)));
        assert!(sets.keeps(date(2025, 1, 31)));
        assert!(!sets.keeps(date(2024, 12, 30)));
        assert!(sets.keeps(date(2023, 12, 31)));
        assert!(!sets.keeps(date(2022, 12, 31)));
    }

    #[test]
    fn test_reason() {
        let sets = KeepSets::compute(&RetentionPolicy::default(), date(2025, 3, 12));
        assert_eq!(sets.reason(date(2025, 3, 9)), Some(RetentionClass::Weekly));
        assert_eq!(sets.reason(date(2025, 3, 10)), Some(RetentionClass::Daily));
        assert_eq!(sets.reason(date(2025, 2, 28)), Some(RetentionClass::Monthly));
        assert_eq!(sets.reason(date(2025, 2, 16)), None);
    }

    #[test]
    fn test_floor_year() {
        let policy = RetentionPolicy {
            daily: 0,
            weekly: 0,
            monthly: 0,
            yearly: 10,
        };
        let sets = KeepSets::compute(&policy, date(2002, 6, 1));
        assert_eq!(sets.yearly.len(), 3);
        assert!(sets.yearly.contains(&date(2000, 12, 31)));
    }

    #[test]
    fn test_zero_daily_keeps_today_only() {
        let policy = RetentionPolicy {
            daily: 0,
            weekly: 0,
            monthly: 0,
            yearly: 0,
        };
        let sets = KeepSets::compute(&policy, date(2025, 3, 12));
        assert!(sets.keeps(date(2025, 3, 12)));
        assert!(!sets.keeps(date(2025, 3, 11)));
    }
}
