//! Calendar classification of backup dates

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};

/// Retention class of a backup date; exactly one applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RetentionClass {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for RetentionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

/// Whether `date` is the last day of its month
pub fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Yearly on Dec 31, else monthly on a month end, else weekly on a Sunday
pub fn classify(date: NaiveDate) -> RetentionClass {
    if date.month() == 12 && date.day() == 31 {
        RetentionClass::Yearly
    } else if is_month_end(date) {
        RetentionClass::Monthly
    } else if date.weekday() == Weekday::Sun {
        RetentionClass::Weekly
    } else {
        RetentionClass::Daily
    }
}
