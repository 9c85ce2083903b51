use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::{HrError, HrResult};
use crate::utils::dates::{days_inclusive, last_day_of_month, same_month};

/// Longest `[from, to]` span accepted by the range queries.
pub const MAX_RANGE_DAYS: i64 = 366;

pub fn check_range(from: NaiveDate, to: NaiveDate) -> HrResult<()> {
    if (to - from).num_days() >= MAX_RANGE_DAYS {
        return Err(HrError::Validation(format!(
            "Date range cannot exceed {} days",
            MAX_RANGE_DAYS
        )));
    }
    Ok(())
}

/// Employment window used to clamp date ranges.
#[derive(Debug, Clone, Copy)]
pub struct Employment {
    pub joining: NaiveDate,
    pub relieving: Option<NaiveDate>,
}

/// Days of `month` in `year` that are not holidays (when excluded) and lie
/// strictly before `today`. The month is clipped to the employment window.
pub fn unmarked_days_in_month(
    year: i32,
    month: u32,
    employment: Employment,
    holidays: &HashSet<NaiveDate>,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, month, 1),
        last_day_of_month(year, month),
    ) else {
        return Vec::new();
    };

    let start = if same_month(employment.joining, first) {
        employment.joining
    } else {
        first
    };
    let end = match employment.relieving {
        Some(r) if same_month(r, first) => r,
        _ => last,
    };
    if employment.joining > last || employment.relieving.is_some_and(|r| r < first) {
        return Vec::new();
    }

    days_inclusive(start, end)
        .into_iter()
        .take_while(|d| *d < today)
        .filter(|d| !holidays.contains(d))
        .collect()
}

/// Days in `[from, to]`, clamped to the employment window, that have no
/// workday yet.
pub fn unmarked_days_in_range(
    from: NaiveDate,
    to: NaiveDate,
    employment: Employment,
    marked: &HashSet<NaiveDate>,
) -> Vec<NaiveDate> {
    let start = from.max(employment.joining);
    let end = employment.relieving.map_or(to, |r| to.min(r));

    days_inclusive(start, end)
        .into_iter()
        .filter(|d| !marked.contains(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_limited_to_a_leap_year() {
        assert!(check_range(d(2024, 1, 1), d(2024, 12, 31)).is_ok());
        assert!(check_range(d(2024, 1, 1), d(2025, 1, 1)).is_err());
        assert!(check_range(d(1, 1, 1), d(9999, 12, 31)).is_err());
        assert!(check_range(d(2024, 3, 4), d(2024, 3, 1)).is_ok());
    }

    fn employed_since(joining: NaiveDate) -> Employment {
        Employment { joining, relieving: None }
    }

    #[test]
    fn month_stops_before_today() {
        let days = unmarked_days_in_month(
            2024,
            3,
            employed_since(d(2020, 1, 1)),
            &HashSet::new(),
            d(2024, 3, 5),
        );
        assert_eq!(days, vec![d(2024, 3, 1), d(2024, 3, 2), d(2024, 3, 3), d(2024, 3, 4)]);
    }

    #[test]
    fn past_month_is_complete_and_skips_holidays() {
        let holidays: HashSet<_> = [d(2024, 2, 14)].into_iter().collect();
        let days = unmarked_days_in_month(
            2024,
            2,
            employed_since(d(2020, 1, 1)),
            &holidays,
            d(2024, 3, 5),
        );
        assert_eq!(days.len(), 28);
        assert!(!days.contains(&d(2024, 2, 14)));
    }

    #[test]
    fn month_starts_at_joining_and_ends_at_relieving() {
        let employment = Employment {
            joining: d(2024, 2, 10),
            relieving: Some(d(2024, 2, 12)),
        };
        let days = unmarked_days_in_month(2024, 2, employment, &HashSet::new(), d(2024, 6, 1));
        assert_eq!(days, vec![d(2024, 2, 10), d(2024, 2, 11), d(2024, 2, 12)]);
    }

    #[test]
    fn month_outside_employment_is_empty() {
        let employment = employed_since(d(2024, 5, 1));
        assert!(unmarked_days_in_month(2024, 2, employment, &HashSet::new(), d(2024, 6, 1)).is_empty());
    }

    #[test]
    fn range_excludes_existing_workdays() {
        let marked: HashSet<_> = [d(2024, 3, 2)].into_iter().collect();
        let days = unmarked_days_in_range(
            d(2024, 3, 1),
            d(2024, 3, 3),
            employed_since(d(2020, 1, 1)),
            &marked,
        );
        assert_eq!(days, vec![d(2024, 3, 1), d(2024, 3, 3)]);
    }

    #[test]
    fn range_is_clamped_to_employment() {
        let employment = Employment {
            joining: d(2024, 3, 2),
            relieving: Some(d(2024, 3, 4)),
        };
        let days = unmarked_days_in_range(d(2024, 3, 1), d(2024, 3, 9), employment, &HashSet::new());
        assert_eq!(days, vec![d(2024, 3, 2), d(2024, 3, 3), d(2024, 3, 4)]);
    }
}
