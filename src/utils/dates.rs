use chrono::{Datelike, Month, NaiveDate, Weekday};

/// `dd.MM.yyyy`, the format used in user-facing date lists.
pub fn format_dotted(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Month number for an English month name ("January", "jan", ...).
pub fn month_number(name: &str) -> Option<u32> {
    name.trim().parse::<Month>().ok().map(|m| m.number_from_month())
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1).and_then(|d| d.pred_opt())
}

/// All dates from `start` to `end`, both inclusive. Empty when `start > end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Full English weekday name, as stored on daily hours rows.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn formats_with_dots() {
        assert_eq!(format_dotted(d(2024, 3, 4)), "04.03.2024");
    }

    #[test]
    fn parses_month_names() {
        assert_eq!(month_number("February"), Some(2));
        assert_eq!(month_number("dec"), Some(12));
        assert_eq!(month_number("Brumaire"), None);
    }

    #[test]
    fn last_day_handles_leap_years_and_december() {
        assert_eq!(last_day_of_month(2024, 2), Some(d(2024, 2, 29)));
        assert_eq!(last_day_of_month(2023, 2), Some(d(2023, 2, 28)));
        assert_eq!(last_day_of_month(2023, 12), Some(d(2023, 12, 31)));
    }

    #[test]
    fn weekday_names_are_full() {
        assert_eq!(weekday_name(d(2024, 3, 4).weekday()), "Monday");
        assert_eq!(weekday_name(Weekday::Sun), "Sunday");
    }

    #[test]
    fn inclusive_day_range() {
        assert_eq!(days_inclusive(d(2024, 1, 30), d(2024, 2, 1)).len(), 3);
        assert!(days_inclusive(d(2024, 2, 1), d(2024, 1, 30)).is_empty());
    }
}
