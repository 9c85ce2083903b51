//! Minimal iCalendar (RFC 5545) writer for all-day leave events.

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::model::leave_application::{LeaveCalendarEntry, LeaveStatus};

const PRODID: &str = "-//HR Addon//Leave Calendar//EN";
const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Confirmed,
    Cancelled,
}

impl EventStatus {
    fn as_ics(self) -> &'static str {
        match self {
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub status: EventStatus,
}

impl CalendarEvent {
    /// Approved leaves become confirmed events, cancelled ones cancelled
    /// events. Other statuses are not exported.
    pub fn from_leave(entry: &LeaveCalendarEntry) -> Option<Self> {
        let status = match entry.status.parse::<LeaveStatus>().ok()? {
            LeaveStatus::Approved => EventStatus::Confirmed,
            LeaveStatus::Cancelled => EventStatus::Cancelled,
            LeaveStatus::Open | LeaveStatus::Rejected => return None,
        };
        Some(Self {
            uid: format!("leave-application-{}@hr-addon", entry.id),
            summary: format!("{} ({})", entry.employee_name, entry.leave_type),
            description: entry.description.clone().filter(|d| !d.trim().is_empty()),
            first_day: entry.from_date,
            last_day: entry.to_date,
            status,
        })
    }
}

pub fn render_calendar(name: &str, events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{}", escape_text(name)),
    ];

    for event in events {
        // DTEND of an all-day event is exclusive
        let end = event
            .last_day
            .checked_add_days(Days::new(1))
            .unwrap_or(event.last_day);
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", event.uid));
        lines.push(format!("DTSTAMP:{dtstamp}"));
        lines.push(format!("DTSTART;VALUE=DATE:{}", event.first_day.format("%Y%m%d")));
        lines.push(format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")));
        lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));
        if let Some(description) = &event.description {
            lines.push(format!("DESCRIPTION:{}", escape_text(description)));
        }
        lines.push(format!("STATUS:{}", event.status.as_ics()));
        lines.push("TRANSP:TRANSPARENT".to_string());
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(&line));
        out.push_str("\r\n");
    }
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Splits a content line into chunks of at most 75 octets without breaking
/// UTF-8 sequences; continuation lines start with a single space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        // continuation lines carry a leading space, leaving 74 octets of content
        if used + width > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            used = 1;
        }
        out.push(c);
        used += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(id: u64, status: &str) -> LeaveCalendarEntry {
        LeaveCalendarEntry {
            id,
            employee_name: "Jane Roe".into(),
            leave_type: "Annual Leave".into(),
            from_date: d(2024, 7, 1),
            to_date: d(2024, 7, 5),
            status: status.into(),
            description: None,
        }
    }

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn only_approved_and_cancelled_leaves_are_exported() {
        assert_eq!(
            CalendarEvent::from_leave(&entry(1, "Approved")).map(|e| e.status),
            Some(EventStatus::Confirmed)
        );
        assert_eq!(
            CalendarEvent::from_leave(&entry(2, "Cancelled")).map(|e| e.status),
            Some(EventStatus::Cancelled)
        );
        assert!(CalendarEvent::from_leave(&entry(3, "Open")).is_none());
        assert!(CalendarEvent::from_leave(&entry(4, "Rejected")).is_none());
    }

    #[test]
    fn renders_all_day_event_with_exclusive_end() {
        let event = CalendarEvent::from_leave(&entry(7, "Approved")).unwrap();
        let ics = render_calendar("Leaves", &[event], stamp());

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert!(ics.contains("UID:leave-application-7@hr-addon\r\n"));
        assert!(ics.contains("DTSTAMP:20240601T120000Z\r\n"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20240701\r\n"));
        assert!(ics.contains("DTEND;VALUE=DATE:20240706\r\n"));
        assert!(ics.contains("SUMMARY:Jane Roe (Annual Leave)\r\n"));
        assert!(ics.contains("STATUS:CONFIRMED\r\n"));
    }

    #[test]
    fn empty_calendar_is_still_valid() {
        let ics = render_calendar("Leaves", &[], stamp());
        assert!(!ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("X-WR-CALNAME:Leaves\r\n"));
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn folds_long_lines_on_char_boundaries() {
        let line = format!("DESCRIPTION:{}", "ü".repeat(60));
        let folded = fold_line(&line);
        for part in folded.split("\r\n") {
            assert!(part.len() <= MAX_LINE_OCTETS, "{} octets", part.len());
        }
        let unfolded = folded.replace("\r\n ", "");
        assert_eq!(unfolded, line);
    }
}
