//! Time accounting for a single employee day.
//!
//! Everything here is a pure function of the day's check-ins, the weekly
//! target for that weekday, the holiday/policy flags and the break settings.
//! Persistence lives in [`super::service`].

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::employee_checkin::EmployeeCheckin;
use crate::model::settings::{BreakCalculationMode, HrAddonSettings};
use crate::model::workday::WorkdayStatus;

/// Hours worked reported when check-ins do not form IN/OUT pairs.
pub const ODD_CHECKINS_HOURS_WORKED: f64 = -36.0;
/// Break hours reported when check-ins do not form IN/OUT pairs.
pub const ODD_CHECKINS_BREAK_HOURS: f64 = -360.0;
/// Below this many worked hours a `no_break_hours` policy waives the break.
pub const NO_BREAK_THRESHOLD_HOURS: f64 = 6.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Target hours and break allowance configured for one weekday.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTarget {
    pub hours: f64,
    pub break_minutes: i64,
}

impl DailyTarget {
    pub fn break_hours(&self) -> f64 {
        self.break_minutes as f64 / 60.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayPolicy {
    pub no_break_hours: bool,
    pub target_zero_on_holiday: bool,
    pub is_holiday: bool,
}

impl DayPolicy {
    fn zero_target(&self) -> bool {
        self.target_zero_on_holiday && self.is_holiday
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakSettings {
    pub mode: BreakCalculationMode,
    pub swap_hours: bool,
}

impl BreakSettings {
    /// Swapping only applies when breaks come from the check-ins themselves.
    pub fn swapped(&self) -> bool {
        self.mode == BreakCalculationMode::FromCheckins && self.swap_hours
    }
}

impl From<&HrAddonSettings> for BreakSettings {
    fn from(s: &HrAddonSettings) -> Self {
        Self {
            mode: s.workday_break_calculation_mechanism,
            swap_hours: s.swap_hours_worked_and_actual_working_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WorkdayLog {
    pub target_hours: f64,
    pub total_target_seconds: f64,
    pub break_minutes: i64,
    pub hours_worked: f64,
    pub expected_break_hours: f64,
    pub actual_working_hours: f64,
    pub total_work_seconds: f64,
    pub break_hours: f64,
    pub total_break_seconds: f64,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub first_checkin: Option<NaiveDateTime>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub last_checkout: Option<NaiveDateTime>,
    pub attendance_id: Option<u64>,
    pub manual_workday: bool,
    pub checkins: Vec<EmployeeCheckin>,
}

impl WorkdayLog {
    /// True when the check-ins could not be paired.
    pub fn has_unpaired_checkins(&self) -> bool {
        self.checkins.len() % 2 != 0
    }
}

/// Difference in hours, rounded to six decimals.
pub fn hours_between(later: NaiveDateTime, earlier: NaiveDateTime) -> f64 {
    let hours = (later - earlier).num_seconds() as f64 / SECONDS_PER_HOUR;
    (hours * 1e6).round() / 1e6
}

/// Computes the log for a day. Without check-ins the day is accounted from
/// the target alone and `fallback_attendance` (the day's attendance record)
/// is linked.
pub fn compute_day(
    checkins: &[EmployeeCheckin],
    target: DailyTarget,
    policy: DayPolicy,
    settings: BreakSettings,
    fallback_attendance: Option<u64>,
) -> WorkdayLog {
    if checkins.is_empty() {
        compute_without_checkins(target, policy, fallback_attendance)
    } else {
        compute_from_checkins(checkins, target, policy, settings)
    }
}

pub fn compute_without_checkins(
    target: DailyTarget,
    policy: DayPolicy,
    attendance_id: Option<u64>,
) -> WorkdayLog {
    if policy.zero_target() {
        return WorkdayLog {
            target_hours: 0.0,
            total_target_seconds: 0.0,
            break_minutes: target.break_minutes,
            hours_worked: 0.0,
            expected_break_hours: 0.0,
            actual_working_hours: 0.0,
            total_work_seconds: 0.0,
            break_hours: 0.0,
            total_break_seconds: 0.0,
            first_checkin: None,
            last_checkout: None,
            attendance_id,
            manual_workday: false,
            checkins: Vec::new(),
        };
    }

    WorkdayLog {
        target_hours: target.hours,
        total_target_seconds: target.hours * SECONDS_PER_HOUR,
        break_minutes: target.break_minutes,
        hours_worked: 0.0,
        expected_break_hours: target.break_hours(),
        actual_working_hours: -target.hours,
        total_work_seconds: 0.0,
        break_hours: 0.0,
        total_break_seconds: 0.0,
        first_checkin: None,
        last_checkout: None,
        attendance_id,
        manual_workday: true,
        checkins: Vec::new(),
    }
}

/// Pairs check-ins positionally (even index IN, odd index OUT) and derives
/// worked, break and actual hours.
pub fn compute_from_checkins(
    checkins: &[EmployeeCheckin],
    target: DailyTarget,
    policy: DayPolicy,
    settings: BreakSettings,
) -> WorkdayLog {
    let swapped = settings.swapped();
    let paired = checkins.len() % 2 == 0;

    let mut hours_worked: f64 = 0.0;
    let mut total_duration: f64 = 0.0;
    let mut first_checkin = None;
    let mut last_checkout = None;
    let break_hours;

    if paired {
        let clock_ins: Vec<NaiveDateTime> = checkins.iter().step_by(2).map(|c| c.time).collect();
        let clock_outs: Vec<NaiveDateTime> =
            checkins.iter().skip(1).step_by(2).map(|c| c.time).collect();

        hours_worked = clock_ins
            .iter()
            .zip(&clock_outs)
            .map(|(i, o)| hours_between(*o, *i))
            .sum();

        if let (Some(first), Some(last)) = (clock_ins.first(), clock_outs.last()) {
            first_checkin = Some(*first);
            last_checkout = Some(*last);
            total_duration = hours_between(*last, *first);
        }

        if swapped {
            std::mem::swap(&mut hours_worked, &mut total_duration);
        }

        let break_from_checkins: f64 = clock_outs
            .iter()
            .zip(clock_ins.iter().skip(1))
            .map(|(o, next_in)| hours_between(*next_in, *o))
            .sum();

        break_hours = select_break_hours(settings.mode, break_from_checkins, target.break_hours());
    } else {
        hours_worked = ODD_CHECKINS_HOURS_WORKED;
        break_hours = ODD_CHECKINS_BREAK_HOURS;
    }

    let expected_break_hours = target.break_hours();
    let mut break_minutes = target.break_minutes;
    let mut total_break_seconds = break_hours * SECONDS_PER_HOUR;
    let total_work_seconds = hours_worked * SECONDS_PER_HOUR;

    let mut actual_working_hours = if swapped {
        if hours_worked > 0.0 {
            hours_worked - break_hours
        } else {
            total_duration - expected_break_hours
        }
    } else if total_duration > 0.0 {
        total_duration - break_hours
    } else {
        hours_worked - expected_break_hours
    };

    if policy.no_break_hours && hours_worked < NO_BREAK_THRESHOLD_HOURS && !swapped {
        break_minutes = 0;
        total_break_seconds = 0.0;
        actual_working_hours = hours_worked;
    }

    let (target_hours, total_target_seconds) = if policy.zero_target() {
        (0.0, 0.0)
    } else {
        (target.hours, target.hours * SECONDS_PER_HOUR)
    };

    WorkdayLog {
        target_hours,
        total_target_seconds,
        break_minutes,
        hours_worked,
        expected_break_hours,
        actual_working_hours,
        total_work_seconds,
        break_hours,
        total_break_seconds,
        first_checkin,
        last_checkout,
        attendance_id: checkins.first().and_then(|c| c.attendance_id),
        manual_workday: false,
        checkins: checkins.to_vec(),
    }
}

fn select_break_hours(mode: BreakCalculationMode, from_checkins: f64, configured: f64) -> f64 {
    match mode {
        BreakCalculationMode::FromCheckins => from_checkins,
        BreakCalculationMode::FromWeeklyWorkingHours => configured,
        BreakCalculationMode::FromWeeklyWorkingHoursIfShorter => {
            if from_checkins <= configured {
                configured
            } else {
                from_checkins
            }
        }
    }
}

/// Comp-time day: nothing worked, the whole target counts as owed.
pub fn apply_comp_off(log: &mut WorkdayLog) {
    log.hours_worked = 0.0;
    log.actual_working_hours = -log.target_hours;
    log.break_hours = 0.0;
    log.total_break_seconds = 0.0;
    log.total_work_seconds = log.actual_working_hours * SECONDS_PER_HOUR;
}

/// Applies the leave and status rules and returns the resulting status.
pub fn apply_leave_status(
    log: &mut WorkdayLog,
    status: WorkdayStatus,
    on_leave: bool,
) -> WorkdayStatus {
    let mut status = status;
    if on_leave {
        log.target_hours = 0.0;
        log.expected_break_hours = 0.0;
        log.actual_working_hours = 0.0;
        log.total_target_seconds = 0.0;
        log.total_break_seconds = 0.0;
        log.total_work_seconds = 0.0;
        status = WorkdayStatus::OnLeave;
    }

    match status {
        WorkdayStatus::HalfDay => log.target_hours /= 2.0,
        WorkdayStatus::OnLeave => log.target_hours = 0.0,
        _ => {}
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hm: &str) -> NaiveDateTime {
        let (h, m) = hm.split_once(':').unwrap();
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h.parse().unwrap(), m.parse().unwrap(), 0)
            .unwrap()
    }

    fn checkins(times: &[&str]) -> Vec<EmployeeCheckin> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| EmployeeCheckin {
                id: i as u64 + 1,
                employee_id: 7,
                log_type: if i % 2 == 0 { "IN" } else { "OUT" }.to_string(),
                time: at(t),
                skip_auto_attendance: false,
                attendance_id: if i == 0 { Some(99) } else { None },
            })
            .collect()
    }

    fn target(hours: f64, break_minutes: i64) -> DailyTarget {
        DailyTarget { hours, break_minutes }
    }

    fn mode(mode: BreakCalculationMode) -> BreakSettings {
        BreakSettings { mode, swap_hours: false }
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    const SPLIT_DAY: [&str; 4] = ["08:00", "12:00", "12:30", "17:00"];

    #[test]
    fn worked_hours_sum_paired_differences() {
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 30),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromCheckins),
        );
        approx(log.hours_worked, 8.5);
        approx(log.total_work_seconds, 8.5 * 3600.0);
        assert_eq!(log.first_checkin, Some(at("08:00")));
        assert_eq!(log.last_checkout, Some(at("17:00")));
        assert_eq!(log.attendance_id, Some(99));
        assert!(!log.manual_workday);
    }

    #[test]
    fn three_pairs_sum_all_segments() {
        let log = compute_from_checkins(
            &checkins(&["07:15", "09:45", "10:00", "12:00", "13:00", "16:20"]),
            target(8.0, 0),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromCheckins),
        );
        approx(log.hours_worked, 2.5 + 2.0 + 3.333333);
        approx(log.break_hours, 0.25 + 1.0);
    }

    #[test]
    fn odd_checkins_report_sentinels() {
        let log = compute_from_checkins(
            &checkins(&["08:00", "12:00", "12:30"]),
            target(8.0, 30),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromCheckins),
        );
        approx(log.hours_worked, ODD_CHECKINS_HOURS_WORKED);
        approx(log.break_hours, ODD_CHECKINS_BREAK_HOURS);
        approx(log.actual_working_hours, ODD_CHECKINS_HOURS_WORKED - 0.5);
        assert!(log.has_unpaired_checkins());
        assert_eq!(log.first_checkin, None);
        assert_eq!(log.last_checkout, None);
    }

    #[test]
    fn single_checkin_is_unpaired() {
        let log = compute_from_checkins(
            &checkins(&["08:00"]),
            target(8.0, 30),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromWeeklyWorkingHours),
        );
        approx(log.hours_worked, -36.0);
        approx(log.total_break_seconds, -360.0 * 3600.0);
    }

    #[test]
    fn break_from_checkins_uses_gaps() {
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 45),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromCheckins),
        );
        approx(log.break_hours, 0.5);
        approx(log.expected_break_hours, 0.75);
        approx(log.actual_working_hours, 9.0 - 0.5);
    }

    #[test]
    fn break_from_weekly_hours_uses_configured_minutes() {
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 45),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromWeeklyWorkingHours),
        );
        approx(log.break_hours, 0.75);
        approx(log.actual_working_hours, 9.0 - 0.75);
    }

    #[test]
    fn shorter_break_is_raised_to_configured() {
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 45),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromWeeklyWorkingHoursIfShorter),
        );
        approx(log.break_hours, 0.75);
    }

    #[test]
    fn longer_break_is_kept_when_only_shorter_ones_are_raised() {
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 15),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromWeeklyWorkingHoursIfShorter),
        );
        approx(log.break_hours, 0.5);
        approx(log.actual_working_hours, 8.5);
    }

    #[test]
    fn swapped_mode_exchanges_worked_and_span() {
        let settings = BreakSettings {
            mode: BreakCalculationMode::FromCheckins,
            swap_hours: true,
        };
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 30),
            DayPolicy::default(),
            settings,
        );
        approx(log.hours_worked, 9.0);
        approx(log.total_work_seconds, 9.0 * 3600.0);
        approx(log.actual_working_hours, 9.0 - 0.5);
    }

    #[test]
    fn swap_flag_is_ignored_outside_checkin_mode() {
        let settings = BreakSettings {
            mode: BreakCalculationMode::FromWeeklyWorkingHours,
            swap_hours: true,
        };
        assert!(!settings.swapped());
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 30),
            DayPolicy::default(),
            settings,
        );
        approx(log.hours_worked, 8.5);
    }

    #[test]
    fn no_break_policy_waives_break_on_short_days() {
        let policy = DayPolicy { no_break_hours: true, ..DayPolicy::default() };
        let log = compute_from_checkins(
            &checkins(&["08:00", "13:00"]),
            target(8.0, 30),
            policy,
            mode(BreakCalculationMode::FromWeeklyWorkingHours),
        );
        approx(log.actual_working_hours, 5.0);
        assert_eq!(log.break_minutes, 0);
        approx(log.total_break_seconds, 0.0);
    }

    #[test]
    fn no_break_policy_does_not_apply_to_long_days() {
        let policy = DayPolicy { no_break_hours: true, ..DayPolicy::default() };
        let log = compute_from_checkins(
            &checkins(&["08:00", "15:00"]),
            target(8.0, 30),
            policy,
            mode(BreakCalculationMode::FromWeeklyWorkingHours),
        );
        approx(log.actual_working_hours, 6.5);
        assert_eq!(log.break_minutes, 30);
    }

    #[test]
    fn holiday_zeroes_target_when_configured() {
        let policy = DayPolicy {
            target_zero_on_holiday: true,
            is_holiday: true,
            ..DayPolicy::default()
        };
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 30),
            policy,
            mode(BreakCalculationMode::FromCheckins),
        );
        approx(log.target_hours, 0.0);
        approx(log.total_target_seconds, 0.0);
        approx(log.hours_worked, 8.5);
    }

    #[test]
    fn holiday_without_flag_keeps_target() {
        let policy = DayPolicy { is_holiday: true, ..DayPolicy::default() };
        let log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 30),
            policy,
            mode(BreakCalculationMode::FromCheckins),
        );
        approx(log.target_hours, 8.0);
        approx(log.total_target_seconds, 28_800.0);
    }

    #[test]
    fn missing_checkins_owe_the_full_target() {
        let log = compute_day(
            &[],
            target(7.5, 30),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromCheckins),
            Some(5),
        );
        assert!(log.manual_workday);
        approx(log.actual_working_hours, -7.5);
        approx(log.expected_break_hours, 0.5);
        approx(log.total_target_seconds, 27_000.0);
        assert_eq!(log.attendance_id, Some(5));
    }

    #[test]
    fn missing_checkins_on_zeroed_holiday_account_nothing() {
        let policy = DayPolicy {
            target_zero_on_holiday: true,
            is_holiday: true,
            ..DayPolicy::default()
        };
        let log = compute_without_checkins(target(7.5, 30), policy, None);
        assert!(!log.manual_workday);
        approx(log.target_hours, 0.0);
        approx(log.actual_working_hours, 0.0);
        approx(log.expected_break_hours, 0.0);
    }

    #[test]
    fn comp_off_negates_target() {
        let mut log = compute_from_checkins(
            &checkins(&SPLIT_DAY),
            target(8.0, 30),
            DayPolicy::default(),
            mode(BreakCalculationMode::FromCheckins),
        );
        apply_comp_off(&mut log);
        approx(log.hours_worked, 0.0);
        approx(log.actual_working_hours, -8.0);
        approx(log.break_hours, 0.0);
        approx(log.total_work_seconds, -8.0 * 3600.0);
    }

    #[test]
    fn leave_zeroes_accounting_and_sets_status() {
        let mut log = compute_without_checkins(target(8.0, 30), DayPolicy::default(), None);
        let status = apply_leave_status(&mut log, WorkdayStatus::Present, true);
        assert_eq!(status, WorkdayStatus::OnLeave);
        approx(log.target_hours, 0.0);
        approx(log.actual_working_hours, 0.0);
        approx(log.expected_break_hours, 0.0);
        approx(log.total_target_seconds, 0.0);
    }

    #[test]
    fn half_day_halves_target() {
        let mut log = compute_without_checkins(target(8.0, 30), DayPolicy::default(), None);
        let status = apply_leave_status(&mut log, WorkdayStatus::HalfDay, false);
        assert_eq!(status, WorkdayStatus::HalfDay);
        approx(log.target_hours, 4.0);
    }

    #[test]
    fn explicit_on_leave_status_zeroes_target() {
        let mut log = compute_without_checkins(target(8.0, 30), DayPolicy::default(), None);
        apply_leave_status(&mut log, WorkdayStatus::OnLeave, false);
        approx(log.target_hours, 0.0);
    }

    #[test]
    fn hours_between_rounds_to_six_places() {
        let a = at("08:00");
        let b = a + chrono::Duration::seconds(1);
        approx(hours_between(b, a), 0.000278);
    }
}
