pub mod checkin;
pub mod leave_application;
pub mod report;
pub mod settings;
pub mod weekly_working_hours;
pub mod workday;
