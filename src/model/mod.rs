pub mod employee;
pub mod employee_checkin;
pub mod leave_application;
pub mod role;
pub mod scheduled_job_log;
pub mod settings;
pub mod user;
pub mod weekly_working_hours;
pub mod workday;
