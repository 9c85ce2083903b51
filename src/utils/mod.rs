pub mod dates;
pub mod error_log;
