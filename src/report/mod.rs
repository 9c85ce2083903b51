pub mod work_hour;
