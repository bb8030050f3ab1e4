pub mod client;
pub mod dashboard;
pub mod employee;
pub mod time_off;
pub mod timesheet;
