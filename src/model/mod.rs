pub mod audit_log;
pub mod client;
pub mod employee;
pub mod role;
pub mod time_entry;
pub mod time_off;
pub mod timesheet;
