pub mod add;
pub mod auth_cmd;
pub mod check;
pub mod common;
pub mod config;
pub mod delete;
pub mod list;
pub mod reminders;
pub mod watch;
