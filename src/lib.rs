pub mod calendar;
pub mod commands;
pub mod config;
pub mod dates;
pub mod engine;
pub mod fields;
pub mod jira;
pub mod jql;
pub mod logging;
pub mod models;
pub mod tracker;
