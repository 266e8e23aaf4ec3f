//! Travel regulation, allowance estimation, and approval lifecycle engine for
//! business-trip and expense applications.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
