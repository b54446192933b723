#![warn(missing_docs)]
//! Margin manages service level objectives declaratively: a YAML spec is
//! validated, turned into a deterministic plan, and reconciled against
//! Google Cloud Monitoring. It also analyzes and reports on live error
//! budgets without writing anything.

pub mod alerting;
pub mod analyze;
pub mod cmd;
pub mod monitoring;
pub mod planner;
pub mod report;
pub mod spec;
