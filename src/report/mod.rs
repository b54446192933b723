//! Report reading, aggregation, and rendering.

pub mod aggregate;
pub mod errors;
pub mod json;
pub mod markdown;

pub use aggregate::{aggregate, read_results, AggregateResult, ReportError, ServiceAggregate};
pub use errors::write_errors_markdown;
pub use json::write_json;
pub use markdown::{write_aggregate_markdown, write_markdown_summary};
