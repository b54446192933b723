//! Spec loading, modeling, and validation.
//!
//! This module owns everything between a YAML file on disk and a validated
//! [`Spec`] the planner can consume.

pub mod labels;
pub mod loader;
pub mod model;
pub mod templates;
pub mod validate;
pub mod window;

pub use labels::parse_labels;
pub use loader::{LoaderError, SpecLoader};
pub use model::{
    AlertOverride, Alerting, Metadata, MetricRef, Period, Sli, Slo, SloAlerting, Spec,
    API_VERSION_V1, KIND_SERVICE_SLO,
};
pub use templates::{template_for_service, MetricTemplate, ServiceTemplate, TemplateError};
pub use validate::ValidationError;
pub use window::{is_calendar_window, is_valid_window, parse_threshold, parse_window, WindowError};
