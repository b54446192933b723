//! Reconciliation against Cloud Monitoring.
//!
//! The reconciler drives an abstract [`Backend`] so the apply logic is
//! testable without the network; [`GcpBackend`] is the real implementation.

pub mod apply;
pub mod error;
pub mod gcp;
pub mod ownership;
pub mod traits;

pub use apply::{apply_plan, delete_plan, ApplyError};
pub use error::BackendError;
pub use gcp::{GcpBackend, DEFAULT_BASE_URL, TOKEN_ENV};
pub use ownership::OwnershipFilter;
pub use traits::{
    ApplyAlertRequest, ApplyDashboardRequest, ApplySloRequest, Backend, DeleteRequest,
    DeleteSummary, EnsureServiceRequest, ServiceSummary,
};
