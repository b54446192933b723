//! CLI subcommand implementations.

pub mod analyze;
pub mod apply;
pub mod report;
pub mod services;

use thiserror::Error;

use crate::analyze::AnalyzeError;
use crate::monitoring::{ApplyError, BackendError};
use crate::report::ReportError;
use crate::spec::labels::LabelError;
use crate::spec::loader::LoaderError;
use crate::spec::validate::ValidationError;

/// Errors surfaced to the CLI user. [`Error::exit_code`] maps these onto the
/// process exit status.
#[derive(Debug, Error)]
pub enum Error {
    /// No spec file was given.
    #[error("-f is required")]
    MissingSpecFile,

    /// Neither the spec nor `--project` named a project.
    #[error("--project is required when the spec has no metadata.project")]
    MissingProject,

    /// `--labels` was malformed.
    #[error(transparent)]
    Labels(#[from] LabelError),

    /// The spec file could not be loaded.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// The spec failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An apply or delete pass failed.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// A backend call outside the reconciler failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Analysis failed outright.
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    /// Reading or writing reports failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// `--only` was not a valid regular expression.
    #[error("invalid --only pattern: {0}")]
    OnlyRegex(#[from] regex::Error),

    /// `--format` named an unknown output format.
    #[error("unknown format {0:?}; expected md, json, or a comma-separated mix")]
    UnknownFormat(String),

    /// `explain` was given an unknown topic.
    #[error("unknown topic {0:?}; try burn-rate")]
    UnknownTopic(String),

    /// A local filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run completed but the result is degraded and the caller asked to
    /// fail on that.
    #[error("{what}")]
    Partial {
        /// Human description of the degradation.
        what: String,
    },
}

impl Error {
    /// Process exit code: 2 for degraded-but-completed runs, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Partial { .. } => 2,
            _ => 1,
        }
    }
}
