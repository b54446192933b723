//! Loader for SLO specification files.

use std::{fs, path::PathBuf};

use thiserror::Error;

use super::model::Spec;

/// Loads and decodes a spec document from a YAML file.
pub struct SpecLoader {
    path: PathBuf,
}

/// Errors that can occur while loading a specification.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The spec file could not be read.
    #[error("Failed to read spec file: {0}")]
    Io(#[from] std::io::Error),

    /// The spec file is not valid YAML for the spec schema.
    #[error("Failed to parse spec: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The spec file does not have a `.yaml`/`.yml` extension.
    #[error("Unsupported spec format; expected a .yaml or .yml file")]
    UnsupportedFormat,
}

impl SpecLoader {
    /// Creates a new `SpecLoader` for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads and decodes the spec document. Validation is a separate step; a
    /// successfully loaded spec may still fail [`Spec::validate`].
    ///
    /// [`Spec::validate`]: super::model::Spec::validate
    pub fn load(&self) -> Result<Spec, LoaderError> {
        if !self.is_yaml_file() {
            return Err(LoaderError::UnsupportedFormat);
        }
        let raw = fs::read_to_string(&self.path)?;
        let spec = serde_yaml::from_str(&raw)?;
        Ok(spec)
    }

    /// Checks if the file has a YAML extension.
    fn is_yaml_file(&self) -> bool {
        matches!(
            self.path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        )
    }
}
