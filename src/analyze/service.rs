//! Normalization of the `--service` flag.

use thiserror::Error;

/// Errors from resolving the service to analyze.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// `--project` was not given and the service was not a full resource name.
    #[error("--project is required")]
    MissingProject,

    /// `--service` was not given.
    #[error("--service is required")]
    MissingService,

    /// A full resource name embeds a different project than `--project`.
    #[error("service {service:?} belongs to project {embedded:?}, not {project:?}")]
    ProjectMismatch {
        /// The full service resource name.
        service: String,
        /// Project embedded in the resource name.
        embedded: String,
        /// Project given on the command line.
        project: String,
    },

    /// The resource name did not look like `projects/{p}/services/{s}`.
    #[error("invalid service resource name {0:?}")]
    InvalidResourceName(String),
}

/// Resolves `--project`/`--service` into `(project, full resource name)`.
///
/// The service may be a bare ID, which is joined with the project, or a full
/// `projects/{p}/services/{s}` name, which must agree with `--project` when
/// both are given.
pub fn normalize_service(project: &str, service: &str) -> Result<(String, String), ServiceError> {
    let service = service.trim();
    let project = project.trim();
    if service.is_empty() {
        return Err(ServiceError::MissingService);
    }

    if let Some(rest) = service.strip_prefix("projects/") {
        let mut parts = rest.splitn(3, '/');
        let embedded = parts.next().unwrap_or_default();
        let keyword = parts.next().unwrap_or_default();
        let id = parts.next().unwrap_or_default();
        if embedded.is_empty() || keyword != "services" || id.is_empty() || id.contains('/') {
            return Err(ServiceError::InvalidResourceName(service.to_string()));
        }
        if !project.is_empty() && project != embedded {
            return Err(ServiceError::ProjectMismatch {
                service: service.to_string(),
                embedded: embedded.to_string(),
                project: project.to_string(),
            });
        }
        return Ok((embedded.to_string(), service.to_string()));
    }

    if project.is_empty() {
        return Err(ServiceError::MissingProject);
    }
    Ok((
        project.to_string(),
        format!("projects/{project}/services/{service}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id_joined_with_project() {
        let (project, service) = normalize_service("acme-prod", "checkout-api").unwrap();
        assert_eq!(project, "acme-prod");
        assert_eq!(service, "projects/acme-prod/services/checkout-api");
    }

    #[test]
    fn test_resource_name_passthrough() {
        let (project, service) =
            normalize_service("", "projects/acme-prod/services/checkout-api").unwrap();
        assert_eq!(project, "acme-prod");
        assert_eq!(service, "projects/acme-prod/services/checkout-api");
    }

    #[test]
    fn test_resource_name_project_mismatch() {
        let err = normalize_service("other", "projects/acme-prod/services/checkout-api")
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProjectMismatch { .. }));
    }

    #[test]
    fn test_missing_flags() {
        assert!(matches!(
            normalize_service("", "checkout-api"),
            Err(ServiceError::MissingProject)
        ));
        assert!(matches!(
            normalize_service("acme-prod", ""),
            Err(ServiceError::MissingService)
        ));
    }

    #[test]
    fn test_malformed_resource_name() {
        for bad in [
            "projects/acme-prod",
            "projects/acme-prod/slos/x",
            "projects//services/x",
            "projects/acme-prod/services/",
        ] {
            assert!(
                matches!(
                    normalize_service("", bad),
                    Err(ServiceError::InvalidResourceName(_))
                ),
                "{bad} should be rejected"
            );
        }
    }
}
