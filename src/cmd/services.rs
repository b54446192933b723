//! `services list`: show the monitoring services in a project.

use clap::Args;

use crate::monitoring::{Backend, GcpBackend};
use crate::planner::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};

use super::Error;

/// Flags for the services subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServicesArgs {
    /// Target project.
    #[arg(long)]
    pub project: String,
}

/// `margin services list`.
pub async fn execute_list(args: ServicesArgs) -> Result<(), Error> {
    let backend = GcpBackend::from_env()?;
    list_with_backend(args, &backend).await
}

/// Lists services with an injected backend. Used by tests.
pub async fn list_with_backend(args: ServicesArgs, backend: &dyn Backend) -> Result<(), Error> {
    let services = backend.list_services(&args.project).await?;
    if services.is_empty() {
        println!("No monitoring services in project {}.", args.project);
        return Ok(());
    }

    println!("{:<50} {:<30} {}", "NAME", "DISPLAY NAME", "MANAGED");
    for service in services {
        let managed = service.labels.get(MANAGED_BY_LABEL).map(String::as_str)
            == Some(MANAGED_BY_VALUE);
        println!(
            "{:<50} {:<30} {}",
            service.name,
            service.display_name,
            if managed { "yes" } else { "no" }
        );
    }
    Ok(())
}
