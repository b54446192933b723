//! `apply`, `plan`, `validate`, and `delete`: the spec-driven subcommands.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use crate::monitoring::{apply_plan, delete_plan, Backend, GcpBackend};
use crate::planner::{self, render::render_plan, Plan};
use crate::spec::{parse_labels, Spec, SpecLoader};

use super::Error;

/// Flags shared by every spec-driven subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SpecArgs {
    /// Path to the spec file.
    #[arg(short, long)]
    pub file: Option<String>,

    /// Overrides metadata.project from the spec.
    #[arg(long, default_value = "")]
    pub project: String,

    /// Extra labels as key=value,key=value, merged over the spec's labels.
    #[arg(long, default_value = "")]
    pub labels: String,

    /// Print what would change without calling Google Cloud.
    #[arg(long)]
    pub dry_run: bool,
}

/// Loads, validates, and plans the spec named by the shared flags.
pub fn build_plan(args: &SpecArgs) -> Result<(Spec, Plan), Error> {
    let file = args.file.as_deref().ok_or(Error::MissingSpecFile)?;
    let spec = SpecLoader::new(PathBuf::from(file)).load()?;
    spec.validate()?;
    let labels = parse_labels(&args.labels)?;
    let plan = planner::build(
        &spec,
        &planner::Options {
            project_override: args.project.clone(),
            labels,
        },
    );
    if plan.project.trim().is_empty() {
        return Err(Error::MissingProject);
    }
    Ok((spec, plan))
}

/// `margin validate`: load and validate, touching nothing remote.
pub fn execute_validate(args: SpecArgs) -> Result<(), Error> {
    let file = args.file.as_deref().ok_or(Error::MissingSpecFile)?;
    let spec = SpecLoader::new(PathBuf::from(file)).load()?;
    spec.validate()?;
    println!(
        "Spec is valid: {} ({} SLOs).",
        spec.metadata.name,
        spec.slos.len()
    );
    Ok(())
}

/// `margin plan`: print the plan without applying it.
pub fn execute_plan(args: SpecArgs) -> Result<(), Error> {
    let (_, plan) = build_plan(&args)?;
    let mut stdout = io::stdout().lock();
    render_plan(&mut stdout, &plan).map_err(Error::Io)?;
    Ok(())
}

/// `margin apply`: reconcile the plan against Cloud Monitoring.
pub async fn execute_apply(args: SpecArgs) -> Result<(), Error> {
    let dry_run = args.dry_run;
    let (_, plan) = build_plan(&args)?;
    if dry_run {
        let mut stdout = io::stdout().lock();
        render_plan(&mut stdout, &plan).map_err(Error::Io)?;
        writeln!(stdout, "\nDry run; nothing was applied.").map_err(Error::Io)?;
        return Ok(());
    }

    let backend = GcpBackend::from_env()?;
    apply_plan(&backend, &plan).await?;
    println!(
        "Applied {} SLOs, {} alerts, and 1 dashboard in project {}.",
        plan.slos.len(),
        plan.alerts.len(),
        plan.project
    );
    println!(
        "View: https://console.cloud.google.com/monitoring/services?project={}",
        plan.project
    );
    Ok(())
}

/// `margin delete`: remove every resource the spec owns.
pub async fn execute_delete(args: SpecArgs) -> Result<(), Error> {
    let dry_run = args.dry_run;
    let (_, plan) = build_plan(&args)?;
    if dry_run {
        let labels: Vec<String> = plan
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!(
            "Would delete resources under service {} in project {} labeled {}.",
            plan.service_id,
            plan.project,
            labels.join(", ")
        );
        return Ok(());
    }

    let backend = GcpBackend::from_env()?;
    let summary = delete_plan(&backend, &plan).await?;
    println!(
        "Deleted {} SLOs, {} alerts, and {} dashboards in project {}.",
        summary.slos, summary.alerts, summary.dashboards, plan.project
    );
    Ok(())
}

/// Shared by integration tests that drive apply against a mock endpoint.
pub async fn apply_with_backend(args: SpecArgs, backend: &dyn Backend) -> Result<(), Error> {
    let (_, plan) = build_plan(&args)?;
    apply_plan(backend, &plan).await?;
    Ok(())
}
