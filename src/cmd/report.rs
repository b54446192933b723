//! `report`: aggregate multiple analysis results into one fleet report.

use std::path::PathBuf;

use clap::Args;

use crate::analyze::model::Status;
use crate::report::{
    aggregate, read_results, write_aggregate_markdown, write_errors_markdown, write_json,
};

use super::Error;

/// Flags for the report subcommand.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Comma-separated list of result.json files to aggregate.
    #[arg(long, default_value = "")]
    pub inputs: String,

    /// Output directory.
    #[arg(long, default_value = "out/report")]
    pub out: String,

    /// Exit with code 2 when the aggregate status is not ok.
    #[arg(long)]
    pub fail_on_partial: bool,
}

/// `margin report`.
pub fn execute(args: ReportArgs) -> Result<(), Error> {
    let inputs: Vec<String> = args
        .inputs
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let results = read_results(&inputs)?;
    let report = aggregate(&results)?;

    let out_dir = PathBuf::from(&args.out);
    write_json(&out_dir.join("report.json"), &report)?;
    write_aggregate_markdown(&out_dir.join("report.md"), &report)?;
    write_errors_markdown(&out_dir.join("errors.md"), &report.errors)?;

    println!(
        "Aggregated {} inputs into {} services: {}.",
        report.inputs.len(),
        report.services.len(),
        report.status
    );
    println!("Report written to {}.", out_dir.display());

    if args.fail_on_partial && report.status != Status::Ok {
        return Err(Error::Partial {
            what: format!("report finished with status {}", report.status),
        });
    }
    Ok(())
}
