//! `analyze`: read-only error budget analysis.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Args;
use regex::Regex;

use crate::analyze::fetch::GcpReader;
use crate::analyze::model::Status;
use crate::analyze::time::parse_last;
use crate::analyze::{self, Analysis, Reader, DEFAULT_MAX_SLOS};
use crate::planner::sanitize_id;
use crate::report::{write_errors_markdown, write_json, write_markdown_summary};

use super::Error;

/// Flags for the analyze subcommand.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Target project. Optional when --service is a full resource name.
    #[arg(long, default_value = "")]
    pub project: String,

    /// Service ID or full projects/{p}/services/{s} resource name.
    #[arg(long, default_value = "")]
    pub service: String,

    /// Window start, RFC 3339. Ignored when --last is given.
    #[arg(long, default_value = "")]
    pub start: String,

    /// Window end, RFC 3339. Ignored when --last is given.
    #[arg(long, default_value = "")]
    pub end: String,

    /// Trailing window ending now, e.g. 90m or 7d. Wins over --start/--end.
    #[arg(long)]
    pub last: Option<String>,

    /// Output directory. Defaults to a timestamped directory under
    /// out/margin-analyze.
    #[arg(long)]
    pub out: Option<String>,

    /// Output formats, comma separated.
    #[arg(long, default_value = "md,json")]
    pub format: String,

    /// Include the budget formula and notes per SLO.
    #[arg(long)]
    pub explain: bool,

    /// Cap on the number of SLOs analyzed.
    #[arg(long, default_value_t = DEFAULT_MAX_SLOS)]
    pub max_slos: usize,

    /// Only analyze SLOs whose display name or resource name matches this
    /// regular expression.
    #[arg(long)]
    pub only: Option<String>,

    /// Exit with code 2 when the result is not ok.
    #[arg(long)]
    pub fail_on_partial: bool,
}

/// Output formats for analysis results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Format {
    /// Markdown summary plus errors file.
    Markdown,
    /// Machine-readable result document.
    Json,
}

/// Parses the `--format` flag.
pub fn parse_formats(input: &str) -> Result<BTreeSet<Format>, Error> {
    let mut formats = BTreeSet::new();
    for part in input.split(',') {
        match part.trim().to_ascii_lowercase().as_str() {
            "" => continue,
            "md" | "markdown" => {
                formats.insert(Format::Markdown);
            }
            "json" => {
                formats.insert(Format::Json);
            }
            other => return Err(Error::UnknownFormat(other.to_string())),
        }
    }
    if formats.is_empty() {
        return Err(Error::UnknownFormat(input.to_string()));
    }
    Ok(formats)
}

// Stamped with the window start, not the wall clock, so re-running the same
// window lands in the same directory.
fn default_out_dir(service: &str, window_start: chrono::DateTime<Utc>) -> PathBuf {
    let service_slug = sanitize_id(service.rsplit('/').next().unwrap_or(service));
    PathBuf::from("out")
        .join("margin-analyze")
        .join(format!(
            "{}-{service_slug}",
            window_start.format("%Y%m%d-%H%M%S")
        ))
}

/// Writes the selected outputs for a finished analysis.
pub fn write_outputs(
    out_dir: &Path,
    analysis: &Analysis,
    formats: &BTreeSet<Format>,
    explain: bool,
) -> Result<(), Error> {
    if formats.contains(&Format::Json) {
        write_json(&out_dir.join("result.json"), &analysis.result)?;
        write_json(&out_dir.join("sources.json"), &analysis.sources)?;
    }
    if formats.contains(&Format::Markdown) {
        write_markdown_summary(&out_dir.join("summary.md"), &analysis.result, explain)?;
    }
    // Always written so tooling can rely on its presence.
    write_errors_markdown(&out_dir.join("errors.md"), &analysis.result.errors)?;
    Ok(())
}

/// `margin analyze` against the production endpoint.
pub async fn execute(args: AnalyzeArgs) -> Result<(), Error> {
    let reader = GcpReader::from_env()?;
    execute_with_reader(args, &reader).await
}

/// Runs the analysis with an injected reader. Used by integration tests.
pub async fn execute_with_reader(args: AnalyzeArgs, reader: &dyn Reader) -> Result<(), Error> {
    let formats = parse_formats(&args.format)?;
    let only = match &args.only {
        Some(pattern) => Some(Regex::new(pattern)?),
        None => None,
    };
    let last = match &args.last {
        Some(value) => Some(parse_last(value).map_err(analyze::AnalyzeError::Time)?),
        None => None,
    };

    let now = Utc::now();
    let options = analyze::Options {
        project: args.project.clone(),
        service: args.service.clone(),
        start: args.start.clone(),
        end: args.end.clone(),
        last,
        explain: args.explain,
        max_slos: args.max_slos,
        only,
    };
    let analysis = analyze::run(reader, &options, now).await?;

    let out_dir = match &args.out {
        Some(out) => PathBuf::from(out),
        None => default_out_dir(&analysis.result.service, analysis.result.window.start),
    };
    write_outputs(&out_dir, &analysis, &formats, args.explain)?;

    println!(
        "Analyzed {} SLOs for {}: {}.",
        analysis.result.slos.len(),
        analysis.result.service,
        analysis.result.status
    );
    println!("Results written to {}.", out_dir.display());

    if args.fail_on_partial && analysis.result.status != Status::Ok {
        return Err(Error::Partial {
            what: format!("analysis finished with status {}", analysis.result.status),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let both = parse_formats("md,json").unwrap();
        assert!(both.contains(&Format::Markdown));
        assert!(both.contains(&Format::Json));

        let one = parse_formats("JSON").unwrap();
        assert_eq!(one.len(), 1);

        assert!(matches!(
            parse_formats("yaml"),
            Err(Error::UnknownFormat(_))
        ));
        assert!(matches!(parse_formats(""), Err(Error::UnknownFormat(_))));
    }

    #[test]
    fn test_default_out_dir_stamps_window_start() {
        let start = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 6, 1, 12, 0, 0).unwrap();
        let dir = default_out_dir("projects/acme-prod/services/Checkout API", start);
        assert_eq!(
            dir,
            PathBuf::from("out/margin-analyze/20250601-120000-checkout-api")
        );
        // Deterministic for a fixed window, whenever the run happens.
        assert_eq!(
            dir,
            default_out_dir("projects/acme-prod/services/Checkout API", start)
        );
    }

    #[test]
    fn test_errors_markdown_is_written_for_every_format_selection() {
        use crate::analyze::model::{AnalysisResult, ReportWindow, Sources, SCHEMA_VERSION};
        use crate::analyze::Analysis;

        let start = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 6, 1, 0, 0, 0).unwrap();
        let analysis = Analysis {
            result: AnalysisResult {
                schema_version: SCHEMA_VERSION.to_string(),
                project: "acme-prod".to_string(),
                service: "projects/acme-prod/services/checkout-api".to_string(),
                window: ReportWindow {
                    start,
                    end: start + chrono::Duration::days(7),
                    duration_seconds: 7 * 86_400,
                },
                status: Status::Ok,
                slos: vec![],
                errors: vec![],
            },
            sources: Sources {
                endpoint: "https://monitoring.googleapis.com".to_string(),
                slos_listed: 0,
                slos_analyzed: 0,
            },
        };

        let dir = tempfile::TempDir::new().unwrap();
        let formats = parse_formats("json").unwrap();
        write_outputs(dir.path(), &analysis, &formats, false).unwrap();

        assert!(dir.path().join("result.json").exists());
        assert!(dir.path().join("errors.md").exists());
        assert!(!dir.path().join("summary.md").exists());
    }
}
