use clap::{Parser, Subcommand};
use margin::alerting::explain_burn_rate;
use margin::cmd::{
    self,
    analyze::AnalyzeArgs,
    apply::SpecArgs,
    report::ReportArgs,
    services::ServicesArgs,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconciles the spec's SLOs, alerts, and dashboard.
    Apply(SpecArgs),
    /// Prints the plan without applying it.
    Plan(SpecArgs),
    /// Validates the spec file.
    Validate(SpecArgs),
    /// Deletes every resource the spec owns.
    Delete(SpecArgs),
    /// Analyzes live error budgets for a service.
    Analyze(AnalyzeArgs),
    /// Aggregates analysis results into a fleet report.
    Report(ReportArgs),
    /// Inspects monitoring services in a project.
    Services {
        #[command(subcommand)]
        command: ServicesCommands,
    },
    /// Explains a concept, e.g. burn-rate.
    Explain {
        /// The topic to explain.
        topic: String,
    },
}

#[derive(Subcommand)]
enum ServicesCommands {
    /// Lists monitoring services and whether margin manages them.
    List(ServicesArgs),
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {err}");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Apply(args) => cmd::apply::execute_apply(args).await,
        Commands::Plan(args) => cmd::apply::execute_plan(args),
        Commands::Validate(args) => cmd::apply::execute_validate(args),
        Commands::Delete(args) => cmd::apply::execute_delete(args).await,
        Commands::Analyze(args) => cmd::analyze::execute(args).await,
        Commands::Report(args) => cmd::report::execute(args),
        Commands::Services { command } => match command {
            ServicesCommands::List(args) => cmd::services::execute_list(args).await,
        },
        Commands::Explain { topic } => match topic.as_str() {
            "burn-rate" => {
                print!("{}", explain_burn_rate());
                Ok(())
            }
            other => Err(cmd::Error::UnknownTopic(other.to_string())),
        },
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}
