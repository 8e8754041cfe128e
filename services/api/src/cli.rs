use crate::demo::{run_demo, run_valuation, DemoArgs, ValuationRunArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use valuation_ai::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Valuation Orchestrator",
    about = "Run the property valuation pipeline from the command line or as a service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run valuation pipelines against MLS exports
    Valuation {
        #[command(subcommand)]
        command: ValuationCommand,
    },
    /// Run an end-to-end valuation demo against a seeded market
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ValuationCommand {
    /// Appraise one subject property from MLS CSV exports
    Run(ValuationRunArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// MLS comparable-sales CSV backing the market data source
    #[arg(long)]
    pub(crate) candidates_csv: Option<std::path::PathBuf>,
    /// MLS market-series CSV backing the trend module
    #[arg(long)]
    pub(crate) market_csv: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Valuation {
            command: ValuationCommand::Run(args),
        } => run_valuation(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
