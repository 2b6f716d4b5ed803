use crate::batch::{run_qualify, run_score, QualifyArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_router::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "lead-router",
    about = "Score inbound leads and route them to engage or nurture tracks",
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
    /// Qualify a CSV batch against file-backed collaborators
    Qualify(QualifyArgs),
    /// Score a single lead without dispatching anything
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Qualify(args) => run_qualify(args).await,
        Command::Score(args) => run_score(args),
    }
}
