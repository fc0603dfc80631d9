use crate::demo::{run_demo, run_lease_preview, run_lease_states, DemoArgs, LeasePreviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rentwise::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "rentwise",
    about = "Run the rentwise property management API or exercise its workflows from the command line",
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
    /// Inspect lease generation without starting the service
    Lease {
        #[command(subcommand)]
        command: LeaseCommand,
    },
    /// Walk one unit from application to executed lease, rent collection and reporting
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum LeaseCommand {
    /// Render a sample lease for a state and print the HTML or its section outline
    Preview(LeasePreviewArgs),
    /// List the states with jurisdiction-specific clause coverage
    States,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Do not start the background rent reminder loop
    #[arg(long)]
    pub(crate) no_reminders: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Lease {
            command: LeaseCommand::Preview(args),
        } => run_lease_preview(args),
        Command::Lease {
            command: LeaseCommand::States,
        } => run_lease_states(),
        Command::Demo(args) => run_demo(args),
    }
}
