//! BCN CLI - Command line tool for Barcelona rainfall statistics.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "bcn-cli",
    version,
    about = "Barcelona rainfall statistics toolkit"
)]
struct Cli {
    #[command(flatten)]
    source: bcn_cmd::DataSource,

    #[command(subcommand)]
    command: bcn_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    bcn_cmd::run(cli.source, cli.command).await
}
