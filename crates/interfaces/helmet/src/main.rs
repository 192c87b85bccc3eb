use clap::Parser;
use helmet::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    helmet::logging::setup_logging(cli.verbose);
    helmet::dispatch(cli).await
}
