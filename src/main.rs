use clap::Parser;
use robrix_sync_core::replay::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    replay::init_logging(cli.verbose);
    replay::run(cli).await
}
