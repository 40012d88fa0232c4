use clap::Parser;

use tasktime::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tasktime::logging::init();

    let cli = Cli::parse();
    cli.run().await
}
