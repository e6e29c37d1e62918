use anyhow::Result;
use clap::Parser;
use tracing::info;

use mrl_controller::args::Args;
use mrl_controller::Controller;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = args.job_config()?;
    let mut controller = Controller::new(config, args.settings());

    let summary = controller.run().await?;
    info!(
        inputs = summary.input_files,
        words = summary.words,
        total = summary.total,
        "wrote {}",
        summary.output.display()
    );

    Ok(())
}
