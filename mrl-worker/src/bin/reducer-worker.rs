use clap::Parser;
use mrl_worker::args::ReducerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = ReducerArgs::parse();
    mrl_worker::run_reducer(args).await?;
    Ok(())
}
