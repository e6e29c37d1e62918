use clap::Parser;
use mrl_worker::args::MapperArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = MapperArgs::parse();
    mrl_worker::run_mapper(args).await?;
    Ok(())
}
