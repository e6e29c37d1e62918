use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use mrl_stub::args::Args;
use mrl_stub::{ProcessSpawner, Stub, StubConfig};

fn default_bin_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the stub executable")?;
    exe.parent()
        .map(PathBuf::from)
        .context("stub executable has no parent directory")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let bin_dir = match args.bin_dir {
        Some(dir) => dir,
        None => default_bin_dir()?,
    };

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    info!(%addr, controller = %args.controller, "starting stub");

    let stub = Stub::new(
        StubConfig {
            bin_dir,
            controller: args.controller,
        },
        ProcessSpawner,
    );
    stub.serve(listener).await?;

    Ok(())
}
