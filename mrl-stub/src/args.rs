use std::path::PathBuf;

use clap::Parser;
use common::job::{Endpoint, DEFAULT_STUB_PORT};

#[derive(Parser, Debug)]
#[command(version, about = "Launches mapper and reducer workers for a controller", long_about = None)]
pub struct Args {
    /// The port for the stub to listen on.
    #[arg(short, long, default_value_t = DEFAULT_STUB_PORT)]
    pub port: u16,

    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Directory holding `mapper-worker` and `reducer-worker`. Defaults to the
    /// directory of the stub executable.
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,

    /// Controller rendezvous address handed to workers when a SPAWN does
    /// not carry one.
    #[arg(long, default_value = "127.0.0.1:6001")]
    pub controller: Endpoint,
}
