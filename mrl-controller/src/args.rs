use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use common::job::{Endpoint, JobConfig, DEFAULT_RENDEZVOUS_PORT, DEFAULT_STUB_PORT};
use common::JobError;

use crate::core::ControllerSettings;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a word-count job across stub-launched workers", long_about = None)]
pub struct Args {
    /// Directory holding the input text files.
    pub input_dir: PathBuf,

    /// Shared directory for manifests and intermediate files.
    pub temp_dir: PathBuf,

    /// Directory the reducer outputs and merged result are written to.
    pub output_dir: PathBuf,

    /// Stub endpoints as `host[:port]`, comma separated or repeated.
    #[arg(long = "stub", value_delimiter = ',', required = true)]
    pub stubs: Vec<String>,

    /// Number of mappers.
    #[arg(short = 'm', long = "mappers", default_value_t = 2)]
    pub num_mappers: u32,

    /// Number of reducers.
    #[arg(short = 'r', long = "reducers", default_value_t = 2)]
    pub num_reducers: u32,

    /// Address the rendezvous listener binds to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// The port workers say HELLO on.
    #[arg(short, long, default_value_t = DEFAULT_RENDEZVOUS_PORT)]
    pub port: u16,

    /// Host name or address workers use to reach this controller.
    #[arg(long, default_value = "127.0.0.1")]
    pub advertise_host: String,

    #[arg(long, default_value_t = 5)]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub handshake_timeout_secs: u64,

    #[arg(long, default_value_t = 600)]
    pub barrier_timeout_secs: u64,

    #[arg(long, default_value_t = 200)]
    pub poll_interval_ms: u64,
}

impl Args {
    pub fn job_config(&self) -> Result<JobConfig, JobError> {
        let stubs = self
            .stubs
            .iter()
            .map(|s| Endpoint::parse_with_default(s, DEFAULT_STUB_PORT))
            .collect::<Result<Vec<_>, _>>()?;

        JobConfig::new(
            &self.input_dir,
            &self.temp_dir,
            &self.output_dir,
            self.num_mappers,
            self.num_reducers,
            stubs,
        )
    }

    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            bind_host: self.bind.clone(),
            port: self.port,
            advertise_host: self.advertise_host.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            barrier_timeout: Duration::from_secs(self.barrier_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
