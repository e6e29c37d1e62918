use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use common::job::Endpoint;
use workload::DEFAULT_WORKLOAD;

use crate::map::{MapperConfig, DEFAULT_FLUSH_THRESHOLD};
use crate::reduce::ReducerConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "mapper-worker", version, about = "Runs one map task of a job", long_about = None)]
pub struct MapperArgs {
    /// Index of this mapper.
    pub mapper_id: u32,

    /// Number of reducer buckets to partition words into.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub num_reducers: u32,

    /// Manifest listing the input files of this mapper.
    pub manifest: PathBuf,

    /// Shared directory the intermediate files go to.
    pub temp_dir: PathBuf,

    /// Host the controller is listening on for HELLO.
    pub controller_host: String,

    /// Port the controller is listening on for HELLO.
    pub controller_port: u16,

    /// Buffered (bucket, word) entries that trigger a flush to disk.
    #[arg(long, default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    pub flush_threshold: usize,

    /// Application to run.
    #[arg(long, default_value = DEFAULT_WORKLOAD)]
    pub workload: String,

    /// Seconds to wait for BEGIN after saying HELLO.
    #[arg(long, default_value_t = 30)]
    pub handshake_timeout_secs: u64,
}

impl MapperArgs {
    pub fn controller(&self) -> Endpoint {
        Endpoint::new(self.controller_host.clone(), self.controller_port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn to_config(&self) -> MapperConfig {
        MapperConfig {
            mapper_id: self.mapper_id,
            num_reducers: self.num_reducers,
            manifest: self.manifest.clone(),
            temp_dir: self.temp_dir.clone(),
            flush_threshold: self.flush_threshold,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "reducer-worker", version, about = "Runs one reduce task of a job", long_about = None)]
pub struct ReducerArgs {
    /// Index of this reducer, which is also the bucket it owns.
    pub reducer_id: u32,

    /// Shared directory holding the intermediate files.
    pub temp_dir: PathBuf,

    /// Directory the reducer output goes to.
    pub output_dir: PathBuf,

    /// Host the controller is listening on for HELLO.
    pub controller_host: String,

    /// Port the controller is listening on for HELLO.
    pub controller_port: u16,

    /// Number of mappers in the job. When given, every mapper's completion
    /// marker must exist and intermediates from higher mapper ids are ignored.
    #[arg(long)]
    pub mappers: Option<u32>,

    /// Suffix of the output and marker names; defaults to `r<id>`.
    #[arg(long)]
    pub output_suffix: Option<String>,

    /// Application to run.
    #[arg(long, default_value = DEFAULT_WORKLOAD)]
    pub workload: String,

    /// Seconds to wait for BEGIN after saying HELLO.
    #[arg(long, default_value_t = 30)]
    pub handshake_timeout_secs: u64,
}

impl ReducerArgs {
    pub fn controller(&self) -> Endpoint {
        Endpoint::new(self.controller_host.clone(), self.controller_port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn to_config(&self) -> ReducerConfig {
        let mut config = ReducerConfig::new(self.reducer_id, &self.temp_dir, &self.output_dir);
        config.num_mappers = self.mappers;
        if let Some(suffix) = &self.output_suffix {
            config.output_suffix = suffix.clone();
        }
        config
    }
}
