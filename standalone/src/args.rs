use std::path::PathBuf;

use clap::Parser;
use mrl_worker::map::DEFAULT_FLUSH_THRESHOLD;
use workload::DEFAULT_WORKLOAD;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a whole job in this process, one task at a time", long_about = None)]
pub struct Args {
    /// Directory holding the input text files.
    pub input_dir: PathBuf,

    /// Directory for manifests and intermediate files.
    pub temp_dir: PathBuf,

    /// Directory the reducer outputs and merged result are written to.
    pub output_dir: PathBuf,

    /// Number of mappers.
    #[arg(short = 'm', long = "mappers", default_value_t = 2)]
    pub num_mappers: u32,

    /// Number of reducers.
    #[arg(short = 'r', long = "reducers", default_value_t = 2)]
    pub num_reducers: u32,

    /// Application to run.
    #[arg(short, long, default_value = DEFAULT_WORKLOAD)]
    pub workload: String,

    #[arg(long, default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    pub flush_threshold: usize,
}
