//! Runs partitioning, every mapper, every reducer and the merge in one
//! process, with the same files and markers a distributed job leaves behind.

use anyhow::{Context, Result};
use clap::Parser;
use common::aggregate::{Aggregator, MergeSummary};
use common::job::{Endpoint, JobConfig};
use common::{assign_files, layout, storage};
use mrl_worker::map::{Mapper, MapperConfig};
use mrl_worker::reduce::{Reducer, ReducerConfig};
use tracing::info;

mod args;
use args::Args;

fn run(args: &Args) -> Result<MergeSummary> {
    let workload = workload::named(&args.workload)?;

    // No stubs take part; the endpoint only satisfies validation.
    let config = JobConfig::new(
        &args.input_dir,
        &args.temp_dir,
        &args.output_dir,
        args.num_mappers,
        args.num_reducers,
        vec![Endpoint::new("localhost", 0)],
    )?;

    storage::ensure_dir(&config.temp_dir)?;
    storage::ensure_dir(&config.output_dir)?;
    storage::remove_if_exists(&layout::job_marker_path(&config.output_dir))?;

    let inputs = config.input_files()?;
    info!(inputs = inputs.len(), mappers = config.num_mappers, reducers = config.num_reducers, "starting local job");

    for manifest in assign_files(&inputs, config.num_mappers) {
        let mapper_id = manifest.mapper_id;
        let manifest_path = manifest.write_to(&config.temp_dir)?;
        let mapper = Mapper::new(
            MapperConfig {
                mapper_id,
                num_reducers: config.num_reducers,
                manifest: manifest_path,
                temp_dir: config.temp_dir.clone(),
                flush_threshold: args.flush_threshold,
            },
            workload,
        );
        mapper.run().with_context(|| format!("mapper {mapper_id} failed"))?;
    }

    for reducer_id in 0..config.num_reducers {
        let mut reducer_config = ReducerConfig::new(reducer_id, &config.temp_dir, &config.output_dir);
        reducer_config.num_mappers = Some(config.num_mappers);
        Reducer::new(reducer_config, workload)
            .run()
            .with_context(|| format!("reducer {reducer_id} failed"))?;
    }

    let summary = Aggregator::new(&config.output_dir, config.num_reducers).merge()?;
    storage::touch(&layout::job_marker_path(&config.output_dir))?;
    Ok(summary)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let summary = run(&args)?;
    info!(
        words = summary.words,
        total = summary.total,
        "wrote {}",
        summary.output.display()
    );

    Ok(())
}
