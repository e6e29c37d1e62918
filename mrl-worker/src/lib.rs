//! Mapper and reducer worker processes.
//!
//! A worker is launched by a stub with its task on the command line. It says
//! HELLO to the controller, waits for BEGIN, does its work against the shared
//! directories and leaves a completion marker behind. Its exit status is the
//! only other thing it reports.

use anyhow::{Context, Result};
use common::Role;
use tracing::info;

pub mod args;
pub mod core;
pub mod map;
pub mod reduce;

use args::{MapperArgs, ReducerArgs};
use map::{MapStats, Mapper};
use reduce::{ReduceStats, Reducer};

/// Handshake, then run the map task described by `args`.
pub async fn run_mapper(args: MapperArgs) -> Result<MapStats> {
    let workload = workload::named(&args.workload)?;
    let controller = args.controller();
    info!(mapper_id = args.mapper_id, %controller, workload = %args.workload, "mapper worker starting");

    crate::core::handshake(&controller, Role::Map, args.mapper_id, args.handshake_timeout()).await?;

    let mapper = Mapper::new(args.to_config(), workload);
    tokio::task::spawn_blocking(move || mapper.run())
        .await
        .context("map task panicked")?
}

/// Handshake, then run the reduce task described by `args`.
pub async fn run_reducer(args: ReducerArgs) -> Result<ReduceStats> {
    let workload = workload::named(&args.workload)?;
    let controller = args.controller();
    info!(reducer_id = args.reducer_id, %controller, workload = %args.workload, "reducer worker starting");

    crate::core::handshake(&controller, Role::Reduce, args.reducer_id, args.handshake_timeout()).await?;

    let reducer = Reducer::new(args.to_config(), workload);
    tokio::task::spawn_blocking(move || reducer.run())
        .await
        .context("reduce task panicked")?
}
