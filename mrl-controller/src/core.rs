use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use common::aggregate::Aggregator;
use common::codec::SpawnRequest;
use common::job::{Endpoint, JobConfig, JobPhase, DEFAULT_RENDEZVOUS_PORT};
use common::{assign_files, layout, storage, Role};
use tracing::{debug, info};

use crate::barrier::{CompletionBarrier, PollingBarrier, DEFAULT_POLL_INTERVAL};
use crate::dispatch;
use crate::rendezvous::Rendezvous;
use crate::worker_info::WorkerRecord;
use crate::worker_registry::WorkerRegistry;

/// How the controller itself runs, as opposed to what job it runs.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Address the rendezvous listener binds to.
    pub bind_host: String,

    /// Rendezvous port; `0` picks a free one.
    pub port: u16,

    /// Host workers are told to say HELLO to.
    pub advertise_host: String,

    /// Bound on connecting to a stub and on waiting for its reply.
    pub connect_timeout: Duration,

    /// Bound on admitting every worker of one phase.
    pub handshake_timeout: Duration,

    /// Bound on waiting for the completion markers of one phase.
    pub barrier_timeout: Duration,

    pub poll_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_RENDEZVOUS_PORT,
            advertise_host: "127.0.0.1".to_string(),
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(60),
            barrier_timeout: Duration::from_secs(600),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub input_files: usize,
    pub words: usize,
    pub total: u64,
    pub output: PathBuf,
}

/// Runs one job end to end: partition, map, reduce, merge.
pub struct Controller<B = PollingBarrier> {
    config: JobConfig,
    settings: ControllerSettings,
    barrier: B,
    registry: WorkerRegistry,
    phase: JobPhase,
}

impl Controller<PollingBarrier> {
    pub fn new(config: JobConfig, settings: ControllerSettings) -> Self {
        let barrier = PollingBarrier {
            interval: settings.poll_interval,
        };
        Self::with_barrier(config, settings, barrier)
    }
}

impl<B: CompletionBarrier> Controller<B> {
    pub fn with_barrier(config: JobConfig, settings: ControllerSettings, barrier: B) -> Self {
        Self {
            config,
            settings,
            barrier,
            registry: WorkerRegistry::new(),
            phase: JobPhase::Pending,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Run the job. The job marker `SUCCESS` is written only if every step
    /// succeeded; any error aborts the job where it happened.
    pub async fn run(&mut self) -> Result<JobSummary> {
        self.config.validate()?;
        self.prepare_directories()?;
        self.clear_stale_markers()?;

        let inputs = self.config.input_files()?;
        info!(
            inputs = inputs.len(),
            mappers = self.config.num_mappers,
            reducers = self.config.num_reducers,
            stubs = self.config.stub_endpoints.len(),
            "starting job"
        );

        let mut manifests = Vec::new();
        for manifest in assign_files(&inputs, self.config.num_mappers) {
            let path = manifest
                .write_to(&self.config.temp_dir)
                .with_context(|| format!("cannot write manifest of mapper {}", manifest.mapper_id))?;
            debug!(mapper_id = manifest.mapper_id, files = manifest.files.len(), path = %path.display(), "manifest written");
            manifests.push(path);
        }

        let bind_addr = format!("{}:{}", self.settings.bind_host, self.settings.port);
        let rendezvous = Rendezvous::bind(&bind_addr)
            .await
            .with_context(|| format!("cannot open rendezvous listener on {bind_addr}"))?;
        let advertised = Endpoint::new(
            self.settings.advertise_host.clone(),
            rendezvous.local_addr()?.port(),
        );
        info!(%advertised, "rendezvous listening");

        self.phase = JobPhase::Mapping;
        let mapper_markers: Vec<PathBuf> = (0..self.config.num_mappers)
            .map(|id| layout::mapper_marker_path(&self.config.temp_dir, id))
            .collect();
        let requests = manifests
            .into_iter()
            .enumerate()
            .map(|(id, manifest)| SpawnRequest {
                role: Role::Map,
                id: id as u32,
                peer_count: self.config.num_reducers,
                temp_dir: self.config.temp_dir.clone(),
                target: manifest,
                controller: Some(advertised.clone()),
            })
            .collect();
        self.run_phase(Role::Map, requests, &rendezvous, &mapper_markers)
            .await?;

        self.phase = JobPhase::Reducing;
        let reducer_markers: Vec<PathBuf> = (0..self.config.num_reducers)
            .map(|id| layout::reducer_marker_path(&self.config.output_dir, &layout::reducer_suffix(id)))
            .collect();
        let requests = (0..self.config.num_reducers)
            .map(|id| SpawnRequest {
                role: Role::Reduce,
                id,
                peer_count: self.config.num_mappers,
                temp_dir: self.config.temp_dir.clone(),
                target: self.config.output_dir.clone(),
                controller: Some(advertised.clone()),
            })
            .collect();
        self.run_phase(Role::Reduce, requests, &rendezvous, &reducer_markers)
            .await?;

        self.phase = JobPhase::Merging;
        let merged = Aggregator::new(&self.config.output_dir, self.config.num_reducers)
            .merge()
            .context("aggregation failed")?;

        storage::touch(&layout::job_marker_path(&self.config.output_dir))
            .context("cannot write job marker")?;
        self.phase = JobPhase::Completed;

        let summary = JobSummary {
            input_files: inputs.len(),
            words: merged.words,
            total: merged.total,
            output: merged.output,
        };
        info!(
            words = summary.words,
            total = summary.total,
            output = %summary.output.display(),
            "job completed"
        );
        Ok(summary)
    }

    /// Dispatch every request, admit the workers, then wait for their markers.
    async fn run_phase(
        &mut self,
        role: Role,
        requests: Vec<SpawnRequest>,
        rendezvous: &Rendezvous,
        markers: &[PathBuf],
    ) -> Result<()> {
        for request in requests {
            let id = request.id;
            let stub = self.config.stub_for(id).clone();
            let pid = dispatch::spawn_worker(&stub, request, self.settings.connect_timeout)
                .await
                .with_context(|| format!("cannot dispatch {role} {id}"))?;
            self.registry
                .record_dispatch(WorkerRecord::dispatched(role, id, stub, pid));
        }

        rendezvous
            .admit(role, &mut self.registry, self.settings.handshake_timeout)
            .await
            .with_context(|| format!("{role} rendezvous failed"))?;

        let stage = match role {
            Role::Map => "mappers",
            Role::Reduce => "reducers",
        };
        self.barrier
            .await_completion(stage, markers, self.settings.barrier_timeout)
            .await
            .with_context(|| format!("{stage} did not complete"))?;
        self.registry.mark_completed(role);
        Ok(())
    }

    /// Create the working directories and pin every path to an absolute one,
    /// since workers may run elsewhere.
    fn prepare_directories(&mut self) -> Result<()> {
        storage::ensure_dir(&self.config.temp_dir)
            .with_context(|| format!("cannot create {}", self.config.temp_dir.display()))?;
        storage::ensure_dir(&self.config.output_dir)
            .with_context(|| format!("cannot create {}", self.config.output_dir.display()))?;

        for dir in [
            &mut self.config.input_dir,
            &mut self.config.temp_dir,
            &mut self.config.output_dir,
        ] {
            *dir = dir
                .canonicalize()
                .with_context(|| format!("cannot resolve {}", dir.display()))?;
        }
        Ok(())
    }

    /// Markers left by an earlier run must not satisfy this run's barriers.
    fn clear_stale_markers(&self) -> Result<()> {
        let temp_dir = &self.config.temp_dir;
        let output_dir = &self.config.output_dir;

        storage::remove_if_exists(&layout::job_marker_path(output_dir))?;
        for id in 0..self.config.num_reducers {
            storage::remove_if_exists(&layout::reducer_marker_path(output_dir, &layout::reducer_suffix(id)))?;
        }
        for id in 0..self.config.num_mappers {
            storage::remove_if_exists(&layout::mapper_marker_path(temp_dir, id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use common::JobError;

    use super::*;

    #[tokio::test]
    async fn stale_markers_are_cleared_before_dispatch() {
        let root = tempfile::tempdir().unwrap();
        let (input, temp, output) = (root.path().join("in"), root.path().join("tmp"), root.path().join("out"));
        for dir in [&input, &temp, &output] {
            fs::create_dir(dir).unwrap();
        }
        fs::write(input.join("a.txt"), "cat").unwrap();
        for marker in [
            layout::job_marker_path(&output),
            layout::reducer_marker_path(&output, "r0"),
            layout::mapper_marker_path(&temp, 0),
        ] {
            storage::touch(&marker).unwrap();
        }

        // Nothing listens on the stub port, so the job stops at the first dispatch.
        let free = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stub = Endpoint::new("127.0.0.1", free.local_addr().unwrap().port());
        drop(free);

        let config = JobConfig::new(&input, &temp, &output, 1, 1, vec![stub]).unwrap();
        let settings = ControllerSettings {
            bind_host: "127.0.0.1".to_string(),
            port: 0,
            ..ControllerSettings::default()
        };
        let mut controller = Controller::new(config, settings);
        let err = controller.run().await.unwrap_err();

        assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::StubUnreachable { .. })));
        assert_eq!(controller.phase(), JobPhase::Mapping);
        assert!(!layout::job_marker_path(&output).exists());
        assert!(!layout::reducer_marker_path(&output, "r0").exists());
        assert!(!layout::mapper_marker_path(&temp, 0).exists());
        assert!(layout::manifest_path(&temp, 0).exists());
    }
}
