use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::JobError;
use crate::{layout, storage};

/// Phase of a job as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Job not started.
    Pending,

    /// Mappers dispatched; waiting for their handshakes and markers.
    Mapping,

    /// Reducers dispatched; waiting for their handshakes and markers.
    Reducing,

    /// Merging reducer outputs.
    Merging,

    /// Job marker written.
    Completed,
}

/// Port a stub listens on when none is given.
pub const DEFAULT_STUB_PORT: u16 = 5001;

/// Port the controller accepts worker HELLOs on when none is given.
pub const DEFAULT_RENDEZVOUS_PORT: u16 = 6001;

/// A `host:port` pair for a stub or for the controller's rendezvous socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, or a bare `host` which then gets `default_port`.
    pub fn parse_with_default(s: &str, default_port: u16) -> Result<Self, JobError> {
        let s = s.trim();
        match s.rsplit_once(':') {
            Some(_) => s.parse(),
            None if !s.is_empty() => Ok(Self::new(s, default_port)),
            None => Err(JobError::Config("empty endpoint".into())),
        }
    }

    /// Address tuple accepted by `TcpStream::connect`.
    pub fn addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| JobError::Config(format!("endpoint `{s}` is not host:port")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(JobError::Config(format!("endpoint `{s}` has no host")));
        }
        let port = port
            .parse()
            .map_err(|_| JobError::Config(format!("endpoint `{s}` has an invalid port")))?;
        Ok(Self::new(host, port))
    }
}

/// Immutable description of one word-count job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Directory holding the input text files.
    pub input_dir: PathBuf,

    /// Shared directory for manifests, intermediate files and mapper markers.
    pub temp_dir: PathBuf,

    /// Directory for reducer outputs, the merged output and the job marker.
    pub output_dir: PathBuf,

    pub num_mappers: u32,
    pub num_reducers: u32,

    /// Stubs, in the order workers are dealt to them.
    pub stub_endpoints: Vec<Endpoint>,
}

impl JobConfig {
    /// Build a config, rejecting values no job can run with.
    pub fn new(
        input_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        num_mappers: u32,
        num_reducers: u32,
        stub_endpoints: Vec<Endpoint>,
    ) -> Result<Self, JobError> {
        let config = Self {
            input_dir: input_dir.into(),
            temp_dir: temp_dir.into(),
            output_dir: output_dir.into(),
            num_mappers,
            num_reducers,
            stub_endpoints,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.num_mappers == 0 {
            return Err(JobError::Config("number of mappers must be positive".into()));
        }
        if self.num_reducers == 0 {
            return Err(JobError::Config("number of reducers must be positive".into()));
        }
        if self.stub_endpoints.is_empty() {
            return Err(JobError::Config("at least one stub endpoint is required".into()));
        }
        Ok(())
    }

    /// Input files of this job. An input directory with none is an error.
    pub fn input_files(&self) -> Result<Vec<PathBuf>, JobError> {
        let files = storage::list_input_files(&self.input_dir)?;
        if files.is_empty() {
            return Err(JobError::Config(format!(
                "no input files in {}",
                self.input_dir.display()
            )));
        }
        Ok(files)
    }

    /// Stub that hosts worker `index` of a phase.
    pub fn stub_for(&self, index: u32) -> &Endpoint {
        &self.stub_endpoints[index as usize % self.stub_endpoints.len()]
    }
}

/// The input files assigned to one mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub mapper_id: u32,
    pub files: Vec<PathBuf>,
}

impl Manifest {
    pub fn empty(mapper_id: u32) -> Self {
        Self {
            mapper_id,
            files: Vec::new(),
        }
    }

    /// Persist as `<temp_dir>/mapper_input_<id>.txt`, one path per line,
    /// and return the path written.
    pub fn write_to(&self, temp_dir: &Path) -> io::Result<PathBuf> {
        let path = layout::manifest_path(temp_dir, self.mapper_id);
        let mut contents = String::new();
        for file in &self.files {
            contents.push_str(&file.to_string_lossy());
            contents.push('\n');
        }
        storage::write_all(&path, &contents)?;
        Ok(path)
    }

    /// Load a manifest written by [`Manifest::write_to`]. Blank lines are ignored.
    pub fn read_from(path: &Path, mapper_id: u32) -> Result<Self, JobError> {
        if !storage::exists(path) {
            return Err(JobError::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        let files = storage::read_lines(path)?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(PathBuf::from)
            .collect();
        Ok(Self { mapper_id, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_parsing() {
        assert_eq!("10.0.0.7:5001".parse::<Endpoint>().unwrap(), Endpoint::new("10.0.0.7", 5001));
        assert_eq!("[::1]:80".parse::<Endpoint>().unwrap(), Endpoint::new("::1", 80));
        assert!("nohost".parse::<Endpoint>().is_err());
        assert!(":5001".parse::<Endpoint>().is_err());
        assert!("host:notaport".parse::<Endpoint>().is_err());

        assert_eq!(
            Endpoint::parse_with_default("worker-3", 5001).unwrap(),
            Endpoint::new("worker-3", 5001)
        );
        assert_eq!(
            Endpoint::parse_with_default(" worker-3:7000 ", 5001).unwrap(),
            Endpoint::new("worker-3", 7000)
        );
        assert!(Endpoint::parse_with_default("", 5001).is_err());
    }

    #[test]
    fn config_rejects_degenerate_values() {
        let stubs = vec![Endpoint::new("127.0.0.1", 5001)];
        assert!(JobConfig::new("in", "tmp", "out", 0, 1, stubs.clone()).is_err());
        assert!(JobConfig::new("in", "tmp", "out", 1, 0, stubs.clone()).is_err());
        assert!(JobConfig::new("in", "tmp", "out", 1, 1, vec![]).is_err());
        assert!(JobConfig::new("in", "tmp", "out", 1, 1, stubs).is_ok());
    }

    #[test]
    fn stubs_are_dealt_round_robin() {
        let stubs = vec![Endpoint::new("a", 1), Endpoint::new("b", 2)];
        let config = JobConfig::new("in", "tmp", "out", 3, 1, stubs).unwrap();
        assert_eq!(config.stub_for(0).host, "a");
        assert_eq!(config.stub_for(1).host, "b");
        assert_eq!(config.stub_for(2).host, "a");
    }

    #[test]
    fn empty_input_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("skip.md"), "x").unwrap();
        let stubs = vec![Endpoint::new("127.0.0.1", 5001)];
        let config = JobConfig::new(dir.path(), "tmp", "out", 1, 1, stubs).unwrap();

        assert!(matches!(config.input_files(), Err(JobError::Config(_))));

        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        assert_eq!(config.input_files().unwrap(), vec![dir.path().join("a.txt")]);
    }

    #[test]
    fn manifest_survives_the_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            mapper_id: 4,
            files: vec![PathBuf::from("/data/a.txt"), PathBuf::from("/data/b.txt")],
        };
        let path = manifest.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("mapper_input_4.txt"));
        assert_eq!(Manifest::read_from(&path, 4).unwrap(), manifest);
    }

    #[test]
    fn missing_manifest_is_a_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::read_from(&dir.path().join("mapper_input_0.txt"), 0).unwrap_err();
        assert!(matches!(err, JobError::MissingArtifact { .. }));
    }
}
