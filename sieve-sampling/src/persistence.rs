//! Handing accepted rule sets to storage.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sieve_common::ProjectId;
use sieve_log::LogError;

use crate::config::{ParseError, SamplingConfig};
use crate::ruleset::RuleSet;

/// Failure to store or load a rule set.
///
/// Storing is retryable. The caller decides whether to retry, nothing in this crate does.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Reading or writing the file failed.
    #[error("could not access {}", .path.display())]
    Io {
        /// The file that was accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The rule set could not be serialized.
    #[error("could not serialize rule set")]
    Serialize(#[source] serde_json::Error),
    /// A stored rule set could not be parsed.
    #[error("could not parse {}", .path.display())]
    Parse {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: ParseError,
    },
}

/// Receives the persisted form of a project's rule set.
pub trait RuleSetSink {
    /// Stores the configuration of a project, replacing the previous one.
    fn store(&self, project_id: ProjectId, config: &SamplingConfig)
    -> Result<(), PersistenceError>;
}

impl<T: RuleSetSink + ?Sized> RuleSetSink for &T {
    fn store(&self, project_id: ProjectId, config: &SamplingConfig) -> Result<(), PersistenceError> {
        (**self).store(project_id, config)
    }
}

impl<T: RuleSetSink + ?Sized> RuleSetSink for Arc<T> {
    fn store(&self, project_id: ProjectId, config: &SamplingConfig) -> Result<(), PersistenceError> {
        (**self).store(project_id, config)
    }
}

/// Builds the persisted form of the rule set and hands it to the sink.
pub fn apply_rule_set<S>(
    sink: &S,
    project_id: ProjectId,
    rule_set: &RuleSet,
) -> Result<(), PersistenceError>
where
    S: RuleSetSink + ?Sized,
{
    let config = SamplingConfig::from(rule_set);
    sink.store(project_id, &config).inspect_err(|error| {
        sieve_log::error!(%project_id, "failed to persist rule set: {}", LogError(error));
    })
}

/// Keeps stored configurations in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    configs: Mutex<BTreeMap<ProjectId, SamplingConfig>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last configuration stored for the project.
    pub fn get(&self, project_id: ProjectId) -> Option<SamplingConfig> {
        self.configs.lock().get(&project_id).cloned()
    }
}

impl RuleSetSink for MemorySink {
    fn store(&self, project_id: ProjectId, config: &SamplingConfig) -> Result<(), PersistenceError> {
        self.configs.lock().insert(project_id, config.clone());
        Ok(())
    }
}

/// Stores one JSON file per project in a directory.
///
/// Files are written to a uniquely named temporary file in the same directory first and renamed
/// into place, so readers never observe a partially written file.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into the given directory.
    ///
    /// The directory is created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of the file holding the project's rule set.
    pub fn path(&self, project_id: ProjectId) -> PathBuf {
        self.dir.join(format!("{project_id}.json"))
    }

    /// Loads the stored rule set of a project.
    ///
    /// Returns `Ok(None)` if nothing was stored for the project yet.
    pub fn load(&self, project_id: ProjectId) -> Result<Option<RuleSet>, PersistenceError> {
        let path = self.path(project_id);

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        crate::config::parse_rule_set(&json)
            .map(Some)
            .map_err(|source| PersistenceError::Parse { path, source })
    }
}

impl RuleSetSink for FileSink {
    fn store(&self, project_id: ProjectId, config: &SamplingConfig) -> Result<(), PersistenceError> {
        let json = config.to_json().map_err(PersistenceError::Serialize)?;
        let path = self.path(project_id);

        let io_error = |source: io::Error| PersistenceError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_error)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        file.persist(&path).map_err(|error| io_error(error.error))?;

        sieve_log::debug!(
            %project_id,
            path = %path.display(),
            "stored rule set"
        );

        Ok(())
    }
}
