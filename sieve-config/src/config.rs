use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sieve_log::{Level, LogConfig};

/// The name of the configuration file inside the config folder.
const CONFIG_FILE: &str = "config.yml";

/// Defines the source of a config error.
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (a CLI parameter).
    FieldOverride(String),
}

impl fmt::Display for ConfigErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErrorSource::None => Ok(()),
            ConfigErrorSource::File(file_name) => {
                write!(f, " (file {})", file_name.display())
            }
            ConfigErrorSource::FieldOverride(name) => write!(f, " (field {name})"),
        }
    }
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    #[inline]
    fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(kind)
        }
    }

    #[inline]
    fn file(mut self, p: impl AsRef<Path>) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }

    /// Returns the file the error originated from, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            ConfigErrorSource::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.source)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
}

/// Where random numbers for sampling decisions come from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomSourceKind {
    /// Derived from the trace or event id, so decisions are reproducible.
    #[default]
    Seeded,
    /// Drawn from an entropy backed generator.
    Entropy,
}

/// Error returned when parsing an unknown [`RandomSourceKind`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown random source '{0}'")]
pub struct ParseRandomSourceError(String);

impl FromStr for RandomSourceKind {
    type Err = ParseRandomSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seeded" => Ok(Self::Seeded),
            "entropy" => Ok(Self::Entropy),
            _ => Err(ParseRandomSourceError(s.to_owned())),
        }
    }
}

/// Controls sampling decisions.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct Sampling {
    /// The source of random numbers for sampling decisions.
    pub random_source: RandomSourceKind,
}

/// Controls where rule sets are stored.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Storage {
    /// The directory holding one rule set file per project.
    ///
    /// Relative paths are resolved against the config folder.
    pub path: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            path: PathBuf::from("rules"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct ConfigValues {
    #[serde(default)]
    logging: LogConfig,
    #[serde(default)]
    sampling: Sampling,
    #[serde(default)]
    storage: Storage,
}

impl ConfigValues {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let f = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(path));
            }
        };

        serde_yaml::from_reader(io::BufReader::new(f))
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(path))
    }
}

/// Overrides for the values of a [`Config`], typically from command line arguments.
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The log level.
    pub log_level: Option<String>,
    /// The directory rule sets are stored in.
    pub storage_path: Option<String>,
    /// The source of random numbers for sampling decisions.
    pub random_source: Option<String>,
}

/// Config struct.
#[derive(Debug)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
}

impl Config {
    /// Loads a config from a given config folder.
    ///
    /// If the folder does not contain a `config.yml`, all values are defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = env::current_dir()
            .map(|x| x.join(path.as_ref()))
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        let values = ConfigValues::load(&path.join(CONFIG_FILE))?;
        Ok(Config { values, path })
    }

    /// Override configuration with values coming from other sources.
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        if let Some(level) = overrides.log_level {
            self.values.logging.level = level.parse::<Level>().map_err(|err| {
                ConfigError::wrap(err, ConfigErrorKind::InvalidValue).field("log_level")
            })?;
        }

        if let Some(storage_path) = overrides.storage_path {
            if storage_path.is_empty() {
                return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("storage_path"));
            }
            self.values.storage.path = PathBuf::from(storage_path);
        }

        if let Some(random_source) = overrides.random_source {
            self.values.sampling.random_source = random_source.parse().map_err(|err| {
                ConfigError::wrap(err, ConfigErrorKind::InvalidValue).field("random_source")
            })?;
        }

        Ok(self)
    }

    /// Returns the config folder.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }

    /// Returns the source of random numbers for sampling decisions.
    pub fn random_source(&self) -> RandomSourceKind {
        self.values.sampling.random_source
    }

    /// Returns the directory rule sets are stored in.
    pub fn storage_path(&self) -> PathBuf {
        self.path.join(&self.values.storage.path)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use sieve_log::LogFormat;

    use super::*;

    fn write_config(yaml: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), yaml).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_path(dir.path()).unwrap();

        assert_eq!(config.logging().level, Level::Info);
        assert_eq!(config.random_source(), RandomSourceKind::Seeded);
        assert_eq!(config.storage_path(), dir.path().join("rules"));
    }

    #[test]
    fn test_load_values() {
        let dir = write_config(
            r#"
logging:
  level: trace
  format: json
sampling:
  random_source: entropy
storage:
  path: /var/lib/sieve
"#,
        );

        let config = Config::from_path(dir.path()).unwrap();
        assert_eq!(config.logging().level, Level::Trace);
        assert_eq!(config.logging().format, LogFormat::Json);
        assert_eq!(config.random_source(), RandomSourceKind::Entropy);
        assert_eq!(config.storage_path(), PathBuf::from("/var/lib/sieve"));
    }

    #[test]
    fn test_bad_yaml() {
        let dir = write_config("logging: [");
        let error = Config::from_path(dir.path()).unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
        assert_eq!(error.path(), Some(dir.path().join(CONFIG_FILE).as_path()));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_invalid_value_in_file() {
        let dir = write_config("sampling:\n  random_source: dice\n");
        let error = Config::from_path(dir.path()).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
    }

    #[test]
    fn test_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_path(dir.path()).unwrap();

        config
            .apply_override(OverridableConfig {
                log_level: Some("debug".to_owned()),
                storage_path: Some("other".to_owned()),
                random_source: Some("entropy".to_owned()),
            })
            .unwrap();

        assert_eq!(config.logging().level, Level::Debug);
        assert_eq!(config.storage_path(), dir.path().join("other"));
        assert_eq!(config.random_source(), RandomSourceKind::Entropy);
    }

    #[test]
    fn test_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_path(dir.path()).unwrap();

        let error = config
            .apply_override(OverridableConfig {
                log_level: Some("loud".to_owned()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        insta::assert_snapshot!(error.to_string(), @"invalid config value (field log_level)");
    }
}
