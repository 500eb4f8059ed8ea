use sieve_config::{Config, RandomSourceKind};
use sieve_sampling::{EntropyRandom, RandomSource, SeededRandom};

/// Print spawn infos to the log.
pub fn dump_spawn_infos(config: &Config) {
    sieve_log::debug!(
        "launching sieve from config folder {}",
        config.path().display()
    );
    sieve_log::debug!("  storage path: {}", config.storage_path().display());
    sieve_log::debug!("  random source: {:?}", config.random_source());
    sieve_log::debug!("  log level: {}", config.logging().level);
}

/// Initialize the logging system.
pub fn init_logging(config: &Config) {
    sieve_log::init(config.logging());
}

/// Creates the random source selected in the config.
pub fn random_source(config: &Config) -> Box<dyn RandomSource> {
    match config.random_source() {
        RandomSourceKind::Seeded => Box::new(SeededRandom),
        RandomSourceKind::Entropy => Box::new(EntropyRandom),
    }
}
