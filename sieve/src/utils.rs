use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Reads a JSON document from the given file, or from `stdin` if there is none or it is `-`.
pub fn read_json<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse {}", path.display()))
        }
        _ => serde_json::from_reader(io::stdin().lock()).context("failed to parse stdin"),
    }
}

/// Prints a value as pretty JSON to `stdout`.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sieve_sampling::{RuleCandidate, RuleKind};

    use super::*;

    #[test]
    fn test_read_candidate_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rule.json");
        fs::write(
            &path,
            r#"{"type":"transaction","tracing":true,"conditions":[],"sampleRate":0.3}"#,
        )
        .unwrap();

        let candidate: RuleCandidate = read_json(Some(&path)).unwrap();
        assert_eq!(candidate.kind, Some(RuleKind::Transaction));
        assert!(candidate.tracing);
        assert_eq!(candidate.sample_rate, Some(0.3));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let error = read_json::<RuleCandidate>(Some(&path)).unwrap_err();
        assert!(error.to_string().starts_with("failed to open "));
    }

    #[test]
    fn test_read_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rule.json");
        fs::write(&path, "{").unwrap();

        let error = read_json::<RuleCandidate>(Some(&path)).unwrap_err();
        assert!(error.to_string().starts_with("failed to parse "));
    }
}
