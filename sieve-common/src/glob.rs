use std::num::NonZeroUsize;
use std::sync::LazyLock;

use globset::GlobBuilder;
use lru::LruCache;
use parking_lot::Mutex;
use regex::bytes::{Regex, RegexBuilder};

const GLOB_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(500).unwrap();

static GLOB_CACHE: LazyLock<Mutex<LruCache<(GlobOptions, String), Regex>>> =
    LazyLock::new(|| Mutex::new(LruCache::new(GLOB_CACHE_SIZE)));

/// Controls the options of the globber.
///
/// The default is a case sensitive glob where `*` also matches path separators but not newlines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GlobOptions {
    /// Enables case insensitive matching.
    pub case_insensitive: bool,
    /// Allows wildcards to match newlines.
    pub allow_newline: bool,
}

/// Raised by [`validate_glob`] for patterns that cannot be compiled.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid glob pattern '{pattern}': {reason}")]
pub struct GlobError {
    pattern: String,
    reason: String,
}

impl GlobError {
    /// The offending pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// A description of what is wrong with the pattern.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

fn translate_pattern(pat: &str, options: GlobOptions) -> Result<Regex, GlobError> {
    let glob = GlobBuilder::new(pat)
        .case_insensitive(options.case_insensitive)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map_err(|e| GlobError {
            pattern: pat.to_owned(),
            reason: e.kind().to_string(),
        })?;

    RegexBuilder::new(glob.regex())
        .dot_matches_new_line(options.allow_newline)
        .build()
        .map_err(|e| GlobError {
            pattern: pat.to_owned(),
            reason: e.to_string(),
        })
}

/// Checks that the pattern is a well-formed glob.
///
/// Supported syntax is `*` and `?` wildcards, character classes like `[0-9]` or `[!a-z]`,
/// alternates like `{a,b}`, and backslash escapes. Empty patterns are rejected since they can
/// never match anything.
///
/// # Example
///
/// ```
/// assert!(sieve_common::validate_glob("1.2.*").is_ok());
/// assert!(sieve_common::validate_glob("1.[2").is_err());
/// ```
pub fn validate_glob(pattern: &str) -> Result<(), GlobError> {
    if pattern.is_empty() {
        return Err(GlobError {
            pattern: String::new(),
            reason: "empty pattern".to_owned(),
        });
    }

    translate_pattern(pattern, GlobOptions::default()).map(|_| ())
}

/// Performs a glob operation on bytes.
///
/// Returns `true` if the glob matches, `false` otherwise. Patterns that fail to compile never
/// match. Compiled patterns are kept in a process wide LRU cache.
pub fn glob_match_bytes(value: &[u8], pat: &str, options: GlobOptions) -> bool {
    let key = (options, pat.to_owned());
    let mut cache = GLOB_CACHE.lock();

    if let Some(pattern) = cache.get(&key) {
        pattern.is_match(value)
    } else if let Ok(pattern) = translate_pattern(pat, options) {
        let rv = pattern.is_match(value);
        cache.put(key, pattern);
        rv
    } else {
        false
    }
}

/// Performs a glob operation.
///
/// Returns `true` if the glob matches. Empty values never match.
///
/// Note that even though this accepts strings, the case insensitivity here is only
/// applied on ASCII characters as the underlying globber matches on bytes exclusively.
pub fn glob_match(value: &str, pat: &str, options: GlobOptions) -> bool {
    if value.is_empty() {
        return false;
    }
    glob_match_bytes(value.as_bytes(), pat, options)
}

/// Returns `true` if any of the patterns match the value.
pub fn glob_match_any<I, S>(value: &str, patterns: I, options: GlobOptions) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .any(|pat| glob_match(value, pat.as_ref(), options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globs() {
        macro_rules! test_glob {
            ($value:expr, $pat:expr, $is_match:expr, {$($k:ident: $v:expr),*}) => {{
                #[allow(clippy::needless_update)]
                let options = GlobOptions { $($k: $v,)* ..Default::default() };
                assert!(
                    glob_match($value, $pat, options) == $is_match,
                    "expected that {} {} {} with options {:?}",
                    $pat,
                    if $is_match { "matches" } else { "does not match" },
                    $value,
                    &options,
                );
            }}
        }

        test_glob!("1.2.3", "1.2.3", true, {});
        test_glob!("1.2.3", "1.2.*", true, {});
        test_glob!("1.2.30", "1.2.?", false, {});
        test_glob!("9.9.9", "1.2.3", false, {});
        test_glob!("Release-1", "release-*", false, {});
        test_glob!("Release-1", "release-*", true, {case_insensitive: true});
        test_glob!("/api/0/users/", "/api/*", true, {});
        test_glob!("/api/0/users/", "*/users/", true, {});
        test_glob!("1.18.4.2153-2aa83397b", "1.18.[0-4].*", true, {});
        test_glob!("1.18.5.2153-2aa83397b", "1.18.[0-4].*", false, {});
        test_glob!("1.18.5.2153-2aa83397b", "1.18.[!0-4].*", true, {});
        test_glob!("backend@2.0", "{frontend,backend}@*", true, {});
        test_glob!("foo\nbar", "foo*", false, {});
        test_glob!("foo\nbar", "foo*", true, {allow_newline: true});
        test_glob!("", "*", false, {});
    }

    #[test]
    fn test_escape_brace() {
        let pat = r"/api/0/organizations/\{organization_slug\}/event*";
        assert!(glob_match(
            "/api/0/organizations/{organization_slug}/event/foobar",
            pat,
            GlobOptions::default()
        ));
    }

    #[test]
    fn test_validate_glob() {
        assert!(validate_glob("*").is_ok());
        assert!(validate_glob("release-[0-9]*").is_ok());

        let error = validate_glob("1.[2").unwrap_err();
        assert_eq!(error.pattern(), "1.[2");

        assert!(validate_glob("{a,b").is_err());
        assert!(validate_glob("").is_err());
    }

    #[test]
    fn test_invalid_glob_never_matches() {
        assert!(!glob_match("1.[2", "1.[2", GlobOptions::default()));
    }

    #[test]
    fn test_match_any() {
        let patterns = ["2.1.1", "1.1.*"];
        assert!(glob_match_any("1.1.7", patterns, GlobOptions::default()));
        assert!(!glob_match_any("3.0.0", patterns, GlobOptions::default()));
        assert!(!glob_match_any("3.0.0", Vec::<String>::new(), GlobOptions::default()));
    }
}
