//! Matches CSP violation reports against origin patterns.
//!
//! Origins are written as `scheme://domain:port`, where every part is optional and `*` stands for
//! any value. Domains can start with a `*.` wildcard to include all subdomains.

use sieve_event::Event;

/// Checks if the CSP report of the event points to one of the given origins.
///
/// Both the blocked URI and the source file of the report are checked. Events that are not CSP
/// reports never match.
pub fn matches<It, S>(event: &Event, origins: It) -> bool
where
    It: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let Some(csp) = event.csp() else {
        return false;
    };

    let origins: Vec<SchemeDomainPort> = origins
        .into_iter()
        .map(|origin| SchemeDomainPort::from(origin.as_ref()))
        .collect();

    matches_any_origin(csp.blocked_uri.as_deref(), &origins)
        || matches_any_origin(csp.source_file.as_deref(), &origins)
}

/// A pattern used to match allowed paths.
///
/// Each field is `None` if it matches everything.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SchemeDomainPort {
    /// The scheme of the url.
    pub scheme: Option<String>,
    /// The domain of the url.
    pub domain: Option<String>,
    /// The port of the url.
    pub port: Option<String>,
}

impl From<&str> for SchemeDomainPort {
    fn from(url: &str) -> SchemeDomainPort {
        fn normalize(pattern: &str) -> Option<String> {
            if pattern == "*" {
                None
            } else {
                Some(pattern.to_lowercase())
            }
        }

        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (normalize(scheme), rest),
            None => (None, url),
        };

        let domain_port = rest.split('/').next().unwrap_or(rest);

        let (domain, port) = match domain_port.split_once(':') {
            Some((domain, port)) => (normalize(domain), normalize(port)),
            None => (normalize(domain_port), None),
        };

        SchemeDomainPort {
            scheme,
            domain,
            port,
        }
    }
}

/// Checks if a url satisfies one of the specified origins.
///
/// An origin specification may be in any of the following formats:
///
///  - `http://domain.com[:port]`
///  - an exact match is required
///  - `*`: anything goes
///  - `*.domain.com`: matches domain.com and any subdomains
///  - `*:port`: matches any hostname as long as the port matches
pub fn matches_any_origin(url: Option<&str>, origins: &[SchemeDomainPort]) -> bool {
    if origins
        .iter()
        .any(|o| o.scheme.is_none() && o.port.is_none() && o.domain.is_none())
    {
        return true;
    }

    let Some(url) = url else {
        return false;
    };
    let url = SchemeDomainPort::from(url);

    for origin in origins {
        if origin.scheme.is_some() && url.scheme != origin.scheme {
            continue;
        }
        if origin.port.is_some() && url.port != origin.port {
            continue;
        }
        if origin.domain.is_some() && url.domain != origin.domain {
            if let (Some(origin_domain), Some(domain)) = (&origin.domain, &url.domain) {
                if let Some(suffix) = origin_domain.strip_prefix('*') {
                    // `*.abc.com` matches both `x.abc.com` and `abc.com`
                    if domain.ends_with(suffix) || Some(domain.as_str()) == suffix.get(1..) {
                        return true;
                    }
                }
            }
            continue;
        }
        return true;
    }

    false
}

/// Returns `true` if the value can be used as a CSP origin pattern.
pub fn is_valid_origin(value: &str) -> bool {
    !value.trim().is_empty() && !value.chars().any(char::is_whitespace)
}
