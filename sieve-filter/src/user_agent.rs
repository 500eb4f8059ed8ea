//! Minimal user agent parsing for browser family and major version.
//!
//! This covers only the browser families that legacy browser detection needs: IE, IE Mobile,
//! Edge, Safari, Opera, Opera Mini, Chrome, Firefox and Android. Everything else is reported as
//! family `Other` without a version. It is not a general purpose user agent parser and should not
//! be used for anything beyond [`legacy_browsers`](crate::legacy_browsers).

use std::sync::LazyLock;

use regex::Regex;

/// The browser of a parsed user agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAgent {
    /// The browser family, for example `IE` or `Opera Mini`.
    pub family: &'static str,
    /// The major version of the browser, if it could be determined.
    pub major: Option<u32>,
}

/// Browser families in matching order.
///
/// More specific families come first, since for example Opera and Edge also announce themselves
/// as Chrome, and every WebKit browser announces itself as Safari.
static FAMILIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("IE Mobile", r"IEMobile[/ ](\d+)"),
        ("IE", r"MSIE (\d+)"),
        ("IE", r"Trident/\d+.*;\s*rv:(\d+)"),
        ("Opera Mini", r"Opera Mini/(\d+)"),
        ("Opera", r"OPR/(\d+)"),
        ("Opera", r"Opera[/ ].*Version/(\d+)"),
        ("Opera", r"Opera[/ ](\d+)"),
        ("Edge", r"Edge?/(\d+)"),
        ("Chrome", r"(?:Chrome|CriOS)/(\d+)"),
        ("Firefox", r"(?:Firefox|FxiOS)/(\d+)"),
        ("Android", r"Android (\d+)"),
        ("Safari", r"Version/(\d+)[\d.]*.*Safari/"),
    ]
    .into_iter()
    .map(|(family, pattern)| {
        (
            family,
            Regex::new(pattern).expect("Invalid user agent family Regex"),
        )
    })
    .collect()
});

/// Parses the browser family and major version from a user agent string.
pub fn parse_user_agent(user_agent: &str) -> UserAgent {
    for (family, regex) in FAMILIES.iter() {
        if let Some(captures) = regex.captures(user_agent) {
            return UserAgent {
                family: *family,
                major: captures.get(1).and_then(|m| m.as_str().parse().ok()),
            };
        }
    }

    UserAgent {
        family: "Other",
        major: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_families() {
        let examples = &[
            (
                "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.0; Trident/4.0)",
                "IE",
                Some(8),
            ),
            (
                "Mozilla/5.0 (Windows NT 6.3; Trident/7.0; rv:11.0) like Gecko",
                "IE",
                Some(11),
            ),
            (
                "Mozilla/5.0 (compatible; MSIE 9.0; Windows Phone OS 7.5; Trident/5.0; IEMobile/9.0; NOKIA; Lumia 710)",
                "IE Mobile",
                Some(9),
            ),
            (
                "Opera/9.80 (J2ME/MIDP; Opera Mini/7.0.32796/59.323; U; fr) Presto/2.12.423 Version/12.16",
                "Opera Mini",
                Some(7),
            ),
            (
                "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/27.0.1453.12 Safari/537.36 OPR/14.0.1116.4",
                "Opera",
                Some(14),
            ),
            (
                "Opera/9.80 (Windows NT 6.1; U; en) Presto/2.10.289 Version/12.02",
                "Opera",
                Some(12),
            ),
            (
                "Mozilla/5.0 (Linux; U; Android 3.2; nl-nl; GT-P6800 Build/HTJ85B) AppleWebKit/534.13 (KHTML, like Gecko) Version/4.0 Safari/534.13",
                "Android",
                Some(3),
            ),
            (
                "Mozilla/5.0 (Macintosh; U; Intel Mac OS X 1063; tr-DE) AppleWebKit/533.16 (KHTML like Gecko) Version/5.0 Safari/533.16",
                "Safari",
                Some(5),
            ),
            (
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                "Chrome",
                Some(120),
            ),
            (
                "Mozilla/5.0 (Windows NT 10.0; rv:109.0) Gecko/20100101 Firefox/115.0",
                "Firefox",
                Some(115),
            ),
            ("curl/8.4.0", "Other", None),
        ];

        for &(user_agent, family, major) in examples {
            assert_eq!(
                parse_user_agent(user_agent),
                UserAgent { family, major },
                "parsing {user_agent}"
            );
        }
    }
}
