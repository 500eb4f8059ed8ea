//! Detects events originating from legacy browsers.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sieve_event::Event;

use crate::user_agent::{self, UserAgent};

/// A browser class matched by the legacy browser condition.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LegacyBrowser {
    /// Applies the default set of min-version checks for all known browsers.
    Default,
    /// Internet Explorer 8 and older.
    IePre9,
    /// Internet Explorer 9.
    Ie9,
    /// Internet Explorer 10.
    Ie10,
    /// Internet Explorer 11.
    Ie11,
    /// Opera 14 and older.
    OperaPre15,
    /// Opera Mini 7 and older.
    OperaMiniPre8,
    /// Android 3 and older.
    AndroidPre4,
    /// Safari 5 and older.
    SafariPre6,
    /// An unknown browser id, kept for forward compatibility.
    Unknown(String),
}

impl LegacyBrowser {
    /// All known browser classes, in their canonical order.
    pub const KNOWN: &'static [LegacyBrowser] = &[
        LegacyBrowser::Default,
        LegacyBrowser::IePre9,
        LegacyBrowser::Ie9,
        LegacyBrowser::Ie10,
        LegacyBrowser::Ie11,
        LegacyBrowser::OperaPre15,
        LegacyBrowser::OperaMiniPre8,
        LegacyBrowser::AndroidPre4,
        LegacyBrowser::SafariPre6,
    ];

    /// Returns the id of this browser class.
    pub fn as_str(&self) -> &str {
        match self {
            LegacyBrowser::Default => "default",
            LegacyBrowser::IePre9 => "ie_pre_9",
            LegacyBrowser::Ie9 => "ie9",
            LegacyBrowser::Ie10 => "ie10",
            LegacyBrowser::Ie11 => "ie11",
            LegacyBrowser::OperaPre15 => "opera_pre_15",
            LegacyBrowser::OperaMiniPre8 => "opera_mini_pre_8",
            LegacyBrowser::AndroidPre4 => "android_pre_4",
            LegacyBrowser::SafariPre6 => "safari_pre_6",
            LegacyBrowser::Unknown(string) => string,
        }
    }

    /// Returns `true` if this is one of the known browser classes.
    pub fn is_known(&self) -> bool {
        !matches!(self, LegacyBrowser::Unknown(_))
    }
}

impl From<&str> for LegacyBrowser {
    fn from(val: &str) -> Self {
        match val {
            "default" => LegacyBrowser::Default,
            "ie_pre_9" => LegacyBrowser::IePre9,
            "ie9" => LegacyBrowser::Ie9,
            "ie10" => LegacyBrowser::Ie10,
            "ie11" => LegacyBrowser::Ie11,
            "opera_pre_15" => LegacyBrowser::OperaPre15,
            "opera_mini_pre_8" => LegacyBrowser::OperaMiniPre8,
            "android_pre_4" => LegacyBrowser::AndroidPre4,
            "safari_pre_6" => LegacyBrowser::SafariPre6,
            _ => LegacyBrowser::Unknown(val.to_owned()),
        }
    }
}

impl fmt::Display for LegacyBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LegacyBrowser {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let string = Cow::<str>::deserialize(deserializer)?;
        Ok(string.as_ref().into())
    }
}

impl Serialize for LegacyBrowser {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Minimum supported major version per browser family for [`LegacyBrowser::Default`].
const MIN_VERSIONS: &[(&str, u32)] = &[
    ("Chrome", 0),
    ("IE", 10),
    ("Firefox", 0),
    ("Safari", 6),
    ("Edge", 0),
    ("Opera", 15),
    ("Android", 4),
    ("Opera Mini", 8),
];

/// Checks if the event originates from one of the specified legacy browsers.
pub fn matches<'a, It>(event: &Event, browsers: It) -> bool
where
    It: IntoIterator<Item = &'a LegacyBrowser>,
{
    let Some(user_agent_string) = event.user_agent() else {
        return false;
    };
    let user_agent = user_agent::parse_user_agent(user_agent_string);

    // remap IE Mobile to IE
    let family = match user_agent.family {
        "IE Mobile" => "IE",
        other => other,
    };

    browsers.into_iter().any(|browser| match browser {
        LegacyBrowser::Default => default_filter(family, &user_agent),
        LegacyBrowser::IePre9 => filter_browser(family, &user_agent, "IE", |x| x <= 8),
        LegacyBrowser::Ie9 => filter_browser(family, &user_agent, "IE", |x| x == 9),
        LegacyBrowser::Ie10 => filter_browser(family, &user_agent, "IE", |x| x == 10),
        LegacyBrowser::Ie11 => filter_browser(family, &user_agent, "IE", |x| x == 11),
        LegacyBrowser::OperaMiniPre8 => {
            filter_browser(family, &user_agent, "Opera Mini", |x| x < 8)
        }
        LegacyBrowser::OperaPre15 => filter_browser(family, &user_agent, "Opera", |x| x < 15),
        LegacyBrowser::AndroidPre4 => filter_browser(family, &user_agent, "Android", |x| x < 4),
        LegacyBrowser::SafariPre6 => filter_browser(family, &user_agent, "Safari", |x| x < 6),
        LegacyBrowser::Unknown(_) => false,
    })
}

fn default_filter(mapped_family: &str, user_agent: &UserAgent) -> bool {
    let Some(major) = user_agent.major else {
        return false;
    };

    MIN_VERSIONS
        .iter()
        .find(|(family, _)| *family == mapped_family)
        .is_some_and(|&(_, min_version)| min_version > major)
}

fn filter_browser<F>(
    mapped_family: &str,
    user_agent: &UserAgent,
    family: &str,
    should_filter: F,
) -> bool
where
    F: FnOnce(u32) -> bool,
{
    mapped_family == family && user_agent.major.is_some_and(should_filter)
}

#[cfg(test)]
mod tests {
    const IE8_UA: &str = "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.0; Trident/4.0)";
    const IE_MOBILE9_UA: &str = "Mozilla/5.0 (compatible; MSIE 9.0; Windows Phone OS 7.5; Trident/5.0; IEMobile/9.0; NOKIA; Lumia 710)";
    const IE9_UA: &str = "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 7.1; Trident/5.0)";
    const IE10_UA: &str = "Mozilla/5.0 (compatible; MSIE 10.0; Windows NT 6.1; Trident/6.0)";
    const IE11_UA: &str = "Mozilla/5.0 (Windows NT 6.3; Trident/7.0; rv:11.0) like Gecko";
    const OPERA_MINI_PRE8_UA: &str = "Opera/9.80 (J2ME/MIDP; Opera Mini/7.0.32796/59.323; U; fr) Presto/2.12.423 Version/12.16";
    const OPERA_MINI_8_UA: &str = "Opera/9.80 (J2ME/MIDP; Opera Mini/8.0.35158/36.2534; U; en) Presto/2.12.423 Version/12.16";
    const OPERA_PRE15_UA: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/27.0.1453.12 Safari/537.36 OPR/14.0.1116.4";
    const OPERA_15_UA: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/28.0.1500.45 Safari/537.36 OPR/15.0.1147.61 (Edition Next)";
    const ANDROID_PRE4_UA: &str = "Mozilla/5.0 (Linux; U; Android 3.2; nl-nl; GT-P6800 Build/HTJ85B) AppleWebKit/534.13 (KHTML, like Gecko) Version/4.0 Safari/534.13";
    const ANDROID_4_UA: &str = "Mozilla/5.0 (Linux; U; Android 4.1.1; en-gb; Build/KLP) AppleWebKit/534.30 (KHTML, like Gecko) Version/4.0 Safari/534.30";
    const SAFARI_PRE6_UA: &str = "Mozilla/5.0 (Macintosh; U; Intel Mac OS X 1063; tr-DE) AppleWebKit/533.16 (KHTML like Gecko) Version/5.0 Safari/533.16";
    const SAFARI_6_UA: &str = "Mozilla/5.0 (Macintosh; U; Intel Mac OS X 10.17.4; en-GB) AppleWebKit/605.1.5 (KHTML, like Gecko) Version/6.0 Safari/605.1.5";

    use super::*;
    use crate::testutils;

    #[test]
    fn test_match_default_browsers() {
        for old_user_agent in &[
            IE9_UA,
            IE_MOBILE9_UA,
            SAFARI_PRE6_UA,
            OPERA_PRE15_UA,
            ANDROID_PRE4_UA,
            OPERA_MINI_PRE8_UA,
        ] {
            let event = testutils::get_event_with_user_agent(old_user_agent);
            assert!(
                matches(&event, &[LegacyBrowser::Default]),
                "Default browsers did not match {old_user_agent}"
            );
        }
    }

    #[test]
    fn test_dont_match_default_above_min_versions() {
        for user_agent in &[
            IE10_UA,
            IE11_UA,
            SAFARI_6_UA,
            OPERA_15_UA,
            ANDROID_4_UA,
            OPERA_MINI_8_UA,
        ] {
            let event = testutils::get_event_with_user_agent(user_agent);
            assert!(
                !matches(&event, &[LegacyBrowser::Default]),
                "Default browsers matched {user_agent}"
            );
        }
    }

    #[test]
    fn test_match_configured() {
        let examples = &[
            (IE8_UA, LegacyBrowser::IePre9),
            (IE9_UA, LegacyBrowser::Ie9),
            (IE_MOBILE9_UA, LegacyBrowser::Ie9),
            (IE10_UA, LegacyBrowser::Ie10),
            (IE11_UA, LegacyBrowser::Ie11),
            (OPERA_MINI_PRE8_UA, LegacyBrowser::OperaMiniPre8),
            (OPERA_PRE15_UA, LegacyBrowser::OperaPre15),
            (ANDROID_PRE4_UA, LegacyBrowser::AndroidPre4),
            (SAFARI_PRE6_UA, LegacyBrowser::SafariPre6),
        ];

        for (user_agent, browser) in examples {
            let event = testutils::get_event_with_user_agent(user_agent);
            assert!(
                matches(&event, [browser]),
                "{browser} did not match {user_agent}"
            );
        }
    }

    #[test]
    fn test_dont_match_unconfigured() {
        let event = testutils::get_event_with_user_agent(IE9_UA);
        assert!(!matches(
            &event,
            &[LegacyBrowser::Ie10, LegacyBrowser::SafariPre6]
        ));

        let event = testutils::get_event_with_user_agent(IE8_UA);
        assert!(!matches(&event, &[LegacyBrowser::Unknown("ie7".to_owned())]));
        assert!(!matches(&Event::default(), LegacyBrowser::KNOWN));
    }

    #[test]
    fn test_browser_ids() {
        for browser in LegacyBrowser::KNOWN {
            assert_eq!(&LegacyBrowser::from(browser.as_str()), browser);
            assert!(browser.is_known());
        }

        let unknown = LegacyBrowser::from("netscape");
        assert!(!unknown.is_known());
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"netscape\"");
    }
}
