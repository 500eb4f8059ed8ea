//! Detects events caused by problematic browser extensions.

use std::sync::LazyLock;

use regex::Regex;
use sieve_event::{Event, Exception};

static EXTENSION_EXC_VALUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        # Random plugins/extensions
        top\.GLOBALS|
        originalCreateNotification|
        canvas.contentDocument|
        MyApp_RemoveAllHighlights|
        http://tt\.epicplay\.com|
        Can't\sfind\svariable:\sZiteReader|
        jigsaw\sis\snot\sdefined|
        ComboSearch\sis\snot\sdefined|
        http://loading\.retry\.widdit\.com/|
        atomicFindClose|
        # Facebook borked
        fb_xd_fragment|
        # ISP optimizing proxy
        bmi_SafeAddOnload|
        EBCallBackMessageReceived|
        _gCrWeb|
        conduitPage|
        # Google Search app (iOS)
        null\sis\snot\san\sobject\s\(evaluating\s'elt.parentNode'\)|
        # Dragon Web Extension from Nuance Communications
        plugin\.setSuspendState\sis\snot\sa\sfunction|
        # Chrome extension message passing failure
        Extension\scontext\sinvalidated
    "#,
    )
    .expect("Invalid browser extensions filter (Exec Vals) Regex")
});

static EXTENSION_EXC_SOURCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        graph\.facebook\.com|                           # Facebook flakiness
        connect\.facebook\.net|                         # Facebook blocked
        eatdifferent\.com\.woopra-ns\.com|              # Woopra flakiness
        static\.woopra\.com/js/woopra\.js|
        ^chrome(-extension)?://|                        # Chrome extensions
        ^moz-extension://|                              # Firefox extensions
        ^safari-extension://|                           # Safari extensions
        127\.0\.0\.1:4001/isrunning|                    # Cacaoweb
        webappstoolbarba\.texthelp\.com/|               # Other
        metrics\.itunes\.apple\.com\.edgesuite\.net/|
        kaspersky-labs\.com                             # Kaspersky Protection browser extension
    ",
    )
    .expect("Invalid browser extensions filter (Exec Sources) Regex")
});

/// Checks if the event was caused by a known problematic browser extension.
///
/// Looks at the message of the first exception and the source of its last stack frame.
pub fn matches(event: &Event) -> bool {
    let Some(exception) = event.exception_values().first() else {
        return false;
    };

    if let Some(value) = exception.value.as_deref() {
        if EXTENSION_EXC_VALUES.is_match(value) {
            return true;
        }
    }

    if let Some(source) = get_exception_source(exception) {
        if EXTENSION_EXC_SOURCES.is_match(source) {
            return true;
        }
    }

    false
}

fn get_exception_source(exception: &Exception) -> Option<&str> {
    let frames = &exception.stacktrace.as_ref()?.frames;
    frames.last()?.abs_path.as_deref()
}

#[cfg(test)]
mod tests {
    use sieve_event::{Exceptions, Frame, Stacktrace};

    use super::*;

    /// Returns an event with the specified exception on the first position.
    fn get_event_with_exception(e: Exception) -> Event {
        Event {
            exceptions: Some(Exceptions {
                values: vec![e, Exception::default(), Exception::default()],
            }),
            ..Event::default()
        }
    }

    fn get_event_with_exception_source(src: &str) -> Event {
        let ex = Exception {
            stacktrace: Some(Stacktrace {
                frames: vec![Frame {
                    abs_path: Some(src.to_owned()),
                }],
            }),
            ..Exception::default()
        };
        get_event_with_exception(ex)
    }

    fn get_event_with_exception_value(val: &str) -> Event {
        let ex = Exception {
            value: Some(val.to_owned()),
            ..Exception::default()
        };
        get_event_with_exception(ex)
    }

    #[test]
    fn test_match_known_browser_extension_source() {
        let sources = [
            "https://graph.facebook.com/",
            "https://connect.facebook.net/en_US/sdk.js",
            "https://eatdifferent.com.woopra-ns.com/main.js",
            "https://static.woopra.com/js/woopra.js",
            "chrome-extension://my-extension/or/something",
            "chrome://my-extension/or/something",
            "moz-extension://my-extension/or/something",
            "safari-extension://my-extension/or/something",
            "127.0.0.1:4001/isrunning",
            "webappstoolbarba.texthelp.com/",
            "http://metrics.itunes.apple.com.edgesuite.net/itunespreview/itunes/browser:firefo",
            "https://fscr.kaspersky-labs.com/B-9B72-7B7/main.js",
        ];

        for source_name in &sources {
            let event = get_event_with_exception_source(source_name);
            assert!(
                matches(&event),
                "Not recognizing events with known source {source_name}"
            );
        }
    }

    #[test]
    fn test_match_known_browser_extension_values() {
        let exceptions = [
            "what does conduitPage even do",
            "null is not an object (evaluating 'elt.parentNode')",
            "some error on top.GLOBALS",
            "biiig problem on originalCreateNotification",
            "canvas.contentDocument",
            "MyApp_RemoveAllHighlights",
            "http://tt.epicplay.com/not/very/good",
            "Can't find variable: ZiteReader, I wonder why?",
            "jigsaw is not defined and I'm not happy about it",
            "ComboSearch is not defined",
            "http://loading.retry.widdit.com/some/obscure/error",
            "atomicFindClose has messed up",
            "bad news, we have a fb_xd_fragment",
            "oh no! we have a case of: bmi_SafeAddOnload, again !",
            "watch out ! EBCallBackMessageReceived",
            "error _gCrWeb",
            "plugin.setSuspendState is not a function",
            "Extension context invalidated",
        ];

        for exc_value in &exceptions {
            let event = get_event_with_exception_value(exc_value);
            assert!(
                matches(&event),
                "Not recognizing events with known value {exc_value}"
            );
        }
    }

    #[test]
    fn test_dont_match_unknown_browser_extension() {
        let events = [
            get_event_with_exception_source("https://some/resonable/source.js"),
            get_event_with_exception_value("some perfectly reasonable value"),
            Event::default(),
        ];

        for event in &events {
            assert!(!matches(event), "Matched although source and value are ok");
        }
    }
}
