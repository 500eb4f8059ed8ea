//! Matches the messages of error events against glob patterns.

use std::borrow::Cow;

use sieve_common::{GlobOptions, glob_match_any};
use sieve_event::Event;

const OPTIONS: GlobOptions = GlobOptions {
    case_insensitive: false,
    allow_newline: true,
};

/// Collects the messages of an event that patterns are matched against.
///
/// These are the formatted log message (or the raw one if there is no formatted message) and one
/// message per exception in the form `"{type}: {value}"`.
pub fn messages(event: &Event) -> Vec<Cow<'_, str>> {
    let mut messages = Vec::new();

    if let Some(logentry) = &event.logentry {
        if let Some(message) = logentry.formatted.as_deref().or(logentry.message.as_deref()) {
            messages.push(Cow::Borrowed(message));
        }
    }

    for exception in event.exception_values() {
        if let Some(message) = exception.message() {
            messages.push(Cow::Owned(message));
        }
    }

    messages
}

/// Checks if any message of the event matches any of the patterns.
pub fn matches<S>(event: &Event, patterns: &[S]) -> bool
where
    S: AsRef<str>,
{
    if patterns.is_empty() {
        return false;
    }

    messages(event)
        .iter()
        .any(|message| glob_match_any(message, patterns, OPTIONS))
}

#[cfg(test)]
mod tests {
    use sieve_event::{Exception, Exceptions, LogEntry};

    use super::*;

    fn get_event_with_exception(ty: Option<&str>, value: Option<&str>) -> Event {
        Event {
            exceptions: Some(Exceptions {
                values: vec![Exception {
                    ty: ty.map(str::to_owned),
                    value: value.map(str::to_owned),
                    ..Exception::default()
                }],
            }),
            ..Event::default()
        }
    }

    fn get_event_with_logentry(formatted: Option<&str>, message: Option<&str>) -> Event {
        Event {
            logentry: Some(LogEntry {
                formatted: formatted.map(str::to_owned),
                message: message.map(str::to_owned),
            }),
            ..Event::default()
        }
    }

    #[test]
    fn test_match_exception() {
        let examples = &[
            (Some("ChunkLoadError"), Some("Loading chunk 3 failed"), "ChunkLoadError*", true),
            (Some("ChunkLoadError"), Some("Loading chunk 3 failed"), "*chunk 3*", true),
            (Some("ChunkLoadError"), None, "ChunkLoadError", true),
            (None, Some("Loading chunk 3 failed"), "Loading chunk*", true),
            (Some("TypeError"), Some("null is not an object"), "ChunkLoadError*", false),
            (Some("TypeError"), Some("null is not an object"), "typeerror*", false),
        ];

        for &(ty, value, pattern, expected) in examples {
            let event = get_event_with_exception(ty, value);
            assert_eq!(
                matches(&event, &[pattern]),
                expected,
                "{pattern} against {ty:?}: {value:?}"
            );
        }
    }

    #[test]
    fn test_match_logentry() {
        let event = get_event_with_logentry(Some("Failed to fetch user 42"), Some("Failed to fetch user %s"));
        assert!(matches(&event, &["*user 42"]));
        assert!(!matches(&event, &["*user %s"]));

        let event = get_event_with_logentry(None, Some("Failed to fetch user %s"));
        assert!(matches(&event, &["*user %s"]));
    }

    #[test]
    fn test_match_multiline_message() {
        let event = get_event_with_logentry(Some("first line\nsecond line"), None);
        assert!(matches(&event, &["first*"]));
    }

    #[test]
    fn test_no_patterns_no_messages() {
        let event = get_event_with_exception(Some("TypeError"), Some("oops"));
        assert!(!matches::<&str>(&event, &[]));
        assert!(!matches(&Event::default(), &["*"]));
    }

    #[test]
    fn test_collect_messages() {
        let mut event = get_event_with_exception(Some("TypeError"), Some("oops"));
        event.logentry = Some(LogEntry {
            formatted: Some("something broke".to_owned()),
            message: None,
        });

        insta::assert_debug_snapshot!(messages(&event), @r#"
        [
            "something broke",
            "TypeError: oops",
        ]
        "#);
    }
}
