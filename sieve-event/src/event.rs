use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dsc::DynamicSamplingContext;
use crate::getter::{Getter, Val, or_none};

/// The type of an event.
///
/// Sampling distinguishes transactions from everything else. All other types are sampled by error
/// rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Events that carry an exception payload.
    #[default]
    Error,
    /// A performance monitoring transaction.
    Transaction,
    /// An event representing a CSP violation report.
    Csp,
    /// All events that do not qualify as any other type.
    Default,
}

impl EventType {
    /// Returns `true` for transaction events.
    pub fn is_transaction(self) -> bool {
        self == Self::Transaction
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Transaction => "transaction",
            Self::Csp => "csp",
            Self::Default => "default",
        })
    }
}

/// Information about the user who triggered an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Unique identifier of the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The user segment, for apps that divide users into user segments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Remote IP address of the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// The HTTP request that caused an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// The URL of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request headers, keyed by header name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Request {
    /// Returns the value of a header, matching its name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A log message attached to an error event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    /// The log message with parameters substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// The raw log message, possibly with placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A single frame of a stack trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    /// Absolute path to the source file, or the script URL for browser code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abs_path: Option<String>,
}

/// A stack trace, oldest frame first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stacktrace {
    /// The frames of the stack trace.
    pub frames: Vec<Frame>,
}

/// A single exception of an error event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exception {
    /// The type of the exception, for example `ValueError`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    /// The human readable exception message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// The stack trace of the exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
}

impl Exception {
    /// Returns the message used for error message filtering.
    ///
    /// This is `"{type}: {value}"` if both are present, otherwise whichever one exists.
    pub fn message(&self) -> Option<String> {
        match (self.ty.as_deref(), self.value.as_deref()) {
            (Some(ty), Some(value)) => Some(format!("{ty}: {value}")),
            (Some(ty), None) => Some(ty.to_owned()),
            (None, Some(value)) => Some(value.to_owned()),
            (None, None) => None,
        }
    }
}

/// The list of exceptions of an error event, innermost last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exceptions {
    /// The exception values.
    pub values: Vec<Exception>,
}

/// A content security policy violation report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Csp {
    /// The directive whose enforcement caused the violation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_directive: Option<String>,
    /// The URI of the resource that was blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_uri: Option<String>,
    /// The URL of the resource where the violation occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

/// The sampled payload.
///
/// Only the attributes that sampling conditions can refer to are modeled. Unknown fields are
/// ignored when parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Unique identifier of this event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    /// The type of the event.
    #[serde(rename = "type")]
    pub ty: EventType,
    /// The release this event was created in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// The environment this event was created in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// The transaction name, for transaction events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// The user who triggered the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// The HTTP request of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    /// The log message of an error event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logentry: Option<LogEntry>,
    /// The exceptions of an error event.
    #[serde(rename = "exception", skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Exceptions>,
    /// The CSP report, for CSP events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csp: Option<Csp>,
    /// The dynamic sampling context of the trace this event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsc: Option<DynamicSamplingContext>,
}

impl Event {
    /// Returns the value of the `User-Agent` request header.
    pub fn user_agent(&self) -> Option<&str> {
        self.request.as_ref()?.header("User-Agent")
    }

    /// Returns the raw IP address of the user.
    pub fn ip_address(&self) -> Option<&str> {
        self.user.as_ref()?.ip_address.as_deref()
    }

    /// Returns the parsed IP address of the user.
    ///
    /// Returns `None` if the address is missing or cannot be parsed.
    pub fn client_ip(&self) -> Option<IpAddr> {
        self.ip_address()?.parse().ok()
    }

    /// Returns the URL of the request.
    pub fn url(&self) -> Option<&str> {
        self.request.as_ref()?.url.as_deref()
    }

    /// Returns the CSP report, only for CSP events.
    pub fn csp(&self) -> Option<&Csp> {
        if self.ty != EventType::Csp {
            return None;
        }
        self.csp.as_ref()
    }

    /// Returns the exception values of the event, empty if there are none.
    pub fn exception_values(&self) -> &[Exception] {
        self.exceptions
            .as_ref()
            .map(|exceptions| exceptions.values.as_slice())
            .unwrap_or_default()
    }

    /// Returns the trace context, if the event was sent as part of a trace.
    pub fn dsc(&self) -> Option<&DynamicSamplingContext> {
        self.dsc.as_ref()
    }
}

impl Getter for Event {
    fn get_value(&self, path: &str) -> Option<Val<'_>> {
        Some(match path.strip_prefix("event.")? {
            "release" => or_none(self.release.as_ref()?)?.into(),
            "environment" => or_none(self.environment.as_ref()?)?.into(),
            "transaction" => or_none(self.transaction.as_ref()?)?.into(),
            "user.id" => or_none(self.user.as_ref()?.id.as_ref()?)?.into(),
            "user.segment" => or_none(self.user.as_ref()?.segment.as_ref()?)?.into(),
            "user.ip_address" => or_none(self.user.as_ref()?.ip_address.as_ref()?)?.into(),
            "request.url" => or_none(self.request.as_ref()?.url.as_ref()?)?.into(),
            _ => return None,
        })
    }
}
