//! Single predicates over an event attribute.
//!
//! The root type is [`Condition`]. Every condition has a [`Category`], which determines the
//! attribute it reads and the [`Operator`] used to compare it against the configured values.

use std::fmt;

use enumset::EnumSetType;
use serde::{Deserialize, Serialize};
use sieve_common::{GlobOptions, glob_match_any};
use sieve_event::{Event, Getter, Val};
use sieve_filter::{
    LegacyBrowser, browser_extensions, client_ips, csp, error_messages, legacy_browsers,
    localhost, web_crawlers,
};

use crate::utils;

/// The attribute a [`Condition`] refers to.
#[derive(Debug, Ord, PartialOrd, Hash, EnumSetType, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// The release of the event, matched with globs.
    Release,
    /// The environment of the event.
    Environment,
    /// The id of the user who triggered the event.
    UserId,
    /// The segment of the user who triggered the event.
    UserSegment,
    /// Whether the event was caused by a known problematic browser extension.
    BrowserExtensions,
    /// Whether the event originates from the local host.
    Localhost,
    /// The legacy browser classes the event's user agent falls into.
    LegacyBrowsers,
    /// Whether the event was sent by a known web crawler.
    WebCrawlers,
    /// IP addresses or networks containing the client IP.
    IpAddresses,
    /// Origins of CSP violation reports.
    ContentSecurityPolicy,
    /// The log message and exception messages of the event, matched with globs.
    ErrorMessages,
    /// The transaction name, matched with globs.
    Transactions,
}

impl Category {
    /// Returns the camel case name of this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Environment => "environment",
            Self::UserId => "userId",
            Self::UserSegment => "userSegment",
            Self::BrowserExtensions => "browserExtensions",
            Self::Localhost => "localhost",
            Self::LegacyBrowsers => "legacyBrowsers",
            Self::WebCrawlers => "webCrawlers",
            Self::IpAddresses => "ipAddresses",
            Self::ContentSecurityPolicy => "contentSecurityPolicy",
            Self::ErrorMessages => "errorMessages",
            Self::Transactions => "transactions",
        }
    }

    /// Returns the only operator supported by this category.
    pub fn operator(self) -> Operator {
        match self {
            Self::Release | Self::Transactions | Self::ErrorMessages => Operator::Glob,
            Self::Environment
            | Self::UserId
            | Self::UserSegment
            | Self::BrowserExtensions
            | Self::Localhost
            | Self::WebCrawlers => Operator::Eq,
            Self::LegacyBrowsers | Self::IpAddresses | Self::ContentSecurityPolicy => {
                Operator::Custom
            }
        }
    }

    /// Returns `true` if the values of this category are the literals `true` and `false`.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            Self::BrowserExtensions | Self::Localhost | Self::WebCrawlers
        )
    }

    /// The path of the event field this category reads.
    pub fn event_field(self) -> &'static str {
        match self {
            Self::Release => "event.release",
            Self::Environment => "event.environment",
            Self::UserId => "event.user.id",
            Self::UserSegment => "event.user.segment",
            Self::BrowserExtensions => "event.has_bad_browser_extensions",
            Self::Localhost => "event.is_local_ip",
            Self::LegacyBrowsers => "event.legacy_browser",
            Self::WebCrawlers => "event.web_crawlers",
            Self::IpAddresses => "event.client_ip",
            Self::ContentSecurityPolicy => "event.csp",
            Self::ErrorMessages => "event.error_messages",
            Self::Transactions => "event.transaction",
        }
    }

    /// The path of the trace field this category reads, if it is available on traces.
    pub fn trace_field(self) -> Option<&'static str> {
        Some(match self {
            Self::Release => "trace.release",
            Self::Environment => "trace.environment",
            Self::UserId => "trace.user.id",
            Self::UserSegment => "trace.user.segment",
            Self::Transactions => "trace.transaction",
            _ => return None,
        })
    }

    /// Returns the field read by tracing or non-tracing rules.
    pub fn field_name(self, tracing: bool) -> Option<&'static str> {
        if tracing {
            self.trace_field()
        } else {
            Some(self.event_field())
        }
    }

    /// Resolves a field path back to its category.
    ///
    /// The returned flag is `true` if the path is a trace field.
    pub fn from_field_name(name: &str) -> Option<(Self, bool)> {
        enumset::EnumSet::<Category>::all()
            .iter()
            .find_map(|category| {
                if category.event_field() == name {
                    Some((category, false))
                } else if category.trace_field() == Some(name) {
                    Some((category, true))
                } else {
                    None
                }
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a condition compares the attribute with its values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Shell style glob patterns, matches if any pattern matches.
    Glob,
    /// Exact equality, matches if any value is equal.
    Eq,
    /// A category specific predicate.
    Custom,
}

impl Operator {
    /// Returns the lowercase name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glob => "glob",
            Self::Eq => "eq",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`Operator::Eq`] conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOptions {
    /// If `true`, string values are compared in case-insensitive mode.
    ///
    /// This has no effect on boolean categories.
    #[serde(default)]
    pub ignore_case: bool,
}

/// A predicate over one attribute of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// The attribute this condition refers to.
    pub category: Category,
    /// The comparison applied to the attribute.
    pub operator: Operator,
    /// The values to compare with, in order.
    pub values: Vec<String>,
    /// Configuration options for the condition.
    #[serde(default, skip_serializing_if = "utils::is_default")]
    pub options: ConditionOptions,
}

impl Condition {
    /// Creates a condition using the operator of the category.
    pub fn new<I, S>(category: Category, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            operator: category.operator(),
            values: values.into_iter().map(Into::into).collect(),
            options: ConditionOptions::default(),
        }
    }

    /// Enables case-insensitive comparison for equality conditions.
    pub fn ignore_case(mut self) -> Self {
        self.options.ignore_case = true;
        self
    }

    /// Returns `true` if the condition matches the event.
    ///
    /// Tracing conditions read the event's dynamic sampling context and never match an event
    /// without one. Conditions on categories that are not available on traces never match in
    /// tracing mode.
    pub fn matches(&self, event: &Event, tracing: bool) -> bool {
        if tracing {
            let (Some(dsc), Some(field)) = (event.dsc(), self.category.trace_field()) else {
                return false;
            };
            return self.matches_value(dsc.get_value(field));
        }

        match self.category {
            Category::Release
            | Category::Environment
            | Category::UserId
            | Category::UserSegment
            | Category::Transactions => {
                self.matches_value(event.get_value(self.category.event_field()))
            }
            Category::BrowserExtensions => self.matches_flag(browser_extensions::matches(event)),
            Category::Localhost => self.matches_flag(localhost::matches(event)),
            Category::WebCrawlers => self.matches_flag(web_crawlers::matches(event)),
            Category::LegacyBrowsers => {
                let browsers: Vec<LegacyBrowser> = self
                    .values
                    .iter()
                    .map(|value| LegacyBrowser::from(value.as_str()))
                    .collect();
                legacy_browsers::matches(event, &browsers)
            }
            Category::IpAddresses => client_ips::matches(event.client_ip(), &self.values),
            Category::ContentSecurityPolicy => csp::matches(event, &self.values),
            Category::ErrorMessages => error_messages::matches(event, &self.values),
        }
    }

    fn matches_value(&self, value: Option<Val<'_>>) -> bool {
        let Some(value) = value.and_then(|v| v.as_str()) else {
            return false;
        };

        match self.operator {
            Operator::Glob => glob_match_any(value, &self.values, GlobOptions::default()),
            Operator::Eq => self.values.iter().any(|v| self.cmp(v, value)),
            Operator::Custom => false,
        }
    }

    fn matches_flag(&self, flag: bool) -> bool {
        self.values
            .iter()
            .any(|value| value.parse::<bool>() == Ok(flag))
    }

    fn cmp(&self, left: &str, right: &str) -> bool {
        if self.options.ignore_case {
            unicase::eq(left, right)
        } else {
            left == right
        }
    }
}
