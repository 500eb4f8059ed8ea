//! Contextual information stored on traces.
//!
//! [`DynamicSamplingContext`] (DSC) contains properties associated to traces that are shared
//! between all events of a trace. These properties do not change during the lifetime of the
//! trace, which is why tracing rules evaluate against the DSC instead of the individual event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::getter::{Getter, Val, or_none};

/// DynamicSamplingContext created by the first SDK in the call chain.
///
/// Because SDKs funnel this data through the baggage header, it is representable as a flat map of
/// strings: no nested objects, arrays or other non-string values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicSamplingContext {
    /// ID created by clients to represent the current call flow.
    pub trace_id: Uuid,
    /// The release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// The environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// The name of the transaction that started the trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// The user specific identifiers of the trace.
    #[serde(flatten, default)]
    pub user: TraceUserContext,
    /// Additional arbitrary fields for forwards compatibility.
    #[serde(flatten, default)]
    pub other: BTreeMap<String, Value>,
}

impl DynamicSamplingContext {
    /// Creates a context for the given trace with all optional attributes unset.
    pub fn new(trace_id: Uuid) -> Self {
        Self {
            trace_id,
            release: None,
            environment: None,
            transaction: None,
            user: TraceUserContext::default(),
            other: BTreeMap::new(),
        }
    }
}

impl Getter for DynamicSamplingContext {
    fn get_value(&self, path: &str) -> Option<Val<'_>> {
        Some(match path.strip_prefix("trace.")? {
            "release" => or_none(self.release.as_ref()?)?.into(),
            "environment" => or_none(self.environment.as_ref()?)?.into(),
            "user.id" => or_none(&self.user.user_id)?.into(),
            "user.segment" => or_none(&self.user.user_segment)?.into(),
            "transaction" => or_none(self.transaction.as_ref()?)?.into(),
            _ => return None,
        })
    }
}

/// User-related information in a [`DynamicSamplingContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TraceUserContext {
    /// The value of the `user.segment` property.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_segment: String,

    /// The value of the `user.id` property.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
}

impl<'de> Deserialize<'de> for TraceUserContext {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize, Default)]
        struct Nested {
            #[serde(default)]
            pub segment: String,
            #[serde(default)]
            pub id: String,
        }

        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            user: Option<Nested>,
            #[serde(default)]
            user_segment: String,
            #[serde(default)]
            user_id: String,
        }

        let helper = Helper::deserialize(deserializer)?;

        // The flat form wins over the legacy nested `user` object.
        if helper.user_id.is_empty() && helper.user_segment.is_empty() {
            let user = helper.user.unwrap_or_default();
            Ok(TraceUserContext {
                user_segment: user.segment,
                user_id: user.id,
            })
        } else {
            Ok(TraceUserContext {
                user_segment: helper.user_segment,
                user_id: helper.user_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let json = r#"
        {
            "trace_id": "00000000-0000-0000-0000-000000000000",
            "release": "1.1.1",
            "environment": "prod",
            "user_segment": "vip",
            "user_id": "user-42",
            "transaction": "/checkout",
            "replay_id": "1a2b3c"
        }
        "#;
        let dsc = serde_json::from_str::<DynamicSamplingContext>(json).unwrap();
        insta::assert_json_snapshot!(dsc, @r#"
        {
          "trace_id": "00000000-0000-0000-0000-000000000000",
          "release": "1.1.1",
          "environment": "prod",
          "transaction": "/checkout",
          "user_segment": "vip",
          "user_id": "user-42",
          "replay_id": "1a2b3c"
        }
        "#);
    }

    #[test]
    fn parse_nested_user() {
        let json = r#"
        {
            "trace_id": "00000000-0000-0000-0000-000000000000",
            "user": {
                "id": "some-id",
                "segment": "all"
            }
        }
        "#;
        let dsc = serde_json::from_str::<DynamicSamplingContext>(json).unwrap();
        assert_eq!(dsc.user.user_id, "some-id");
        assert_eq!(dsc.user.user_segment, "all");
    }

    #[test]
    fn flat_user_wins_over_nested() {
        let json = r#"
        {
            "trace_id": "00000000-0000-0000-0000-000000000000",
            "user_id": "flat",
            "user": {"id": "nested"}
        }
        "#;
        let dsc = serde_json::from_str::<DynamicSamplingContext>(json).unwrap();
        assert_eq!(dsc.user.user_id, "flat");
    }

    #[test]
    fn getter_paths() {
        let mut dsc = DynamicSamplingContext::new(Uuid::nil());
        dsc.release = Some("2.0.0".to_owned());
        dsc.environment = Some(String::new());
        dsc.user.user_id = "u1".to_owned();

        assert_eq!(dsc.get_value("trace.release"), Some(Val::String("2.0.0")));
        assert_eq!(dsc.get_value("trace.user.id"), Some(Val::String("u1")));
        assert_eq!(dsc.get_value("trace.environment"), None);
        assert_eq!(dsc.get_value("trace.user.segment"), None);
        assert_eq!(dsc.get_value("event.release"), None);
    }
}
