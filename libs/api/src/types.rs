//! Object types exchanged with the cluster state store.
//!
//! Field names follow the core/v1 JSON encoding (camelCase) so the same
//! structs serve the HTTP client and the in-memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// API version used for every object the scheduler writes.
pub const API_VERSION: &str = "v1";

/// Reason attached to outcome records for a completed placement.
pub const REASON_SCHEDULED: &str = "Scheduled";

/// Severity attached to outcome records for a completed placement.
pub const EVENT_TYPE_NORMAL: &str = "Normal";

// =============================================================================
// Metadata
// =============================================================================

/// Identity metadata common to all objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Server-side name generation prefix (used for outcome records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
}

/// Reference from one object to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub kind: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

// =============================================================================
// Unit
// =============================================================================

/// Placement-relevant part of a unit's spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSpec {
    /// Placement authority tag: the scheduler responsible for this unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_name: Option<String>,

    /// Host the unit is assigned to. Empty while unplaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

/// A work item requiring host placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: UnitSpec,
}

impl Unit {
    /// Build an unplaced unit owned by `scheduler_name`.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        uid: impl Into<String>,
        scheduler_name: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                uid: uid.into(),
                generate_name: None,
            },
            spec: UnitSpec {
                scheduler_name: Some(scheduler_name.into()),
                node_name: None,
            },
        }
    }

    /// Decode a unit from a watch event object, rejecting anonymous units.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ApiError> {
        let unit: Unit = serde_json::from_value(value).map_err(|e| ApiError::InvalidObject {
            kind: "unit",
            message: e.to_string(),
        })?;

        if unit.metadata.name.is_empty() {
            return Err(ApiError::MissingField {
                kind: "unit",
                field: "metadata.name",
            });
        }
        if unit.metadata.namespace.is_empty() {
            return Err(ApiError::MissingField {
                kind: "unit",
                field: "metadata.namespace",
            });
        }

        Ok(unit)
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    /// `namespace/name`, the identity used in logs and messages.
    pub fn key(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    /// Returns true if no host has been assigned yet.
    pub fn is_unplaced(&self) -> bool {
        self.spec.node_name.as_deref().is_none_or(str::is_empty)
    }

    /// Returns true if the placement authority tag names `scheduler_name`.
    pub fn is_owned_by(&self, scheduler_name: &str) -> bool {
        self.spec.scheduler_name.as_deref() == Some(scheduler_name)
    }

    /// Reference to this unit for bindings and outcome records.
    pub fn reference(&self) -> ObjectReference {
        ObjectReference {
            api_version: None,
            kind: "Pod".to_string(),
            name: self.metadata.name.clone(),
            namespace: Some(self.metadata.namespace.clone()),
            uid: (!self.metadata.uid.is_empty()).then(|| self.metadata.uid.clone()),
        }
    }
}

// =============================================================================
// Host
// =============================================================================

/// An execution target a unit can be placed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub metadata: ObjectMeta,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                ..ObjectMeta::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Host listing as returned by the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostList {
    #[serde(default)]
    pub items: Vec<Host>,
}

// =============================================================================
// Binding
// =============================================================================

/// Placement commit: assigns the unit named in `metadata` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub target: ObjectReference,
}

impl Binding {
    pub fn new(unit: &Unit, host: &Host) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "Binding".to_string(),
            metadata: ObjectMeta {
                name: unit.metadata.name.clone(),
                namespace: unit.metadata.namespace.clone(),
                ..ObjectMeta::default()
            },
            target: ObjectReference {
                api_version: Some(API_VERSION.to_string()),
                kind: "Node".to_string(),
                name: host.name().to_string(),
                namespace: None,
                uid: None,
            },
        }
    }

    pub fn unit_namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn unit_name(&self) -> &str {
        &self.metadata.name
    }

    pub fn host_name(&self) -> &str {
        &self.target.name
    }
}

// =============================================================================
// Outcome Record
// =============================================================================

/// Component that produced an outcome record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    #[serde(default)]
    pub component: String,
}

/// Observability record describing a placement outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub involved_object: ObjectReference,
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub count: i32,
    #[serde(with = "rfc3339_seconds")]
    pub first_timestamp: DateTime<Utc>,
    #[serde(with = "rfc3339_seconds")]
    pub last_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: EventSource,
}

impl OutcomeRecord {
    /// Record for a unit that was placed at `at`, reported by `component`.
    pub fn scheduled(
        unit: &Unit,
        component: &str,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "Event".to_string(),
            metadata: ObjectMeta {
                namespace: unit.metadata.namespace.clone(),
                generate_name: Some(format!("{}-", unit.metadata.name)),
                ..ObjectMeta::default()
            },
            involved_object: unit.reference(),
            reason: REASON_SCHEDULED.to_string(),
            message: message.into(),
            event_type: EVENT_TYPE_NORMAL.to_string(),
            count: 1,
            first_timestamp: at,
            last_timestamp: at,
            source: EventSource {
                component: component.to_string(),
            },
        }
    }

    /// Namespace the record is written into (the involved unit's namespace).
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }
}

/// Timestamps on the wire are RFC 3339 with whole seconds.
mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_unit_decodes_from_pod_json() {
        let unit = Unit::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-1",
                "namespace": "default",
                "uid": "u-1",
                "labels": {"a": "b"}
            },
            "spec": {"schedulerName": "random-scheduler", "containers": []},
            "status": {"phase": "Pending"}
        }))
        .unwrap();

        assert_eq!(unit.key(), "default/web-1");
        assert_eq!(unit.uid(), "u-1");
        assert!(unit.is_unplaced());
        assert!(unit.is_owned_by("random-scheduler"));
        assert!(!unit.is_owned_by("default-scheduler"));
    }

    #[test]
    fn test_unit_without_name_is_rejected() {
        let err = Unit::from_value(json!({"metadata": {"namespace": "default"}})).unwrap_err();
        assert_eq!(
            err,
            ApiError::MissingField {
                kind: "unit",
                field: "metadata.name"
            }
        );
    }

    #[test]
    fn test_unit_with_wrong_shape_is_rejected() {
        let err = Unit::from_value(json!({"metadata": "nope"})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidObject { kind: "unit", .. }));
    }

    #[test]
    fn test_empty_node_name_counts_as_unplaced() {
        let mut unit = Unit::new("default", "web-1", "u-1", "random-scheduler");
        unit.spec.node_name = Some(String::new());
        assert!(unit.is_unplaced());

        unit.spec.node_name = Some("h1".to_string());
        assert!(!unit.is_unplaced());
    }

    #[test]
    fn test_binding_wire_shape() {
        let unit = Unit::new("default", "web-1", "u-1", "random-scheduler");
        let binding = Binding::new(&unit, &Host::new("h2"));

        assert_eq!(
            serde_json::to_value(&binding).unwrap(),
            json!({
                "apiVersion": "v1",
                "kind": "Binding",
                "metadata": {"name": "web-1", "namespace": "default"},
                "target": {"apiVersion": "v1", "kind": "Node", "name": "h2"}
            })
        );
        assert_eq!(binding.host_name(), "h2");
    }

    #[test]
    fn test_outcome_record_wire_shape() {
        let unit = Unit::new("default", "web-1", "u-1", "random-scheduler");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let record = OutcomeRecord::scheduled(&unit, "random-scheduler", "Placed unit", at);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "Event");
        assert_eq!(value["metadata"]["generateName"], "web-1-");
        assert_eq!(value["metadata"]["namespace"], "default");
        assert_eq!(value["involvedObject"]["kind"], "Pod");
        assert_eq!(value["involvedObject"]["uid"], "u-1");
        assert_eq!(value["reason"], "Scheduled");
        assert_eq!(value["type"], "Normal");
        assert_eq!(value["count"], 1);
        assert_eq!(value["firstTimestamp"], "2024-05-01T12:30:00Z");
        assert_eq!(value["source"]["component"], "random-scheduler");

        let back: OutcomeRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.last_timestamp, at);
    }

    #[test]
    fn test_host_list_tolerates_missing_items() {
        let list: HostList = serde_json::from_value(json!({"kind": "NodeList"})).unwrap();
        assert!(list.items.is_empty());
    }
}
