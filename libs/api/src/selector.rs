//! Server-side field selectors for watches.

use crate::types::Unit;

/// Field path carrying the placement authority tag.
pub const SCHEDULER_NAME_FIELD: &str = "spec.schedulerName";

/// Field path carrying the assigned host.
pub const NODE_NAME_FIELD: &str = "spec.nodeName";

/// A conjunction of `field=value` requirements evaluated by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    requirements: Vec<(String, String)>,
}

impl FieldSelector {
    /// Unplaced units whose authority tag names `scheduler_name`.
    pub fn unplaced_for(scheduler_name: &str) -> Self {
        Self {
            requirements: vec![
                (SCHEDULER_NAME_FIELD.to_string(), scheduler_name.to_string()),
                (NODE_NAME_FIELD.to_string(), String::new()),
            ],
        }
    }

    /// Evaluate the selector locally against a unit.
    ///
    /// Unknown field paths never match.
    pub fn matches(&self, unit: &Unit) -> bool {
        self.requirements.iter().all(|(field, value)| match field.as_str() {
            SCHEDULER_NAME_FIELD => unit.spec.scheduler_name.as_deref().unwrap_or("") == value,
            NODE_NAME_FIELD => unit.spec.node_name.as_deref().unwrap_or("") == value,
            _ => false,
        })
    }
}

impl std::fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (field, value)) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}
