//! Error taxonomy for the scheduling loop.
//!
//! Only [`StreamError`] is fatal. Everything wrapped by [`ScheduleError`] is
//! contained to a single unit and logged by the loop.

use rsched_api::ApiError;
use thiserror::Error;

/// Failures reported by a cluster state client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The store rejected the write because the object is already in the
    /// requested state (e.g. the unit is already bound).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store answered with a non-success status.
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The store could not be reached or the request timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The store's answer could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<ApiError> for ClusterError {
    fn from(err: ApiError) -> Self {
        ClusterError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for ClusterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClusterError::Decode(err.to_string())
        } else {
            ClusterError::Transport(err.to_string())
        }
    }
}

/// Host selection failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no hosts available")]
    NoHostsAvailable,

    #[error("failed to list hosts: {0}")]
    ListHosts(ClusterError),
}

/// The placement commit failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The unit was already bound. Expected under redelivery.
    #[error("unit {unit} is already bound: {message}")]
    Conflict { unit: String, message: String },

    /// The store could not be reached or refused the request.
    #[error("failed to bind unit {unit}: {source}")]
    Transport {
        unit: String,
        #[source]
        source: ClusterError,
    },
}

/// The outcome record could not be written. The placement itself stands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to record outcome for unit {unit}: {source}")]
pub struct NotifyError {
    pub unit: String,
    #[source]
    pub source: ClusterError,
}

/// The event subscription could not be opened or was lost.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("failed to open watch: {0}")]
    Subscribe(ClusterError),

    #[error("watch stream failed: {0}")]
    Lost(ClusterError),

    #[error("watch stream closed")]
    Closed,
}

/// Stage of the per-unit sequence at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Select,
    Bind,
    Notify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Select => write!(f, "select"),
            Stage::Bind => write!(f, "bind"),
            Stage::Notify => write!(f, "notify"),
        }
    }
}

/// A per-unit failure, contained at the loop boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl ScheduleError {
    pub fn stage(&self) -> Stage {
        match self {
            ScheduleError::Selection(_) => Stage::Select,
            ScheduleError::Bind(_) => Stage::Bind,
            ScheduleError::Notify(_) => Stage::Notify,
        }
    }

    /// Returns true if the unit was already bound by someone else.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ScheduleError::Bind(BindError::Conflict { .. }))
    }

    /// Returns true if the placement was committed despite this error.
    pub fn is_placed(&self) -> bool {
        matches!(self, ScheduleError::Notify(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_classification() {
        let select: ScheduleError = SelectionError::NoHostsAvailable.into();
        assert_eq!(select.stage(), Stage::Select);
        assert!(!select.is_conflict());

        let conflict: ScheduleError = BindError::Conflict {
            unit: "default/web-1".to_string(),
            message: "already assigned".to_string(),
        }
        .into();
        assert_eq!(conflict.stage(), Stage::Bind);
        assert!(conflict.is_conflict());
        assert!(!conflict.is_placed());

        let notify: ScheduleError = NotifyError {
            unit: "default/web-1".to_string(),
            source: ClusterError::Transport("refused".to_string()),
        }
        .into();
        assert_eq!(notify.stage(), Stage::Notify);
        assert!(notify.is_placed());
    }

    #[test]
    fn test_transport_bind_is_not_a_conflict() {
        let err: ScheduleError = BindError::Transport {
            unit: "default/web-1".to_string(),
            source: ClusterError::Status {
                status: 403,
                body: "forbidden".to_string(),
            },
        }
        .into();
        assert!(!err.is_conflict());
        assert_eq!(
            err.to_string(),
            "failed to bind unit default/web-1: store returned status 403: forbidden"
        );
    }

    #[test]
    fn test_api_error_maps_to_decode() {
        let err: ClusterError = ApiError::InvalidWatchEvent("eof".to_string()).into();
        assert!(matches!(err, ClusterError::Decode(_)));
    }
}
