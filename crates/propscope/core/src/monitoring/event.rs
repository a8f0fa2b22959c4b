// Propscope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;

use crate::analysis::{AnalysisError, AnalysisSnapshot};
use crate::tracker::AttributeRef;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Analysis panicked: {0}")]
    AnalysisPanicked(String),
    #[error("No tokio runtime available to drive the sampler")]
    RuntimeUnavailable,
    #[error("Sampling interval must be greater than zero")]
    InvalidInterval,
}

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FrequentUpdates,
    UnusedAttributes,
    AttributeOverload,
}

/// Warning synthesized from a snapshot by a [`WarningRule`](super::rules::WarningRule)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringWarning {
    pub kind: WarningKind,
    pub rule: String,
    pub message: String,
    /// Offending attributes, if the rule is attribute-scoped
    pub attributes: Vec<AttributeRef>,
    /// Offending components, if the rule is component-scoped
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MonitoringEvent {
    Update {
        timestamp: u64,
        snapshot: Arc<AnalysisSnapshot>,
    },
    Warning {
        timestamp: u64,
        warning: MonitoringWarning,
    },
    Error {
        timestamp: u64,
        #[serde(serialize_with = "serialize_display")]
        error: MonitorError,
    },
}

impl MonitoringEvent {
    pub fn timestamp(&self) -> u64 {
        match self {
            MonitoringEvent::Update { timestamp, .. } | MonitoringEvent::Warning { timestamp, .. } | MonitoringEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<AnalysisSnapshot>> {
        match self {
            MonitoringEvent::Update { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&MonitoringWarning> {
        match self {
            MonitoringEvent::Warning { warning, .. } => Some(warning),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MonitorError> {
        match self {
            MonitoringEvent::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, MonitoringEvent::Update { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, MonitoringEvent::Warning { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MonitoringEvent::Error { .. })
    }
}

fn serialize_display<S: Serializer>(error: &MonitorError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_event_serializes_message() {
        let event = MonitoringEvent::Error {
            timestamp: 42,
            error: MonitorError::AnalysisPanicked("boom".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "error", "timestamp": 42, "error": "Analysis panicked: boom"})
        );
        assert!(event.is_error());
        assert_eq!(event.timestamp(), 42);
    }

    #[test]
    fn test_warning_event_accessors() {
        let event = MonitoringEvent::Warning {
            timestamp: 7,
            warning: MonitoringWarning {
                kind: WarningKind::UnusedAttributes,
                rule: "unused_attributes".to_string(),
                message: "1 unused attribute".to_string(),
                attributes: vec![AttributeRef::new("Widget", "size")],
                components: Vec::new(),
            },
        };
        assert!(event.is_warning());
        assert!(event.snapshot().is_none());
        assert_eq!(event.warning().map(|w| w.kind), Some(WarningKind::UnusedAttributes));

        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["warning"]["kind"], json!("unused_attributes"));
        assert_eq!(encoded["warning"]["attributes"][0]["attribute"], json!("size"));
    }
}
