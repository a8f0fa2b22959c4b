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

use propscope_common::{AttributeValue, TrackerConfig, ValueKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Identifies one attribute of one component type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AttributeRef {
    pub component: String,
    pub attribute: String,
}

impl AttributeRef {
    pub fn new(component: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.attribute)
    }
}

/// Optional metadata attached to an observation by the host hook
#[derive(Debug, Clone, Default)]
pub struct ObservationMeta {
    /// Attributes the component declares as required
    pub required: BTreeSet<String>,
    /// Declared kinds that take precedence over inference
    pub type_overrides: BTreeMap<String, ValueKind>,
}

impl ObservationMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, attribute: impl Into<String>) -> Self {
        self.required.insert(attribute.into());
        self
    }

    pub fn declare(mut self, attribute: impl Into<String>, kind: ValueKind) -> Self {
        self.type_overrides.insert(attribute.into(), kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.type_overrides.is_empty()
    }
}

/// A value an attribute held before it changed, with the time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub value: AttributeValue,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeRecord {
    pub name: String,
    /// Kind inferred from the most recent value
    pub kind: ValueKind,
    pub declared_kind: Option<ValueKind>,
    pub required: bool,
    pub observation_count: u64,
    pub change_count: u64,
    /// `None` only for attributes declared through metadata and never observed
    pub last_value: Option<AttributeValue>,
    pub last_changed_at: u64,
    pub history: VecDeque<HistoryEntry>,
    pub timestamps: VecDeque<u64>,
}

impl AttributeRecord {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ValueKind::Undefined,
            declared_kind: None,
            required: false,
            observation_count: 0,
            change_count: 0,
            last_value: None,
            last_changed_at: 0,
            history: VecDeque::new(),
            timestamps: VecDeque::new(),
        }
    }

    /// Declared kind if one was given, inferred kind otherwise
    pub fn effective_kind(&self) -> ValueKind {
        self.declared_kind.unwrap_or(self.kind)
    }

    pub fn change_rate(&self) -> f64 {
        self.change_count as f64 / self.observation_count.max(1) as f64
    }

    pub fn is_unused(&self) -> bool {
        self.observation_count == 0
    }

    /// Whether the attribute currently holds a defined value
    pub fn has_defined_value(&self) -> bool {
        self.last_value.as_ref().is_some_and(|v| !v.is_undefined())
    }

    /// Applies one observation. Returns true when the value changed.
    pub(crate) fn record_observation(&mut self, value: &AttributeValue, now: u64, config: &TrackerConfig) -> bool {
        self.observation_count += 1;
        self.kind = value.kind();

        let changed = match self.last_value.as_ref() {
            None => {
                // First sighting establishes the baseline
                self.last_value = Some(value.clone());
                self.last_changed_at = now;
                false
            }
            Some(previous) if previous == value => false,
            Some(_) => {
                self.change_count += 1;
                if let Some(previous) = self.last_value.replace(value.clone()) {
                    self.history.push_back(HistoryEntry {
                        value: previous,
                        timestamp: self.last_changed_at,
                    });
                    while self.history.len() > config.max_history {
                        self.history.pop_front();
                    }
                }
                self.last_changed_at = now;
                true
            }
        };

        self.timestamps.push_back(now);
        while self.timestamps.len() > config.max_timestamps {
            self.timestamps.pop_front();
        }

        changed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRecord {
    pub name: String,
    pub attributes: BTreeMap<String, AttributeRecord>,
    /// Number of observations (renders) reported for the component
    pub observation_count: u64,
    pub first_seen: u64,
    pub last_seen: u64,
}

impl ComponentRecord {
    pub(crate) fn new(name: &str, now: u64) -> Self {
        Self {
            name: name.to_string(),
            attributes: BTreeMap::new(),
            observation_count: 0,
            first_seen: now,
            last_seen: now,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeRecord> {
        self.attributes.get(name)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub(crate) fn attribute_mut(&mut self, name: &str) -> &mut AttributeRecord {
        self.attributes.entry(name.to_string()).or_insert_with(|| AttributeRecord::new(name))
    }
}
