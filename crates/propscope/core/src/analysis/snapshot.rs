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

use serde::Serialize;
use std::collections::BTreeMap;

use crate::tracker::{AttributeRecord, AttributeRef, ComponentRecord};

/// An attribute whose value changes on more than the configured share of observations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentUpdate {
    pub attribute: AttributeRef,
    pub change_count: u64,
    pub observation_count: u64,
    pub change_rate: f64,
}

/// Attributes whose change counts are close to the anchor's.
///
/// `members` always starts with the anchor. Groups may overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoUpdateGroup {
    pub anchor: AttributeRef,
    pub change_count: u64,
    pub members: Vec<AttributeRef>,
}

impl CoUpdateGroup {
    pub fn contains(&self, attribute: &AttributeRef) -> bool {
        self.members.contains(attribute)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub components: usize,
    pub attributes: usize,
    pub observations: u64,
    pub changes: u64,
}

impl SnapshotSummary {
    pub(crate) fn from_table(components: &BTreeMap<String, ComponentRecord>) -> Self {
        let mut summary = SnapshotSummary {
            components: components.len(),
            ..Default::default()
        };
        for component in components.values() {
            summary.observations += component.observation_count;
            summary.attributes += component.attribute_count();
            summary.changes += component.attributes.values().map(|a| a.change_count).sum::<u64>();
        }
        summary
    }
}

/// Result of one analysis pass. Shared behind an `Arc` and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub computed_at: u64,
    pub components: BTreeMap<String, ComponentRecord>,
    pub unused_attributes: Vec<AttributeRef>,
    pub frequent_updates: Vec<FrequentUpdate>,
    pub co_update_groups: Vec<CoUpdateGroup>,
    pub summary: SnapshotSummary,
}

impl AnalysisSnapshot {
    pub fn component(&self, name: &str) -> Option<&ComponentRecord> {
        self.components.get(name)
    }

    pub fn attribute(&self, attribute: &AttributeRef) -> Option<&AttributeRecord> {
        self.components.get(&attribute.component)?.attribute(&attribute.attribute)
    }

    pub fn is_unused(&self, attribute: &AttributeRef) -> bool {
        self.unused_attributes.contains(attribute)
    }

    pub fn is_frequent(&self, attribute: &AttributeRef) -> bool {
        self.frequent_updates.iter().any(|f| &f.attribute == attribute)
    }

    /// Groups that contain `attribute`, anchored or not
    pub fn groups_containing<'a>(&'a self, attribute: &'a AttributeRef) -> impl Iterator<Item = &'a CoUpdateGroup> + 'a {
        self.co_update_groups.iter().filter(move |g| g.contains(attribute))
    }

    /// Components carrying more than `max_attributes` attributes
    pub fn overloaded_components(&self, max_attributes: usize) -> Vec<&ComponentRecord> {
        self.components.values().filter(|c| c.attribute_count() > max_attributes).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
