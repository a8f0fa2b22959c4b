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

//! Pure derivations over a component table

use std::collections::{BTreeMap, BTreeSet};

use super::snapshot::{CoUpdateGroup, FrequentUpdate};
use crate::tracker::{AttributeRef, ComponentRecord};

/// Relative change-count difference, measured against `anchor`.
///
/// Not symmetric: `relative_difference(a, b)` and `relative_difference(b, a)`
/// differ whenever `a != b`. The denominator is floored at 1.
pub fn relative_difference(anchor: u64, other: u64) -> f64 {
    anchor.abs_diff(other) as f64 / anchor.max(1) as f64
}

pub fn unused_attributes(components: &BTreeMap<String, ComponentRecord>) -> Vec<AttributeRef> {
    components
        .values()
        .flat_map(|component| {
            component
                .attributes
                .values()
                .filter(|a| a.is_unused())
                .map(move |a| AttributeRef::new(component.name.as_str(), a.name.as_str()))
        })
        .collect()
}

pub fn frequent_updates(components: &BTreeMap<String, ComponentRecord>, ratio: f64) -> Vec<FrequentUpdate> {
    let mut frequent = Vec::new();

    for component in components.values() {
        for attribute in component.attributes.values() {
            let change_rate = attribute.change_rate();
            if change_rate > ratio {
                frequent.push(FrequentUpdate {
                    attribute: AttributeRef::new(component.name.as_str(), attribute.name.as_str()),
                    change_count: attribute.change_count,
                    observation_count: attribute.observation_count,
                    change_rate,
                });
            }
        }
    }

    frequent
}

/// Attributes eligible for co-update correlation with their change counts.
///
/// Attributes currently holding an undefined value are left out. Static
/// attributes stay in and correlate with each other at a change count of 0.
pub fn co_update_candidates(components: &BTreeMap<String, ComponentRecord>) -> Vec<(AttributeRef, u64)> {
    components
        .values()
        .flat_map(|component| {
            component
                .attributes
                .values()
                .filter(|a| a.has_defined_value())
                .map(move |a| (AttributeRef::new(component.name.as_str(), a.name.as_str()), a.change_count))
        })
        .collect()
}

/// Pairwise co-update grouping. O(n^2) in the number of candidates.
///
/// Each candidate anchors a group holding every other candidate within
/// `tolerance` of it. Groups with the same member set are reported once,
/// under the first anchor that produced them.
pub fn co_update_groups(candidates: &[(AttributeRef, u64)], tolerance: f64) -> Vec<CoUpdateGroup> {
    let mut groups = Vec::new();
    let mut seen: BTreeSet<Vec<usize>> = BTreeSet::new();

    for (i, (anchor, anchor_changes)) in candidates.iter().enumerate() {
        let mut indices = vec![i];
        for (j, (_, other_changes)) in candidates.iter().enumerate() {
            if i != j && relative_difference(*anchor_changes, *other_changes) < tolerance {
                indices.push(j);
            }
        }

        if indices.len() < 2 {
            continue;
        }

        let mut key = indices.clone();
        key.sort_unstable();
        if !seen.insert(key) {
            continue;
        }

        groups.push(CoUpdateGroup {
            anchor: anchor.clone(),
            change_count: *anchor_changes,
            members: indices.into_iter().map(|idx| candidates[idx].0.clone()).collect(),
        });
    }

    groups
}
