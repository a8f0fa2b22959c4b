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

use propscope_common::MonitorConfig;

use super::event::{MonitoringWarning, WarningKind};
use crate::analysis::AnalysisSnapshot;

/// Threshold check evaluated against every sampled snapshot
pub trait WarningRule: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, snapshot: &AnalysisSnapshot) -> Option<MonitoringWarning>;
}

/// The rule set a bus starts with
pub fn default_rules(config: &MonitorConfig) -> Vec<Box<dyn WarningRule>> {
    vec![
        Box::new(FrequentUpdateRule::new(config.max_frequent_updates)),
        Box::new(UnusedAttributeRule::new(config.max_unused_attributes)),
        Box::new(AttributeOverloadRule::new(config.max_attributes_per_component)),
    ]
}

pub struct FrequentUpdateRule {
    max_allowed: usize,
}

impl FrequentUpdateRule {
    pub fn new(max_allowed: usize) -> Self {
        Self { max_allowed }
    }
}

impl WarningRule for FrequentUpdateRule {
    fn name(&self) -> &str {
        "frequent_updates"
    }

    fn evaluate(&self, snapshot: &AnalysisSnapshot) -> Option<MonitoringWarning> {
        let count = snapshot.frequent_updates.len();
        if count <= self.max_allowed {
            return None;
        }

        Some(MonitoringWarning {
            kind: WarningKind::FrequentUpdates,
            rule: self.name().to_string(),
            message: format!("{} attribute(s) change on most renders", count),
            attributes: snapshot.frequent_updates.iter().map(|f| f.attribute.clone()).collect(),
            components: Vec::new(),
        })
    }
}

pub struct UnusedAttributeRule {
    max_allowed: usize,
}

impl UnusedAttributeRule {
    pub fn new(max_allowed: usize) -> Self {
        Self { max_allowed }
    }
}

impl WarningRule for UnusedAttributeRule {
    fn name(&self) -> &str {
        "unused_attributes"
    }

    fn evaluate(&self, snapshot: &AnalysisSnapshot) -> Option<MonitoringWarning> {
        let count = snapshot.unused_attributes.len();
        if count <= self.max_allowed {
            return None;
        }

        Some(MonitoringWarning {
            kind: WarningKind::UnusedAttributes,
            rule: self.name().to_string(),
            message: format!("{} declared attribute(s) never observed", count),
            attributes: snapshot.unused_attributes.clone(),
            components: Vec::new(),
        })
    }
}

pub struct AttributeOverloadRule {
    max_attributes: usize,
}

impl AttributeOverloadRule {
    pub fn new(max_attributes: usize) -> Self {
        Self { max_attributes }
    }
}

impl WarningRule for AttributeOverloadRule {
    fn name(&self) -> &str {
        "attribute_overload"
    }

    fn evaluate(&self, snapshot: &AnalysisSnapshot) -> Option<MonitoringWarning> {
        let overloaded: Vec<String> = snapshot.overloaded_components(self.max_attributes).into_iter().map(|c| c.name.clone()).collect();
        if overloaded.is_empty() {
            return None;
        }

        Some(MonitoringWarning {
            kind: WarningKind::AttributeOverload,
            rule: self.name().to_string(),
            message: format!("{} component(s) take more than {} attributes", overloaded.len(), self.max_attributes),
            attributes: Vec::new(),
            components: overloaded,
        })
    }
}
