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

use propscope_common::{AttributeMap, Clock, SystemClock, TrackerConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

use super::record::{AttributeRef, ComponentRecord, ObservationMeta};

/// Per-component, per-attribute usage statistics
#[derive(Debug)]
pub struct UsageTracker {
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    components: BTreeMap<String, ComponentRecord>,
}

impl UsageTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            components: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Records one observation of `component` with the given attribute set
    pub fn observe(&mut self, component: &str, attributes: &AttributeMap) -> Vec<AttributeRef> {
        self.observe_with(component, attributes, &ObservationMeta::default())
    }

    /// Records one observation along with required flags and type overrides.
    ///
    /// Every attribute in `attributes` has its observation count bumped and is
    /// deep compared against its stored value. Attributes named only in `meta`
    /// are registered without an observation. Returns every attribute touched.
    pub fn observe_with(&mut self, component: &str, attributes: &AttributeMap, meta: &ObservationMeta) -> Vec<AttributeRef> {
        let now = self.clock.now_millis();
        let config = &self.config;

        let record = self.components.entry(component.to_string()).or_insert_with(|| {
            trace!("Tracking new component {}", component);
            ComponentRecord::new(component, now)
        });
        record.observation_count += 1;
        record.last_seen = now;

        let mut touched = Vec::with_capacity(attributes.len());

        for (name, value) in attributes {
            let attribute = record.attribute_mut(name);
            if attribute.record_observation(value, now, config) {
                trace!("{}.{} changed ({} changes)", component, name, attribute.change_count);
            }
            touched.push(AttributeRef::new(component, name.as_str()));
        }

        for name in &meta.required {
            record.attribute_mut(name).required = true;
            if !attributes.contains_key(name) {
                touched.push(AttributeRef::new(component, name.as_str()));
            }
        }

        for (name, kind) in &meta.type_overrides {
            record.attribute_mut(name).declared_kind = Some(*kind);
            if !attributes.contains_key(name) && !meta.required.contains(name) {
                touched.push(AttributeRef::new(component, name.as_str()));
            }
        }

        touched
    }

    pub fn record(&self, component: &str) -> Option<&ComponentRecord> {
        self.components.get(component)
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.components.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Total number of tracked attributes across all components
    pub fn attribute_count(&self) -> usize {
        self.components.values().map(ComponentRecord::attribute_count).sum()
    }

    pub fn observation_count_for(&self, component: &str) -> u64 {
        self.components.get(component).map(|c| c.observation_count).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.components.clear();
    }

    pub(crate) fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    pub(crate) fn snapshot_table(&self) -> BTreeMap<String, ComponentRecord> {
        self.components.clone()
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propscope_common::{AttributeValue, FunctionRef, ManualClock, ValueKind};

    fn attrs<const N: usize>(entries: [(&str, AttributeValue); N]) -> AttributeMap {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_counter_scenario() {
        let mut tracker = UsageTracker::default();
        tracker.observe("Counter", &attrs([("value", AttributeValue::from(0))]));
        for i in 1..=9 {
            tracker.observe("Counter", &attrs([("value", AttributeValue::from(i))]));
        }

        let record = tracker.record("Counter").unwrap();
        let value = record.attribute("value").unwrap();
        assert_eq!(value.observation_count, 10);
        assert_eq!(value.change_count, 9);
        assert_eq!(value.history.len(), 9);
        assert_eq!(tracker.observation_count_for("Counter"), 10);
    }

    #[test]
    fn test_repeated_value_is_not_a_change() {
        let mut tracker = UsageTracker::default();
        let props = attrs([("style", AttributeValue::object([("color", "red")]))]);
        tracker.observe("Button", &props);
        tracker.observe("Button", &props.clone());

        let style = tracker.record("Button").unwrap().attribute("style").unwrap();
        assert_eq!(style.observation_count, 2);
        assert_eq!(style.change_count, 0);
        assert_eq!(style.timestamps.len(), 2);
    }

    #[test]
    fn test_stored_value_does_not_follow_caller_mutation() {
        let mut tracker = UsageTracker::default();
        let mut props = attrs([("items", AttributeValue::array(["a", "b"]))]);
        tracker.observe("List", &props);

        if let Some(AttributeValue::Array(items)) = props.get_mut("items") {
            items.push(AttributeValue::from("c"));
        }

        let stored = tracker.record("List").unwrap().attribute("items").unwrap();
        assert_eq!(stored.last_value, Some(AttributeValue::array(["a", "b"])));
    }

    #[test]
    fn test_function_values_compare_by_reference() {
        let mut tracker = UsageTracker::default();
        let stable = FunctionRef::new("onClick");

        tracker.observe("Button", &attrs([("onClick", AttributeValue::from(stable.clone()))]));
        tracker.observe("Button", &attrs([("onClick", AttributeValue::from(stable))]));
        tracker.observe("Button", &attrs([("onClick", AttributeValue::from(FunctionRef::new("onClick")))]));

        let handler = tracker.record("Button").unwrap().attribute("onClick").unwrap();
        assert_eq!(handler.kind, ValueKind::Function);
        assert_eq!(handler.observation_count, 3);
        assert_eq!(handler.change_count, 1);
    }

    #[test]
    fn test_metadata_declares_unobserved_attributes() {
        let mut tracker = UsageTracker::default();
        let meta = ObservationMeta::new().require("theme").require("size").declare("size", ValueKind::Number);

        let touched = tracker.observe_with("Widget", &attrs([("theme", AttributeValue::from("dark"))]), &meta);
        assert_eq!(touched, vec![AttributeRef::new("Widget", "theme"), AttributeRef::new("Widget", "size")]);

        let widget = tracker.record("Widget").unwrap();
        let theme = widget.attribute("theme").unwrap();
        assert!(theme.required);
        assert_eq!(theme.observation_count, 1);

        let size = widget.attribute("size").unwrap();
        assert!(size.required);
        assert!(size.is_unused());
        assert_eq!(size.effective_kind(), ValueKind::Number);
        assert_eq!(size.last_value, None);
    }

    #[test]
    fn test_undefined_values_are_recorded() {
        let mut tracker = UsageTracker::default();
        tracker.observe("Card", &attrs([("title", AttributeValue::Undefined)]));

        let title = tracker.record("Card").unwrap().attribute("title").unwrap();
        assert_eq!(title.kind, ValueKind::Undefined);
        assert_eq!(title.observation_count, 1);
        assert!(!title.has_defined_value());
    }

    #[test]
    fn test_timestamps_follow_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut tracker = UsageTracker::with_clock(TrackerConfig::default(), clock.clone());

        tracker.observe("Clock", &attrs([("tick", AttributeValue::from(1))]));
        clock.advance(40);
        tracker.observe("Clock", &attrs([("tick", AttributeValue::from(2))]));

        let record = tracker.record("Clock").unwrap();
        assert_eq!(record.first_seen, 1_000);
        assert_eq!(record.last_seen, 1_040);
        let tick = record.attribute("tick").unwrap();
        assert_eq!(tick.timestamps, vec![1_000, 1_040]);
        assert_eq!(tick.history[0].timestamp, 1_000);
        assert_eq!(tick.last_changed_at, 1_040);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut tracker = UsageTracker::default();
        tracker.observe("A", &attrs([("x", AttributeValue::from(1))]));
        tracker.observe("B", &attrs([("y", AttributeValue::from(2))]));
        assert_eq!(tracker.attribute_count(), 2);

        tracker.reset();
        assert_eq!(tracker.component_count(), 0);
        assert!(tracker.record("A").is_none());
        assert_eq!(tracker.observation_count_for("A"), 0);
    }
}
