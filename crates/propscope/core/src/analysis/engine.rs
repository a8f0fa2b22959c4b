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

use metrics::{counter, gauge};
use parking_lot::Mutex;
use propscope_common::{AnalysisConfig, AttributeMap, PropscopeConfig};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::patterns;
use super::snapshot::{AnalysisSnapshot, SnapshotSummary};
use crate::tracker::{AttributeRef, ObservationMeta, UsageTracker};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Co-update analysis budget exceeded: {tracked} eligible attributes, limit is {limit}")]
    CorrelationBudgetExceeded { tracked: usize, limit: usize },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug)]
struct EngineState {
    tracker: UsageTracker,
    cached: Option<Arc<AnalysisSnapshot>>,
    last_analysis_at: Option<u64>,
    last_observe_at: Option<u64>,
    /// Attributes touched since the last recomputation
    pending: HashSet<AttributeRef>,
}

/// Derives [`AnalysisSnapshot`]s from a [`UsageTracker`].
///
/// One mutex guards the tracker, the memoized snapshot and the pending batch,
/// so observations and analysis passes never interleave. Observations are
/// applied immediately; only recomputation of the snapshot is throttled.
#[derive(Debug)]
pub struct AnalysisEngine {
    config: AnalysisConfig,
    state: Mutex<EngineState>,
}

impl AnalysisEngine {
    pub fn new(tracker: UsageTracker, config: AnalysisConfig) -> Self {
        Self {
            config,
            state: Mutex::new(EngineState {
                tracker,
                cached: None,
                last_analysis_at: None,
                last_observe_at: None,
                pending: HashSet::new(),
            }),
        }
    }

    pub fn from_config(config: &PropscopeConfig) -> Self {
        Self::new(UsageTracker::new(config.tracker.clone()), config.analysis.clone())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn observe(&self, component: &str, attributes: &AttributeMap) {
        self.observe_with(component, attributes, &ObservationMeta::default());
    }

    pub fn observe_with(&self, component: &str, attributes: &AttributeMap, meta: &ObservationMeta) {
        let mut state = self.state.lock();
        let touched = state.tracker.observe_with(component, attributes, meta);
        let now = state.tracker.now_millis();
        state.last_observe_at = Some(now);
        state.pending.extend(touched);
        counter!("propscope.observations", 1);
    }

    /// Returns the current snapshot, recomputing it unless the memoized one is
    /// younger than the cache window and no observation landed within the
    /// quiet window.
    ///
    /// A reused snapshot can lag behind observations that arrived after it was
    /// computed, for at most one cache window. `pending_len` counts the
    /// attributes it does not reflect yet; `invalidate` forces a recompute.
    pub fn analyze(&self) -> AnalysisResult<Arc<AnalysisSnapshot>> {
        let mut state = self.state.lock();
        let now = state.tracker.now_millis();

        if let Some(cached) = self.reusable(&state, now) {
            counter!("propscope.analysis.cache_hits", 1);
            debug!("Serving cached analysis computed at {}", cached.computed_at);
            return Ok(cached);
        }

        let snapshot = Arc::new(self.compute(&state.tracker, now)?);
        state.cached = Some(Arc::clone(&snapshot));
        state.last_analysis_at = Some(now);

        let flushed = state.pending.len();
        state.pending.clear();

        counter!("propscope.analysis.recomputed", 1);
        gauge!("propscope.tracked_attributes", snapshot.summary.attributes as f64);
        debug!(
            "Recomputed analysis: {} components, {} attributes, {} pending touches flushed",
            snapshot.summary.components, snapshot.summary.attributes, flushed
        );

        Ok(snapshot)
    }

    fn reusable(&self, state: &EngineState, now: u64) -> Option<Arc<AnalysisSnapshot>> {
        let cached = state.cached.as_ref()?;
        let analyzed_at = state.last_analysis_at?;

        let fresh = now.saturating_sub(analyzed_at) < self.config.cache_window_ms;
        let quiet = state.last_observe_at.is_none_or(|at| now.saturating_sub(at) > self.config.quiet_window_ms);

        (fresh && quiet).then(|| Arc::clone(cached))
    }

    fn compute(&self, tracker: &UsageTracker, now: u64) -> AnalysisResult<AnalysisSnapshot> {
        let components = tracker.snapshot_table();

        let candidates = patterns::co_update_candidates(&components);
        if candidates.len() > self.config.max_correlated_attributes {
            return Err(AnalysisError::CorrelationBudgetExceeded {
                tracked: candidates.len(),
                limit: self.config.max_correlated_attributes,
            });
        }

        Ok(AnalysisSnapshot {
            computed_at: now,
            unused_attributes: patterns::unused_attributes(&components),
            frequent_updates: patterns::frequent_updates(&components, self.config.frequent_update_ratio),
            co_update_groups: patterns::co_update_groups(&candidates, self.config.co_update_tolerance),
            summary: SnapshotSummary::from_table(&components),
            components,
        })
    }

    /// Drops the memoized snapshot so the next `analyze` recomputes
    pub fn invalidate(&self) {
        self.state.lock().cached = None;
    }

    /// Clears all records, the memoized snapshot and the pending batch at once
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tracker.reset();
        state.cached = None;
        state.last_analysis_at = None;
        state.last_observe_at = None;
        state.pending.clear();
        info!("Usage statistics reset");
    }

    pub fn cached_snapshot(&self) -> Option<Arc<AnalysisSnapshot>> {
        self.state.lock().cached.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn last_analysis_at(&self) -> Option<u64> {
        self.state.lock().last_analysis_at
    }

    pub fn observation_count_for(&self, component: &str) -> u64 {
        self.state.lock().tracker.observation_count_for(component)
    }

    pub(crate) fn now_millis(&self) -> u64 {
        self.state.lock().tracker.now_millis()
    }

    /// Runs `f` against the tracker while holding the engine lock
    pub fn with_tracker<R>(&self, f: impl FnOnce(&UsageTracker) -> R) -> R {
        f(&self.state.lock().tracker)
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::from_config(&PropscopeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propscope_common::{AttributeValue, ManualClock, TrackerConfig};

    fn engine_with_clock() -> (AnalysisEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let tracker = UsageTracker::with_clock(TrackerConfig::default(), clock.clone());
        (AnalysisEngine::new(tracker, AnalysisConfig::default()), clock)
    }

    fn props(name: &str, value: impl Into<AttributeValue>) -> AttributeMap {
        AttributeMap::from([(name.to_string(), value.into())])
    }

    #[test]
    fn test_counter_scenario() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Counter", &props("value", 0));
        for i in 1..=9 {
            clock.advance(5);
            engine.observe("Counter", &props("value", i));
        }

        let snapshot = engine.analyze().unwrap();
        let value = AttributeRef::new("Counter", "value");
        let record = snapshot.attribute(&value).unwrap();

        assert_eq!(record.observation_count, 10);
        assert_eq!(record.change_count, 9);
        assert!(!snapshot.is_unused(&value));
        assert!(snapshot.is_frequent(&value));
        assert_eq!(snapshot.summary.observations, 10);
        assert_eq!(snapshot.summary.changes, 9);
    }

    #[test]
    fn test_cached_snapshot_reused_when_quiet() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Panel", &props("open", true));
        clock.advance(20);

        let first = engine.analyze().unwrap();
        clock.advance(100);
        let second = engine.analyze().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_cache_expires_after_window() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Panel", &props("open", true));
        clock.advance(20);

        let first = engine.analyze().unwrap();
        clock.advance(1_000);
        let second = engine.analyze().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.computed_at, first.computed_at + 1_000);
    }

    #[test]
    fn test_burst_forces_recompute() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Feed", &props("count", 1));
        clock.advance(20);
        let before = engine.analyze().unwrap();

        clock.advance(5);
        for i in 2..6 {
            engine.observe("Feed", &props("count", i));
        }
        clock.advance(3);

        let after = engine.analyze().unwrap();
        assert!(after.computed_at > before.computed_at);
        let count = after.attribute(&AttributeRef::new("Feed", "count")).unwrap();
        assert_eq!(count.observation_count, 5);
        assert_eq!(engine.pending_len(), 0);
    }

    #[test]
    fn test_pending_batch_tracks_touched_attributes() {
        let (engine, _clock) = engine_with_clock();
        engine.observe("Nav", &props("active", "home"));
        engine.observe("Nav", &props("active", "about"));
        engine.observe("Footer", &props("year", 2025));
        assert_eq!(engine.pending_len(), 2);

        engine.analyze().unwrap();
        assert_eq!(engine.pending_len(), 0);
    }

    #[test]
    fn test_declared_attribute_is_unused() {
        let (engine, _clock) = engine_with_clock();
        let meta = ObservationMeta::new().require("size");
        engine.observe_with("Widget", &props("theme", "dark"), &meta);

        let snapshot = engine.analyze().unwrap();
        assert_eq!(snapshot.unused_attributes, vec![AttributeRef::new("Widget", "size")]);
        assert!(!snapshot.is_unused(&AttributeRef::new("Widget", "theme")));
    }

    #[test]
    fn test_co_update_groups_skip_undefined_values() {
        let (engine, clock) = engine_with_clock();
        for i in 0..11 {
            clock.advance(1);
            let mut attrs = AttributeMap::new();
            attrs.insert("x".to_string(), AttributeValue::from(i));
            attrs.insert("y".to_string(), AttributeValue::from(i * 2));
            attrs.insert("label".to_string(), AttributeValue::from("static"));
            attrs.insert("ghost".to_string(), AttributeValue::Undefined);
            engine.observe("Chart", &attrs);
        }

        let snapshot = engine.analyze().unwrap();
        let ghost = AttributeRef::new("Chart", "ghost");
        assert!(snapshot.groups_containing(&ghost).next().is_none());

        // `label` never changed and has nothing at 0 changes to pair with
        assert_eq!(snapshot.co_update_groups.len(), 1);
        let group = &snapshot.co_update_groups[0];
        assert_eq!(group.change_count, 10);
        assert_eq!(group.members.len(), 2);
        assert!(group.contains(&AttributeRef::new("Chart", "x")));
        assert!(group.contains(&AttributeRef::new("Chart", "y")));
    }

    #[test]
    fn test_static_attributes_form_one_group() {
        let (engine, clock) = engine_with_clock();
        let attrs = AttributeMap::from([
            ("a".to_string(), AttributeValue::from("x")),
            ("b".to_string(), AttributeValue::from("y")),
        ]);
        for _ in 0..5 {
            engine.observe("Static", &attrs);
        }
        clock.advance(20);

        let snapshot = engine.analyze().unwrap();
        assert_eq!(snapshot.co_update_groups.len(), 1);
        let group = &snapshot.co_update_groups[0];
        assert_eq!(group.change_count, 0);
        assert_eq!(group.anchor, AttributeRef::new("Static", "a"));
        assert_eq!(group.members, vec![AttributeRef::new("Static", "a"), AttributeRef::new("Static", "b")]);
    }

    #[test]
    fn test_correlation_budget_leaves_cache_untouched() {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = UsageTracker::with_clock(TrackerConfig::default(), clock.clone());
        let config = AnalysisConfig {
            max_correlated_attributes: 1,
            ..AnalysisConfig::default()
        };
        let engine = AnalysisEngine::new(tracker, config);

        for i in 0..3 {
            let mut attrs = AttributeMap::new();
            attrs.insert("a".to_string(), AttributeValue::from(i));
            attrs.insert("b".to_string(), AttributeValue::from(i));
            engine.observe("Too", &attrs);
        }

        assert_eq!(
            engine.analyze().unwrap_err(),
            AnalysisError::CorrelationBudgetExceeded { tracked: 2, limit: 1 }
        );
        assert!(engine.cached_snapshot().is_none());
        assert_eq!(engine.pending_len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached_from_engine() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Menu", &props("items", AttributeValue::array(["a"])));
        clock.advance(20);

        let snapshot = engine.analyze().unwrap();
        let mut copy = (*snapshot).clone();
        copy.components.clear();

        clock.advance(1);
        let again = engine.analyze().unwrap();
        assert_eq!(again.summary.components, 1);
        assert!(again.component("Menu").is_some());
    }

    #[test]
    fn test_reset_is_total() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Menu", &props("open", false));
        clock.advance(20);
        engine.analyze().unwrap();

        engine.reset();
        assert!(engine.cached_snapshot().is_none());
        assert!(engine.last_analysis_at().is_none());
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.observation_count_for("Menu"), 0);

        let snapshot = engine.analyze().unwrap();
        assert!(snapshot.components.is_empty());
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let (engine, clock) = engine_with_clock();
        engine.observe("Tabs", &props("index", 0));
        clock.advance(20);

        let first = engine.analyze().unwrap();
        engine.invalidate();
        let second = engine.analyze().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }
}
