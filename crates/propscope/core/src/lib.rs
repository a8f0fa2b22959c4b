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

//! Propscope core
//!
//! Online prop usage statistics for a live component tree:
//!
//! - [`tracker`] ingests attribute observations and keeps per-attribute counts
//! - [`analysis`] derives memoized snapshots (unused, frequent, co-updating attributes)
//! - [`monitoring`] samples the engine periodically and streams events to subscribers
//!
//! ```rust
//! use std::sync::Arc;
//! use propscope_common::{AttributeMap, AttributeValue, PropscopeConfig};
//! use propscope_core::analysis::AnalysisEngine;
//! use propscope_core::monitoring::MonitoringBus;
//!
//! let config = PropscopeConfig::default();
//! let engine = Arc::new(AnalysisEngine::from_config(&config));
//! let bus = MonitoringBus::new(Arc::clone(&engine), config.monitor.clone());
//!
//! bus.subscribe(|event| {
//!     if let Some(snapshot) = event.snapshot() {
//!         println!("{} components tracked", snapshot.summary.components);
//!     }
//!     Ok(())
//! });
//!
//! let mut props = AttributeMap::new();
//! props.insert("count".to_string(), AttributeValue::from(1));
//! engine.observe("Counter", &props);
//!
//! assert_eq!(bus.sample_now(), 1);
//! ```

pub mod analysis;
pub mod monitoring;
pub mod tracker;

pub use analysis::{AnalysisEngine, AnalysisError, AnalysisSnapshot};
pub use monitoring::{MonitoringBus, MonitoringEvent};
pub use tracker::{AttributeRef, UsageTracker};
