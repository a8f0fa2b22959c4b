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

//! Usage tracking
//!
//! The tracker ingests "component C observed attribute set A" events and keeps
//! one [`ComponentRecord`] per component type with an [`AttributeRecord`] per
//! attribute. Records are created lazily and live until `reset`.
//!
//! # Usage
//!
//! ```rust
//! use propscope_common::{AttributeMap, AttributeValue};
//! use propscope_core::tracker::UsageTracker;
//!
//! let mut tracker = UsageTracker::default();
//! let mut props = AttributeMap::new();
//! props.insert("label".to_string(), AttributeValue::from("Save"));
//!
//! tracker.observe("Button", &props);
//! tracker.observe("Button", &props);
//!
//! let label = tracker.record("Button").unwrap().attribute("label").unwrap();
//! assert_eq!(label.observation_count, 2);
//! assert_eq!(label.change_count, 0);
//! ```

pub mod record;
#[allow(clippy::module_inception)]
pub mod tracker;

pub use record::{AttributeRecord, AttributeRef, ComponentRecord, HistoryEntry, ObservationMeta};
pub use tracker::UsageTracker;
