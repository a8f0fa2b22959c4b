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

//! Usage analysis
//!
//! The [`AnalysisEngine`] owns a [`UsageTracker`](crate::tracker::UsageTracker)
//! and derives [`AnalysisSnapshot`]s from it on demand:
//!
//! - unused attributes (declared but never observed)
//! - frequent updaters (change rate above the configured ratio)
//! - co-update groups (attributes with similar change counts)
//!
//! Snapshots are memoized. A memoized snapshot is served only while it is
//! younger than the cache window and no observation arrived within the quiet
//! window, so a pass never reuses data from before a burst that is still in
//! flight.

pub mod engine;
pub mod patterns;
pub mod snapshot;

pub use engine::{AnalysisEngine, AnalysisError, AnalysisResult};
pub use snapshot::{AnalysisSnapshot, CoUpdateGroup, FrequentUpdate, SnapshotSummary};
