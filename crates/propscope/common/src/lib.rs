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

//! Shared types for Propscope
//!
//! Value model, configuration and clock used by the tracker, the analysis
//! engine and the monitoring bus in `propscope-core`.

pub mod clock;
pub mod config;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnalysisConfig, ConfigError, ConfigResult, MonitorConfig, PropscopeConfig, TrackerConfig};
pub use value::{AttributeMap, AttributeValue, FunctionRef, ValueKind};
