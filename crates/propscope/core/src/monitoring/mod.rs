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

//! Monitoring bus
//!
//! A [`MonitoringBus`] samples an [`AnalysisEngine`](crate::analysis::AnalysisEngine)
//! on a fixed cadence and fans the outcome out to subscribers:
//!
//! 1. one `Update` event carrying the snapshot,
//! 2. one `Warning` event per [`WarningRule`] that fires,
//! 3. or a single `Error` event if the analysis pass failed.
//!
//! Delivery is synchronous on the sampler task. Subscriber failures are
//! isolated: an `Err` or a panic is logged and the next subscriber still runs.

pub mod bus;
pub mod event;
pub mod rules;

pub use bus::{MonitoringBus, SubscriberError, SubscriberResult, SubscriptionId};
pub use event::{MonitorError, MonitorResult, MonitoringEvent, MonitoringWarning, WarningKind};
pub use rules::{AttributeOverloadRule, FrequentUpdateRule, UnusedAttributeRule, WarningRule, default_rules};
