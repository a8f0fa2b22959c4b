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

use metrics::counter;
use parking_lot::{Mutex, RwLock};
use propscope_common::MonitorConfig;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::event::{MonitorError, MonitorResult, MonitoringEvent, MonitoringWarning};
use super::rules::{WarningRule, default_rules};
use crate::analysis::{AnalysisEngine, AnalysisSnapshot};

pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;
pub type SubscriberResult = Result<(), SubscriberError>;

type Subscriber = Arc<dyn Fn(&MonitoringEvent) -> SubscriberResult + Send + Sync>;

/// Token returned by [`MonitoringBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct BusShared {
    engine: Arc<AnalysisEngine>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    rules: RwLock<Vec<Box<dyn WarningRule>>>,
    next_id: AtomicU64,
}

impl BusShared {
    /// One sampling cycle: analyze, publish the update, then any warnings
    fn tick(&self) -> usize {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.engine.analyze()));
        let timestamp = self.engine.now_millis();

        let snapshot = match outcome {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                error!("Analysis failed: {}", e);
                self.publish(&MonitoringEvent::Error {
                    timestamp,
                    error: MonitorError::Analysis(e),
                });
                return 1;
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Analysis panicked: {}", message);
                self.publish(&MonitoringEvent::Error {
                    timestamp,
                    error: MonitorError::AnalysisPanicked(message),
                });
                return 1;
            }
        };

        self.publish(&MonitoringEvent::Update {
            timestamp,
            snapshot: Arc::clone(&snapshot),
        });

        let warnings = self.evaluate_rules(&snapshot);
        for warning in &warnings {
            debug!("Rule {} raised: {}", warning.rule, warning.message);
            self.publish(&MonitoringEvent::Warning {
                timestamp,
                warning: warning.clone(),
            });
        }

        1 + warnings.len()
    }

    /// Runs every rule against `snapshot`. A panicking rule is logged and
    /// contributes no warning.
    fn evaluate_rules(&self, snapshot: &AnalysisSnapshot) -> Vec<MonitoringWarning> {
        let rules = self.rules.read();
        let mut warnings = Vec::new();

        for rule in rules.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(snapshot))) {
                Ok(Some(warning)) => warnings.push(warning),
                Ok(None) => {}
                Err(payload) => {
                    counter!("propscope.rule.failures", 1);
                    warn!("Rule {} panicked: {}", rule.name(), panic_message(payload.as_ref()));
                }
            }
        }

        warnings
    }

    /// Delivers `event` to every subscriber in registration order.
    ///
    /// The subscriber list is copied so no lock is held while callbacks run.
    /// A failing or panicking subscriber is logged and skipped.
    fn publish(&self, event: &MonitoringEvent) {
        let subscribers: Vec<(SubscriptionId, Subscriber)> = self.subscribers.read().clone();

        for (id, subscriber) in subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    counter!("propscope.subscriber.failures", 1);
                    warn!("Subscriber {:?} failed: {}", id, e);
                }
                Err(payload) => {
                    counter!("propscope.subscriber.failures", 1);
                    warn!("Subscriber {:?} panicked: {}", id, panic_message(payload.as_ref()));
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Sampler {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Periodically samples an [`AnalysisEngine`] and fans the results out to
/// subscribers as [`MonitoringEvent`]s.
pub struct MonitoringBus {
    shared: Arc<BusShared>,
    config: MonitorConfig,
    sampler: Mutex<Option<Sampler>>,
}

impl MonitoringBus {
    pub fn new(engine: Arc<AnalysisEngine>, config: MonitorConfig) -> Self {
        let rules = default_rules(&config);
        Self::with_rules(engine, config, rules)
    }

    pub fn with_rules(engine: Arc<AnalysisEngine>, config: MonitorConfig, rules: Vec<Box<dyn WarningRule>>) -> Self {
        Self {
            shared: Arc::new(BusShared {
                engine,
                subscribers: RwLock::new(Vec::new()),
                rules: RwLock::new(rules),
                next_id: AtomicU64::new(0),
            }),
            config,
            sampler: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<AnalysisEngine> {
        &self.shared.engine
    }

    pub fn add_rule(&self, rule: Box<dyn WarningRule>) {
        self.shared.rules.write().push(rule);
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MonitoringEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.shared.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }

    pub fn publish(&self, event: &MonitoringEvent) {
        self.shared.publish(event);
    }

    /// Runs one sampling cycle on the calling thread. Returns the number of
    /// events published.
    pub fn sample_now(&self) -> usize {
        self.shared.tick()
    }

    /// Starts sampling at the configured interval
    pub fn start(&self) -> MonitorResult<bool> {
        self.start_with_interval(self.config.interval())
    }

    /// Starts sampling every `interval` on the current tokio runtime. The
    /// first tick fires one interval after the call. Returns `Ok(false)` if
    /// the sampler is already running.
    pub fn start_with_interval(&self, interval: Duration) -> MonitorResult<bool> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidInterval);
        }

        let mut sampler = self.sampler.lock();
        if sampler.as_ref().is_some_and(|s| !s.task.is_finished()) {
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::RuntimeUnavailable)?;
        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let shared = Arc::clone(&self.shared);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        // Analysis and subscriber callbacks block
                        let tick_shared = Arc::clone(&shared);
                        match tokio::task::spawn_blocking(move || tick_shared.tick()).await {
                            Ok(published) => debug!("Sampler tick published {} event(s)", published),
                            Err(e) => error!("Sampler tick aborted: {}", e),
                        }
                    }
                }
            }
        });

        *sampler = Some(Sampler { shutdown, task });
        info!("Monitoring started, sampling every {:?}", interval);
        Ok(true)
    }

    /// Stops sampling. Any tick already in progress runs to completion and may
    /// still publish after this returns; no further ticks start. Returns false if the sampler was not running.
    pub fn stop(&self) -> bool {
        let Some(sampler) = self.sampler.lock().take() else {
            return false;
        };

        let was_running = !sampler.task.is_finished();
        let _ = sampler.shutdown.send(());
        if was_running {
            info!("Monitoring stopped");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.sampler.lock().as_ref().is_some_and(|s| !s.task.is_finished())
    }
}

impl Drop for MonitoringBus {
    fn drop(&mut self) {
        self.stop();
    }
}
