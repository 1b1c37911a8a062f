//! Scheduler state machine
//!
//! Every configuration notification starts a new cancellation generation,
//! which cancels the pending timer and the in-flight cycle of the previous
//! one, then spawns a driver task for the new generation. The driver
//! loads the configuration, evaluates it, optionally waits, runs a cycle
//! and repeats with a freshly loaded configuration until the evaluation
//! says there is nothing left to do. A superseded driver exits at its next
//! await point.

use crate::aggregator::{Aggregator, CycleReport};
use crate::fetch::{CancelGroup, CancellationRegistry};
use crate::notify::{ConnectionState, Notifier, NotifierMessage};
use crate::scheduler::decision::{evaluate, retry_delay, ScheduleDecision};
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// What the scheduler is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No pending timer and no cycle running
    Idle,
    /// One timer pending
    Armed { delay: Duration },
    /// A cycle is fetching or publishing
    Running,
}

struct SchedulerState {
    phase: Phase,
    group: Option<CancelGroup>,
    last_report: Option<CycleReport>,
}

/// Shared between the scheduler handle and its driver tasks
struct Shared {
    aggregator: Arc<Aggregator>,
    state: Mutex<SchedulerState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Updates the phase unless `group` has been cancelled or superseded
    fn set_phase(&self, group: &CancelGroup, phase: Phase) {
        let mut state = self.lock();
        if !group.is_cancelled() {
            state.phase = phase;
        }
    }

    /// Waits for `delay` unless the group is cancelled first
    async fn wait(&self, group: &CancelGroup, delay: Duration) -> bool {
        self.set_phase(group, Phase::Armed { delay });
        tokio::select! {
            biased;
            _ = group.cancelled() => {
                tracing::debug!("Timer of generation {} superseded", group.generation());
                false
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

pub struct Scheduler {
    shared: Arc<Shared>,
    registry: Arc<CancellationRegistry>,
}

impl Scheduler {
    pub fn new(aggregator: Arc<Aggregator>, registry: Arc<CancellationRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared {
                aggregator,
                state: Mutex::new(SchedulerState {
                    phase: Phase::Idle,
                    group: None,
                    last_report: None,
                }),
            }),
            registry,
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Report of the most recent successful cycle
    pub fn last_report(&self) -> Option<CycleReport> {
        self.shared.lock().last_report.clone()
    }

    /// Supersedes whatever is pending or running and schedules the
    /// configuration found at `config_url`
    ///
    /// Returns the handle of the new generation's driver task.
    pub fn on_config_url(&self, config_url: impl Into<String>) -> JoinHandle<()> {
        let config_url = config_url.into();
        let group = self.registry.begin_generation();
        tracing::info!(
            "New configuration {} (generation {})",
            config_url,
            group.generation()
        );

        {
            let mut state = self.shared.lock();
            state.group = Some(group.clone());
            state.phase = Phase::Idle;
        }

        tokio::spawn(drive(Arc::clone(&self.shared), group, config_url))
    }

    /// Cancels the pending timer and the in-flight cycle, if any
    pub fn shutdown(&self) {
        let group = {
            let mut state = self.shared.lock();
            state.phase = Phase::Idle;
            state.group.take()
        };
        if let Some(group) = group {
            group.cancel();
        }
        self.registry.cancel_all();
    }

    /// Consumes configuration URLs from `topic` until the notifier closes
    ///
    /// Subscribes on every `Connected` event; a disconnect keeps the current
    /// schedule alive. A failed subscription is retried on the next
    /// `Connected` event.
    pub async fn run(&self, notifier: &dyn Notifier, topic: &str) {
        let mut connections = notifier.connection_changes();
        let mut messages: Option<BoxStream<'static, NotifierMessage>> = None;

        loop {
            tokio::select! {
                state = connections.next() => match state {
                    Some(ConnectionState::Connected) => {
                        tracing::info!("Notifier connected, subscribing to '{}'", topic);
                        messages = match notifier.subscribe(topic).await {
                            Ok(stream) => Some(stream),
                            Err(e) => {
                                tracing::error!("Failed subscribing to '{}': {}", topic, e);
                                None
                            }
                        };
                    }
                    Some(ConnectionState::Disconnected) => {
                        tracing::warn!("Notifier disconnected");
                        messages = None;
                    }
                    None => {
                        tracing::info!("Notifier closed");
                        return;
                    }
                },
                message = next_message(&mut messages) => match message {
                    Some(message) => {
                        tracing::debug!("Notification #{}", message.sequence);
                        let config_url = message.data.trim();
                        if config_url.is_empty() {
                            tracing::warn!("Ignoring empty configuration notification");
                        } else {
                            self.on_config_url(config_url);
                        }
                    }
                    None => {
                        tracing::warn!("Subscription to '{}' ended", topic);
                        messages = None;
                    }
                },
            }
        }
    }
}

async fn next_message(
    messages: &mut Option<BoxStream<'static, NotifierMessage>>,
) -> Option<NotifierMessage> {
    match messages {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Driver of one generation: evaluate, wait, run, repeat
async fn drive(shared: Arc<Shared>, group: CancelGroup, config_url: String) {
    let sink = Arc::clone(shared.aggregator.sink());

    loop {
        if group.is_cancelled() {
            return;
        }

        let loaded = tokio::select! {
            biased;
            _ = group.cancelled() => return,
            loaded = sink.fetch_config(&config_url) => loaded,
        };
        let config = match loaded {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed loading configuration {}: {}", config_url, e);
                shared.set_phase(&group, Phase::Idle);
                return;
            }
        };

        match evaluate(&config, Utc::now()) {
            ScheduleDecision::RunNow => {}
            ScheduleDecision::RunAfter(delay) => {
                tracing::info!("Next cycle of '{}' in {:?}", config.name, delay);
                if !shared.wait(&group, delay).await {
                    return;
                }
            }
            ScheduleDecision::Done => {
                tracing::info!(
                    "'{}' already processed and cron disabled, waiting for a new configuration",
                    config.name
                );
                shared.set_phase(&group, Phase::Idle);
                return;
            }
            ScheduleDecision::Invalid(reason) => {
                tracing::error!("Invalid configuration '{}': {}", config.name, reason);
                shared.set_phase(&group, Phase::Idle);
                return;
            }
        }

        shared.set_phase(&group, Phase::Running);
        match shared.aggregator.run_cycle(&group, &config).await {
            Ok(report) => {
                let mut state = shared.lock();
                if !group.is_cancelled() {
                    state.last_report = Some(report);
                }
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("Cycle of '{}' cancelled", config.name);
                return;
            }
            Err(e) => {
                tracing::error!("Cycle of '{}' failed: {}", config.name, e);
                match retry_delay(&config) {
                    Some(delay) => {
                        if !shared.wait(&group, delay).await {
                            return;
                        }
                    }
                    None => {
                        shared.set_phase(&group, Phase::Idle);
                        return;
                    }
                }
            }
        }
    }
}
