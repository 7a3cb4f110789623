//! Progress broadcast hub
//!
//! Fans one upstream progress stream per job out to any number of
//! subscribers. The hub holds at most one upstream connection per job_id:
//! the first subscriber opens it, later subscribers share it. A dropped
//! upstream reconnects with jittered exponential backoff; terminal events
//! close the channel after a short grace delay so late SSE flushes still
//! see them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use rand::Rng;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use bomcat_common::config::StreamConfig;
use bomcat_common::events::{EnrichEvent, EventBus, JobProgress};

/// How often an idle channel checks for departed subscribers
const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Per-channel fan-out buffer
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream connect failed: {0}")]
    Connect(String),
}

/// Source of progress events for one job
///
/// In-process deployments read the orchestrator's event bus; a split
/// deployment would implement this over an SSE client instead.
#[async_trait]
pub trait ProgressUpstream: Send + Sync + 'static {
    async fn connect(
        &self,
        job_id: Uuid,
    ) -> Result<BoxStream<'static, EnrichEvent>, UpstreamError>;
}

/// Upstream backed by the in-process event bus
pub struct LocalUpstream {
    bus: EventBus,
}

impl LocalUpstream {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ProgressUpstream for LocalUpstream {
    async fn connect(
        &self,
        job_id: Uuid,
    ) -> Result<BoxStream<'static, EnrichEvent>, UpstreamError> {
        let mut rx = self.bus.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) if event.job_id() == job_id => yield event,
                    Ok(_) => continue,
                    // A lagged subscriber skips ahead; progress snapshots
                    // are self-contained so nothing needs replaying
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(stream.boxed())
    }
}

/// Jittered exponential backoff schedule
///
/// A plain value object: `next_delay` advances the schedule, `reset` is
/// called after a successful connect. Delays double from `base` up to
/// `max`, with ±20% jitter applied after capping.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max,
            max_attempts,
            attempt: 0,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
            config.max_reconnect_attempts,
        )
    }

    /// Delay before jitter for a given attempt number
    pub fn pre_jitter(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Next delay to sleep, or None once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self.pre_jitter(self.attempt);
        self.attempt += 1;

        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        Some(delay.mul_f64(jitter))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Connection lifecycle of one job channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
    Error,
}

/// What a subscriber gets back: the event receiver plus the last progress
/// snapshot seen on the channel, for an immediate `connected` frame
pub struct Subscription {
    pub receiver: broadcast::Receiver<EnrichEvent>,
    pub snapshot: Option<JobProgress>,
}

#[derive(Clone)]
struct Channel {
    tx: broadcast::Sender<EnrichEvent>,
    state: Arc<Mutex<ChannelState>>,
    last_progress: Arc<Mutex<Option<JobProgress>>>,
}

struct HubInner {
    channels: Mutex<HashMap<Uuid, Channel>>,
}

impl HubInner {
    fn remove(&self, job_id: Uuid) {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&job_id);
    }
}

/// Shared fan-out hub over one upstream per job
pub struct ProgressHub {
    upstream: Arc<dyn ProgressUpstream>,
    config: StreamConfig,
    inner: Arc<HubInner>,
}

impl ProgressHub {
    pub fn new(upstream: Arc<dyn ProgressUpstream>, config: StreamConfig) -> Self {
        Self {
            upstream,
            config,
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Attach to a job's progress channel, creating it on first use
    ///
    /// Get-or-create is atomic under the registry lock, so concurrent
    /// first subscribers still share a single upstream connection.
    pub fn subscribe(&self, job_id: Uuid) -> Subscription {
        let mut channels = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(channel) = channels.get(&job_id) {
            return Subscription {
                receiver: channel.tx.subscribe(),
                snapshot: channel
                    .last_progress
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone(),
            };
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        let channel = Channel {
            tx: tx.clone(),
            state: Arc::new(Mutex::new(ChannelState::Connecting)),
            last_progress: Arc::new(Mutex::new(None)),
        };
        channels.insert(job_id, channel.clone());
        drop(channels);

        tracing::debug!(job_id = %job_id, "Opening progress channel");

        let inner = Arc::clone(&self.inner);
        let upstream = Arc::clone(&self.upstream);
        let config = self.config.clone();
        tokio::spawn(async move {
            pump(inner, upstream, config, job_id, channel).await;
        });

        Subscription {
            receiver: rx,
            snapshot: None,
        }
    }

    /// Connection state of a job's channel, if one is open
    pub fn state(&self, job_id: Uuid) -> Option<ChannelState> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&job_id)
            .map(|c| *c.state.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Number of open job channels
    pub fn channel_count(&self) -> usize {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

fn set_state(channel: &Channel, state: ChannelState) {
    *channel.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
}

/// Per-job pump: connect, forward, reconnect, close
async fn pump(
    inner: Arc<HubInner>,
    upstream: Arc<dyn ProgressUpstream>,
    config: StreamConfig,
    job_id: Uuid,
    channel: Channel,
) {
    let mut backoff = Backoff::from_config(&config);
    let grace = Duration::from_millis(config.close_grace_ms);

    loop {
        match upstream.connect(job_id).await {
            Ok(mut stream) => {
                set_state(&channel, ChannelState::Connected);
                backoff.reset();
                tracing::debug!(job_id = %job_id, "Upstream connected");

                let mut idle = tokio::time::interval(IDLE_CHECK_INTERVAL);
                idle.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        event = stream.next() => {
                            let Some(event) = event else {
                                // Upstream dropped mid-job
                                break;
                            };

                            *channel
                                .last_progress
                                .lock()
                                .unwrap_or_else(|e| e.into_inner()) =
                                Some(event.progress().clone());

                            let terminal = event.is_terminal();
                            let _ = channel.tx.send(event);

                            if terminal {
                                // Grace delay lets subscribers drain the
                                // terminal frame before the channel closes
                                tokio::time::sleep(grace).await;
                                set_state(&channel, ChannelState::Closed);
                                inner.remove(job_id);
                                tracing::debug!(job_id = %job_id, "Progress channel closed (job finished)");
                                return;
                            }
                        }
                        _ = idle.tick() => {
                            if channel.tx.receiver_count() == 0 {
                                set_state(&channel, ChannelState::Closed);
                                inner.remove(job_id);
                                tracing::debug!(job_id = %job_id, "Progress channel closed (no subscribers)");
                                return;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Upstream connect failed");
            }
        }

        if channel.tx.receiver_count() == 0 {
            set_state(&channel, ChannelState::Closed);
            inner.remove(job_id);
            return;
        }

        set_state(&channel, ChannelState::Reconnecting);
        match backoff.next_delay() {
            Some(delay) => {
                tracing::debug!(
                    job_id = %job_id,
                    delay_ms = delay.as_millis() as u64,
                    attempt = backoff.attempt(),
                    "Reconnecting to upstream"
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                let progress = channel
                    .last_progress
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone()
                    .unwrap_or_else(|| JobProgress::pending(job_id, 0));
                let _ = channel
                    .tx
                    .send(EnrichEvent::error(progress, "upstream connection lost"));
                set_state(&channel, ChannelState::Error);
                inner.remove(job_id);
                tracing::warn!(job_id = %job_id, "Reconnect attempts exhausted, channel errored");
                return;
            }
        }
    }
}
