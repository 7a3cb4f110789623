//! Job-level enrichment orchestration
//!
//! One job enriches a batch of BOM line items through a bounded worker
//! pool. Pause is cooperative: in-flight items run to completion and the
//! workers park before taking the next item. Stop cancels the job for
//! good; a stopped job cannot be resumed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{EnrichmentRun, PartQuery};
use crate::normalize::Normalizer;
use crate::router::Router;
use crate::scoring::QualityScorer;
use crate::suppliers::TierChain;
use bomcat_common::events::{EnrichEvent, EventBus, JobProgress, JobStatus};
use bomcat_common::{Error, Result};

/// One BOM line item to enrich
#[derive(Debug, Clone)]
pub struct LineItem {
    pub line_id: Uuid,
    pub query: PartQuery,
}

impl LineItem {
    pub fn new(query: PartQuery) -> Self {
        Self {
            line_id: Uuid::new_v4(),
            query,
        }
    }
}

/// Processes a single line item end to end
///
/// The production implementation runs the supplier chain, normalizer,
/// scorer, and router; tests substitute their own.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    /// Returns true if the item was enriched, false if it failed
    async fn process(&self, job_id: Uuid, item: &LineItem) -> bool;
}

/// The real pipeline: tier chain → normalize → score → route
pub struct EnrichmentPipeline {
    pool: sqlx::SqlitePool,
    chain: TierChain,
    normalizer: Normalizer,
    scorer: QualityScorer,
    router: Router,
}

impl EnrichmentPipeline {
    pub fn new(pool: sqlx::SqlitePool, chain: TierChain, router: Router) -> Self {
        Self {
            pool,
            chain,
            normalizer: Normalizer::new(),
            scorer: QualityScorer::new(),
            router,
        }
    }
}

#[async_trait]
impl ItemProcessor for EnrichmentPipeline {
    async fn process(&self, job_id: Uuid, item: &LineItem) -> bool {
        let started = std::time::Instant::now();
        let mut run = EnrichmentRun::begin(job_id, item.line_id, &item.query);

        let outcome = self.chain.resolve(&item.query).await;
        run.processing_time_ms = started.elapsed().as_millis() as u64;

        match outcome.hit {
            Some(hit) => {
                let supplier_name = outcome
                    .supplier_name
                    .unwrap_or_else(|| hit.payload.supplier.clone());
                let record = self.normalizer.normalize(&hit.payload, run.id);
                let breakdown = self
                    .scorer
                    .score(&record, hit.confidence, outcome.tier_reached);
                run.processing_time_ms = started.elapsed().as_millis() as u64;

                match self
                    .router
                    .commit(
                        &self.pool,
                        run,
                        &record.comparisons,
                        record.fields,
                        breakdown,
                        &supplier_name,
                    )
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!(
                            job_id = %job_id,
                            line_id = %item.line_id,
                            error = %e,
                            "Failed to commit enrichment result"
                        );
                        false
                    }
                }
            }
            None => {
                let detail = outcome
                    .attempts
                    .iter()
                    .map(|a| {
                        format!(
                            "tier {} ({}): {}",
                            a.tier,
                            a.supplier_name,
                            a.error.as_deref().unwrap_or("below usability floor")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ");

                if let Err(e) = self
                    .router
                    .commit_failure(&self.pool, run, outcome.tier_reached, detail)
                    .await
                {
                    tracing::error!(
                        job_id = %job_id,
                        line_id = %item.line_id,
                        error = %e,
                        "Failed to record enrichment failure"
                    );
                }
                false
            }
        }
    }
}

/// Mutable state for one job
struct JobState {
    job_id: Uuid,
    queue: Mutex<VecDeque<LineItem>>,
    progress: std::sync::Mutex<JobProgress>,
    pause_tx: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl JobState {
    fn snapshot(&self) -> JobProgress {
        self.progress.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update<F: FnOnce(&mut JobProgress)>(&self, f: F) -> JobProgress {
        let mut progress = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut progress);
        progress.recompute();
        progress.clone()
    }
}

/// Drives enrichment jobs through a bounded worker pool
pub struct Orchestrator {
    processor: Arc<dyn ItemProcessor>,
    event_bus: EventBus,
    worker_pool_size: usize,
    jobs: RwLock<HashMap<Uuid, Arc<JobState>>>,
}

impl Orchestrator {
    pub fn new(
        processor: Arc<dyn ItemProcessor>,
        event_bus: EventBus,
        worker_pool_size: usize,
    ) -> Self {
        Self {
            processor,
            event_bus,
            worker_pool_size: worker_pool_size.max(1),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new job over the given line items, returning its id
    pub async fn start(self: &Arc<Self>, items: Vec<LineItem>) -> Result<Uuid> {
        if items.is_empty() {
            return Err(Error::InvalidInput("job has no line items".to_string()));
        }

        let job_id = Uuid::new_v4();
        let total = items.len();
        let (pause_tx, _) = watch::channel(false);

        let mut progress = JobProgress::pending(job_id, total);
        progress.status = JobStatus::Enriching;

        let state = Arc::new(JobState {
            job_id,
            queue: Mutex::new(items.into_iter().collect()),
            progress: std::sync::Mutex::new(progress.clone()),
            pause_tx,
            cancel: CancellationToken::new(),
        });

        self.jobs.write().await.insert(job_id, state.clone());

        tracing::info!(
            job_id = %job_id,
            total_items = total,
            workers = self.worker_pool_size,
            "Starting enrichment job"
        );

        self.event_bus.emit_lossy(EnrichEvent::started(progress));

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run_job(state).await;
        });

        Ok(job_id)
    }

    /// Pause a running job; in-flight items finish first
    pub async fn pause(&self, job_id: Uuid) -> Result<JobProgress> {
        let state = self.job_state(job_id).await?;

        let progress = state.update(|p| {
            if p.status != JobStatus::Enriching {
                return;
            }
            p.status = JobStatus::Paused;
        });
        if progress.status != JobStatus::Paused {
            return Err(Error::Conflict(format!(
                "job {} is {} and cannot be paused",
                job_id,
                progress.status.as_str()
            )));
        }

        let _ = state.pause_tx.send(true);
        tracing::info!(job_id = %job_id, "Job paused");
        Ok(progress)
    }

    /// Resume a paused job without reprocessing completed items
    pub async fn resume(&self, job_id: Uuid) -> Result<JobProgress> {
        let state = self.job_state(job_id).await?;

        let progress = state.update(|p| {
            if p.status != JobStatus::Paused {
                return;
            }
            p.status = JobStatus::Enriching;
        });
        if progress.status != JobStatus::Enriching {
            return Err(Error::Conflict(format!(
                "job {} is {} and cannot be resumed",
                job_id,
                progress.status.as_str()
            )));
        }

        let _ = state.pause_tx.send(false);
        tracing::info!(job_id = %job_id, "Job resumed");
        Ok(progress)
    }

    /// Stop a job permanently
    pub async fn stop(&self, job_id: Uuid) -> Result<JobProgress> {
        let state = self.job_state(job_id).await?;

        let progress = state.update(|p| {
            if !p.status.is_terminal() {
                p.status = JobStatus::Stopped;
            }
        });
        if progress.status != JobStatus::Stopped {
            return Err(Error::Conflict(format!(
                "job {} is already {}",
                job_id,
                progress.status.as_str()
            )));
        }

        state.cancel.cancel();
        // Unpark any paused workers so they observe the cancellation
        let _ = state.pause_tx.send(false);
        tracing::info!(job_id = %job_id, "Job stopped");
        Ok(progress)
    }

    /// Current progress snapshot for a job
    pub async fn status(&self, job_id: Uuid) -> Result<JobProgress> {
        Ok(self.job_state(job_id).await?.snapshot())
    }

    async fn job_state(&self, job_id: Uuid) -> Result<Arc<JobState>> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))
    }

    async fn run_job(self: Arc<Self>, state: Arc<JobState>) {
        let mut workers = JoinSet::new();
        for _ in 0..self.worker_pool_size {
            let orchestrator = Arc::clone(&self);
            let state = Arc::clone(&state);
            workers.spawn(async move {
                orchestrator.worker_loop(state).await;
            });
        }
        let mut fault: Option<String> = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(
                    job_id = %state.job_id,
                    error = %e,
                    "Enrichment worker crashed"
                );
                if fault.is_none() {
                    fault = Some(format!("enrichment worker crashed: {}", e));
                }
                // The remaining workers cannot be trusted to drain the
                // queue; stop the job and unpark anyone waiting
                state.cancel.cancel();
                let _ = state.pause_tx.send(false);
            }
        }

        let final_progress = state.update(|p| {
            if !p.status.is_terminal() {
                p.status = if fault.is_some() {
                    JobStatus::Failed
                } else {
                    JobStatus::Completed
                };
            }
        });

        match final_progress.status {
            JobStatus::Failed => {
                let message =
                    fault.unwrap_or_else(|| "enrichment worker crashed".to_string());
                tracing::error!(job_id = %state.job_id, "Enrichment job failed: {}", message);
                self.event_bus
                    .emit_lossy(EnrichEvent::error(final_progress, message));
            }
            JobStatus::Stopped => {
                tracing::info!(job_id = %state.job_id, "Enrichment job stopped");
                self.event_bus
                    .emit_lossy(EnrichEvent::completed(final_progress));
            }
            _ => {
                tracing::info!(
                    job_id = %state.job_id,
                    enriched = final_progress.enriched_items,
                    failed = final_progress.failed_items,
                    "Enrichment job completed"
                );
                self.event_bus
                    .emit_lossy(EnrichEvent::completed(final_progress));
            }
        }
    }

    async fn worker_loop(&self, state: Arc<JobState>) {
        let mut pause_rx = state.pause_tx.subscribe();

        loop {
            if state.cancel.is_cancelled() {
                return;
            }

            // Park while paused; wake on resume or stop
            while *pause_rx.borrow() {
                tokio::select! {
                    _ = state.cancel.cancelled() => return,
                    changed = pause_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }

            let item = state.queue.lock().await.pop_front();
            let Some(item) = item else {
                return;
            };

            let enriched = self.processor.process(state.job_id, &item).await;

            let progress = state.update(|p| {
                if enriched {
                    p.enriched_items += 1;
                } else {
                    p.failed_items += 1;
                }
            });

            let event = if enriched {
                EnrichEvent::component_completed(progress.clone(), item.line_id, item.query.mpn.clone())
            } else {
                EnrichEvent::component_failed(progress.clone(), item.line_id, item.query.mpn.clone())
            };
            self.event_bus.emit_lossy(event);
            self.event_bus.emit_lossy(EnrichEvent::progress_update(progress));
        }
    }
}
