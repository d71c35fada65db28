//! Job executor: consumes the queue and dispatches handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use recut_models::{JobRecord, MAX_ERROR_LEN};
use recut_queue::{JobQueue, QueueJob};

use crate::analysis::run_ingest;
use crate::config::WorkerConfig;
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{run_generate, run_pipeline};
use crate::render_job::run_apply;

/// Consumes jobs from the queue with bounded concurrency, retry
/// bookkeeping and DLQ escalation.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<WorkerContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: JobQueue) -> WorkerResult<Self> {
        let ctx = WorkerContext::from_env(config.clone())?;
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Ok(Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        })
    }

    /// Signal shutdown; the run loop drains in-flight jobs.
    pub fn shutdown_handle(&self) -> tokio::sync::watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Main loop: consume, claim stale work and dispatch until
    /// shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "starting executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await.map_err(WorkerError::from)?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodic claim of messages left pending by crashed workers.
        let claim_queue = Arc::clone(&self.queue);
        let claim_ctx = Arc::clone(&self.ctx);
        let claim_semaphore = Arc::clone(&self.job_semaphore);
        let claim_consumer = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let claim_min_idle = self.config.claim_min_idle;
        let mut claim_shutdown = self.shutdown.subscribe();

        let claim_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = claim_shutdown.changed() => {
                        if *claim_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match claim_queue.claim_pending(&claim_consumer, claim_min_idle, 5).await {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!("claimed {} stale jobs", jobs.len());
                                for (message_id, job) in jobs {
                                    let Ok(permit) =
                                        Arc::clone(&claim_semaphore).acquire_owned().await
                                    else {
                                        return;
                                    };
                                    let ctx = Arc::clone(&claim_ctx);
                                    let queue = Arc::clone(&claim_queue);
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(ctx, queue, message_id, job).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("failed to claim pending jobs: {e}"),
                        }
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_batch() => {
                    if let Err(e) = result {
                        error!("error consuming jobs: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("waiting for in-flight jobs to finish");
        let _ = tokio::time::timeout(Duration::from_secs(60), self.drain()).await;
        info!("executor stopped");
        Ok(())
    }

    async fn consume_batch(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await
            .map_err(WorkerError::from)?;

        if jobs.is_empty() {
            return Ok(());
        }
        debug!("consumed {} jobs", jobs.len());

        for (message_id, job) in jobs {
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Transient("semaphore closed".to_string()))?;
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&self.queue);
            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, message_id, job).await;
            });
        }
        Ok(())
    }

    async fn drain(&self) {
        let _ = self
            .job_semaphore
            .acquire_many(self.config.max_concurrent_jobs as u32)
            .await;
    }

    /// Execute one job with retry and DLQ handling.
    async fn execute_job(
        ctx: Arc<WorkerContext>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: QueueJob,
    ) {
        let job_id = job.job_id().clone();
        let kind = job.job_kind();
        info!(job_id = %job_id, kind = kind.as_str(), "executing job");
        metrics::counter!("recut_jobs_started_total", "kind" => kind.as_str()).increment(1);

        let result = Self::dispatch(ctx.as_ref(), &job).await;

        match result {
            Ok(()) => {
                metrics::counter!("recut_jobs_completed_total", "kind" => kind.as_str())
                    .increment(1);
                queue.ack(&message_id).await.ok();
                queue.clear_dedup(&job).await.ok();
            }
            Err(WorkerError::Cancelled) => {
                // The record is already terminal; just drop the message.
                queue.ack(&message_id).await.ok();
                queue.clear_dedup(&job).await.ok();
            }
            Err(e) => {
                let retryable = e.is_retryable();
                let retries = queue.increment_retry(&message_id).await.unwrap_or(u32::MAX);

                if retryable && retries < queue.max_retries() {
                    warn!(
                        job_id = %job_id,
                        attempt = retries,
                        "job failed, leaving pending for retry: {e}"
                    );
                    // Not acked: the message is redelivered via the
                    // stale-claim path after the retry delay.
                    Self::record_retry(ctx.as_ref(), &job_id, retries).await;
                } else {
                    error!(job_id = %job_id, "job failed permanently: {e}");
                    metrics::counter!("recut_jobs_failed_total", "kind" => kind.as_str())
                        .increment(1);
                    Self::record_failure(ctx.as_ref(), &job, &e).await;
                    let mut message = e.to_string();
                    message.truncate(MAX_ERROR_LEN);
                    queue.dlq(&message_id, &job, &message).await.ok();
                    queue.clear_dedup(&job).await.ok();
                }
            }
        }
    }

    async fn dispatch(ctx: &WorkerContext, job: &QueueJob) -> WorkerResult<()> {
        match job {
            QueueJob::IngestMedia(j) => run_ingest(ctx, j).await,
            QueueJob::GeneratePlan(j) => run_generate(ctx, j).await.map(|_| ()),
            QueueJob::ApplyEdit(j) => run_apply(ctx, j).await,
            QueueJob::Pipeline(j) => run_pipeline(ctx, j).await,
        }
    }

    /// Bump the retry count on the record, leaving it in-flight.
    async fn record_retry(ctx: &WorkerContext, job_id: &recut_models::JobId, retries: u32) {
        if let Ok(Some(mut record)) = ctx.store.try_get_job(job_id).await {
            record.retry_count = retries;
            ctx.store.put_job(&record).await.ok();
        }
    }

    /// Terminal failure: mark the record failed with the truncated
    /// error string.
    async fn record_failure(ctx: &WorkerContext, job: &QueueJob, error: &WorkerError) {
        let job_id = job.job_id();
        let mut record = match ctx.store.try_get_job(job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => JobRecord::new(
                job_id.clone(),
                job.job_kind(),
                serde_json::to_value(job).unwrap_or(serde_json::Value::Null),
            ),
            Err(e) => {
                warn!("could not load record for failed job {job_id}: {e}");
                return;
            }
        };
        record.fail(error.to_string());
        ctx.store.put_job(&record).await.ok();
    }
}
