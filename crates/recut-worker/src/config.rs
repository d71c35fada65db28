//! Worker configuration.

use std::time::Duration;

/// Worker configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Concurrent frame-caption calls within one job
    pub max_caption_parallel: usize,
    /// Seconds between sampled frames when a job does not override it
    pub frame_granularity_seconds: f64,
    /// Interval for time-based scene fallback
    pub scene_fallback_interval: f64,
    /// Job timeout
    pub job_timeout: Duration,
    /// How often the worker scans for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed
    pub claim_min_idle: Duration,
    /// Per-subprocess timeout for ffmpeg invocations
    pub subprocess_timeout: Duration,
    /// Work directory for temporary files
    pub work_dir: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_caption_parallel: 8,
            frame_granularity_seconds: 1.0,
            scene_fallback_interval: 30.0,
            job_timeout: Duration::from_secs(3600),
            claim_interval: Duration::from_secs(60),
            claim_min_idle: Duration::from_secs(600),
            subprocess_timeout: Duration::from_secs(600),
            work_dir: "/tmp/recut".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS", defaults.max_concurrent_jobs),
            max_caption_parallel: env_parse(
                "WORKER_MAX_CAPTION_PARALLEL",
                defaults.max_caption_parallel,
            ),
            frame_granularity_seconds: env_parse(
                "WORKER_FRAME_GRANULARITY",
                defaults.frame_granularity_seconds,
            ),
            scene_fallback_interval: env_parse(
                "WORKER_SCENE_FALLBACK_INTERVAL",
                defaults.scene_fallback_interval,
            ),
            job_timeout: Duration::from_secs(env_parse(
                "WORKER_JOB_TIMEOUT",
                defaults.job_timeout.as_secs(),
            )),
            claim_interval: Duration::from_secs(env_parse(
                "WORKER_CLAIM_INTERVAL_SECS",
                defaults.claim_interval.as_secs(),
            )),
            claim_min_idle: Duration::from_secs(env_parse(
                "WORKER_CLAIM_MIN_IDLE_SECS",
                defaults.claim_min_idle.as_secs(),
            )),
            subprocess_timeout: Duration::from_secs(env_parse(
                "WORKER_SUBPROCESS_TIMEOUT",
                defaults.subprocess_timeout.as_secs(),
            )),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.max_caption_parallel, 8);
        assert_eq!(config.subprocess_timeout, Duration::from_secs(600));
    }
}
