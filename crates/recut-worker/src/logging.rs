//! Structured job logging.

use tracing::{error, info, warn};

use recut_models::JobId;

/// Logger attaching `job_id` and `operation` to lifecycle events.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn start(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "job started: {message}");
    }

    pub fn progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "job progress: {message}");
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = %self.operation, "job warning: {message}");
    }

    pub fn failure(&self, message: &str) {
        error!(job_id = %self.job_id, operation = %self.operation, "job error: {message}");
    }

    pub fn completion(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "job completed: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_construction() {
        let id = JobId::from_string("job-1");
        let logger = JobLogger::new(&id, "pipeline");
        assert_eq!(logger.job_id, "job-1");
        assert_eq!(logger.operation, "pipeline");
    }
}
