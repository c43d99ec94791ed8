use crate::document::DocumentReader;
use crate::job_report::JobReport;
use crate::progress_tracker::ProgressTracker;
use crate::restorer::{RestoreOutcome, TreeRestorer};

use ie_archive::ArchiveGate;
use ie_config::{ArchiveConfig, RetryConfig};
use ie_core::{
    FailureLog, JobContext, ObjectStore, ProgressStore, RelationConfig, Result, UserDirectory,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use tokio_util::sync::CancellationToken;

/// Validates an archive, then restores it into an existing target root.
pub struct ImportService {
    store: Arc<dyn ObjectStore>,
    users: Arc<dyn UserDirectory>,
    progress: Arc<dyn ProgressStore>,
    failures: Arc<dyn FailureLog>,
    config: Arc<RelationConfig>,
    archive: ArchiveConfig,
    retry: RetryConfig,
    work_dir: PathBuf,
    cancel: CancellationToken,
}

impl ImportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        users: Arc<dyn UserDirectory>,
        progress: Arc<dyn ProgressStore>,
        failures: Arc<dyn FailureLog>,
        config: Arc<RelationConfig>,
        archive: ArchiveConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            store,
            users,
            progress,
            failures,
            config,
            archive,
            retry,
            work_dir: std::env::temp_dir(),
            cancel: CancellationToken::new(),
        }
    }

    /// Directory that receives `ie-import-<correlation id>` extractions.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Never fails: errors are logged in full and reported redacted.
    pub async fn import(&self, archive: &Path, ctx: &JobContext) -> JobReport {
        match self.run(archive, ctx).await {
            Ok(report) => report,
            Err(e) => {
                error!(
                    "Import {} into {} {} failed: {}",
                    ctx.correlation_id, ctx.target.class, ctx.target.id, e
                );
                JobReport::failed(&e)
            }
        }
    }

    async fn run(&self, archive: &Path, ctx: &JobContext) -> Result<JobReport> {
        let extract_dir = self
            .work_dir
            .join(format!("ie-import-{}", ctx.correlation_id));
        let gate = ArchiveGate::new(self.archive.clone()).with_cancellation(self.cancel.clone());
        let trusted = gate.open(archive, &extract_dir).await?;

        let result = self.restore(trusted.dir(), ctx).await;
        trusted.cleanup();
        let outcome = result?;

        info!(
            "Import {} finished: success={} errors={}",
            ctx.correlation_id,
            outcome.success,
            outcome.errors.len()
        );
        Ok(JobReport {
            success: outcome.success,
            errors: outcome.errors,
            counts: outcome.counts,
            archive: None,
        })
    }

    async fn restore(&self, dir: &Path, ctx: &JobContext) -> Result<RestoreOutcome> {
        let reader = DocumentReader::open(dir, self.config.root_name())?;
        let tracker = ProgressTracker::new(Arc::clone(&self.progress), Arc::clone(&self.failures), ctx);
        let restorer = TreeRestorer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.users),
            Arc::clone(&self.config),
            tracker,
            self.retry.clone(),
        );
        restorer.restore(&reader, ctx).await
    }
}
