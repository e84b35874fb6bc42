/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::{DateTime, Utc};
use entity::build::BuildRequest;
use entity::{BuildMetrics, BuildRecord, BuildSnapshot, BuildStatus};
use remote_core::consts::BUILD_NUMBER_SEED_FACTOR;
use remote_core::remote::*;
use remote_core::types::Cli;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use super::extract::extract_file;
use super::retention::{BuildRetention, RetainedBuild};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Build queue is full, {0} builds are waiting")]
    QueueFull(usize),
    #[error("No builder available for platform `{0}`")]
    Unsupported(String),
    #[error("Invalid build request: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Build {0} already exists")]
    DuplicateBuildNumber(u64),
    #[error("Failed to receive upload for build {build_number}: {source}")]
    Upload {
        build_number: u64,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create build directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Build {0} not found")]
    NotFound(u64),
    #[error("Build {0} did not complete successfully")]
    NotAvailable(u64),
    #[error(transparent)]
    Builder(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct BuildManagerConfig {
    pub base_dir: PathBuf,
    pub max_builds_in_queue: usize,
    pub max_builds_to_keep: usize,
    pub delete_builds_on_shutdown: bool,
    pub build_timeout: Option<Duration>,
}

impl BuildManagerConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        BuildManagerConfig {
            base_dir: base_dir.into(),
            max_builds_in_queue: 10,
            max_builds_to_keep: 20,
            delete_builds_on_shutdown: false,
            build_timeout: None,
        }
    }
}

impl From<&Cli> for BuildManagerConfig {
    fn from(cli: &Cli) -> Self {
        BuildManagerConfig {
            base_dir: cli.base_dir(),
            max_builds_in_queue: cli.max_builds_in_queue,
            max_builds_to_keep: cli.max_builds_to_keep,
            delete_builds_on_shutdown: cli.delete_builds_on_shutdown,
            build_timeout: cli.build_deadline(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PostBuildAction {
    Emulate,
    Deploy,
    Run,
    Debug,
}

impl PostBuildAction {
    fn status(self) -> BuildStatus {
        match self {
            PostBuildAction::Emulate => BuildStatus::Emulated,
            PostBuildAction::Deploy => BuildStatus::Installed,
            PostBuildAction::Run => BuildStatus::Running,
            PostBuildAction::Debug => BuildStatus::Debugging,
        }
    }

    fn message(self) -> &'static str {
        match self {
            PostBuildAction::Emulate => "BuildEmulated",
            PostBuildAction::Deploy => "BuildDeployed",
            PostBuildAction::Run => "BuildRunning",
            PostBuildAction::Debug => "BuildDebugging",
        }
    }
}

/// A build record together with the builder that serves it.
#[derive(Debug)]
struct BuildEntry {
    record: Mutex<BuildRecord>,
    builder: Arc<dyn RemoteBuilder>,
}

impl BuildEntry {
    fn record(&self) -> MutexGuard<'_, BuildRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> BuildRecord {
        self.record().clone()
    }
}

impl RetainedBuild for BuildEntry {
    fn status(&self) -> BuildStatus {
        self.record().status
    }

    fn submission_time(&self) -> DateTime<Utc> {
        self.record().submission_time
    }

    fn build_dir(&self) -> PathBuf {
        self.record().build_dir.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadStage {
    Registered,
    Receiving,
    Settled,
}

/// Cleans up a submission that stops before its upload is stored.
///
/// A registered build without a directory is dropped again and counts as
/// rejected. A build whose upload was cut off ends as ERROR and counts as
/// failed.
struct PendingUpload<'a> {
    manager: &'a BuildManager,
    build_number: u64,
    stage: UploadStage,
}

impl<'a> PendingUpload<'a> {
    fn new(manager: &'a BuildManager, build_number: u64) -> Self {
        PendingUpload {
            manager,
            build_number,
            stage: UploadStage::Registered,
        }
    }

    fn receiving(&mut self) {
        self.stage = UploadStage::Receiving;
    }

    fn settle(&mut self) {
        self.stage = UploadStage::Settled;
    }
}

impl Drop for PendingUpload<'_> {
    fn drop(&mut self) {
        let build_number = self.build_number;

        match self.stage {
            UploadStage::Registered => {
                self.manager.builds_mut().remove(&build_number);
                self.manager.count(|m| m.rejected += 1);
            }
            UploadStage::Receiving => {
                warn!(build_number, "Upload stopped before it was stored");
                self.manager.transition(build_number, BuildStatus::Error, "UploadFailed", vec![
                    "upload cancelled".to_string(),
                ]);
                self.manager.count(|m| m.failed += 1);
            }
            UploadStage::Settled => {}
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    current: Option<u64>,
    queued: VecDeque<u64>,
}

/// Accepts uploads and runs their builds one at a time in arrival order.
pub struct BuildManager {
    config: BuildManagerConfig,
    resolver: Arc<dyn BuilderResolver>,
    retention: BuildRetention,
    builds: RwLock<HashMap<u64, Arc<BuildEntry>>>,
    queue: Mutex<QueueState>,
    counter: AtomicU64,
    metrics: Mutex<BuildMetrics>,
}

impl BuildManager {
    pub fn new(config: BuildManagerConfig, resolver: Arc<dyn BuilderResolver>) -> Self {
        let seed = u64::from(std::process::id()) * BUILD_NUMBER_SEED_FACTOR;

        BuildManager {
            retention: BuildRetention::new(config.max_builds_to_keep),
            config,
            resolver,
            builds: RwLock::new(HashMap::new()),
            queue: Mutex::new(QueueState::default()),
            counter: AtomicU64::new(seed),
            metrics: Mutex::new(BuildMetrics::default()),
        }
    }

    /// Registers a build and stores its upload.
    ///
    /// Returns once the archive is on disk; extraction and the build itself
    /// continue in the background.
    #[instrument(skip(self, request, upload), fields(platform = %request.platform))]
    pub async fn submit<R>(
        self: &Arc<Self>,
        request: BuildRequest,
        mut upload: R,
    ) -> Result<BuildRecord, SubmissionError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.count(|m| m.submitted += 1);

        let queue_length = self.queue_length();
        if queue_length >= self.config.max_builds_in_queue {
            warn!(queue_length, "Rejecting build, queue is full");
            self.count(|m| m.rejected += 1);
            return Err(SubmissionError::QueueFull(queue_length));
        }

        let Some(builder) = self.resolver.resolve(&request) else {
            warn!("Rejecting build, no builder for platform");
            self.count(|m| m.rejected += 1);
            return Err(SubmissionError::Unsupported(request.platform));
        };

        let errors = builder.validate_build_request(&request);
        if !errors.is_empty() {
            warn!(?errors, "Rejecting invalid build request");
            self.count(|m| m.rejected += 1);
            return Err(SubmissionError::Validation(errors));
        }

        let (build_number, build_dir, entry) = match self.register(&request, builder) {
            Ok(registered) => registered,
            Err(e) => {
                self.count(|m| m.rejected += 1);
                return Err(e);
            }
        };
        let mut pending = PendingUpload::new(self, build_number);

        if let Err(source) = tokio::fs::create_dir_all(&build_dir).await {
            error!(build_number, error = %source, "Failed to create build directory");
            return Err(SubmissionError::Io {
                path: build_dir,
                source,
            });
        }

        self.count(|m| m.accepted += 1);
        pending.receiving();
        info!(build_number, "Accepted build, receiving upload");

        let upload_path = build_dir.join(format!("upload_{}.tgz", build_number));
        let stored = store_upload(&upload_path, &mut upload).await;
        pending.settle();

        match stored {
            Ok(bytes) => debug!(build_number, bytes, "Stored upload"),
            Err(source) => {
                warn!(build_number, error = %source, "Upload failed");
                self.transition(build_number, BuildStatus::Error, "UploadFailed", vec![
                    source.to_string(),
                ]);
                self.count(|m| m.failed += 1);
                return Err(SubmissionError::Upload {
                    build_number,
                    source,
                });
            }
        }

        let record = {
            let mut record = entry.record();
            record.tgz_file_path = Some(upload_path);
            record.update_status(BuildStatus::Uploaded, Some("UploadedBuild"), vec![]);
            record.clone()
        };

        tokio::spawn(Arc::clone(self).begin_build(build_number));

        Ok(record)
    }

    pub fn get_build(&self, build_number: u64) -> Option<BuildRecord> {
        self.entry(build_number).map(|entry| entry.snapshot())
    }

    pub fn get_all_builds(&self) -> BuildSnapshot {
        let (current, queued) = {
            let queue = self.queue();
            (queue.current, queue.queued.iter().copied().collect::<Vec<_>>())
        };

        let builds = self.builds();
        let mut all_builds: Vec<BuildRecord> =
            builds.values().map(|entry| entry.snapshot()).collect();
        all_builds.sort_by_key(|record| record.build_number);

        BuildSnapshot {
            metrics: self.metrics(),
            queue_length: queued.len(),
            current_build: current
                .and_then(|n| builds.get(&n))
                .map(|entry| entry.snapshot()),
            queued_builds: queued
                .iter()
                .filter_map(|n| builds.get(n))
                .map(|entry| entry.snapshot())
                .collect(),
            all_builds,
        }
    }

    pub fn metrics(&self) -> BuildMetrics {
        *self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn queue_length(&self) -> usize {
        self.queue().queued.len()
    }

    pub fn current_build(&self) -> Option<u64> {
        self.queue().current
    }

    #[instrument(skip(self))]
    pub async fn download_build(&self, build_number: u64) -> Result<ArtifactDownload, ActionError> {
        let (builder, record) = self.successful_build(build_number)?;
        let download = builder.download_build(&record).await?;

        self.transition(build_number, BuildStatus::Downloaded, "BuildDownloaded", vec![]);
        self.count(|m| m.downloaded += 1);
        info!(file = %download.file_name, "Build downloaded");

        Ok(download)
    }

    pub async fn emulate_build(
        &self,
        build_number: u64,
        params: &ActionParams,
    ) -> Result<ActionOutcome, ActionError> {
        self.perform(build_number, PostBuildAction::Emulate, params).await
    }

    pub async fn deploy_build(
        &self,
        build_number: u64,
        params: &ActionParams,
    ) -> Result<ActionOutcome, ActionError> {
        self.perform(build_number, PostBuildAction::Deploy, params).await
    }

    pub async fn run_build(
        &self,
        build_number: u64,
        params: &ActionParams,
    ) -> Result<ActionOutcome, ActionError> {
        self.perform(build_number, PostBuildAction::Run, params).await
    }

    pub async fn debug_build(
        &self,
        build_number: u64,
        params: &ActionParams,
    ) -> Result<ActionOutcome, ActionError> {
        self.perform(build_number, PostBuildAction::Debug, params).await
    }

    /// Drops every build and its directory if configured to do so.
    pub fn shutdown(&self) {
        if !self.config.delete_builds_on_shutdown {
            return;
        }

        let mut builds = self.builds_mut();
        self.retention.delete_all_sync(&mut *builds);
    }

    #[instrument(skip(self, params))]
    async fn perform(
        &self,
        build_number: u64,
        action: PostBuildAction,
        params: &ActionParams,
    ) -> Result<ActionOutcome, ActionError> {
        let (builder, record) = self.successful_build(build_number)?;

        let outcome = match action {
            PostBuildAction::Emulate => builder.emulate_build(&record, params).await?,
            PostBuildAction::Deploy => builder.deploy_build(&record, params).await?,
            PostBuildAction::Run => builder.run_build(&record, params).await?,
            PostBuildAction::Debug => builder.debug_build(&record, params).await?,
        };

        self.transition(build_number, action.status(), action.message(), vec![]);
        Ok(outcome)
    }

    fn successful_build(
        &self,
        build_number: u64,
    ) -> Result<(Arc<dyn RemoteBuilder>, BuildRecord), ActionError> {
        let entry = self
            .entry(build_number)
            .ok_or(ActionError::NotFound(build_number))?;
        let record = entry.snapshot();

        if !record.build_successful {
            return Err(ActionError::NotAvailable(build_number));
        }

        Ok((Arc::clone(&entry.builder), record))
    }

    #[instrument(skip(self))]
    async fn begin_build(self: Arc<Self>, build_number: u64) {
        let Some(record) = self.get_build(build_number) else {
            warn!("Build vanished before extraction");
            return;
        };

        let archive = record.tgz_file_path.clone().unwrap_or_else(|| record.upload_path());
        let app_dir = record.default_app_dir();

        match extract_file(archive, app_dir.clone()).await {
            Ok(change_list) => {
                if let Some(manifest) = &change_list {
                    debug!(deleted = manifest.deleted_files.len(), "Applied change list");
                }

                self.modify(build_number, |record| {
                    record.app_dir = Some(app_dir);
                    record.change_list = change_list;
                });
                self.transition(build_number, BuildStatus::Extracted, "ExtractedBuild", vec![]);
                self.enqueue_or_start(build_number);
            }
            Err(e) => {
                warn!(error = %e, "Extraction failed");
                self.transition(build_number, BuildStatus::Error, "ExtractionFailed", vec![
                    e.to_string(),
                ]);
                self.count(|m| m.failed += 1);
            }
        }
    }

    fn enqueue_or_start(self: &Arc<Self>, build_number: u64) {
        let mut queue = self.queue();

        if queue.current.is_none() {
            queue.current = Some(build_number);
            drop(queue);

            tokio::spawn(Arc::clone(self).drive(build_number));
            return;
        }

        if queue.queued.len() >= self.config.max_builds_in_queue {
            drop(queue);

            warn!(build_number, "Queue filled up during upload, dropping build");
            self.transition(build_number, BuildStatus::Error, "BuildQueueFull", vec![]);
            self.count(|m| m.rejected += 1);
            return;
        }

        queue.queued.push_back(build_number);
        let ahead = queue.queued.len();
        drop(queue);

        info!(build_number, ahead, "Queued build");
        self.modify(build_number, |record| {
            record.status_message = Some("BuildQueued".to_string());
            record.status_message_args = vec![ahead.to_string()];
        });
    }

    async fn drive(self: Arc<Self>, first: u64) {
        let mut next = Some(first);

        while let Some(build_number) = next {
            self.execute(build_number).await;
            next = self.advance_queue();
        }

        debug!("Build queue drained");
    }

    fn advance_queue(&self) -> Option<u64> {
        let mut queue = self.queue();
        queue.current = queue.queued.pop_front();
        queue.current
    }

    #[instrument(skip(self))]
    async fn execute(&self, build_number: u64) {
        let purged = {
            let mut builds = self.builds_mut();
            self.retention.purge(&mut *builds)
        };
        if !purged.is_empty() {
            info!(?purged, "Purged old builds");
        }

        let Some(entry) = self.entry(build_number) else {
            warn!("Build vanished before it could start");
            return;
        };

        let record = entry.snapshot();
        let app_dir = record.app_dir.clone().unwrap_or_else(|| record.default_app_dir());
        if !tokio::fs::try_exists(&app_dir).await.unwrap_or(false) {
            warn!(app_dir = %app_dir.display(), "Build directory is missing");
            self.transition(build_number, BuildStatus::Error, "BuildDirectoryNotFound", vec![
                app_dir.display().to_string(),
            ]);
            self.count(|m| m.failed += 1);
            return;
        }

        let Some(record) = self.transition(build_number, BuildStatus::Building, "Building", vec![])
        else {
            return;
        };

        info!(platform = %record.build_platform, "Starting build");
        let result = run_builder(Arc::clone(&entry.builder), record, self.config.build_timeout).await;
        self.finish(build_number, result);
    }

    fn finish(&self, build_number: u64, result: BuildResult) {
        let message = result.message.as_deref().unwrap_or(match result.status {
            BuildStatus::Complete => "BuildSucceeded",
            _ => "BuildFailed",
        });

        let record = match self.transition(build_number, result.status, message, result.args) {
            Some(record) => record,
            None => {
                warn!(status = %result.status, "Builder reported an unexpected status");
                match self.transition(build_number, BuildStatus::Error, "BuildFailedWithError", vec![
                    format!("unexpected status {}", result.status),
                ]) {
                    Some(record) => record,
                    None => return,
                }
            }
        };

        match record.status {
            BuildStatus::Complete => {
                info!("Build succeeded");
                self.count(|m| m.succeeded += 1);
            }
            BuildStatus::Invalid => {
                info!(args = ?record.status_message_args, "Build rejected by builder");
                self.count(|m| m.rejected += 1);
            }
            _ => {
                warn!(message = ?record.status_message, args = ?record.status_message_args, "Build failed");
                self.count(|m| m.failed += 1);
            }
        }
    }

    fn register(
        &self,
        request: &BuildRequest,
        builder: Arc<dyn RemoteBuilder>,
    ) -> Result<(u64, PathBuf, Arc<BuildEntry>), SubmissionError> {
        let mut builds = self.builds_mut();

        let build_number = match request.build_number {
            Some(n) if builds.contains_key(&n) || self.retention.is_deleting(n) => {
                return Err(SubmissionError::DuplicateBuildNumber(n));
            }
            Some(n) => n,
            None => loop {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                if !builds.contains_key(&n) && !self.retention.is_deleting(n) {
                    break n;
                }
            },
        };

        let build_dir = self.config.base_dir.join(build_number.to_string());
        let record = BuildRecord::new(build_number, request, build_dir.clone());

        let entry = Arc::new(BuildEntry {
            record: Mutex::new(record),
            builder,
        });
        builds.insert(build_number, Arc::clone(&entry));

        Ok((build_number, build_dir, entry))
    }

    /// Moves a build to `status`, returning the updated record.
    ///
    /// Illegal transitions leave the record untouched and return `None`.
    fn transition(
        &self,
        build_number: u64,
        status: BuildStatus,
        message: &str,
        args: Vec<String>,
    ) -> Option<BuildRecord> {
        let entry = self.entry(build_number)?;
        let mut record = entry.record();

        if !record.update_status(status, Some(message), args) {
            warn!(build_number, from = %record.status, to = %status, "Refusing status transition");
            return None;
        }

        debug!(build_number, %status, message, "Build status changed");
        Some(record.clone())
    }

    fn modify(&self, build_number: u64, f: impl FnOnce(&mut BuildRecord)) {
        if let Some(entry) = self.entry(build_number) {
            f(&mut entry.record());
        }
    }

    fn entry(&self, build_number: u64) -> Option<Arc<BuildEntry>> {
        self.builds().get(&build_number).cloned()
    }

    fn count(&self, f: impl FnOnce(&mut BuildMetrics)) {
        f(&mut self.metrics.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn builds(&self) -> RwLockReadGuard<'_, HashMap<u64, Arc<BuildEntry>>> {
        self.builds.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn builds_mut(&self) -> RwLockWriteGuard<'_, HashMap<u64, Arc<BuildEntry>>> {
        self.builds.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn store_upload<R>(path: &Path, upload: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(path).await?;
    let bytes = tokio::io::copy(upload, &mut file).await?;
    file.flush().await?;

    Ok(bytes)
}

// A panicking or overdue builder ends the build as ERROR.
async fn run_builder(
    builder: Arc<dyn RemoteBuilder>,
    record: BuildRecord,
    deadline: Option<Duration>,
) -> BuildResult {
    let task = tokio::spawn(async move {
        let log = record.log_path();
        builder.build(&record, &log).await
    });
    let abort = task.abort_handle();

    let joined = match deadline {
        Some(deadline) => match tokio::time::timeout(deadline, task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.abort();
                warn!(seconds = deadline.as_secs(), "Build timed out");
                return BuildResult::error("BuildTimedOut", vec![deadline.as_secs().to_string()]);
            }
        },
        None => task.await,
    };

    joined.unwrap_or_else(|e| {
        error!(error = %e, "Build task failed");
        BuildResult::error("BuildFailedWithError", vec![e.to_string()])
    })
}
