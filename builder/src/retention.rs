/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::{DateTime, Utc};
use entity::{BuildRecord, BuildStatus};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// What retention needs to know about a build to decide whether to drop it.
pub trait RetainedBuild {
    fn status(&self) -> BuildStatus;
    fn submission_time(&self) -> DateTime<Utc>;
    fn build_dir(&self) -> PathBuf;
}

impl RetainedBuild for BuildRecord {
    fn status(&self) -> BuildStatus {
        self.status
    }

    fn submission_time(&self) -> DateTime<Utc> {
        self.submission_time
    }

    fn build_dir(&self) -> PathBuf {
        self.build_dir.clone()
    }
}

impl<T: RetainedBuild> RetainedBuild for Arc<T> {
    fn status(&self) -> BuildStatus {
        (**self).status()
    }

    fn submission_time(&self) -> DateTime<Utc> {
        (**self).submission_time()
    }

    fn build_dir(&self) -> PathBuf {
        (**self).build_dir()
    }
}

#[derive(Debug, Clone)]
pub struct BuildRetention {
    max_builds_to_keep: usize,
    deleting: Arc<Mutex<HashSet<u64>>>,
}

impl BuildRetention {
    pub fn new(max_builds_to_keep: usize) -> Self {
        BuildRetention {
            max_builds_to_keep,
            deleting: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether the directory of a purged build is still being removed.
    pub fn is_deleting(&self, build_number: u64) -> bool {
        lock(&self.deleting).contains(&build_number)
    }

    /// Drops the oldest finished builds until at most `max_builds_to_keep`
    /// remain, or no finished build is left.
    ///
    /// Build directories are removed in the background. Returns the build
    /// numbers that were dropped, oldest first.
    pub fn purge<B: RetainedBuild>(&self, builds: &mut HashMap<u64, B>) -> Vec<u64> {
        let excess = builds.len().saturating_sub(self.max_builds_to_keep);
        if excess == 0 {
            return vec![];
        }

        let mut eligible: Vec<(DateTime<Utc>, u64)> = builds
            .iter()
            .filter(|(_, build)| build.status().is_terminal())
            .map(|(build_number, build)| (build.submission_time(), *build_number))
            .collect();
        eligible.sort();

        let purged: Vec<u64> = eligible
            .into_iter()
            .take(excess)
            .map(|(_, build_number)| build_number)
            .collect();

        for build_number in &purged {
            if let Some(build) = builds.remove(build_number) {
                info!(build_number, "Purging build");
                lock(&self.deleting).insert(*build_number);
                delete_in_background(*build_number, build.build_dir(), Arc::clone(&self.deleting));
            }
        }

        purged
    }

    /// Deletes every build directory before returning and empties `builds`.
    pub fn delete_all_sync<B: RetainedBuild>(&self, builds: &mut HashMap<u64, B>) {
        info!(count = builds.len(), "Deleting all builds");

        for (build_number, build) in builds.drain() {
            if let Err(e) = remove_build_dir(&build.build_dir()) {
                warn!(build_number, error = %e, "Failed to delete build directory");
            }
        }
    }
}

fn lock(deleting: &Mutex<HashSet<u64>>) -> std::sync::MutexGuard<'_, HashSet<u64>> {
    deleting.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remove_build_dir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

fn delete_in_background(build_number: u64, dir: PathBuf, deleting: Arc<Mutex<HashSet<u64>>>) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        std::thread::spawn(move || {
            if let Err(e) = remove_build_dir(&dir) {
                warn!(dir = %dir.display(), error = %e, "Failed to delete build directory");
            }
            lock(&deleting).remove(&build_number);
        });
        return;
    };

    handle.spawn(async move {
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Deleted build directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to delete build directory"),
        }
        lock(&deleting).remove(&build_number);
    });
}
