/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};

use super::build::BuildRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildMetrics {
    pub submitted: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub failed: u64,
    pub succeeded: u64,
    pub downloaded: u64,
}

/// Point in time copy of everything the build manager knows about.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSnapshot {
    pub metrics: BuildMetrics,
    pub queue_length: usize,
    pub current_build: Option<BuildRecord>,
    pub queued_builds: Vec<BuildRecord>,
    pub all_builds: Vec<BuildRecord>,
}
