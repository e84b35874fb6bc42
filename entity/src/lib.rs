/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod build;
pub mod manifest;
pub mod metrics;

pub use build::{BuildRecord, BuildStatus};
pub use manifest::ChangeManifest;
pub use metrics::{BuildMetrics, BuildSnapshot};
