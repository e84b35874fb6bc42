/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Interfaces between the build manager and the tools that actually build
//! packages.
//!
//! A [`RemoteBuilder`] owns everything platform specific: validating a request,
//! running the build and every action that needs a finished build (download,
//! emulate, deploy, run, debug). A [`BuilderResolver`] picks the builder that
//! serves a given request.

use anyhow::bail;
use async_trait::async_trait;
use entity::build::BuildRequest;
use entity::{BuildRecord, BuildStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type ActionParams = BTreeMap<String, String>;

/// Outcome of a build as reported by a builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub status: BuildStatus,
    pub message: Option<String>,
    pub args: Vec<String>,
}

impl BuildResult {
    pub fn complete() -> Self {
        BuildResult {
            status: BuildStatus::Complete,
            message: Some("BuildSucceeded".to_string()),
            args: vec![],
        }
    }

    pub fn invalid(message: &str, args: Vec<String>) -> Self {
        BuildResult {
            status: BuildStatus::Invalid,
            message: Some(message.to_string()),
            args,
        }
    }

    pub fn error(message: &str, args: Vec<String>) -> Self {
        BuildResult {
            status: BuildStatus::Error,
            message: Some(message.to_string()),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDownload {
    pub path: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub message: String,
}

#[async_trait]
pub trait RemoteBuilder: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returns every problem with the request, empty if it can be built.
    fn validate_build_request(&self, request: &BuildRequest) -> Vec<String>;

    /// Runs the build in `build.app_dir`, appending tool output to `log`.
    async fn build(&self, build: &BuildRecord, log: &Path) -> BuildResult;

    async fn download_build(&self, build: &BuildRecord) -> anyhow::Result<ArtifactDownload> {
        bail!("{} does not provide downloads for build {}", self.name(), build.build_number)
    }

    async fn emulate_build(
        &self,
        build: &BuildRecord,
        _params: &ActionParams,
    ) -> anyhow::Result<ActionOutcome> {
        bail!("{} cannot emulate build {}", self.name(), build.build_number)
    }

    async fn deploy_build(
        &self,
        build: &BuildRecord,
        _params: &ActionParams,
    ) -> anyhow::Result<ActionOutcome> {
        bail!("{} cannot deploy build {}", self.name(), build.build_number)
    }

    async fn run_build(
        &self,
        build: &BuildRecord,
        _params: &ActionParams,
    ) -> anyhow::Result<ActionOutcome> {
        bail!("{} cannot run build {}", self.name(), build.build_number)
    }

    async fn debug_build(
        &self,
        build: &BuildRecord,
        _params: &ActionParams,
    ) -> anyhow::Result<ActionOutcome> {
        bail!("{} cannot debug build {}", self.name(), build.build_number)
    }
}

pub trait BuilderResolver: Send + Sync {
    fn resolve(&self, request: &BuildRequest) -> Option<Arc<dyn RemoteBuilder>>;
}
