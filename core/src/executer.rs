/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use entity::BuildRecord;
use entity::build::BuildRequest;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::fs::OpenOptions;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::consts::*;
use super::input::{valid_command, valid_configuration, valid_identifier};
use super::remote::*;

/// Builder that delegates to an external program.
///
/// The program is called as `<program> <action> --platform <p> --configuration
/// <c> --build-number <n> [--option key=value]...` from inside the extracted
/// app directory.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    platform: String,
    program: String,
    artifact_dir: String,
}

impl CommandBuilder {
    pub fn new(platform: &str, program: &str, artifact_dir: &str) -> Self {
        CommandBuilder {
            platform: platform.to_string(),
            program: program.to_string(),
            artifact_dir: artifact_dir.to_string(),
        }
    }

    fn command(&self, action: &str, build: &BuildRecord) -> Result<Command> {
        let app_dir = build
            .app_dir
            .as_ref()
            .with_context(|| format!("build {} has no app directory", build.build_number))?;

        let mut command = Command::new(&self.program);
        command
            .arg(action)
            .arg("--platform")
            .arg(&build.build_platform)
            .arg("--configuration")
            .arg(&build.configuration)
            .arg("--build-number")
            .arg(build.build_number.to_string())
            .current_dir(app_dir)
            .env("REMOTE_BUILD_NUMBER", build.build_number.to_string())
            .env("REMOTE_BUILD_DIR", &build.build_dir)
            .kill_on_drop(true);

        for (key, value) in &build.options {
            command.arg("--option").arg(format!("{}={}", key, value));
        }

        if let Some(log_level) = &build.log_level {
            command.arg("--log-level").arg(log_level);
        }

        Ok(command)
    }

    async fn run_logged(&self, build: &BuildRecord, log: &Path) -> Result<ExitStatus> {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .await
            .with_context(|| format!("Failed to open build log {}", log.display()))?
            .into_std()
            .await;
        let stderr = log_file
            .try_clone()
            .context("Failed to duplicate build log handle")?;

        let mut command = self.command(&build.build_command, build)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr));

        debug!(program = %self.program, "Spawning build program");

        let status = command
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", self.program))?;

        Ok(status)
    }

    async fn run_action(
        &self,
        action: &str,
        build: &BuildRecord,
        params: &ActionParams,
    ) -> Result<ActionOutcome> {
        let mut command = self.command(action, build)?;
        for (key, value) in params {
            command.arg("--param").arg(format!("{}={}", key, value));
        }

        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to execute {} {}", self.program, action))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} {} failed: {}",
                self.program,
                action,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(ActionOutcome {
            message: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }
}

#[async_trait]
impl RemoteBuilder for CommandBuilder {
    fn name(&self) -> &str {
        &self.platform
    }

    async fn init(&self) -> Result<()> {
        if Path::new(&self.program).is_absolute() && !Path::new(&self.program).exists() {
            anyhow::bail!("Build program {} does not exist", self.program);
        }

        Ok(())
    }

    fn validate_build_request(&self, request: &BuildRequest) -> Vec<String> {
        let mut errors = Vec::new();

        if !valid_command(&request.command) {
            errors.push(format!("Unsupported build command `{}`", request.command));
        }

        if !valid_configuration(&request.configuration) {
            errors.push(format!(
                "Unsupported configuration `{}`, expected one of {}",
                request.configuration,
                SUPPORTED_CONFIGURATIONS.join(", ")
            ));
        }

        for key in request.options.keys() {
            if !valid_identifier(key) {
                errors.push(format!("Invalid option name `{}`", key));
            }
        }

        errors
    }

    async fn build(&self, build: &BuildRecord, log: &Path) -> BuildResult {
        info!(build_number = build.build_number, platform = %self.platform, "Running build program");

        match self.run_logged(build, log).await {
            Ok(status) if status.success() => BuildResult::complete(),
            Ok(status) if status.code() == Some(INVALID_BUILD_EXIT_CODE) => {
                BuildResult::invalid("InvalidBuildRequest", vec![self.program.clone()])
            }
            Ok(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                BuildResult::error("BuildFailed", vec![code])
            }
            Err(e) => {
                warn!(error = %e, "Build program could not be run");
                BuildResult::error("BuildFailedWithError", vec![format!("{:#}", e)])
            }
        }
    }

    async fn download_build(&self, build: &BuildRecord) -> Result<ArtifactDownload> {
        let app_dir = build
            .app_dir
            .clone()
            .with_context(|| format!("build {} has no app directory", build.build_number))?;
        let source = app_dir.join(&self.artifact_dir);

        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            anyhow::bail!("No artifacts found in {}", source.display());
        }

        let file_name = format!("artifacts_{}.tgz", build.build_number);
        let target = build.build_dir.join(&file_name);
        let prefix = format!("build_{}", build.build_number);

        let archive = target.clone();
        tokio::task::spawn_blocking(move || pack_directory(&source, &archive, &prefix))
            .await
            .context("Packing task panicked")??;

        Ok(ArtifactDownload {
            path: target,
            file_name,
        })
    }

    async fn emulate_build(
        &self,
        build: &BuildRecord,
        params: &ActionParams,
    ) -> Result<ActionOutcome> {
        self.run_action(ACTION_EMULATE, build, params).await
    }

    async fn deploy_build(
        &self,
        build: &BuildRecord,
        params: &ActionParams,
    ) -> Result<ActionOutcome> {
        self.run_action(ACTION_DEPLOY, build, params).await
    }

    async fn run_build(&self, build: &BuildRecord, params: &ActionParams) -> Result<ActionOutcome> {
        self.run_action(ACTION_RUN, build, params).await
    }

    async fn debug_build(
        &self,
        build: &BuildRecord,
        params: &ActionParams,
    ) -> Result<ActionOutcome> {
        self.run_action(ACTION_DEBUG, build, params).await
    }
}

/// Writes `source` into a gzip compressed tarball at `target`, rooted at `prefix`.
pub fn pack_directory(source: &Path, target: &Path, prefix: &str) -> Result<()> {
    let file = File::create(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    archive
        .append_dir_all(prefix, source)
        .with_context(|| format!("Failed to pack {}", source.display()))?;

    archive
        .into_inner()
        .context("Failed to finish tarball")?
        .finish()
        .context("Failed to finish compression")?;

    Ok(())
}
