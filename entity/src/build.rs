/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::manifest::ChangeManifest;

pub const BUILD_LOG_FILE: &str = "build.log";
pub const APP_DIR_NAME: &str = "app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BuildStatus {
    Uploading,
    Uploaded,
    Extracted,
    Building,
    Complete,
    Invalid,
    Error,
    Downloaded,
    Emulated,
    Running,
    Installed,
    Debugging,
}

impl BuildStatus {
    /// States a build may be deleted from by retention.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::Complete
                | BuildStatus::Downloaded
                | BuildStatus::Error
                | BuildStatus::Emulated
                | BuildStatus::Invalid
        )
    }

    /// States only reachable after a successful build.
    pub fn is_post_build(self) -> bool {
        matches!(
            self,
            BuildStatus::Downloaded
                | BuildStatus::Emulated
                | BuildStatus::Running
                | BuildStatus::Installed
                | BuildStatus::Debugging
        )
    }

    pub fn can_transition_to(self, next: BuildStatus) -> bool {
        use BuildStatus::*;

        match self {
            Uploading => matches!(next, Uploaded | Error),
            Uploaded => matches!(next, Extracted | Error),
            Extracted => matches!(next, Building | Error),
            Building => matches!(next, Complete | Invalid | Error),
            Complete => next.is_post_build(),
            Downloaded | Emulated | Running | Installed | Debugging => next.is_post_build(),
            Invalid | Error => false,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStatus::Uploading => "Uploading",
            BuildStatus::Uploaded => "Uploaded",
            BuildStatus::Extracted => "Extracted",
            BuildStatus::Building => "Building",
            BuildStatus::Complete => "Complete",
            BuildStatus::Invalid => "Invalid",
            BuildStatus::Error => "Error",
            BuildStatus::Downloaded => "Downloaded",
            BuildStatus::Emulated => "Emulated",
            BuildStatus::Running => "Running",
            BuildStatus::Installed => "Installed",
            BuildStatus::Debugging => "Debugging",
        };

        f.write_str(name)
    }
}

impl FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uploading" => Ok(BuildStatus::Uploading),
            "uploaded" => Ok(BuildStatus::Uploaded),
            "extracted" => Ok(BuildStatus::Extracted),
            "building" => Ok(BuildStatus::Building),
            "complete" => Ok(BuildStatus::Complete),
            "invalid" => Ok(BuildStatus::Invalid),
            "error" => Ok(BuildStatus::Error),
            "downloaded" => Ok(BuildStatus::Downloaded),
            "emulated" => Ok(BuildStatus::Emulated),
            "running" => Ok(BuildStatus::Running),
            "installed" => Ok(BuildStatus::Installed),
            "debugging" => Ok(BuildStatus::Debugging),
            _ => Err(format!("unknown build status `{}`", s)),
        }
    }
}

/// What a client asked for when submitting a build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub command: String,
    pub configuration: String,
    pub platform: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub build_number: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl BuildRequest {
    pub fn new(platform: &str) -> Self {
        BuildRequest {
            command: "build".to_string(),
            configuration: "release".to_string(),
            platform: platform.to_string(),
            options: BTreeMap::new(),
            build_number: None,
            language: None,
            log_level: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub build_number: u64,
    pub status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_message_args: Vec<String>,
    pub status_time: DateTime<Utc>,
    pub submission_time: DateTime<Utc>,
    pub build_command: String,
    pub configuration: String,
    pub build_platform: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    pub build_dir: PathBuf,
    #[serde(default)]
    pub build_lang: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub build_successful: bool,
    #[serde(default)]
    pub tgz_file_path: Option<PathBuf>,
    #[serde(default)]
    pub app_dir: Option<PathBuf>,
    #[serde(default)]
    pub change_list: Option<ChangeManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BuildRecord {
    pub fn new(build_number: u64, request: &BuildRequest, build_dir: PathBuf) -> Self {
        let now = Utc::now();

        BuildRecord {
            build_number,
            status: BuildStatus::Uploading,
            status_message: Some("UploadingBuild".to_string()),
            status_message_args: vec![],
            status_time: now,
            submission_time: now,
            build_command: request.command.clone(),
            configuration: request.configuration.clone(),
            build_platform: request.platform.clone(),
            options: request.options.clone(),
            build_dir,
            build_lang: request.language.clone(),
            log_level: request.log_level.clone(),
            build_successful: false,
            tgz_file_path: None,
            app_dir: None,
            change_list: None,
            message: None,
        }
    }

    /// Moves the record to `status` if the state machine allows it.
    ///
    /// Returns `false` and leaves the record untouched on a backward or
    /// otherwise illegal transition.
    pub fn update_status(
        &mut self,
        status: BuildStatus,
        message: Option<&str>,
        args: Vec<String>,
    ) -> bool {
        if !self.status.can_transition_to(status) {
            return false;
        }

        self.status = status;
        self.status_message = message.map(str::to_string);
        self.status_message_args = args;
        self.status_time = Utc::now();

        if status == BuildStatus::Complete {
            self.build_successful = true;
        }

        true
    }

    pub fn log_path(&self) -> PathBuf {
        self.build_dir.join(BUILD_LOG_FILE)
    }

    pub fn default_app_dir(&self) -> PathBuf {
        self.build_dir.join(APP_DIR_NAME)
    }

    pub fn upload_path(&self) -> PathBuf {
        self.build_dir.join(format!("upload_{}.tgz", self.build_number))
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}
