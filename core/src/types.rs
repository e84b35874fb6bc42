/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::input::{greater_than_zero, parse_builder_spec, port_in_range};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "Remote Build", display_name = "Remote Build", bin_name = "remote-build-server", author = "Wavelens", version, about, long_about = None)]
pub struct Cli {
    #[arg(long, env = "REMOTE_BUILD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    #[arg(long, env = "REMOTE_BUILD_LOG_JSON", default_value = "false")]
    pub log_json: bool,
    #[arg(long, env = "REMOTE_BUILD_IP", default_value = "127.0.0.1")]
    pub ip: String,
    #[arg(long, env = "REMOTE_BUILD_PORT", value_parser = port_in_range, default_value_t = 3000)]
    pub port: u16,
    #[arg(long, env = "REMOTE_BUILD_BASE_PATH", default_value = "./builds")]
    pub base_path: String,
    #[arg(long, env = "REMOTE_BUILD_MAX_BUILDS_IN_QUEUE", value_parser = greater_than_zero::<usize>, default_value = "10")]
    pub max_builds_in_queue: usize,
    #[arg(long, env = "REMOTE_BUILD_MAX_BUILDS_TO_KEEP", value_parser = greater_than_zero::<usize>, default_value = "20")]
    pub max_builds_to_keep: usize,
    #[arg(long, env = "REMOTE_BUILD_DELETE_BUILDS_ON_SHUTDOWN", default_value = "false")]
    pub delete_builds_on_shutdown: bool,
    #[arg(long, env = "REMOTE_BUILD_BUILD_TIMEOUT", value_parser = greater_than_zero::<u64>)]
    pub build_timeout: Option<u64>,
    #[arg(long = "builder", env = "REMOTE_BUILD_BUILDERS", value_delimiter = ',', value_parser = parse_builder_spec)]
    pub builders: Vec<BuilderSpec>,
    #[arg(long, env = "REMOTE_BUILD_ARTIFACT_DIR", default_value = "bin")]
    pub artifact_dir: String,
    #[arg(long, env = "REMOTE_BUILD_DEFAULT_PLATFORM", default_value = "ios")]
    pub default_platform: String,
    #[arg(long, env = "REMOTE_BUILD_REPORT_ERRORS", default_value = "false")]
    pub report_errors: bool,
    #[arg(long, env = "REMOTE_BUILD_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

impl Cli {
    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(&self.base_path)
    }

    pub fn build_deadline(&self) -> Option<Duration> {
        self.build_timeout.map(Duration::from_secs)
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSpec {
    pub platform: String,
    pub program: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BaseResponse<T> {
    pub error: bool,
    pub message: T,
}
