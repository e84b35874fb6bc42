/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use builder::ServerState;
use entity::build::BuildRequest;
use entity::{BuildRecord, BuildStatus};
use flate2::Compression;
use flate2::write::GzEncoder;
use remote_core::registry::BuilderRegistry;
use remote_core::remote::{ActionOutcome, ActionParams, ArtifactDownload, BuildResult, RemoteBuilder};
use remote_core::types::Cli;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const BUILD_LOG: &str = "line one\nline two\n";

#[derive(Debug)]
pub struct FakeBuilder;

#[async_trait]
impl RemoteBuilder for FakeBuilder {
    fn name(&self) -> &str {
        "fake"
    }

    fn validate_build_request(&self, request: &BuildRequest) -> Vec<String> {
        match request.configuration.as_str() {
            "debug" | "release" => vec![],
            other => vec![format!("Unsupported configuration `{}`", other)],
        }
    }

    async fn build(&self, _build: &BuildRecord, log: &Path) -> BuildResult {
        tokio::fs::write(log, BUILD_LOG).await.unwrap();
        BuildResult::complete()
    }

    async fn download_build(&self, build: &BuildRecord) -> anyhow::Result<ArtifactDownload> {
        let file_name = format!("artifacts_{}.tgz", build.build_number);
        let path = build.build_dir.join(&file_name);
        tokio::fs::write(&path, b"artifact").await?;

        Ok(ArtifactDownload { path, file_name })
    }

    async fn emulate_build(
        &self,
        build: &BuildRecord,
        params: &ActionParams,
    ) -> anyhow::Result<ActionOutcome> {
        Ok(ActionOutcome {
            message: format!(
                "emulating build {} on {}",
                build.build_number,
                params.get("device").map(String::as_str).unwrap_or("default")
            ),
        })
    }
}

pub fn create_mock_cli(base_path: &Path) -> Cli {
    Cli {
        log_level: "info".to_string(),
        log_json: false,
        ip: "127.0.0.1".to_string(),
        port: 3000,
        base_path: base_path.display().to_string(),
        max_builds_in_queue: 10,
        max_builds_to_keep: 20,
        delete_builds_on_shutdown: false,
        build_timeout: None,
        builders: vec![],
        artifact_dir: "bin".to_string(),
        default_platform: "fake".to_string(),
        report_errors: false,
        sentry_dsn: None,
    }
}

pub fn create_mock_state(base_path: &Path) -> Arc<ServerState> {
    let mut registry = BuilderRegistry::new();
    registry.register("fake", Arc::new(FakeBuilder));

    Arc::new(ServerState::new(create_mock_cli(base_path), Arc::new(registry)))
}

pub fn create_server(state: Arc<ServerState>) -> TestServer {
    TestServer::new(web::create_router(state)).unwrap()
}

pub fn project_archive() -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut archive = tar::Builder::new(encoder);

    let data = b"<widget id=\"io.example.app\"/>";
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    archive
        .append_data(&mut header, "project/config.xml", &data[..])
        .unwrap();

    archive.into_inner().unwrap().finish().unwrap()
}

pub async fn wait_for_status(state: &ServerState, build_number: u64, status: BuildStatus) -> BuildRecord {
    for _ in 0..500 {
        if let Some(record) = state.builds.get_build(build_number) {
            if record.status == status {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("build {} never reached {}", build_number, status);
}
