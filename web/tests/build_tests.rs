/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

mod common;

use common::*;
use entity::BuildStatus;
use http::StatusCode;
use serde_json::Value;

async fn submit_build(server: &axum_test::TestServer) -> u64 {
    let response = server
        .post("/build/tasks")
        .add_query_param("platform", "fake")
        .add_query_param("cfg", "Debug")
        .add_query_param("target", "device")
        .bytes(project_archive().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body = response.json::<Value>();
    body["buildNumber"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_server(create_mock_state(dir.path()));

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["error"], false);
    assert_eq!(body["message"], "200 ALIVE");
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_server(create_mock_state(dir.path()));

    let response = server.get("/api/organization").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], true);
}

#[tokio::test]
async fn test_submit_and_poll_build() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_mock_state(dir.path());
    let server = create_server(state.clone());

    let response = server
        .post("/build/tasks")
        .add_query_param("platform", "fake")
        .add_query_param("cfg", "Debug")
        .add_query_param("target", "device")
        .bytes(project_archive().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body = response.json::<Value>();
    let build_number = body["buildNumber"].as_u64().unwrap();

    let location = response.header("location");
    assert!(
        location
            .to_str()
            .unwrap()
            .ends_with(&format!("/build/tasks/{}", build_number))
    );
    assert_eq!(body["status"], "Uploaded");
    assert_eq!(body["configuration"], "debug");
    assert_eq!(body["buildPlatform"], "fake");
    assert_eq!(body["options"]["target"], "device");
    assert_eq!(body["message"], "Build archive uploaded");

    wait_for_status(&state, build_number, BuildStatus::Complete).await;

    let response = server.get(&format!("/build/tasks/{}", build_number)).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "Complete");
    assert_eq!(body["buildSuccessful"], true);
    assert_eq!(body["message"], "Build completed successfully");

    let response = server.get(&format!("/build/{}", build_number)).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["buildNumber"], build_number);

    assert!(dir.path().join(build_number.to_string()).join("app/config.xml").is_file());
}

#[tokio::test]
async fn test_rejected_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_mock_state(dir.path());
    let server = create_server(state.clone());

    let response = server
        .post("/build/tasks")
        .add_query_param("platform", "blackberry")
        .bytes(project_archive().into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], true);

    let response = server
        .post("/build/tasks")
        .add_query_param("cfg", "profile")
        .bytes(project_archive().into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/build/tasks")
        .add_query_param("buildNumber", "abc")
        .bytes(project_archive().into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let metrics = state.builds.metrics();
    assert_eq!(metrics.submitted, 2);
    assert_eq!(metrics.rejected, 2);
    assert!(state.builds.get_all_builds().all_builds.is_empty());
}

#[tokio::test]
async fn test_missing_build() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_server(create_mock_state(dir.path()));

    assert_eq!(server.get("/build/tasks/404").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/build/unknown").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/build/404/download").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/build/404/emulate").await.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/build/tasks/404/log").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "");
}

#[tokio::test]
async fn test_build_log_from_offset() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_mock_state(dir.path());
    let server = create_server(state.clone());

    let build_number = submit_build(&server).await;
    wait_for_status(&state, build_number, BuildStatus::Complete).await;

    let response = server.get(&format!("/build/tasks/{}/log", build_number)).await;
    response.assert_status_ok();
    assert_eq!(response.text(), BUILD_LOG);

    let response = server
        .get(&format!("/build/tasks/{}/log", build_number))
        .add_query_param("offset", 9)
        .await;
    assert_eq!(response.text(), "line two\n");

    let response = server
        .get(&format!("/build/tasks/{}/log", build_number))
        .add_query_param("offset", 1000)
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "");
}

#[tokio::test]
async fn test_build_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_mock_state(dir.path());
    let server = create_server(state.clone());

    let build_number = submit_build(&server).await;
    wait_for_status(&state, build_number, BuildStatus::Complete).await;

    let response = server.get("/build/tasks").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["queueLength"], 0);
    assert_eq!(body["metrics"]["accepted"], 1);
    assert_eq!(body["metrics"]["succeeded"], 1);
    assert_eq!(body["allBuilds"][0]["buildNumber"], build_number);
    assert_eq!(body["allBuilds"][0]["message"], "Build completed successfully");
    assert!(body["queuedBuilds"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_download_and_actions() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_mock_state(dir.path());
    let server = create_server(state.clone());

    let build_number = submit_build(&server).await;
    wait_for_status(&state, build_number, BuildStatus::Complete).await;

    let response = server.get(&format!("/build/{}/download", build_number)).await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-disposition").to_str().unwrap(),
        format!("attachment; filename=\"artifacts_{}.tgz\"", build_number)
    );
    assert_eq!(response.as_bytes().as_ref(), b"artifact");
    assert_eq!(state.builds.get_build(build_number).unwrap().status, BuildStatus::Downloaded);

    let response = server
        .get(&format!("/build/{}/emulate", build_number))
        .add_query_param("device", "pixel")
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["error"], false);
    assert_eq!(body["message"], format!("emulating build {} on pixel", build_number));
    assert_eq!(state.builds.get_build(build_number).unwrap().status, BuildStatus::Emulated);

    let response = server.get(&format!("/build/{}/run", build_number)).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["error"], true);

    let metrics = state.builds.metrics();
    assert_eq!(metrics.downloaded, 1);
}

#[tokio::test]
async fn test_file_browser() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_mock_state(dir.path());
    let server = create_server(state.clone());

    let build_number = submit_build(&server).await;
    wait_for_status(&state, build_number, BuildStatus::Complete).await;

    let response = server.get("/files").await;
    response.assert_status_ok();
    assert!(response.text().contains(&format!("href=\"/files/{}/\"", build_number)));

    let response = server.get(&format!("/files/{}/app", build_number)).await;
    response.assert_status_ok();
    assert!(response.text().contains("config.xml"));

    let response = server.get(&format!("/files/{}/build.log", build_number)).await;
    response.assert_status_ok();
    assert_eq!(response.text(), BUILD_LOG);

    let response = server.get("/files/missing.txt").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
