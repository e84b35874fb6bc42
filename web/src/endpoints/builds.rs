/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use builder::ServerState;
use entity::{BuildRecord, BuildSnapshot};
use futures::TryStreamExt;
use remote_core::messages::{MessageResolver, localize};
use remote_core::remote::{ActionOutcome, ActionParams};
use remote_core::types::BaseResponse;
use std::collections::BTreeMap;
use std::io::{self, SeekFrom};
use std::sync::Arc;
use tokio::io::AsyncSeekExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;

use crate::error::{WebError, WebResult};
use crate::requests::{LogQuery, build_request, preferred_language};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

fn parse_build_number(build: &str) -> WebResult<u64> {
    build.parse().map_err(|_| WebError::not_found("Build"))
}

fn request_origin(headers: &HeaderMap, fallback_host: &str) -> String {
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback_host);

    format!("{}://{}", scheme, host)
}

fn localize_snapshot(snapshot: BuildSnapshot, messages: &dyn MessageResolver) -> BuildSnapshot {
    let localize_all = |records: Vec<BuildRecord>| -> Vec<BuildRecord> {
        records
            .into_iter()
            .map(|record| localize(record, messages))
            .collect()
    };

    BuildSnapshot {
        metrics: snapshot.metrics,
        queue_length: snapshot.queue_length,
        current_build: snapshot.current_build.map(|record| localize(record, messages)),
        queued_builds: localize_all(snapshot.queued_builds),
        all_builds: localize_all(snapshot.all_builds),
    }
}

fn text_response(body: Body) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        body,
    )
        .into_response()
}

fn action_response(outcome: ActionOutcome) -> Json<BaseResponse<String>> {
    Json(BaseResponse {
        error: false,
        message: outcome.message,
    })
}

pub async fn post_build_task(
    state: State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Body,
) -> WebResult<Response> {
    let language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(preferred_language);
    let request = build_request(query, &state.cli.default_platform, language)?;

    let upload = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
    let record = state.builds.submit(request, upload).await?;

    let location = format!(
        "{}/build/tasks/{}",
        request_origin(&headers, &state.cli.server_url()),
        record.build_number
    );
    let location = HeaderValue::from_str(&location)
        .map_err(|_| WebError::BadRequest("Invalid Host header".to_string()))?;

    let record = localize(record, state.messages.as_ref());

    Ok((StatusCode::ACCEPTED, [(header::LOCATION, location)], Json(record)).into_response())
}

pub async fn get_build_tasks(state: State<Arc<ServerState>>) -> WebResult<Json<BuildSnapshot>> {
    let snapshot = state.builds.get_all_builds();

    Ok(Json(localize_snapshot(snapshot, state.messages.as_ref())))
}

pub async fn get_build(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
) -> WebResult<Json<BuildRecord>> {
    let build_number = parse_build_number(&build)?;
    let record = state
        .builds
        .get_build(build_number)
        .ok_or_else(|| WebError::not_found("Build"))?;

    Ok(Json(localize(record, state.messages.as_ref())))
}

pub async fn get_build_log(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
    Query(query): Query<LogQuery>,
) -> WebResult<Response> {
    let Some(record) = build
        .parse::<u64>()
        .ok()
        .and_then(|build_number| state.builds.get_build(build_number))
    else {
        return Ok(text_response(Body::empty()));
    };

    let log_path = record.log_path();
    let mut file = match tokio::fs::File::open(&log_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(text_response(Body::empty()));
        }
        Err(e) => {
            return Err(WebError::Internal(anyhow::Error::new(e).context(format!(
                "Failed to open build log {}",
                log_path.display()
            ))));
        }
    };

    let offset = query.offset.unwrap_or(0);
    if offset > 0 {
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| WebError::Internal(e.into()))?;
    }

    debug!(build_number = record.build_number, offset, "Streaming build log");

    Ok(text_response(Body::from_stream(ReaderStream::new(file))))
}

pub async fn get_build_download(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
) -> WebResult<Response> {
    let build_number = parse_build_number(&build)?;
    let download = state.builds.download_build(build_number).await?;

    let file = tokio::fs::File::open(&download.path).await.map_err(|e| {
        WebError::Internal(anyhow::Error::new(e).context(format!(
            "Failed to open artifacts {}",
            download.path.display()
        )))
    })?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.file_name
    ))
    .map_err(|e| WebError::Internal(e.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/gzip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

pub async fn get_build_emulate(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
    Query(params): Query<ActionParams>,
) -> WebResult<Json<BaseResponse<String>>> {
    let build_number = parse_build_number(&build)?;
    let outcome = state.builds.emulate_build(build_number, &params).await?;

    Ok(action_response(outcome))
}

pub async fn get_build_deploy(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
    Query(params): Query<ActionParams>,
) -> WebResult<Json<BaseResponse<String>>> {
    let build_number = parse_build_number(&build)?;
    let outcome = state.builds.deploy_build(build_number, &params).await?;

    Ok(action_response(outcome))
}

pub async fn get_build_run(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
    Query(params): Query<ActionParams>,
) -> WebResult<Json<BaseResponse<String>>> {
    let build_number = parse_build_number(&build)?;
    let outcome = state.builds.run_build(build_number, &params).await?;

    Ok(action_response(outcome))
}

pub async fn get_build_debug(
    state: State<Arc<ServerState>>,
    Path(build): Path<String>,
    Query(params): Query<ActionParams>,
) -> WebResult<Json<BaseResponse<String>>> {
    let build_number = parse_build_number(&build)?;
    let outcome = state.builds.debug_build(build_number, &params).await?;

    Ok(action_response(outcome))
}
