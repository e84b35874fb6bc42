/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

mod endpoints;
pub mod error;
pub mod requests;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use builder::ServerState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use endpoints::*;

pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/build/tasks",
            get(builds::get_build_tasks)
                .post(builds::post_build_task)
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/build/tasks/{build}", get(builds::get_build))
        .route("/build/tasks/{build}/log", get(builds::get_build_log))
        .route("/build/{build}", get(builds::get_build))
        .route("/build/{build}/download", get(builds::get_build_download))
        .route("/build/{build}/emulate", get(builds::get_build_emulate))
        .route("/build/{build}/deploy", get(builds::get_build_deploy))
        .route("/build/{build}/run", get(builds::get_build_run))
        .route("/build/{build}/debug", get(builds::get_build_debug))
        .route("/files", get(files::get_files_root))
        .route("/files/", get(files::get_files_root))
        .route("/files/{*path}", get(files::get_file))
        .route("/health", get(get_health))
        .fallback(handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve_web(state: Arc<ServerState>) -> std::io::Result<()> {
    let server_url = state.cli.server_url();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&server_url).await?;
    info!(address = %server_url, "Listening for build requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
}
