/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use clap::Parser;
use remote_core::types::Cli;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    remote_core::init_logging(&cli);

    let _guard = match (cli.report_errors, cli.sentry_dsn.as_deref()) {
        (true, Some(dsn)) => Some(sentry::init(dsn)),
        (true, None) => {
            warn!("Error reporting requested without a Sentry DSN");
            None
        }
        _ => None,
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Remote Build Server on {}",
        cli.server_url()
    );

    let state = builder::init_state(cli).await?;
    let served = web::serve_web(Arc::clone(&state)).await;

    state.builds.shutdown();
    served?;

    Ok(())
}
