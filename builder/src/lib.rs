/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod extract;
pub mod retention;
pub mod scheduler;

use anyhow::{Context, Result};
use remote_core::messages::{DefaultMessages, MessageResolver};
use remote_core::registry::BuilderRegistry;
use remote_core::remote::BuilderResolver;
use remote_core::types::Cli;
use scheduler::{BuildManager, BuildManagerConfig};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ServerState {
    pub cli: Cli,
    pub builds: Arc<BuildManager>,
    pub messages: Arc<dyn MessageResolver>,
}

impl ServerState {
    pub fn new(cli: Cli, resolver: Arc<dyn BuilderResolver>) -> Self {
        let builds = Arc::new(BuildManager::new(BuildManagerConfig::from(&cli), resolver));

        ServerState {
            cli,
            builds,
            messages: Arc::new(DefaultMessages),
        }
    }
}

pub async fn init_state(cli: Cli) -> Result<Arc<ServerState>> {
    let base_dir = cli.base_dir();
    tokio::fs::create_dir_all(&base_dir)
        .await
        .with_context(|| format!("Failed to create base directory {}", base_dir.display()))?;

    let registry = BuilderRegistry::from_cli(&cli);
    if registry.platforms().is_empty() {
        warn!("No builders configured, every submission will be rejected");
    }
    registry.init_all().await?;

    info!(
        base_dir = %base_dir.display(),
        platforms = ?registry.platforms(),
        max_builds_in_queue = cli.max_builds_in_queue,
        max_builds_to_keep = cli.max_builds_to_keep,
        "Build manager ready"
    );

    Ok(Arc::new(ServerState::new(cli, Arc::new(registry))))
}
