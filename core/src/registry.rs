/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use entity::build::BuildRequest;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::executer::CommandBuilder;
use super::remote::{BuilderResolver, RemoteBuilder};
use super::types::Cli;

/// Picks a builder by the platform a request targets.
#[derive(Debug, Default, Clone)]
pub struct BuilderRegistry {
    builders: HashMap<String, Arc<dyn RemoteBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cli(cli: &Cli) -> Self {
        let mut registry = Self::new();

        for spec in &cli.builders {
            registry.register(
                &spec.platform,
                Arc::new(CommandBuilder::new(
                    &spec.platform,
                    &spec.program,
                    &cli.artifact_dir,
                )),
            );
        }

        registry
    }

    pub fn register(&mut self, platform: &str, builder: Arc<dyn RemoteBuilder>) {
        self.builders.insert(platform.to_ascii_lowercase(), builder);
    }

    pub fn platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> = self.builders.keys().cloned().collect();
        platforms.sort();
        platforms
    }

    pub async fn init_all(&self) -> Result<()> {
        for (platform, builder) in &self.builders {
            builder
                .init()
                .await
                .with_context(|| format!("Failed to initialize builder for {}", platform))?;
            info!(platform = %platform, "Builder ready");
        }

        Ok(())
    }
}

impl BuilderResolver for BuilderRegistry {
    fn resolve(&self, request: &BuildRequest) -> Option<Arc<dyn RemoteBuilder>> {
        self.builders
            .get(&request.platform.to_ascii_lowercase())
            .cloned()
    }
}
