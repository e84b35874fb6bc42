/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for builder selection

use clap::Parser;
use entity::build::BuildRequest;
use remote_core::executer::CommandBuilder;
use remote_core::registry::BuilderRegistry;
use remote_core::remote::BuilderResolver;
use remote_core::types::Cli;
use std::sync::Arc;

#[test]
fn test_resolve_by_platform() {
    let mut registry = BuilderRegistry::new();
    registry.register("Android", Arc::new(CommandBuilder::new("android", "android-build", "bin")));

    let builder = registry.resolve(&BuildRequest::new("ANDROID")).unwrap();
    assert_eq!(builder.name(), "android");

    assert!(registry.resolve(&BuildRequest::new("ios")).is_none());
}

#[test]
fn test_registry_from_cli() {
    let cli = Cli::try_parse_from([
        "remote-build-server",
        "--builder",
        "ios=ios-build",
        "--builder",
        "android=android-build",
    ])
    .unwrap();

    let registry = BuilderRegistry::from_cli(&cli);
    assert_eq!(registry.platforms(), vec!["android".to_string(), "ios".to_string()]);
}

#[tokio::test]
async fn test_init_all_reports_missing_program() {
    let mut registry = BuilderRegistry::new();
    registry.register("ios", Arc::new(CommandBuilder::new("ios", "ios-build", "bin")));
    assert!(registry.init_all().await.is_ok());

    registry.register("android", Arc::new(CommandBuilder::new("android", "/nonexistent/android-build", "bin")));
    assert!(registry.init_all().await.is_err());
}
