/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for entity enums

use entity::*;
use std::str::FromStr;

#[test]
fn test_build_status_from_str() {
    assert_eq!(BuildStatus::from_str("Complete").unwrap(), BuildStatus::Complete);
    assert_eq!(BuildStatus::from_str("building").unwrap(), BuildStatus::Building);
    assert_eq!(BuildStatus::from_str("DEBUGGING").unwrap(), BuildStatus::Debugging);

    assert!(BuildStatus::from_str("deleted").is_err());
}

#[test]
fn test_build_status_display_matches_wire_name() {
    for status in [
        BuildStatus::Uploading,
        BuildStatus::Extracted,
        BuildStatus::Invalid,
        BuildStatus::Installed,
    ] {
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status));
    }
}

#[test]
fn test_terminal_states() {
    let terminal = [
        BuildStatus::Complete,
        BuildStatus::Downloaded,
        BuildStatus::Error,
        BuildStatus::Emulated,
        BuildStatus::Invalid,
    ];
    let live = [
        BuildStatus::Uploading,
        BuildStatus::Uploaded,
        BuildStatus::Extracted,
        BuildStatus::Building,
        BuildStatus::Running,
        BuildStatus::Installed,
        BuildStatus::Debugging,
    ];

    assert!(terminal.iter().all(|s| s.is_terminal()));
    assert!(live.iter().all(|s| !s.is_terminal()));
}
