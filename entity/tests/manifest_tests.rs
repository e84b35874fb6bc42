/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for the change manifest

use entity::ChangeManifest;

#[test]
fn test_manifest_keeps_unknown_fields() {
    let manifest = ChangeManifest::from_slice(
        br#"{"deletedFiles":["www/a.js"],"changedFiles":["www/b.js"],"addedPlugins":[]}"#,
    )
    .unwrap();

    assert_eq!(manifest.deleted_files, vec!["www/a.js".to_string()]);
    assert!(manifest.extra.contains_key("changedFiles"));
    assert!(manifest.extra.contains_key("addedPlugins"));

    let json = serde_json::to_value(&manifest).unwrap();
    assert_eq!(json["changedFiles"][0], "www/b.js");
}

#[test]
fn test_manifest_without_deleted_files() {
    let manifest = ChangeManifest::from_slice(br#"{"changedFiles":[]}"#).unwrap();
    assert!(manifest.deleted_files.is_empty());
}

#[test]
fn test_manifest_rejects_garbage() {
    assert!(ChangeManifest::from_slice(b"not json").is_err());
}
