/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for the build record

use entity::build::{BuildRequest, BUILD_LOG_FILE};
use entity::*;
use std::path::PathBuf;

fn create_record(build_number: u64) -> BuildRecord {
    let mut request = BuildRequest::new("ios");
    request
        .options
        .insert("target".to_string(), "device".to_string());

    BuildRecord::new(
        build_number,
        &request,
        PathBuf::from(format!("/srv/builds/{}", build_number)),
    )
}

#[test]
fn test_new_record_is_uploading() {
    let record = create_record(7);

    assert_eq!(record.build_number, 7);
    assert_eq!(record.status, BuildStatus::Uploading);
    assert_eq!(record.build_command, "build");
    assert_eq!(record.configuration, "release");
    assert_eq!(record.build_platform, "ios");
    assert_eq!(record.options.get("target").map(String::as_str), Some("device"));
    assert!(!record.build_successful);
    assert_eq!(record.submission_time, record.status_time);
}

#[test]
fn test_record_paths() {
    let record = create_record(12);

    assert_eq!(record.log_path(), PathBuf::from("/srv/builds/12").join(BUILD_LOG_FILE));
    assert_eq!(record.upload_path(), PathBuf::from("/srv/builds/12/upload_12.tgz"));
    assert_eq!(record.default_app_dir(), PathBuf::from("/srv/builds/12/app"));
}

#[test]
fn test_happy_path_transitions() {
    let mut record = create_record(1);

    assert!(record.update_status(BuildStatus::Uploaded, None, vec![]));
    assert!(record.update_status(BuildStatus::Extracted, None, vec![]));
    assert!(record.update_status(BuildStatus::Building, None, vec![]));
    assert!(!record.build_successful);
    assert!(record.update_status(BuildStatus::Complete, Some("BuildSucceeded"), vec![]));
    assert!(record.build_successful);
    assert!(record.update_status(BuildStatus::Downloaded, None, vec![]));
    assert!(record.update_status(BuildStatus::Emulated, None, vec![]));
    assert!(record.update_status(BuildStatus::Running, None, vec![]));
    assert!(record.update_status(BuildStatus::Downloaded, None, vec![]));
    assert!(record.build_successful);
}

#[test]
fn test_backward_transitions_are_refused() {
    let mut record = create_record(2);
    record.update_status(BuildStatus::Uploaded, None, vec![]);
    record.update_status(BuildStatus::Extracted, None, vec![]);
    let before = record.status_time;

    assert!(!record.update_status(BuildStatus::Uploading, None, vec![]));
    assert!(!record.update_status(BuildStatus::Uploaded, None, vec![]));
    assert_eq!(record.status, BuildStatus::Extracted);
    assert_eq!(record.status_time, before);
}

#[test]
fn test_failure_states_are_final() {
    let mut record = create_record(3);
    assert!(record.update_status(
        BuildStatus::Error,
        Some("UploadFailed"),
        vec!["broken pipe".to_string()]
    ));

    for status in [
        BuildStatus::Uploaded,
        BuildStatus::Building,
        BuildStatus::Complete,
        BuildStatus::Downloaded,
    ] {
        assert!(!record.update_status(status, None, vec![]));
    }

    assert_eq!(record.status, BuildStatus::Error);
    assert_eq!(record.status_message.as_deref(), Some("UploadFailed"));
    assert_eq!(record.status_message_args, vec!["broken pipe".to_string()]);
    assert!(!record.build_successful);
}

#[test]
fn test_post_build_actions_require_success() {
    let mut record = create_record(4);
    record.update_status(BuildStatus::Uploaded, None, vec![]);
    record.update_status(BuildStatus::Extracted, None, vec![]);
    record.update_status(BuildStatus::Building, None, vec![]);

    assert!(!record.update_status(BuildStatus::Downloaded, None, vec![]));
    assert!(record.update_status(BuildStatus::Invalid, None, vec![]));
    assert!(!record.update_status(BuildStatus::Debugging, None, vec![]));
}

#[test]
fn test_record_round_trip() {
    let mut record = create_record(42);
    record.update_status(BuildStatus::Uploaded, None, vec![]);
    record.tgz_file_path = Some(record.upload_path());

    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"buildNumber\":42"));
    assert!(json.contains("\"status\":\"Uploaded\""));
    assert!(!json.contains("\"message\""));

    let parsed: BuildRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.build_number, record.build_number);
    assert_eq!(parsed.status, record.status);
    assert_eq!(parsed.status_time, record.status_time);
    assert_eq!(parsed.submission_time, record.submission_time);
    assert_eq!(parsed, record);
}

#[test]
fn test_with_message_is_serialized() {
    let record = create_record(5).with_message("Uploading build 5".to_string());

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["message"], "Uploading build 5");
    assert_eq!(json["statusMessage"], "UploadingBuild");
}
