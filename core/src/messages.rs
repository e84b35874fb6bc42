/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use entity::BuildRecord;

/// Turns a status message key and its arguments into readable text.
pub trait MessageResolver: Send + Sync {
    fn resolve(&self, key: &str, args: &[String], language: Option<&str>) -> String;
}

/// English messages for every key the server itself emits.
///
/// Keys without a template are returned as-is with their arguments appended.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMessages;

impl DefaultMessages {
    fn template(key: &str) -> Option<&'static str> {
        let template = match key {
            "UploadingBuild" => "Uploading build archive",
            "UploadedBuild" => "Build archive uploaded",
            "UploadFailed" => "Uploading the build archive failed: {0}",
            "ExtractedBuild" => "Build archive extracted",
            "ExtractionFailed" => "Extracting the build archive failed: {0}",
            "BuildQueued" => "Waiting for {0} build(s) ahead in the queue",
            "BuildQueueFull" => "The build queue is full",
            "BuildDirectoryNotFound" => "Build directory {0} does not exist",
            "Building" => "Build in progress",
            "BuildSucceeded" => "Build completed successfully",
            "BuildFailed" => "Build failed with exit code {0}",
            "BuildFailedWithError" => "Build failed: {0}",
            "BuildTimedOut" => "Build exceeded the limit of {0} seconds",
            "InvalidBuildRequest" => "Build request was rejected by {0}",
            "BuildDownloaded" => "Build artifacts downloaded",
            "BuildEmulated" => "Build started in the emulator",
            "BuildDeployed" => "Build installed on the device",
            "BuildRunning" => "Build is running on the device",
            "BuildDebugging" => "Build is attached to a debugger",
            _ => return None,
        };

        Some(template)
    }
}

impl MessageResolver for DefaultMessages {
    fn resolve(&self, key: &str, args: &[String], _language: Option<&str>) -> String {
        match Self::template(key) {
            Some(template) => args
                .iter()
                .enumerate()
                .fold(template.to_string(), |text, (i, arg)| {
                    text.replace(&format!("{{{}}}", i), arg)
                }),
            None if args.is_empty() => key.to_string(),
            None => format!("{}: {}", key, args.join(", ")),
        }
    }
}

/// Copy of `record` with its status message resolved into `message`.
pub fn localize(record: BuildRecord, resolver: &dyn MessageResolver) -> BuildRecord {
    let Some(key) = record.status_message.as_deref() else {
        return record;
    };

    let message = resolver.resolve(key, &record.status_message_args, record.build_lang.as_deref());
    record.with_message(message)
}
