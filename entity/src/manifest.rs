/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CHANGE_LIST_FILE: &str = "changeList.json";

/// Client supplied description of an incremental upload.
///
/// Only `deletedFiles` is interpreted by the server, every other field is
/// kept as-is for the builder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeManifest {
    #[serde(default)]
    pub deleted_files: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChangeManifest {
    pub fn from_slice(content: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(content)
    }
}
