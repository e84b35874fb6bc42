/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use entity::build::BuildRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{WebError, WebResult};

pub const QUERY_COMMAND: &str = "command";
pub const QUERY_CONFIGURATION: &str = "cfg";
pub const QUERY_PLATFORM: &str = "platform";
pub const QUERY_BUILD_NUMBER: &str = "buildNumber";
pub const QUERY_LOG_LEVEL: &str = "logLevel";

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct LogQuery {
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Turns the query string of a build submission into a [`BuildRequest`].
///
/// Reserved keys fill the request fields, every other key becomes a builder
/// option.
pub fn build_request(
    mut query: BTreeMap<String, String>,
    default_platform: &str,
    language: Option<String>,
) -> WebResult<BuildRequest> {
    let platform = query
        .remove(QUERY_PLATFORM)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| default_platform.to_string());

    let mut request = BuildRequest::new(&platform);

    if let Some(command) = query.remove(QUERY_COMMAND) {
        request.command = command;
    }

    if let Some(configuration) = query.remove(QUERY_CONFIGURATION) {
        request.configuration = configuration.to_ascii_lowercase();
    }

    if let Some(build_number) = query.remove(QUERY_BUILD_NUMBER) {
        let parsed = build_number
            .parse::<u64>()
            .map_err(|_| WebError::invalid_parameter(QUERY_BUILD_NUMBER, &build_number))?;
        request.build_number = Some(parsed);
    }

    request.log_level = query.remove(QUERY_LOG_LEVEL);
    request.language = language;
    request.options = query;

    Ok(request)
}

/// First language tag of an `Accept-Language` header.
pub fn preferred_language(header: &str) -> Option<String> {
    header
        .split(',')
        .map(|part| part.split(';').next().unwrap_or_default().trim())
        .find(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
}
