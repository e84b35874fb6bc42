/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::consts::*;
use super::types::BuilderSpec;

pub fn port_in_range(s: &str) -> Result<u16, String> {
    let port: usize = s
        .parse()
        .map_err(|_| format!("`{s}` is not a port number"))?;

    if PORT_RANGE.contains(&port) {
        Ok(port as u16)
    } else {
        Err(format!(
            "port not in range {}-{}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        ))
    }
}

pub fn greater_than_zero<
    T: std::str::FromStr + std::cmp::PartialOrd + std::fmt::Display + Default,
>(
    s: &str,
) -> Result<T, String> {
    let num: T = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid number", s))?;

    if num > T::default() {
        Ok(num)
    } else {
        Err(format!("`{}` is not larger than 0", s))
    }
}

/// Parses `platform=program`, e.g. `android=/opt/build/android-build`.
pub fn parse_builder_spec(s: &str) -> Result<BuilderSpec, String> {
    let (platform, program) = s
        .split_once('=')
        .ok_or_else(|| format!("`{}` is not of the form platform=program", s))?;

    let platform = platform.trim();
    let program = program.trim();

    if !valid_identifier(platform) {
        return Err(format!("`{}` is not a valid platform name", platform));
    }

    if program.is_empty() {
        return Err(format!("no program given for platform `{}`", platform));
    }

    Ok(BuilderSpec {
        platform: platform.to_ascii_lowercase(),
        program: program.to_string(),
    })
}

pub fn valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !s.starts_with('-')
}

pub fn valid_configuration(s: &str) -> bool {
    SUPPORTED_CONFIGURATIONS.contains(&s)
}

pub fn valid_command(s: &str) -> bool {
    SUPPORTED_COMMANDS.contains(&s)
}
