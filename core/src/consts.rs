/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::ops::RangeInclusive;

pub const PORT_RANGE: RangeInclusive<usize> = 1..=65535;

pub const SUPPORTED_COMMANDS: [&str; 1] = ["build"];
pub const SUPPORTED_CONFIGURATIONS: [&str; 2] = ["debug", "release"];

// Exit code a build program uses to reject a request it cannot build.
pub const INVALID_BUILD_EXIT_CODE: i32 = 2;

pub const BUILD_NUMBER_SEED_FACTOR: u64 = 1000;

pub const ACTION_EMULATE: &str = "emulate";
pub const ACTION_DEPLOY: &str = "deploy";
pub const ACTION_RUN: &str = "run";
pub const ACTION_DEBUG: &str = "debug";
