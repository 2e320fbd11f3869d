// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod categories;
pub mod exporter;
pub mod recurring;
pub mod reports;
pub mod setup;
pub mod transactions;

/// Trimmed string argument, `None` when absent.
pub(crate) fn opt_text(m: &clap::ArgMatches, name: &str) -> Option<String> {
    m.get_one::<String>(name).map(|s| s.trim().to_string())
}

/// Distinguishes "not given" from "given empty" for clearable text fields.
pub(crate) fn clearable_text(m: &clap::ArgMatches, name: &str) -> Option<Option<String>> {
    opt_text(m, name).map(|s| if s.is_empty() { None } else { Some(s) })
}
