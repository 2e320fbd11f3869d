// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::opt_text;
use crate::ledger::setup::{self, SetupOptions};
use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn init(conn: &mut Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    let options = SetupOptions {
        account_name: opt_text(m, "account-name"),
        account_icon: opt_text(m, "icon"),
        opening_balance: opt_text(m, "opening")
            .map(|o| parse_decimal(&o))
            .transpose()?,
    };
    let done = setup::initialize(conn, user, options)?;
    println!(
        "Initialized '{}': account #{} and {} categories",
        user, done.account_id, done.categories_created
    );
    Ok(())
}

pub fn status(conn: &Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    let s = setup::setup_status(conn, user)?;
    if !maybe_print_json(m.get_flag("json"), &s)? {
        let last_sweep = s
            .last_sweep_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "never".into());
        let rows = vec![
            vec!["Needs setup".into(), s.needs_setup.to_string()],
            vec!["Accounts".into(), s.account_count.to_string()],
            vec!["Categories".into(), s.category_count.to_string()],
            vec!["Transactions".into(), s.transaction_count.to_string()],
            vec!["Recurring".into(), s.recurring_count.to_string()],
            vec!["Total balance".into(), format!("{:.2}", s.total_balance)],
            vec!["Last sweep".into(), last_sweep],
        ];
        println!("{}", pretty_table(&["Item", "Value"], rows));
    }
    Ok(())
}

pub fn reset(conn: &mut Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    let phrase = m
        .get_one::<String>("confirm")
        .context("--confirm is required")?;
    let report = setup::reset(conn, user, phrase)?;
    println!(
        "Removed {} transactions, {} recurring templates, {} accounts, {} categories",
        report.transactions, report.recurring, report.accounts, report.categories
    );
    Ok(())
}
