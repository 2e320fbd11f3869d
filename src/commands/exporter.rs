// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::{accounts, categories, journal};
use anyhow::{bail, Result};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;

pub fn handle(conn: &Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, user, sub),
        _ => Ok(()),
    }
}

struct ExportRow {
    date: String,
    account: String,
    amount: String,
    category: Option<String>,
    description: Option<String>,
    recurring: bool,
}

fn collect_rows(conn: &Connection, user: &str) -> Result<Vec<ExportRow>> {
    let account_names: HashMap<i64, String> = accounts::list_accounts(conn, user)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let category_names: HashMap<i64, String> = categories::list_categories(conn, user)?
        .into_iter()
        .map(|c| (c.category.id, c.category.name))
        .collect();

    Ok(journal::all_for_user(conn, user)?
        .into_iter()
        .map(|t| ExportRow {
            date: t.date.format("%Y-%m-%d").to_string(),
            account: account_names.get(&t.account_id).cloned().unwrap_or_default(),
            amount: t.amount.to_string(),
            category: t.category_id.and_then(|c| category_names.get(&c).cloned()),
            description: t.description,
            recurring: t.is_recurring,
        })
        .collect())
}

fn export_transactions(conn: &Connection, user: &str, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub
        .get_one::<String>("format")
        .map_or("csv", |s| s.as_str())
        .to_lowercase();
    let Some(out) = sub.get_one::<String>("out") else {
        bail!("--out is required");
    };
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }

    let rows = collect_rows(conn, user)?;
    if fmt == "csv" {
        let mut wtr = csv::Writer::from_path(out)?;
        wtr.write_record([
            "date",
            "account",
            "amount",
            "category",
            "description",
            "recurring",
        ])?;
        for r in &rows {
            wtr.write_record([
                r.date.as_str(),
                r.account.as_str(),
                r.amount.as_str(),
                r.category.as_deref().unwrap_or_default(),
                r.description.as_deref().unwrap_or_default(),
                if r.recurring { "true" } else { "false" },
            ])?;
        }
        wtr.flush()?;
    } else {
        let items: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "date": r.date,
                    "account": r.account,
                    "amount": r.amount,
                    "category": r.category,
                    "description": r.description,
                    "recurring": r.recurring,
                })
            })
            .collect();
        std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
    }
    tracing::info!(user, rows = rows.len(), format = %fmt, "exported transactions");
    println!("Exported {} transactions to {}", rows.len(), out);
    Ok(())
}
