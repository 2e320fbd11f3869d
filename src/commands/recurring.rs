// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::opt_text;
use crate::ledger::recurring;
use crate::models::{Frequency, NewRecurring, RecurringFilter, RecurringUpdate};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub fn handle(
    conn: &mut Connection,
    user: &str,
    m: &clap::ArgMatches,
    now: DateTime<Utc>,
) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let template = recurring::create_recurring(
                conn,
                user,
                NewRecurring {
                    account_id: *sub.get_one::<i64>("account").context("--account is required")?,
                    category_id: sub.get_one::<i64>("category").copied(),
                    amount: parse_decimal(
                        sub.get_one::<String>("amount").context("--amount is required")?,
                    )?,
                    description: opt_text(sub, "description").unwrap_or_default(),
                    frequency: opt_text(sub, "frequency")
                        .unwrap_or_default()
                        .parse::<Frequency>()?,
                    next_execution_date: parse_date(
                        sub.get_one::<String>("next").context("--next is required")?,
                    )?,
                    end_date: opt_text(sub, "end").map(|d| parse_date(&d)).transpose()?,
                },
                now,
            )?;
            println!(
                "Added {} template #{} '{}', first run {}",
                template.frequency,
                template.id,
                template.description,
                template.next_execution_date.format("%Y-%m-%d")
            );
        }
        Some(("list", sub)) => {
            let filter = RecurringFilter {
                account_id: sub.get_one::<i64>("account").copied(),
                frequency: opt_text(sub, "frequency")
                    .map(|f| f.parse::<Frequency>())
                    .transpose()?,
                active_only: sub.get_flag("active"),
            };
            let list = recurring::list_recurring(conn, user, &filter, now)?;
            if !maybe_print_json(sub.get_flag("json"), &list)? {
                let rows = list
                    .iter()
                    .map(|v| {
                        let t = &v.template;
                        vec![
                            t.id.to_string(),
                            t.description.clone(),
                            t.amount.to_string(),
                            t.frequency.to_string(),
                            t.next_execution_date.format("%Y-%m-%d").to_string(),
                            v.days_until_next.to_string(),
                            t.end_date
                                .map(|d| d.format("%Y-%m-%d").to_string())
                                .unwrap_or_default(),
                            if t.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Description", "Amount", "Every", "Next", "Days", "Ends", "Active"],
                        rows
                    )
                );
            }
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let end_date = match opt_text(sub, "end") {
                None => None,
                Some(e) if e.is_empty() || e.eq_ignore_ascii_case("none") => Some(None),
                Some(e) => Some(Some(parse_date(&e)?)),
            };
            let template = recurring::update_recurring(
                conn,
                user,
                id,
                RecurringUpdate {
                    account_id: sub.get_one::<i64>("account").copied(),
                    category_id: sub.get_one::<i64>("category").map(|c| Some(*c)),
                    amount: opt_text(sub, "amount")
                        .map(|a| parse_decimal(&a))
                        .transpose()?,
                    description: opt_text(sub, "description"),
                    frequency: opt_text(sub, "frequency")
                        .map(|f| f.parse::<Frequency>())
                        .transpose()?,
                    next_execution_date: opt_text(sub, "next")
                        .map(|d| parse_date(&d))
                        .transpose()?,
                    end_date,
                    is_active: sub.get_one::<bool>("active").copied(),
                },
                now,
            )?;
            println!("Updated template #{} '{}'", template.id, template.description);
        }
        Some(("pause", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let template = recurring::deactivate_recurring(conn, user, id, now)?;
            println!("Paused template #{} '{}'", template.id, template.description);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let deleted = recurring::delete_recurring(conn, user, id, sub.get_flag("delete-generated"))?;
            if deleted.deleted_transactions > 0 {
                println!(
                    "Removed template #{} and {} generated transactions",
                    deleted.id, deleted.deleted_transactions
                );
            } else {
                println!("Removed template #{}", deleted.id);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Entry point for the time-driven collaborator.
pub fn sweep(conn: &mut Connection, m: &clap::ArgMatches, now: DateTime<Utc>) -> Result<()> {
    let report = recurring::process_recurring(conn, now).context("Recurring sweep failed")?;
    if !maybe_print_json(m.get_flag("json"), &report)? {
        println!(
            "Sweep: {} fired, {} deactivated, {} errors",
            report.processed_count,
            report.deactivated.len(),
            report.errors.len()
        );
        for e in &report.errors {
            eprintln!("  {}", e);
        }
    }
    Ok(())
}
