// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{clearable_text, opt_text};
use crate::ledger::{accounts, balances};
use crate::models::{AccountUpdate, Currency, NewAccount};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = opt_text(sub, "name").unwrap_or_default();
            let icon = opt_text(sub, "icon").unwrap_or_else(|| "wallet".into());
            let opening =
                parse_decimal(sub.get_one::<String>("opening").map_or("0", |s| s.as_str()))?;
            let currency = opt_text(sub, "currency")
                .map(|c| c.parse::<Currency>())
                .transpose()?;
            let account = accounts::create_account(
                conn,
                user,
                NewAccount {
                    name,
                    description: clearable_text(sub, "description").flatten(),
                    icon,
                    opening_balance: opening,
                    currency,
                },
            )?;
            println!(
                "Added account #{} '{}' (opening {}{})",
                account.id,
                account.name,
                fmt_money(&account.default_value, account.currency.map(|c| c.as_str())),
                if account.is_default { ", default" } else { "" }
            );
        }
        Some(("list", sub)) => {
            let list = accounts::list_accounts(conn, user)?;
            if !maybe_print_json(sub.get_flag("json"), &list)? {
                let rows = list
                    .iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.display_order.to_string(),
                            a.name.clone(),
                            a.currency.map(|c| c.to_string()).unwrap_or_default(),
                            format!("{:.2}", a.current_amount),
                            if a.is_default { "yes".into() } else { String::new() },
                            if a.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Order", "Name", "CCY", "Balance", "Default", "Active"],
                        rows
                    )
                );
            }
        }
        Some(("show", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let snapshot = balances::account_balance(conn, user, id)?
                .with_context(|| format!("Account #{} not found", id))?;
            if !maybe_print_json(sub.get_flag("json"), &snapshot)? {
                let last = snapshot
                    .last_transaction_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".into());
                let rows = vec![vec![
                    snapshot.name.clone(),
                    format!("{:.2}", snapshot.default_value),
                    format!("{:.2}", snapshot.current_amount),
                    snapshot.transaction_count.to_string(),
                    last,
                ]];
                println!(
                    "{}",
                    pretty_table(
                        &["Account", "Opening", "Balance", "Transactions", "Last"],
                        rows
                    )
                );
            }
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let currency = match opt_text(sub, "currency") {
                None => None,
                Some(c) if c.eq_ignore_ascii_case("none") || c.is_empty() => Some(None),
                Some(c) => Some(Some(c.parse::<Currency>()?)),
            };
            let account = accounts::update_account(
                conn,
                user,
                id,
                AccountUpdate {
                    name: opt_text(sub, "name"),
                    description: clearable_text(sub, "description"),
                    icon: opt_text(sub, "icon"),
                    currency,
                    is_active: sub.get_one::<bool>("active").copied(),
                },
            )?;
            println!("Updated account #{} '{}'", account.id, account.name);
        }
        Some(("default", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let account = accounts::set_default_account(conn, user, id)?;
            println!("Default account is now #{} '{}'", account.id, account.name);
        }
        Some(("reorder", sub)) => {
            let ids: Vec<i64> = sub
                .get_many::<i64>("ids")
                .map(|v| v.copied().collect())
                .unwrap_or_default();
            let list = accounts::reorder_accounts(conn, user, &ids)?;
            let names: Vec<&str> = list.iter().map(|a| a.name.as_str()).collect();
            println!("Account order: {}", names.join(", "));
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let deleted = accounts::delete_account(conn, user, id)?;
            println!("Removed account #{}", deleted.id);
            if let Some(next) = deleted.new_default {
                println!("Account #{} is now the default", next);
            }
        }
        _ => {}
    }
    Ok(())
}
