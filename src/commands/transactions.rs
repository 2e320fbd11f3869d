// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{clearable_text, opt_text};
use crate::ledger::journal;
use crate::ledger::{Page, PageRequest};
use crate::models::{NewTransaction, Transaction, TransactionFilter, TransactionUpdate};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, parse_end_date, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, user, sub)?,
        Some(("edit", sub)) => edit(conn, user, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let deleted = journal::delete_transaction(conn, user, id)?;
            println!(
                "Removed transaction #{} ({}); account #{} balance {:.2}",
                deleted.id, deleted.amount, deleted.account_id, deleted.balance
            );
        }
        Some(("show", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let t = journal::get_transaction(conn, user, id)?;
            if !maybe_print_json(sub.get_flag("json"), &t)? {
                println!("{}", render(std::slice::from_ref(&t)));
            }
        }
        Some(("list", sub)) => list(conn, user, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, user: &str, sub: &clap::ArgMatches) -> Result<()> {
    let account_id = *sub.get_one::<i64>("account").context("--account is required")?;
    let amount = parse_decimal(sub.get_one::<String>("amount").context("--amount is required")?)?;
    let date = opt_text(sub, "date").map(|d| parse_date(&d)).transpose()?;
    let posted = journal::create_transaction(
        conn,
        user,
        NewTransaction {
            account_id,
            category_id: sub.get_one::<i64>("category").copied(),
            amount,
            description: opt_text(sub, "description"),
            date,
        },
    )?;
    println!(
        "Recorded #{} {} on {} (account #{} balance {:.2})",
        posted.transaction.id,
        posted.transaction.amount,
        posted.transaction.date.format("%Y-%m-%d"),
        account_id,
        posted.balance
    );
    Ok(())
}

fn edit(conn: &mut Connection, user: &str, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").context("--id is required")?;
    let amount = opt_text(sub, "amount")
        .map(|a| parse_decimal(&a))
        .transpose()?;
    let date = opt_text(sub, "date").map(|d| parse_date(&d)).transpose()?;
    let category_id = if sub.get_flag("uncategorize") {
        Some(None)
    } else {
        sub.get_one::<i64>("category").map(|c| Some(*c))
    };
    let updated = journal::update_transaction(
        conn,
        user,
        id,
        TransactionUpdate {
            account_id: sub.get_one::<i64>("account").copied(),
            category_id,
            amount,
            description: clearable_text(sub, "description"),
            date,
        },
    )?;
    if updated.old_account_id != updated.transaction.account_id {
        println!(
            "Updated #{}: account #{} balance {:.2}, account #{} balance {:.2}",
            id,
            updated.old_account_id,
            updated.old_account_balance,
            updated.transaction.account_id,
            updated.new_account_balance
        );
    } else {
        println!(
            "Updated #{}: account #{} balance {:.2}",
            id, updated.transaction.account_id, updated.new_account_balance
        );
    }
    Ok(())
}

fn list(conn: &Connection, user: &str, sub: &clap::ArgMatches) -> Result<()> {
    let page = query_rows(conn, user, sub)?;
    if !maybe_print_json(sub.get_flag("json"), &page)? {
        println!("{}", render(&page.items));
        if let Some(cursor) = page.end_cursor.as_ref().filter(|_| page.has_next_page) {
            println!("More results: --after {}", cursor);
        }
    }
    Ok(())
}

fn render(items: &[Transaction]) -> comfy_table::Table {
    let rows = items
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.date.format("%Y-%m-%d").to_string(),
                t.account_id.to_string(),
                t.category_id.map(|c| c.to_string()).unwrap_or_default(),
                t.amount.to_string(),
                t.description.clone().unwrap_or_default(),
                if t.is_recurring { "yes".into() } else { String::new() },
            ]
        })
        .collect();
    pretty_table(
        &["ID", "Date", "Account", "Category", "Amount", "Description", "Recurring"],
        rows,
    )
}

pub fn query_rows(
    conn: &Connection,
    user: &str,
    sub: &clap::ArgMatches,
) -> Result<Page<Transaction>> {
    let filter = TransactionFilter {
        account_id: sub.get_one::<i64>("account").copied(),
        category_id: sub.get_one::<i64>("category").copied(),
        date_from: opt_text(sub, "from").map(|d| parse_date(&d)).transpose()?,
        date_to: opt_text(sub, "to").map(|d| parse_end_date(&d)).transpose()?,
        min_amount: opt_text(sub, "min").map(|a| parse_decimal(&a)).transpose()?,
        max_amount: opt_text(sub, "max").map(|a| parse_decimal(&a)).transpose()?,
    };
    let page = PageRequest::first(sub.get_one::<usize>("limit").copied().unwrap_or(50))
        .after(opt_text(sub, "after"));
    Ok(journal::list_for_user(conn, user, &filter, &page)?)
}
