// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::balances;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub fn handle(
    conn: &Connection,
    user: &str,
    m: &clap::ArgMatches,
    now: DateTime<Utc>,
) -> Result<()> {
    match m.subcommand() {
        Some(("balances", sub)) => balances_report(conn, user, sub)?,
        Some(("summary", sub)) => summary(conn, user, sub, now)?,
        _ => {}
    }
    Ok(())
}

fn balances_report(conn: &Connection, user: &str, sub: &clap::ArgMatches) -> Result<()> {
    let totals = balances::total_balance(conn, user, sub.get_flag("include-inactive"))?;
    if !maybe_print_json(sub.get_flag("json"), &totals)? {
        let mut data: Vec<Vec<String>> = totals
            .accounts
            .iter()
            .map(|l| {
                vec![
                    l.name.clone(),
                    l.currency.map(|c| c.to_string()).unwrap_or_default(),
                    format!("{:.2}", l.current_amount),
                ]
            })
            .collect();
        data.push(vec![
            "Total".into(),
            String::new(),
            format!("{:.2}", totals.total),
        ]);
        println!("{}", pretty_table(&["Account", "CCY", "Balance"], data));
    }
    Ok(())
}

fn summary(
    conn: &Connection,
    user: &str,
    sub: &clap::ArgMatches,
    now: DateTime<Utc>,
) -> Result<()> {
    let days = sub.get_one::<u32>("days").copied().unwrap_or(30);
    let s = balances::period_summary(conn, user, days, now)?;
    if !maybe_print_json(sub.get_flag("json"), &s)? {
        let data = vec![vec![
            format!("{}d", s.period_days),
            format!("{:.2}", s.income),
            format!("{:.2}", s.expense),
            format!("{:.2}", s.net_flow),
            s.transaction_count.to_string(),
            format!("{:.2}", s.average_magnitude),
        ]];
        println!(
            "{}",
            pretty_table(
                &["Period", "Income", "Expense", "Net", "Count", "Avg"],
                data
            )
        );
    }
    Ok(())
}
