// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use super::recurring::LAST_SWEEP_KEY;
use super::{accounts, balances, categories};
use crate::db::{get_setting, write_tx};
use crate::errors::{LedgerError, LedgerResult};
use crate::models::NewAccount;

pub const RESET_PHRASE: &str = "DELETE ALL MY DATA";
pub const DEFAULT_ACCOUNT_NAME: &str = "Main Account";
pub const DEFAULT_ACCOUNT_ICON: &str = "wallet";

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub account_name: Option<String>,
    pub account_icon: Option<String>,
    pub opening_balance: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Initialized {
    pub account_id: i64,
    pub categories_created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupStatus {
    pub needs_setup: bool,
    pub has_accounts: bool,
    pub has_categories: bool,
    pub has_transactions: bool,
    pub account_count: i64,
    pub category_count: i64,
    pub transaction_count: i64,
    pub recurring_count: i64,
    pub total_balance: Decimal,
    pub last_sweep_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetReport {
    pub transactions: usize,
    pub recurring: usize,
    pub accounts: usize,
    pub categories: usize,
}

/// First-run bootstrap: one default account plus the seed categories.
pub fn initialize(
    conn: &mut Connection,
    user: &str,
    options: SetupOptions,
) -> LedgerResult<Initialized> {
    let tx = write_tx(conn)?;
    if count(&tx, "accounts", user)? > 0 {
        return Err(LedgerError::conflict("already initialized"));
    }
    let account = accounts::create_account_in(
        &tx,
        user,
        NewAccount {
            name: options
                .account_name
                .unwrap_or_else(|| DEFAULT_ACCOUNT_NAME.to_string()),
            description: None,
            icon: options
                .account_icon
                .unwrap_or_else(|| DEFAULT_ACCOUNT_ICON.to_string()),
            opening_balance: options.opening_balance.unwrap_or(Decimal::ZERO),
            currency: None,
        },
    )?;
    let created = categories::initialize_defaults_in(&tx, user)?;
    tx.commit()?;
    tracing::info!(user, account_id = account.id, categories = created.len(), "user initialized");
    Ok(Initialized {
        account_id: account.id,
        categories_created: created.len(),
    })
}

pub fn setup_status(conn: &Connection, user: &str) -> LedgerResult<SetupStatus> {
    let account_count = count(conn, "accounts", user)?;
    let category_count = count(conn, "categories", user)?;
    let transaction_count = count(conn, "transactions", user)?;
    let recurring_count = count(conn, "recurring_transactions", user)?;
    let total_balance = balances::total_balance(conn, user, true)?.total;
    let last_sweep_at = get_setting(conn, LAST_SWEEP_KEY)?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    Ok(SetupStatus {
        needs_setup: account_count == 0,
        has_accounts: account_count > 0,
        has_categories: category_count > 0,
        has_transactions: transaction_count > 0,
        account_count,
        category_count,
        transaction_count,
        recurring_count,
        total_balance,
        last_sweep_at,
    })
}

/// Deletes everything the user owns. Children go first so no step ever leaves
/// a dangling reference.
pub fn reset(conn: &mut Connection, user: &str, phrase: &str) -> LedgerResult<ResetReport> {
    if phrase != RESET_PHRASE {
        return Err(LedgerError::validation(format!(
            "confirmation phrase must be exactly '{}'",
            RESET_PHRASE
        )));
    }
    let tx = write_tx(conn)?;
    let mut report = ResetReport::default();
    for (table, slot) in [
        ("transactions", &mut report.transactions),
        ("recurring_transactions", &mut report.recurring),
        ("accounts", &mut report.accounts),
        ("categories", &mut report.categories),
    ] {
        *slot = tx.execute(
            &format!("DELETE FROM {} WHERE user_id=?1", table),
            params![user],
        )?;
    }
    tx.commit()?;
    tracing::warn!(
        user,
        transactions = report.transactions,
        recurring = report.recurring,
        accounts = report.accounts,
        categories = report.categories,
        "user data reset"
    );
    Ok(report)
}

fn count(conn: &Connection, table: &str, user: &str) -> LedgerResult<i64> {
    Ok(conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE user_id=?1", table),
        params![user],
        |r| r.get(0),
    )?)
}
