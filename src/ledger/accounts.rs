// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::write_tx;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{Account, AccountUpdate, Currency, NewAccount};
use crate::utils::{col_decimal, col_ts, fmt_ts};

pub(crate) const ACCOUNT_COLUMNS: &str = "id, user_id, name, description, icon, current_amount, \
     default_value, currency, is_default, is_active, display_order, created_at, updated_at";

pub(crate) fn account_from_row(r: &Row) -> rusqlite::Result<Account> {
    let currency: Option<String> = r.get(7)?;
    let currency = currency
        .map(|c| {
            c.parse::<Currency>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    Ok(Account {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        description: r.get(3)?,
        icon: r.get(4)?,
        current_amount: col_decimal(r, 5)?,
        default_value: col_decimal(r, 6)?,
        currency,
        is_default: r.get(8)?,
        is_active: r.get(9)?,
        display_order: r.get(10)?,
        created_at: col_ts(r, 11)?,
        updated_at: col_ts(r, 12)?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedAccount {
    pub id: i64,
    pub new_default: Option<i64>,
}

fn validate_name(name: &str) -> LedgerResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("account name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Loads an account only if `user` owns it.
pub(crate) fn load_owned(conn: &Connection, user: &str, id: i64) -> LedgerResult<Account> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE id=?1 AND user_id=?2",
        ACCOUNT_COLUMNS
    );
    conn.query_row(&sql, params![id, user], account_from_row)
        .optional()?
        .ok_or(LedgerError::NotFound("account"))
}

/// Adds `delta` to the account balance and returns the new balance. Must run
/// inside the write transaction of the operation that caused the change.
pub(crate) fn apply_delta(
    conn: &Connection,
    user: &str,
    account_id: i64,
    delta: Decimal,
) -> LedgerResult<Decimal> {
    let account = load_owned(conn, user, account_id)?;
    let balance = account.current_amount + delta;
    conn.execute(
        "UPDATE accounts SET current_amount=?1, updated_at=?2 WHERE id=?3",
        params![balance.to_string(), fmt_ts(&Utc::now()), account_id],
    )?;
    Ok(balance)
}

pub fn create_account(conn: &mut Connection, user: &str, new: NewAccount) -> LedgerResult<Account> {
    let tx = write_tx(conn)?;
    let account = create_account_in(&tx, user, new)?;
    tx.commit()?;
    Ok(account)
}

pub(crate) fn create_account_in(
    conn: &Connection,
    user: &str,
    new: NewAccount,
) -> LedgerResult<Account> {
    let name = validate_name(&new.name)?;
    let (count, max_order): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), MAX(display_order) FROM accounts WHERE user_id=?1",
        params![user],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let first = count == 0;
    let order = if first { 0 } else { max_order.unwrap_or(-1) + 1 };
    let now = fmt_ts(&Utc::now());
    conn.execute(
        "INSERT INTO accounts(user_id, name, description, icon, current_amount, default_value,
                              currency, is_default, is_active, display_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7, 1, ?8, ?9, ?9)",
        params![
            user,
            name,
            new.description,
            new.icon,
            new.opening_balance.to_string(),
            new.currency.map(|c| c.as_str()),
            first,
            order,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(user, account_id = id, is_default = first, "account created");
    load_owned(conn, user, id)
}

pub fn update_account(
    conn: &mut Connection,
    user: &str,
    id: i64,
    changes: AccountUpdate,
) -> LedgerResult<Account> {
    let tx = write_tx(conn)?;
    let mut account = load_owned(&tx, user, id)?;
    if let Some(name) = changes.name {
        account.name = validate_name(&name)?;
    }
    if let Some(description) = changes.description {
        account.description = description;
    }
    if let Some(icon) = changes.icon {
        account.icon = icon;
    }
    if let Some(currency) = changes.currency {
        account.currency = currency;
    }
    if let Some(active) = changes.is_active {
        account.is_active = active;
    }
    tx.execute(
        "UPDATE accounts SET name=?1, description=?2, icon=?3, currency=?4, is_active=?5, updated_at=?6
         WHERE id=?7",
        params![
            account.name,
            account.description,
            account.icon,
            account.currency.map(|c| c.as_str()),
            account.is_active,
            fmt_ts(&Utc::now()),
            id
        ],
    )?;
    let account = load_owned(&tx, user, id)?;
    tx.commit()?;
    Ok(account)
}

pub fn set_default_account(conn: &mut Connection, user: &str, id: i64) -> LedgerResult<Account> {
    let tx = write_tx(conn)?;
    let target = load_owned(&tx, user, id)?;
    if !target.is_default {
        let now = fmt_ts(&Utc::now());
        tx.execute(
            "UPDATE accounts SET is_default=0, updated_at=?1
             WHERE user_id=?2 AND is_default=1 AND id<>?3",
            params![now, user, id],
        )?;
        tx.execute(
            "UPDATE accounts SET is_default=1, updated_at=?1 WHERE id=?2",
            params![now, id],
        )?;
        tracing::info!(user, account_id = id, "default account changed");
    }
    let account = load_owned(&tx, user, id)?;
    tx.commit()?;
    Ok(account)
}

pub fn delete_account(conn: &mut Connection, user: &str, id: i64) -> LedgerResult<DeletedAccount> {
    let tx = write_tx(conn)?;
    let account = load_owned(&tx, user, id)?;

    let tx_count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM transactions WHERE account_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if tx_count > 0 {
        return Err(LedgerError::conflict(format!(
            "cannot delete account with {} transactions",
            tx_count
        )));
    }
    let rec_count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM recurring_transactions WHERE account_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if rec_count > 0 {
        return Err(LedgerError::conflict(format!(
            "cannot delete account with {} recurring templates",
            rec_count
        )));
    }

    tx.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
    renumber(&tx, user)?;

    let mut new_default = None;
    if account.is_default {
        let successor: Option<i64> = tx
            .query_row(
                "SELECT id FROM accounts WHERE user_id=?1 ORDER BY display_order, id LIMIT 1",
                params![user],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(next) = successor {
            tx.execute(
                "UPDATE accounts SET is_default=1, updated_at=?1 WHERE id=?2",
                params![fmt_ts(&Utc::now()), next],
            )?;
            new_default = Some(next);
        }
    }
    tx.commit()?;
    tracing::info!(user, account_id = id, ?new_default, "account deleted");
    Ok(DeletedAccount { id, new_default })
}

/// Rewrites `display_order` to follow `ordered_ids`, which must name every
/// account the user owns exactly once.
pub fn reorder_accounts(
    conn: &mut Connection,
    user: &str,
    ordered_ids: &[i64],
) -> LedgerResult<Vec<Account>> {
    let tx = write_tx(conn)?;
    let mut owned: Vec<i64> = list_accounts(&tx, user)?.iter().map(|a| a.id).collect();
    let mut requested = ordered_ids.to_vec();
    owned.sort_unstable();
    requested.sort_unstable();
    if owned != requested {
        return Err(LedgerError::validation(
            "reorder must list each of the user's accounts exactly once",
        ));
    }
    let now = fmt_ts(&Utc::now());
    for (pos, id) in ordered_ids.iter().enumerate() {
        tx.execute(
            "UPDATE accounts SET display_order=?1, updated_at=?2 WHERE id=?3",
            params![pos as i64, now, id],
        )?;
    }
    let accounts = list_accounts(&tx, user)?;
    tx.commit()?;
    Ok(accounts)
}

fn renumber(conn: &Connection, user: &str) -> LedgerResult<()> {
    let ids: Vec<i64> = list_accounts(conn, user)?.iter().map(|a| a.id).collect();
    for (pos, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE accounts SET display_order=?1 WHERE id=?2 AND display_order<>?1",
            params![pos as i64, id],
        )?;
    }
    Ok(())
}

pub fn get_account(conn: &Connection, user: &str, id: i64) -> LedgerResult<Account> {
    load_owned(conn, user, id)
}

pub fn list_accounts(conn: &Connection, user: &str) -> LedgerResult<Vec<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE user_id=?1 ORDER BY display_order, id",
        ACCOUNT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], account_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
