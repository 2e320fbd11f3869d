// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction journal: every write here moves the owning account balance in
//! the same SQLite transaction as the record itself.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use super::pagination::{into_page, Page, PageRequest, TransactionCursor};
use super::{accounts, categories};
use crate::db::write_tx;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{NewTransaction, Transaction, TransactionFilter, TransactionUpdate};
use crate::utils::{col_decimal, col_ts, fmt_ts, is_storable};

pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.user_id, t.account_id, t.category_id, \
     t.amount, t.description, t.date, t.is_recurring, t.recurring_id, t.created_at, t.updated_at";

pub(crate) fn transaction_from_row(r: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        user_id: r.get(1)?,
        account_id: r.get(2)?,
        category_id: r.get(3)?,
        amount: col_decimal(r, 4)?,
        description: r.get(5)?,
        date: col_ts(r, 6)?,
        is_recurring: r.get(7)?,
        recurring_id: r.get(8)?,
        created_at: col_ts(r, 9)?,
        updated_at: col_ts(r, 10)?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PostedTransaction {
    pub transaction: Transaction,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedTransaction {
    pub transaction: Transaction,
    pub old_account_id: i64,
    /// Balance of the account the transaction was moved away from (equal to
    /// `new_account_balance` when the account did not change).
    pub old_account_balance: Decimal,
    pub new_account_balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedTransaction {
    pub id: i64,
    pub account_id: i64,
    pub amount: Decimal,
    pub balance: Decimal,
}

fn load_owned(conn: &Connection, user: &str, id: i64) -> LedgerResult<Transaction> {
    let sql = format!(
        "SELECT {} FROM transactions t WHERE t.id=?1 AND t.user_id=?2",
        TRANSACTION_COLUMNS
    );
    conn.query_row(&sql, params![id, user], transaction_from_row)
        .optional()?
        .ok_or(LedgerError::NotFound("transaction"))
}

/// Rejects dates whose stored text would not sort with the rest.
pub(crate) fn storable_date(ts: DateTime<Utc>) -> LedgerResult<DateTime<Utc>> {
    if is_storable(&ts) {
        Ok(ts)
    } else {
        Err(LedgerError::validation("date must fall in years 0000-9999"))
    }
}

fn normalize_description(d: Option<String>) -> Option<String> {
    d.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn create_transaction(
    conn: &mut Connection,
    user: &str,
    new: NewTransaction,
) -> LedgerResult<PostedTransaction> {
    let tx = write_tx(conn)?;
    let posted = post_in(&tx, user, new, None)?;
    tx.commit()?;
    Ok(posted)
}

/// Inserts a transaction and applies it to the account balance. `recurring_id`
/// marks transactions materialized from a recurring template.
pub(crate) fn post_in(
    conn: &Connection,
    user: &str,
    new: NewTransaction,
    recurring_id: Option<i64>,
) -> LedgerResult<PostedTransaction> {
    accounts::load_owned(conn, user, new.account_id)?;
    if let Some(category_id) = new.category_id {
        categories::load_owned(conn, user, category_id)?;
    }
    let now = Utc::now();
    let date = storable_date(new.date.unwrap_or(now))?;
    let now = fmt_ts(&now);
    conn.execute(
        "INSERT INTO transactions(user_id, account_id, category_id, amount, description, date,
                                  is_recurring, recurring_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            user,
            new.account_id,
            new.category_id,
            new.amount.to_string(),
            normalize_description(new.description),
            fmt_ts(&date),
            recurring_id.is_some(),
            recurring_id,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    let balance = accounts::apply_delta(conn, user, new.account_id, new.amount)?;
    tracing::debug!(
        user,
        transaction_id = id,
        account_id = new.account_id,
        amount = %new.amount,
        balance = %balance,
        "transaction posted"
    );
    Ok(PostedTransaction {
        transaction: load_owned(conn, user, id)?,
        balance,
    })
}

pub fn update_transaction(
    conn: &mut Connection,
    user: &str,
    id: i64,
    changes: TransactionUpdate,
) -> LedgerResult<UpdatedTransaction> {
    let tx = write_tx(conn)?;
    let old = load_owned(&tx, user, id)?;

    let account_id = changes.account_id.unwrap_or(old.account_id);
    if account_id != old.account_id {
        accounts::load_owned(&tx, user, account_id)?;
    }
    let category_id = match changes.category_id {
        Some(Some(c)) => Some(categories::load_owned(&tx, user, c)?.id),
        Some(None) => None,
        None => old.category_id,
    };
    let amount = changes.amount.unwrap_or(old.amount);
    let description = match changes.description {
        Some(d) => normalize_description(d),
        None => old.description.clone(),
    };
    let date = match changes.date {
        Some(d) => storable_date(d)?,
        None => old.date,
    };

    if amount != old.amount || account_id != old.account_id {
        accounts::apply_delta(&tx, user, old.account_id, -old.amount)?;
        accounts::apply_delta(&tx, user, account_id, amount)?;
    }

    tx.execute(
        "UPDATE transactions SET account_id=?1, category_id=?2, amount=?3, description=?4,
                                 date=?5, updated_at=?6
         WHERE id=?7",
        params![
            account_id,
            category_id,
            amount.to_string(),
            description,
            fmt_ts(&date),
            fmt_ts(&Utc::now()),
            id
        ],
    )?;

    let old_account_balance = accounts::load_owned(&tx, user, old.account_id)?.current_amount;
    let new_account_balance = accounts::load_owned(&tx, user, account_id)?.current_amount;
    let transaction = load_owned(&tx, user, id)?;
    tx.commit()?;
    tracing::debug!(user, transaction_id = id, "transaction updated");
    Ok(UpdatedTransaction {
        transaction,
        old_account_id: old.account_id,
        old_account_balance,
        new_account_balance,
    })
}

pub fn delete_transaction(
    conn: &mut Connection,
    user: &str,
    id: i64,
) -> LedgerResult<DeletedTransaction> {
    let tx = write_tx(conn)?;
    let deleted = delete_in(&tx, user, id)?;
    tx.commit()?;
    Ok(deleted)
}

pub(crate) fn delete_in(conn: &Connection, user: &str, id: i64) -> LedgerResult<DeletedTransaction> {
    let old = load_owned(conn, user, id)?;
    conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    let balance = accounts::apply_delta(conn, user, old.account_id, -old.amount)?;
    tracing::debug!(user, transaction_id = id, balance = %balance, "transaction deleted");
    Ok(DeletedTransaction {
        id,
        account_id: old.account_id,
        amount: old.amount,
        balance,
    })
}

pub fn get_transaction(conn: &Connection, user: &str, id: i64) -> LedgerResult<Transaction> {
    load_owned(conn, user, id)
}

pub fn list_for_account(
    conn: &Connection,
    user: &str,
    account_id: i64,
    page: &PageRequest,
) -> LedgerResult<Page<Transaction>> {
    accounts::load_owned(conn, user, account_id)?;
    let filter = TransactionFilter {
        account_id: Some(account_id),
        ..Default::default()
    };
    query_page(conn, user, &filter, page)
}

pub fn list_for_user(
    conn: &Connection,
    user: &str,
    filter: &TransactionFilter,
    page: &PageRequest,
) -> LedgerResult<Page<Transaction>> {
    query_page(conn, user, filter, page)
}

fn query_page(
    conn: &Connection,
    user: &str,
    filter: &TransactionFilter,
    page: &PageRequest,
) -> LedgerResult<Page<Transaction>> {
    let mut sql = format!(
        "SELECT {} FROM transactions t WHERE t.user_id=?",
        TRANSACTION_COLUMNS
    );
    let mut values: Vec<Value> = vec![Value::Text(user.to_string())];

    if let Some(account_id) = filter.account_id {
        sql.push_str(" AND t.account_id=?");
        values.push(Value::Integer(account_id));
    }
    if let Some(category_id) = filter.category_id {
        sql.push_str(" AND t.category_id=?");
        values.push(Value::Integer(category_id));
    }
    if let Some(from) = filter.date_from {
        sql.push_str(" AND t.date>=?");
        values.push(Value::Text(fmt_ts(&storable_date(from)?)));
    }
    if let Some(to) = filter.date_to {
        sql.push_str(" AND t.date<=?");
        values.push(Value::Text(fmt_ts(&storable_date(to)?)));
    }

    let limit = page.limit();
    let mut cursor = page
        .after
        .as_deref()
        .map(TransactionCursor::decode)
        .transpose()?;
    let in_range = |amount: &Decimal| {
        filter.min_amount.is_none_or(|min| *amount >= min)
            && filter.max_amount.is_none_or(|max| *amount <= max)
    };

    // Amounts are TEXT, so the range is checked on the decoded Decimal. Keep
    // scanning in keyset batches until the page and its look-ahead row are full.
    let mut items = Vec::new();
    loop {
        let mut batch_sql = sql.clone();
        let mut batch_values = values.clone();
        if let Some(c) = &cursor {
            let date = fmt_ts(&c.date);
            batch_sql.push_str(" AND (t.date<? OR (t.date=? AND t.id<?))");
            batch_values.push(Value::Text(date.clone()));
            batch_values.push(Value::Text(date));
            batch_values.push(Value::Integer(c.id));
        }
        batch_sql.push_str(" ORDER BY t.date DESC, t.id DESC LIMIT ?");
        batch_values.push(Value::Integer(limit as i64 + 1));

        let mut stmt = conn.prepare_cached(&batch_sql)?;
        let rows = stmt.query_map(params_from_iter(batch_values.iter()), transaction_from_row)?;
        let mut scanned = 0;
        let mut last = None;
        for row in rows {
            let t = row?;
            scanned += 1;
            last = Some(TransactionCursor::from(&t));
            if in_range(&t.amount) && items.len() <= limit {
                items.push(t);
            }
        }
        if items.len() > limit || scanned <= limit {
            break;
        }
        cursor = last;
    }
    Ok(into_page(items, limit))
}

/// Every transaction of a user, oldest first. Used by exports and aggregates.
pub fn all_for_user(conn: &Connection, user: &str) -> LedgerResult<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions t WHERE t.user_id=?1 ORDER BY t.date, t.id",
        TRANSACTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], transaction_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
