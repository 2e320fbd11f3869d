// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use super::accounts;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::Currency;
use crate::utils::{col_decimal, col_opt_ts, earliest_ts, fmt_ts, is_storable};

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub account_id: i64,
    pub name: String,
    pub current_amount: Decimal,
    pub default_value: Decimal,
    pub transaction_count: i64,
    pub last_transaction_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceLine {
    pub account_id: i64,
    pub name: String,
    pub currency: Option<Currency>,
    pub is_active: bool,
    pub current_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalBalance {
    pub total: Decimal,
    pub accounts: Vec<BalanceLine>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodSummary {
    pub period_days: u32,
    pub income: Decimal,
    pub expense: Decimal,
    pub net_flow: Decimal,
    pub transaction_count: usize,
    pub average_magnitude: Decimal,
}

/// Balance snapshot of one account, `None` if the user does not own it.
pub fn account_balance(
    conn: &Connection,
    user: &str,
    account_id: i64,
) -> LedgerResult<Option<AccountBalance>> {
    let account = match accounts::load_owned(conn, user, account_id) {
        Ok(a) => a,
        Err(LedgerError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    let (transaction_count, last_transaction_date) = conn.query_row(
        "SELECT COUNT(*), MAX(date) FROM transactions WHERE account_id=?1",
        params![account_id],
        |r| Ok((r.get::<_, i64>(0)?, col_opt_ts(r, 1)?)),
    )?;
    Ok(Some(AccountBalance {
        account_id,
        name: account.name,
        current_amount: account.current_amount,
        default_value: account.default_value,
        transaction_count,
        last_transaction_date,
        updated_at: account.updated_at,
    }))
}

pub fn total_balance(
    conn: &Connection,
    user: &str,
    include_inactive: bool,
) -> LedgerResult<TotalBalance> {
    let lines: Vec<BalanceLine> = accounts::list_accounts(conn, user)?
        .into_iter()
        .filter(|a| include_inactive || a.is_active)
        .map(|a| BalanceLine {
            account_id: a.id,
            name: a.name,
            currency: a.currency,
            is_active: a.is_active,
            current_amount: a.current_amount,
        })
        .collect();
    let total: Decimal = lines.iter().map(|l| l.current_amount).sum();
    Ok(TotalBalance {
        total,
        accounts: lines,
    })
}

/// Income and expense over the trailing `period_days` ending at `now`.
pub fn period_summary(
    conn: &Connection,
    user: &str,
    period_days: u32,
    now: DateTime<Utc>,
) -> LedgerResult<PeriodSummary> {
    let from = Duration::try_days(i64::from(period_days))
        .and_then(|window| now.checked_sub_signed(window))
        .filter(is_storable)
        .unwrap_or_else(earliest_ts);
    let mut stmt = conn.prepare(
        "SELECT amount FROM transactions WHERE user_id=?1 AND date>=?2 AND date<=?3",
    )?;
    let rows = stmt.query_map(params![user, fmt_ts(&from), fmt_ts(&now)], |r| {
        col_decimal(r, 0)
    })?;

    let mut summary = PeriodSummary {
        period_days,
        ..Default::default()
    };
    let mut magnitude = Decimal::ZERO;
    for row in rows {
        let amount = row?;
        if amount > Decimal::ZERO {
            summary.income += amount;
        } else {
            summary.expense += -amount;
        }
        magnitude += amount.abs();
        summary.transaction_count += 1;
    }
    summary.net_flow = summary.income - summary.expense;
    if summary.transaction_count > 0 {
        summary.average_magnitude = magnitude / Decimal::from(summary.transaction_count);
    }
    Ok(summary)
}
