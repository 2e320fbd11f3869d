// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, Months, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{accounts, categories, journal};
use crate::db::{set_setting, write_tx};
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{
    Frequency, NewRecurring, NewTransaction, RecurringFilter, RecurringTransaction,
    RecurringUpdate,
};
use crate::utils::{col_decimal, col_opt_ts, col_parsed, col_ts, fmt_ts, is_storable};

pub const LAST_SWEEP_KEY: &str = "last_sweep_at";

const RECURRING_COLUMNS: &str = "id, user_id, account_id, category_id, amount, description, \
     frequency, next_execution_date, end_date, is_active, created_at, updated_at";

fn recurring_from_row(r: &Row) -> rusqlite::Result<RecurringTransaction> {
    Ok(RecurringTransaction {
        id: r.get(0)?,
        user_id: r.get(1)?,
        account_id: r.get(2)?,
        category_id: r.get(3)?,
        amount: col_decimal(r, 4)?,
        description: r.get(5)?,
        frequency: col_parsed(r, 6)?,
        next_execution_date: col_ts(r, 7)?,
        end_date: col_opt_ts(r, 8)?,
        is_active: r.get(9)?,
        created_at: col_ts(r, 10)?,
        updated_at: col_ts(r, 11)?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RecurringView {
    #[serde(flatten)]
    pub template: RecurringTransaction,
    pub days_until_next: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedRecurring {
    pub id: i64,
    pub deleted_transactions: usize,
    pub detached_transactions: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub processed_count: usize,
    pub created_transactions: Vec<i64>,
    pub deactivated: Vec<i64>,
    pub errors: Vec<String>,
}

enum SweepOutcome {
    Fired { transaction_id: i64, deactivated: bool },
    Expired,
    NotDue,
}

/// One frequency unit after `date`. Monthly steps keep the day of month and
/// clamp to the last day when the target month is shorter.
pub fn calculate_next_execution(
    date: DateTime<Utc>,
    frequency: Frequency,
) -> LedgerResult<DateTime<Utc>> {
    let next = match frequency {
        Frequency::Daily => date.checked_add_signed(Duration::days(1)),
        Frequency::Weekly => date.checked_add_signed(Duration::days(7)),
        Frequency::Monthly => date.checked_add_months(Months::new(1)),
    };
    next.filter(is_storable)
        .ok_or_else(|| LedgerError::validation("next execution date out of range"))
}

/// Whole days until `next`, rounded up; negative when overdue.
pub fn days_until_next(next: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY_NANOS: i128 = 86_400 * 1_000_000_000;
    let delta = next - now;
    let nanos = i128::from(delta.num_seconds()) * 1_000_000_000 + i128::from(delta.subsec_nanos());
    let days = nanos.div_euclid(DAY_NANOS) + i128::from(nanos.rem_euclid(DAY_NANOS) > 0);
    // |delta| is bounded by chrono's date range, far inside i64 days.
    days as i64
}

fn validate_amount(amount: Decimal) -> LedgerResult<()> {
    if amount.is_zero() {
        return Err(LedgerError::validation("amount must not be zero"));
    }
    Ok(())
}

fn validate_description(description: &str) -> LedgerResult<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("description must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_next(next: DateTime<Utc>, now: DateTime<Utc>) -> LedgerResult<()> {
    journal::storable_date(next)?;
    if next <= now {
        return Err(LedgerError::validation(
            "next execution date must be in the future",
        ));
    }
    Ok(())
}

fn validate_end(end: Option<DateTime<Utc>>, next: DateTime<Utc>) -> LedgerResult<()> {
    match end {
        Some(end) if !is_storable(&end) => Err(LedgerError::validation(
            "end date must fall in years 0000-9999",
        )),
        Some(end) if end <= next => Err(LedgerError::validation(
            "end date must be after the next execution date",
        )),
        _ => Ok(()),
    }
}

fn load_owned(conn: &Connection, user: &str, id: i64) -> LedgerResult<RecurringTransaction> {
    let sql = format!(
        "SELECT {} FROM recurring_transactions WHERE id=?1 AND user_id=?2",
        RECURRING_COLUMNS
    );
    conn.query_row(&sql, params![id, user], recurring_from_row)
        .optional()?
        .ok_or(LedgerError::NotFound("recurring transaction"))
}

pub fn create_recurring(
    conn: &mut Connection,
    user: &str,
    new: NewRecurring,
    now: DateTime<Utc>,
) -> LedgerResult<RecurringTransaction> {
    validate_amount(new.amount)?;
    let description = validate_description(&new.description)?;
    validate_next(new.next_execution_date, now)?;
    validate_end(new.end_date, new.next_execution_date)?;

    let tx = write_tx(conn)?;
    accounts::load_owned(&tx, user, new.account_id)?;
    if let Some(category_id) = new.category_id {
        categories::load_owned(&tx, user, category_id)?;
    }
    let stamp = fmt_ts(&Utc::now());
    tx.execute(
        "INSERT INTO recurring_transactions(user_id, account_id, category_id, amount, description,
                                            frequency, next_execution_date, end_date, is_active,
                                            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
        params![
            user,
            new.account_id,
            new.category_id,
            new.amount.to_string(),
            description,
            new.frequency.as_str(),
            fmt_ts(&new.next_execution_date),
            new.end_date.as_ref().map(fmt_ts),
            stamp
        ],
    )?;
    let template = load_owned(&tx, user, tx.last_insert_rowid())?;
    tx.commit()?;
    tracing::info!(
        user,
        recurring_id = template.id,
        frequency = %template.frequency,
        "recurring template created"
    );
    Ok(template)
}

/// Applies a partial update. Only fields present in `changes` are validated;
/// date ordering is re-checked whenever either date changes.
pub fn update_recurring(
    conn: &mut Connection,
    user: &str,
    id: i64,
    changes: RecurringUpdate,
    now: DateTime<Utc>,
) -> LedgerResult<RecurringTransaction> {
    let tx = write_tx(conn)?;
    let mut template = load_owned(&tx, user, id)?;

    if let Some(account_id) = changes.account_id {
        template.account_id = accounts::load_owned(&tx, user, account_id)?.id;
    }
    if let Some(category_id) = changes.category_id {
        template.category_id = match category_id {
            Some(c) => Some(categories::load_owned(&tx, user, c)?.id),
            None => None,
        };
    }
    if let Some(amount) = changes.amount {
        validate_amount(amount)?;
        template.amount = amount;
    }
    if let Some(description) = changes.description {
        template.description = validate_description(&description)?;
    }
    if let Some(frequency) = changes.frequency {
        template.frequency = frequency;
    }
    let dates_changed = changes.next_execution_date.is_some() || changes.end_date.is_some();
    if let Some(next) = changes.next_execution_date {
        validate_next(next, now)?;
        template.next_execution_date = next;
    }
    if let Some(end) = changes.end_date {
        template.end_date = end;
    }
    if dates_changed {
        validate_end(template.end_date, template.next_execution_date)?;
    }
    if let Some(active) = changes.is_active {
        template.is_active = active;
    }

    tx.execute(
        "UPDATE recurring_transactions
         SET account_id=?1, category_id=?2, amount=?3, description=?4, frequency=?5,
             next_execution_date=?6, end_date=?7, is_active=?8, updated_at=?9
         WHERE id=?10",
        params![
            template.account_id,
            template.category_id,
            template.amount.to_string(),
            template.description,
            template.frequency.as_str(),
            fmt_ts(&template.next_execution_date),
            template.end_date.as_ref().map(fmt_ts),
            template.is_active,
            fmt_ts(&Utc::now()),
            id
        ],
    )?;
    let template = load_owned(&tx, user, id)?;
    tx.commit()?;
    Ok(template)
}

/// Stops a template from firing without removing it.
pub fn deactivate_recurring(
    conn: &mut Connection,
    user: &str,
    id: i64,
    now: DateTime<Utc>,
) -> LedgerResult<RecurringTransaction> {
    update_recurring(
        conn,
        user,
        id,
        RecurringUpdate {
            is_active: Some(false),
            ..Default::default()
        },
        now,
    )
}

/// Hard-deletes a template. Generated transactions are either deleted through
/// the journal (restoring balances) or kept with their back-reference cleared.
pub fn delete_recurring(
    conn: &mut Connection,
    user: &str,
    id: i64,
    delete_generated: bool,
) -> LedgerResult<DeletedRecurring> {
    let tx = write_tx(conn)?;
    load_owned(&tx, user, id)?;

    let generated: Vec<i64> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM transactions WHERE recurring_id=?1 AND user_id=?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id, user], |r| r.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        ids
    };

    let mut deleted_transactions = 0;
    let mut detached_transactions = 0;
    if delete_generated {
        for tx_id in &generated {
            journal::delete_in(&tx, user, *tx_id)?;
            deleted_transactions += 1;
        }
    } else {
        detached_transactions = tx.execute(
            "UPDATE transactions SET recurring_id=NULL, updated_at=?1 WHERE recurring_id=?2",
            params![fmt_ts(&Utc::now()), id],
        )?;
    }
    tx.execute("DELETE FROM recurring_transactions WHERE id=?1", params![id])?;
    tx.commit()?;
    tracing::info!(
        user,
        recurring_id = id,
        deleted_transactions,
        detached_transactions,
        "recurring template deleted"
    );
    Ok(DeletedRecurring {
        id,
        deleted_transactions,
        detached_transactions,
    })
}

pub fn get_recurring(
    conn: &Connection,
    user: &str,
    id: i64,
    now: DateTime<Utc>,
) -> LedgerResult<RecurringView> {
    let template = load_owned(conn, user, id)?;
    Ok(RecurringView {
        days_until_next: days_until_next(template.next_execution_date, now),
        template,
    })
}

pub fn list_recurring(
    conn: &Connection,
    user: &str,
    filter: &RecurringFilter,
    now: DateTime<Utc>,
) -> LedgerResult<Vec<RecurringView>> {
    let sql = format!(
        "SELECT {} FROM recurring_transactions
         WHERE user_id=?1
           AND (?2 IS NULL OR account_id=?2)
           AND (?3 IS NULL OR frequency=?3)
           AND (?4=0 OR is_active=1)
         ORDER BY next_execution_date, id",
        RECURRING_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            user,
            filter.account_id,
            filter.frequency.map(|f| f.as_str()),
            filter.active_only
        ],
        recurring_from_row,
    )?;
    let mut out = Vec::new();
    for row in rows {
        let template = row?;
        out.push(RecurringView {
            days_until_next: days_until_next(template.next_execution_date, now),
            template,
        });
    }
    Ok(out)
}

/// Fires every active template that is due at `now`, one atomic unit per
/// template. A failing template is reported in `errors` and the sweep moves on.
pub fn process_recurring(conn: &mut Connection, now: DateTime<Utc>) -> LedgerResult<SweepReport> {
    let due: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM recurring_transactions
             WHERE is_active=1 AND next_execution_date<=?1
             ORDER BY next_execution_date, id",
        )?;
        let rows = stmt.query_map(params![fmt_ts(&now)], |r| r.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        ids
    };

    let mut report = SweepReport::default();
    for id in due {
        match fire_one(conn, id, now) {
            Ok(SweepOutcome::Fired {
                transaction_id,
                deactivated,
            }) => {
                report.processed_count += 1;
                report.created_transactions.push(transaction_id);
                if deactivated {
                    report.deactivated.push(id);
                }
            }
            Ok(SweepOutcome::Expired) => report.deactivated.push(id),
            Ok(SweepOutcome::NotDue) => {
                tracing::debug!(recurring_id = id, "template no longer due, skipped");
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(recurring_id = id, error = %e, "recurring template failed");
                } else {
                    tracing::warn!(recurring_id = id, error = %e, "recurring template rejected");
                }
                report.errors.push(format!("template {}: {}", id, e));
            }
        }
    }

    set_setting(conn, LAST_SWEEP_KEY, &fmt_ts(&now))?;
    tracing::info!(
        processed = report.processed_count,
        deactivated = report.deactivated.len(),
        errors = report.errors.len(),
        "recurring sweep finished"
    );
    Ok(report)
}

fn fire_one(conn: &mut Connection, id: i64, now: DateTime<Utc>) -> LedgerResult<SweepOutcome> {
    let tx = write_tx(conn)?;
    let sql = format!(
        "SELECT {} FROM recurring_transactions WHERE id=?1",
        RECURRING_COLUMNS
    );
    let template = match tx.query_row(&sql, params![id], recurring_from_row).optional()? {
        Some(t) => t,
        None => return Ok(SweepOutcome::NotDue),
    };
    // An overlapping sweep may already have advanced or disabled it.
    if !template.is_active || template.next_execution_date > now {
        return Ok(SweepOutcome::NotDue);
    }
    let stamp = fmt_ts(&Utc::now());

    if template.end_date.is_some_and(|end| end < now) {
        tx.execute(
            "UPDATE recurring_transactions SET is_active=0, updated_at=?1 WHERE id=?2",
            params![stamp, id],
        )?;
        tx.commit()?;
        return Ok(SweepOutcome::Expired);
    }

    let posted = journal::post_in(
        &tx,
        &template.user_id,
        NewTransaction {
            account_id: template.account_id,
            category_id: template.category_id,
            amount: template.amount,
            description: Some(template.description.clone()),
            date: Some(template.next_execution_date),
        },
        Some(template.id),
    )?;

    let next = calculate_next_execution(template.next_execution_date, template.frequency)?;
    let deactivated = template.end_date.is_some_and(|end| next > end);
    tx.execute(
        "UPDATE recurring_transactions
         SET next_execution_date=?1, is_active=?2, updated_at=?3
         WHERE id=?4",
        params![fmt_ts(&next), !deactivated, stamp, id],
    )?;
    tx.commit()?;
    tracing::debug!(
        recurring_id = id,
        transaction_id = posted.transaction.id,
        next = %next,
        deactivated,
        "recurring template fired"
    );
    Ok(SweepOutcome::Fired {
        transaction_id: posted.transaction.id,
        deactivated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn daily_and_weekly_steps() {
        let d = at(2025, 1, 30);
        assert_eq!(
            calculate_next_execution(d, Frequency::Daily).unwrap(),
            at(2025, 1, 31)
        );
        assert_eq!(
            calculate_next_execution(d, Frequency::Weekly).unwrap(),
            at(2025, 2, 6)
        );
    }

    #[test]
    fn monthly_keeps_day_of_month() {
        assert_eq!(
            calculate_next_execution(at(2025, 1, 15), Frequency::Monthly).unwrap(),
            at(2025, 2, 15)
        );
        assert_eq!(
            calculate_next_execution(at(2025, 12, 15), Frequency::Monthly).unwrap(),
            at(2026, 1, 15)
        );
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        assert_eq!(
            calculate_next_execution(at(2025, 1, 31), Frequency::Monthly).unwrap(),
            at(2025, 2, 28)
        );
        assert_eq!(
            calculate_next_execution(at(2024, 1, 31), Frequency::Monthly).unwrap(),
            at(2024, 2, 29)
        );
    }

    #[test]
    fn days_until_next_rounds_up() {
        let now = at(2025, 3, 1);
        assert_eq!(days_until_next(now + Duration::hours(1), now), 1);
        assert_eq!(days_until_next(now + Duration::days(2), now), 2);
        assert_eq!(days_until_next(now, now), 0);
        assert_eq!(days_until_next(now - Duration::hours(36), now), -1);
        assert_eq!(days_until_next(now - Duration::days(3), now), -3);
    }

    #[test]
    fn days_until_next_counts_sub_second_remainders() {
        let now = at(2025, 3, 1);
        assert_eq!(days_until_next(now + Duration::milliseconds(500), now), 1);
        assert_eq!(days_until_next(now + Duration::nanoseconds(1), now), 1);
        assert_eq!(days_until_next(now - Duration::milliseconds(500), now), 0);
        let day_and_a_bit = Duration::days(1) + Duration::milliseconds(1);
        assert_eq!(days_until_next(now + day_and_a_bit, now), 2);
        assert_eq!(days_until_next(now - day_and_a_bit, now), -1);
    }

    #[test]
    fn stepping_past_year_9999_is_rejected() {
        let late = at(9999, 12, 31);
        assert!(matches!(
            calculate_next_execution(late, Frequency::Daily),
            Err(LedgerError::Validation(_))
        ));
    }
}
