// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use pursebook::db;
use pursebook::ledger::recurring::{self, LAST_SWEEP_KEY};
use pursebook::ledger::{accounts, journal};
use pursebook::models::{Frequency, NewAccount, NewRecurring, RecurringFilter, RecurringUpdate};
use pursebook::LedgerError;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

fn setup() -> (Connection, i64) {
    let mut conn = db::open_in_memory().unwrap();
    let account = accounts::create_account(
        &mut conn,
        "alice",
        NewAccount {
            name: "Checking".into(),
            description: None,
            icon: "wallet".into(),
            opening_balance: Decimal::from(500),
            currency: None,
        },
    )
    .unwrap();
    (conn, account.id)
}

fn template(account_id: i64, amount: i64, frequency: Frequency, next: DateTime<Utc>) -> NewRecurring {
    NewRecurring {
        account_id,
        category_id: None,
        amount: Decimal::from(amount),
        description: "Subscription".into(),
        frequency,
        next_execution_date: next,
        end_date: None,
    }
}

fn balance(conn: &Connection, account_id: i64) -> Decimal {
    accounts::get_account(conn, "alice", account_id)
        .unwrap()
        .current_amount
}

#[test]
fn creation_rejects_bad_input() {
    let (mut conn, a) = setup();
    let now = t0();

    let cases = [
        template(a, 0, Frequency::Daily, now + Duration::days(1)),
        NewRecurring {
            description: "   ".into(),
            ..template(a, -5, Frequency::Daily, now + Duration::days(1))
        },
        template(a, -5, Frequency::Daily, now - Duration::hours(1)),
        template(a, -5, Frequency::Daily, now),
        NewRecurring {
            end_date: Some(now + Duration::days(1)),
            ..template(a, -5, Frequency::Daily, now + Duration::days(1))
        },
    ];
    for case in cases {
        assert!(matches!(
            recurring::create_recurring(&mut conn, "alice", case, now),
            Err(LedgerError::Validation(_))
        ));
    }

    assert!(matches!(
        recurring::create_recurring(
            &mut conn,
            "bob",
            template(a, -5, Frequency::Daily, now + Duration::days(1)),
            now
        ),
        Err(LedgerError::NotFound(_))
    ));
    assert!(recurring::list_recurring(&conn, "alice", &RecurringFilter::default(), now)
        .unwrap()
        .is_empty());
}

#[test]
fn monthly_template_fires_once_and_advances_a_month() {
    let (mut conn, a) = setup();
    let now = t0();
    let next = now + Duration::days(2);
    let created = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -75, Frequency::Monthly, next),
        now,
    )
    .unwrap();

    let view = recurring::get_recurring(&conn, "alice", created.id, now).unwrap();
    assert_eq!(view.days_until_next, 2);

    let report = recurring::process_recurring(&mut conn, now + Duration::days(3)).unwrap();
    assert_eq!(report.processed_count, 1);
    assert_eq!(report.created_transactions.len(), 1);
    assert!(report.errors.is_empty());

    let tx = journal::get_transaction(&conn, "alice", report.created_transactions[0]).unwrap();
    assert_eq!(tx.amount, Decimal::from(-75));
    assert!(tx.is_recurring);
    assert_eq!(tx.recurring_id, Some(created.id));
    assert_eq!(tx.date, next);
    assert_eq!(tx.description.as_deref(), Some("Subscription"));
    assert_eq!(balance(&conn, a), Decimal::from(425));

    let after = recurring::get_recurring(&conn, "alice", created.id, now).unwrap();
    assert_eq!(
        after.template.next_execution_date,
        next.checked_add_months(Months::new(1)).unwrap()
    );
    assert!(after.template.is_active);

    // Re-running at the same instant finds nothing due.
    let again = recurring::process_recurring(&mut conn, now + Duration::days(3)).unwrap();
    assert_eq!(again.processed_count, 0);
    assert_eq!(balance(&conn, a), Decimal::from(425));
}

#[test]
fn overdue_template_fires_once_per_sweep() {
    let (mut conn, a) = setup();
    let now = t0();
    let created = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -1, Frequency::Daily, now + Duration::hours(1)),
        now,
    )
    .unwrap();

    let later = now + Duration::days(5);
    let report = recurring::process_recurring(&mut conn, later).unwrap();
    assert_eq!(report.processed_count, 1);
    let view = recurring::get_recurring(&conn, "alice", created.id, later).unwrap();
    assert_eq!(
        view.template.next_execution_date,
        now + Duration::hours(1) + Duration::days(1)
    );
    assert!(view.days_until_next < 0);

    recurring::process_recurring(&mut conn, later).unwrap();
    assert_eq!(balance(&conn, a), Decimal::from(498));
}

#[test]
fn end_date_deactivates_after_last_run() {
    let (mut conn, a) = setup();
    let now = t0();
    let next = now + Duration::days(1);
    let created = recurring::create_recurring(
        &mut conn,
        "alice",
        NewRecurring {
            end_date: Some(next + Duration::hours(12)),
            ..template(a, 100, Frequency::Daily, next)
        },
        now,
    )
    .unwrap();

    let report = recurring::process_recurring(&mut conn, next + Duration::hours(1)).unwrap();
    assert_eq!(report.processed_count, 1);
    assert_eq!(report.deactivated, vec![created.id]);
    let view = recurring::get_recurring(&conn, "alice", created.id, now).unwrap();
    assert!(!view.template.is_active);
    assert_eq!(balance(&conn, a), Decimal::from(600));

    let later = recurring::process_recurring(&mut conn, next + Duration::days(10)).unwrap();
    assert_eq!(later.processed_count, 0);
}

#[test]
fn expired_template_is_deactivated_without_firing() {
    let (mut conn, a) = setup();
    let now = t0();
    let next = now + Duration::days(1);
    let created = recurring::create_recurring(
        &mut conn,
        "alice",
        NewRecurring {
            end_date: Some(next + Duration::hours(12)),
            ..template(a, -10, Frequency::Weekly, next)
        },
        now,
    )
    .unwrap();

    let report = recurring::process_recurring(&mut conn, now + Duration::days(4)).unwrap();
    assert_eq!(report.processed_count, 0);
    assert_eq!(report.deactivated, vec![created.id]);
    assert_eq!(balance(&conn, a), Decimal::from(500));
}

#[test]
fn one_broken_template_does_not_stop_the_sweep() {
    let (mut conn, a) = setup();
    let now = t0();
    let broken = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -5, Frequency::Daily, now + Duration::hours(1)),
        now,
    )
    .unwrap();
    let healthy = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -7, Frequency::Daily, now + Duration::hours(2)),
        now,
    )
    .unwrap();
    conn.execute(
        "UPDATE recurring_transactions SET amount='not-a-number' WHERE id=?1",
        params![broken.id],
    )
    .unwrap();

    let sweep_at = now + Duration::hours(3);
    let report = recurring::process_recurring(&mut conn, sweep_at).unwrap();
    assert_eq!(report.processed_count, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with(&format!("template {}:", broken.id)));
    assert_eq!(balance(&conn, a), Decimal::from(493));

    let txs = journal::all_for_user(&conn, "alice").unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].recurring_id, Some(healthy.id));
    assert!(db::get_setting(&conn, LAST_SWEEP_KEY).unwrap().is_some());
}

#[test]
fn update_validates_only_changed_fields() {
    let (mut conn, a) = setup();
    let now = t0();
    let created = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -20, Frequency::Weekly, now + Duration::days(1)),
        now,
    )
    .unwrap();

    // The stored next date is now in the past, but it is not being changed.
    let later = now + Duration::days(3);
    let updated = recurring::update_recurring(
        &mut conn,
        "alice",
        created.id,
        RecurringUpdate {
            description: Some("Streaming".into()),
            frequency: Some(Frequency::Monthly),
            ..Default::default()
        },
        later,
    )
    .unwrap();
    assert_eq!(updated.description, "Streaming");
    assert_eq!(updated.frequency, Frequency::Monthly);

    let bad = [
        RecurringUpdate {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        },
        RecurringUpdate {
            next_execution_date: Some(later - Duration::hours(1)),
            ..Default::default()
        },
        RecurringUpdate {
            end_date: Some(Some(now)),
            ..Default::default()
        },
    ];
    for changes in bad {
        assert!(matches!(
            recurring::update_recurring(&mut conn, "alice", created.id, changes, later),
            Err(LedgerError::Validation(_))
        ));
    }

    let paused = recurring::deactivate_recurring(&mut conn, "alice", created.id, later).unwrap();
    assert!(!paused.is_active);
    let active = recurring::list_recurring(
        &conn,
        "alice",
        &RecurringFilter {
            active_only: true,
            ..Default::default()
        },
        later,
    )
    .unwrap();
    assert!(active.is_empty());
}

#[test]
fn delete_can_purge_or_keep_generated_transactions() {
    let (mut conn, a) = setup();
    let now = t0();
    let purge = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -40, Frequency::Daily, now + Duration::hours(1)),
        now,
    )
    .unwrap();
    let keep = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -60, Frequency::Daily, now + Duration::hours(1)),
        now,
    )
    .unwrap();
    recurring::process_recurring(&mut conn, now + Duration::hours(2)).unwrap();
    recurring::process_recurring(&mut conn, now + Duration::days(1) + Duration::hours(2)).unwrap();
    assert_eq!(balance(&conn, a), Decimal::from(300));

    assert!(matches!(
        recurring::delete_recurring(&mut conn, "bob", purge.id, true),
        Err(LedgerError::NotFound(_))
    ));

    let deleted = recurring::delete_recurring(&mut conn, "alice", purge.id, true).unwrap();
    assert_eq!(deleted.deleted_transactions, 2);
    assert_eq!(balance(&conn, a), Decimal::from(380));

    let detached = recurring::delete_recurring(&mut conn, "alice", keep.id, false).unwrap();
    assert_eq!(detached.deleted_transactions, 0);
    assert_eq!(detached.detached_transactions, 2);
    assert_eq!(balance(&conn, a), Decimal::from(380));
    let txs = journal::all_for_user(&conn, "alice").unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs.iter().all(|t| t.recurring_id.is_none() && t.is_recurring));
}

#[test]
fn listing_filters_by_account_and_frequency() {
    let (mut conn, a) = setup();
    let b = accounts::create_account(
        &mut conn,
        "alice",
        NewAccount {
            name: "Savings".into(),
            description: None,
            icon: "piggy".into(),
            opening_balance: Decimal::ZERO,
            currency: None,
        },
    )
    .unwrap()
    .id;
    let now = t0();
    let weekly = recurring::create_recurring(
        &mut conn,
        "alice",
        template(a, -3, Frequency::Weekly, now + Duration::days(2)),
        now,
    )
    .unwrap();
    let monthly = recurring::create_recurring(
        &mut conn,
        "alice",
        template(b, 50, Frequency::Monthly, now + Duration::days(1)),
        now,
    )
    .unwrap();

    let all = recurring::list_recurring(&conn, "alice", &RecurringFilter::default(), now).unwrap();
    let ids: Vec<i64> = all.iter().map(|v| v.template.id).collect();
    assert_eq!(ids, vec![monthly.id, weekly.id]);

    let only_b = recurring::list_recurring(
        &conn,
        "alice",
        &RecurringFilter {
            account_id: Some(b),
            ..Default::default()
        },
        now,
    )
    .unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].template.id, monthly.id);

    let weekly_only = recurring::list_recurring(
        &conn,
        "alice",
        &RecurringFilter {
            frequency: Some(Frequency::Weekly),
            ..Default::default()
        },
        now,
    )
    .unwrap();
    assert_eq!(weekly_only.len(), 1);
    assert_eq!(weekly_only[0].days_until_next, 2);

    assert!(recurring::list_recurring(&conn, "bob", &RecurringFilter::default(), now)
        .unwrap()
        .is_empty());
}
