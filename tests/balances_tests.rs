// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pursebook::db;
use pursebook::ledger::{accounts, balances, journal};
use pursebook::models::{AccountUpdate, NewAccount, NewTransaction};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 18, 0, 0).unwrap()
}

fn account(conn: &mut Connection, name: &str, opening: i64) -> i64 {
    accounts::create_account(
        conn,
        "alice",
        NewAccount {
            name: name.into(),
            description: None,
            icon: "wallet".into(),
            opening_balance: Decimal::from(opening),
            currency: None,
        },
    )
    .unwrap()
    .id
}

fn post(conn: &mut Connection, account_id: i64, amount: i64, date: DateTime<Utc>) {
    journal::create_transaction(
        conn,
        "alice",
        NewTransaction {
            account_id,
            category_id: None,
            amount: Decimal::from(amount),
            description: None,
            date: Some(date),
        },
    )
    .unwrap();
}

#[test]
fn account_balance_snapshot() {
    let mut conn = db::open_in_memory().unwrap();
    let a = account(&mut conn, "Checking", 200);
    post(&mut conn, a, -50, now() - Duration::days(3));
    post(&mut conn, a, 10, now() - Duration::days(1));

    let snap = balances::account_balance(&conn, "alice", a).unwrap().unwrap();
    assert_eq!(snap.current_amount, Decimal::from(160));
    assert_eq!(snap.default_value, Decimal::from(200));
    assert_eq!(snap.transaction_count, 2);
    assert_eq!(snap.last_transaction_date, Some(now() - Duration::days(1)));

    assert!(balances::account_balance(&conn, "bob", a).unwrap().is_none());
    assert!(balances::account_balance(&conn, "alice", 4242).unwrap().is_none());
}

#[test]
fn total_balance_can_skip_inactive_accounts() {
    let mut conn = db::open_in_memory().unwrap();
    let a = account(&mut conn, "Checking", 100);
    let b = account(&mut conn, "Old card", -40);
    account(&mut conn, "Savings", 1000);

    let all = balances::total_balance(&conn, "alice", true).unwrap();
    assert_eq!(all.total, Decimal::from(1060));
    assert_eq!(all.accounts.len(), 3);
    assert_eq!(all.accounts[0].account_id, a);

    accounts::update_account(
        &mut conn,
        "alice",
        b,
        AccountUpdate {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .unwrap();
    let active = balances::total_balance(&conn, "alice", false).unwrap();
    assert_eq!(active.total, Decimal::from(1100));
    assert!(active.accounts.iter().all(|l| l.account_id != b));
    assert_eq!(
        balances::total_balance(&conn, "alice", true).unwrap().total,
        Decimal::from(1060)
    );

    let empty = balances::total_balance(&conn, "bob", true).unwrap();
    assert_eq!(empty.total, Decimal::ZERO);
    assert!(empty.accounts.is_empty());
}

#[test]
fn period_summary_covers_trailing_window() {
    let mut conn = db::open_in_memory().unwrap();
    let a = account(&mut conn, "Checking", 0);
    post(&mut conn, a, 3000, now() - Duration::days(2));
    post(&mut conn, a, -200, now() - Duration::days(10));
    post(&mut conn, a, -100, now() - Duration::days(29));
    post(&mut conn, a, -999, now() - Duration::days(45));

    let s = balances::period_summary(&conn, "alice", 30, now()).unwrap();
    assert_eq!(s.period_days, 30);
    assert_eq!(s.income, Decimal::from(3000));
    assert_eq!(s.expense, Decimal::from(300));
    assert_eq!(s.net_flow, Decimal::from(2700));
    assert_eq!(s.transaction_count, 3);
    assert_eq!(s.average_magnitude, Decimal::from(1100));

    let week = balances::period_summary(&conn, "alice", 7, now()).unwrap();
    assert_eq!(week.transaction_count, 1);
    assert_eq!(week.expense, Decimal::ZERO);
}

#[test]
fn period_summary_is_zero_for_new_user() {
    let conn = db::open_in_memory().unwrap();
    let s = balances::period_summary(&conn, "nobody", 30, now()).unwrap();
    assert_eq!(s.income, Decimal::ZERO);
    assert_eq!(s.expense, Decimal::ZERO);
    assert_eq!(s.net_flow, Decimal::ZERO);
    assert_eq!(s.transaction_count, 0);
    assert_eq!(s.average_magnitude, Decimal::ZERO);
}

#[test]
fn period_summary_tolerates_longest_window() {
    let mut conn = db::open_in_memory().unwrap();
    let empty = balances::period_summary(&conn, "alice", u32::MAX, now()).unwrap();
    assert_eq!(empty.period_days, u32::MAX);
    assert_eq!(empty.transaction_count, 0);
    assert_eq!(empty.net_flow, Decimal::ZERO);

    let a = account(&mut conn, "Checking", 0);
    post(&mut conn, a, -75, Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap());
    post(&mut conn, a, 20, now() - Duration::days(1));
    let s = balances::period_summary(&conn, "alice", u32::MAX, now()).unwrap();
    assert_eq!(s.transaction_count, 2);
    assert_eq!(s.expense, Decimal::from(75));
    assert_eq!(s.net_flow, Decimal::from(-55));
}
