// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Utc};
use pursebook::db;
use pursebook::ledger::categories::{self, DEFAULT_CATEGORIES, FALLBACK_CATEGORY, NEUTRAL_COLOR};
use pursebook::ledger::{accounts, journal, recurring};
use pursebook::models::{
    CategoryUpdate, Frequency, NewAccount, NewCategory, NewRecurring, NewTransaction,
};
use pursebook::LedgerError;
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> (Connection, i64) {
    let mut conn = db::open_in_memory().unwrap();
    let account = accounts::create_account(
        &mut conn,
        "alice",
        NewAccount {
            name: "Checking".into(),
            description: None,
            icon: "wallet".into(),
            opening_balance: Decimal::ZERO,
            currency: None,
        },
    )
    .unwrap();
    (conn, account.id)
}

fn category(conn: &mut Connection, user: &str, name: &str) -> i64 {
    categories::create_category(
        conn,
        user,
        NewCategory {
            name: name.into(),
            icon: "tag".into(),
            color: None,
        },
    )
    .unwrap()
    .id
}

fn spend(conn: &mut Connection, account_id: i64, category_id: Option<i64>, amount: i64) -> i64 {
    journal::create_transaction(
        conn,
        "alice",
        NewTransaction {
            account_id,
            category_id,
            amount: Decimal::from(amount),
            description: None,
            date: None,
        },
    )
    .unwrap()
    .transaction
    .id
}

fn fallback_count(conn: &Connection, user: &str) -> usize {
    categories::list_categories(conn, user)
        .unwrap()
        .iter()
        .filter(|c| c.category.name == FALLBACK_CATEGORY)
        .count()
}

#[test]
fn names_are_unique_per_user_only() {
    let (mut conn, _) = setup();
    let rent = category(&mut conn, "alice", "Rent");

    let dup = categories::create_category(
        &mut conn,
        "alice",
        NewCategory {
            name: "Rent".into(),
            icon: "home".into(),
            color: Some("#123456".into()),
        },
    );
    match dup.unwrap_err() {
        LedgerError::Conflict(msg) => assert_eq!(msg, "category with this name already exists"),
        other => panic!("unexpected error: {other:?}"),
    }

    // Case-sensitive, and other users are unaffected.
    category(&mut conn, "alice", "rent");
    category(&mut conn, "bob", "Rent");

    let groceries = category(&mut conn, "alice", "Groceries");
    let err = categories::update_category(
        &mut conn,
        "alice",
        groceries,
        CategoryUpdate {
            name: Some("Rent".into()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Renaming to its own name is not a collision.
    categories::update_category(
        &mut conn,
        "alice",
        rent,
        CategoryUpdate {
            name: Some("Rent".into()),
            icon: Some("key".into()),
            ..Default::default()
        },
    )
    .unwrap();
}

#[test]
fn uncolored_categories_get_neutral_color() {
    let (mut conn, _) = setup();
    let id = category(&mut conn, "alice", "Misc");
    let c = categories::get_category(&conn, "alice", id).unwrap();
    assert_eq!(c.color, NEUTRAL_COLOR);
    assert!(!c.is_default);

    let err = categories::create_category(
        &mut conn,
        "alice",
        NewCategory {
            name: " ".into(),
            icon: "tag".into(),
            color: None,
        },
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[test]
fn delete_without_target_moves_references_to_other() {
    let (mut conn, account) = setup();
    let food = category(&mut conn, "alice", "Food");
    let t1 = spend(&mut conn, account, Some(food), -10);
    let t2 = spend(&mut conn, account, Some(food), -20);

    let deleted = categories::delete_category(&mut conn, "alice", food, None).unwrap();
    assert_eq!(deleted.reassigned_transactions, 2);
    let other_id = deleted.reassigned_to.unwrap();

    let other = categories::get_category(&conn, "alice", other_id).unwrap();
    assert_eq!(other.name, FALLBACK_CATEGORY);
    assert!(other.is_default);
    for t in [t1, t2] {
        assert_eq!(
            journal::get_transaction(&conn, "alice", t).unwrap().category_id,
            Some(other_id)
        );
    }
    assert!(matches!(
        categories::get_category(&conn, "alice", food),
        Err(LedgerError::NotFound(_))
    ));

    // A second deletion reuses the same fallback.
    let fun = category(&mut conn, "alice", "Fun");
    spend(&mut conn, account, Some(fun), -5);
    let again = categories::delete_category(&mut conn, "alice", fun, None).unwrap();
    assert_eq!(again.reassigned_to, Some(other_id));
    assert_eq!(fallback_count(&conn, "alice"), 1);
}

#[test]
fn unused_category_is_deleted_without_fallback() {
    let (mut conn, _) = setup();
    let spare = category(&mut conn, "alice", "Spare");
    let deleted = categories::delete_category(&mut conn, "alice", spare, None).unwrap();
    assert_eq!(deleted.reassigned_to, None);
    assert_eq!(deleted.reassigned_transactions, 0);
    assert_eq!(fallback_count(&conn, "alice"), 0);
}

#[test]
fn explicit_reassignment_target_is_validated() {
    let (mut conn, account) = setup();
    let food = category(&mut conn, "alice", "Food");
    let dining = category(&mut conn, "alice", "Dining");
    let bobs = category(&mut conn, "bob", "Dining");
    spend(&mut conn, account, Some(food), -12);

    for target in [food, bobs, 9999] {
        match categories::delete_category(&mut conn, "alice", food, Some(target)).unwrap_err() {
            LedgerError::Validation(msg) => assert_eq!(msg, "invalid reassignment category"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    let deleted = categories::delete_category(&mut conn, "alice", food, Some(dining)).unwrap();
    assert_eq!(deleted.reassigned_to, Some(dining));
    assert_eq!(deleted.reassigned_transactions, 1);
    assert_eq!(fallback_count(&conn, "alice"), 0);
}

#[test]
fn recurring_templates_follow_reassignment() {
    let (mut conn, account) = setup();
    let gym = category(&mut conn, "alice", "Gym");
    let now = Utc::now();
    let template = recurring::create_recurring(
        &mut conn,
        "alice",
        NewRecurring {
            account_id: account,
            category_id: Some(gym),
            amount: Decimal::from(-30),
            description: "Membership".into(),
            frequency: Frequency::Monthly,
            next_execution_date: now + Duration::days(5),
            end_date: None,
        },
        now,
    )
    .unwrap();

    let deleted = categories::delete_category(&mut conn, "alice", gym, None).unwrap();
    assert_eq!(deleted.reassigned_transactions, 0);
    assert_eq!(deleted.reassigned_recurring, 1);
    let view = recurring::get_recurring(&conn, "alice", template.id, now).unwrap();
    assert_eq!(view.template.category_id, deleted.reassigned_to);
}

#[test]
fn fallback_in_use_needs_explicit_target() {
    let (mut conn, account) = setup();
    categories::initialize_defaults(&mut conn, "alice").unwrap();
    let other = categories::list_categories(&conn, "alice")
        .unwrap()
        .into_iter()
        .find(|c| c.category.name == FALLBACK_CATEGORY)
        .unwrap()
        .category
        .id;
    spend(&mut conn, account, Some(other), -1);

    assert!(matches!(
        categories::delete_category(&mut conn, "alice", other, None),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn seeding_is_idempotent() {
    let (mut conn, _) = setup();
    category(&mut conn, "alice", "Travel");

    let first = categories::initialize_defaults(&mut conn, "alice").unwrap();
    assert_eq!(first.len(), DEFAULT_CATEGORIES.len() - 1);
    let second = categories::initialize_defaults(&mut conn, "alice").unwrap();
    assert!(second.is_empty());

    let list = categories::list_categories(&conn, "alice").unwrap();
    assert_eq!(list.len(), DEFAULT_CATEGORIES.len());
    let travel = list.iter().find(|c| c.category.name == "Travel").unwrap();
    assert!(!travel.category.is_default);
}

#[test]
fn listing_orders_by_usage_then_name() {
    let (mut conn, account) = setup();
    category(&mut conn, "alice", "Alpha");
    let b = category(&mut conn, "alice", "Beta");
    let c = category(&mut conn, "alice", "Charlie");
    spend(&mut conn, account, Some(c), -1);
    spend(&mut conn, account, Some(c), -1);
    spend(&mut conn, account, Some(b), -1);

    let list = categories::list_categories(&conn, "alice").unwrap();
    let names: Vec<&str> = list.iter().map(|c| c.category.name.as_str()).collect();
    assert_eq!(names, vec!["Charlie", "Beta", "Alpha"]);
    let counts: Vec<i64> = list.iter().map(|c| c.usage_count).collect();
    assert_eq!(counts, vec![2, 1, 0]);
}
