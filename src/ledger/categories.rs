// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::write_tx;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryUpdate, CategoryUsage, NewCategory};
use crate::utils::{col_ts, fmt_ts};

pub const NEUTRAL_COLOR: &str = "#9E9E9E";
pub const FALLBACK_CATEGORY: &str = "Other";

/// Seed catalog: (name, icon, color).
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Food & Dining", "restaurant", "#FF7043"),
    ("Transportation", "car", "#42A5F5"),
    ("Shopping", "bag", "#AB47BC"),
    ("Entertainment", "film", "#EC407A"),
    ("Bills & Utilities", "receipt", "#FFA726"),
    ("Healthcare", "medkit", "#EF5350"),
    ("Education", "school", "#5C6BC0"),
    ("Travel", "airplane", "#26A69A"),
    ("Income", "cash", "#66BB6A"),
    (FALLBACK_CATEGORY, "ellipsis", NEUTRAL_COLOR),
];

const CATEGORY_COLUMNS: &str = "id, user_id, name, icon, color, is_default, created_at";

fn category_from_row(r: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        icon: r.get(3)?,
        color: r.get(4)?,
        is_default: r.get(5)?,
        created_at: col_ts(r, 6)?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedCategory {
    pub id: i64,
    pub reassigned_to: Option<i64>,
    pub reassigned_transactions: usize,
    pub reassigned_recurring: usize,
}

fn validate_name(name: &str) -> LedgerResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("category name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn find_by_name(conn: &Connection, user: &str, name: &str) -> LedgerResult<Option<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE user_id=?1 AND name=?2",
        CATEGORY_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![user, name], category_from_row)
        .optional()?)
}

pub(crate) fn load_owned(conn: &Connection, user: &str, id: i64) -> LedgerResult<Category> {
    let sql = format!(
        "SELECT {} FROM categories WHERE id=?1 AND user_id=?2",
        CATEGORY_COLUMNS
    );
    conn.query_row(&sql, params![id, user], category_from_row)
        .optional()?
        .ok_or(LedgerError::NotFound("category"))
}

pub fn create_category(
    conn: &mut Connection,
    user: &str,
    new: NewCategory,
) -> LedgerResult<Category> {
    let tx = write_tx(conn)?;
    let category = create_category_in(&tx, user, new, false)?;
    tx.commit()?;
    Ok(category)
}

pub(crate) fn create_category_in(
    conn: &Connection,
    user: &str,
    new: NewCategory,
    is_default: bool,
) -> LedgerResult<Category> {
    let name = validate_name(&new.name)?;
    if find_by_name(conn, user, &name)?.is_some() {
        return Err(LedgerError::conflict("category with this name already exists"));
    }
    let color = new
        .color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| NEUTRAL_COLOR.to_string());
    conn.execute(
        "INSERT INTO categories(user_id, name, icon, color, is_default, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user, name, new.icon, color, is_default, fmt_ts(&Utc::now())],
    )?;
    load_owned(conn, user, conn.last_insert_rowid())
}

pub fn update_category(
    conn: &mut Connection,
    user: &str,
    id: i64,
    changes: CategoryUpdate,
) -> LedgerResult<Category> {
    let tx = write_tx(conn)?;
    let mut category = load_owned(&tx, user, id)?;
    if let Some(name) = changes.name {
        let name = validate_name(&name)?;
        if name != category.name {
            if find_by_name(&tx, user, &name)?.is_some() {
                return Err(LedgerError::conflict("category with this name already exists"));
            }
            category.name = name;
        }
    }
    if let Some(icon) = changes.icon {
        category.icon = icon;
    }
    if let Some(color) = changes.color {
        let color = color.trim();
        category.color = if color.is_empty() {
            NEUTRAL_COLOR.to_string()
        } else {
            color.to_string()
        };
    }
    tx.execute(
        "UPDATE categories SET name=?1, icon=?2, color=?3 WHERE id=?4",
        params![category.name, category.icon, category.color, id],
    )?;
    tx.commit()?;
    Ok(category)
}

/// Deletes a category after pointing every transaction and recurring template
/// that references it at `reassign_to`, or at the user's "Other" category.
pub fn delete_category(
    conn: &mut Connection,
    user: &str,
    id: i64,
    reassign_to: Option<i64>,
) -> LedgerResult<DeletedCategory> {
    let tx = write_tx(conn)?;
    let category = load_owned(&tx, user, id)?;

    let explicit = match reassign_to {
        Some(target) => {
            if target == id {
                return Err(LedgerError::validation("invalid reassignment category"));
            }
            match load_owned(&tx, user, target) {
                Ok(c) => Some(c.id),
                Err(LedgerError::NotFound(_)) => {
                    return Err(LedgerError::validation("invalid reassignment category"));
                }
                Err(e) => return Err(e),
            }
        }
        None => None,
    };

    let referencing: i64 = tx.query_row(
        "SELECT (SELECT COUNT(*) FROM transactions WHERE category_id=?1)
              + (SELECT COUNT(*) FROM recurring_transactions WHERE category_id=?1)",
        params![id],
        |r| r.get(0),
    )?;

    let target = match explicit {
        Some(t) => Some(t),
        None if referencing == 0 => None,
        None => {
            if category.name == FALLBACK_CATEGORY {
                return Err(LedgerError::validation(
                    "the fallback category is in use; choose a reassignment category",
                ));
            }
            let other = match find_by_name(&tx, user, FALLBACK_CATEGORY)? {
                Some(c) => c,
                None => {
                    tracing::debug!(user, "creating fallback category");
                    create_category_in(
                        &tx,
                        user,
                        NewCategory {
                            name: FALLBACK_CATEGORY.to_string(),
                            icon: "ellipsis".to_string(),
                            color: None,
                        },
                        true,
                    )?
                }
            };
            Some(other.id)
        }
    };

    let mut reassigned_transactions = 0;
    let mut reassigned_recurring = 0;
    if let Some(target) = target {
        let now = fmt_ts(&Utc::now());
        reassigned_transactions = tx.execute(
            "UPDATE transactions SET category_id=?1, updated_at=?2 WHERE category_id=?3 AND user_id=?4",
            params![target, now, id, user],
        )?;
        reassigned_recurring = tx.execute(
            "UPDATE recurring_transactions SET category_id=?1, updated_at=?2
             WHERE category_id=?3 AND user_id=?4",
            params![target, now, id, user],
        )?;
    }
    tx.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    tx.commit()?;
    tracing::info!(
        user,
        category_id = id,
        reassigned_transactions,
        reassigned_recurring,
        "category deleted"
    );
    Ok(DeletedCategory {
        id,
        reassigned_to: target,
        reassigned_transactions,
        reassigned_recurring,
    })
}

pub fn get_category(conn: &Connection, user: &str, id: i64) -> LedgerResult<Category> {
    load_owned(conn, user, id)
}

/// Categories with the number of transactions using them, most used first.
pub fn list_categories(conn: &Connection, user: &str) -> LedgerResult<Vec<CategoryUsage>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.user_id, c.name, c.icon, c.color, c.is_default, c.created_at,
                (SELECT COUNT(*) FROM transactions t WHERE t.category_id=c.id) AS usage
         FROM categories c
         WHERE c.user_id=?1
         ORDER BY usage DESC, c.name",
    )?;
    let rows = stmt.query_map(params![user], |r| {
        Ok(CategoryUsage {
            category: category_from_row(r)?,
            usage_count: r.get(7)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn initialize_defaults(conn: &mut Connection, user: &str) -> LedgerResult<Vec<i64>> {
    let tx = write_tx(conn)?;
    let created = initialize_defaults_in(&tx, user)?;
    tx.commit()?;
    Ok(created)
}

pub(crate) fn initialize_defaults_in(conn: &Connection, user: &str) -> LedgerResult<Vec<i64>> {
    let mut created = Vec::new();
    for (name, icon, color) in DEFAULT_CATEGORIES {
        if find_by_name(conn, user, name)?.is_some() {
            continue;
        }
        let category = create_category_in(
            conn,
            user,
            NewCategory {
                name: name.to_string(),
                icon: icon.to_string(),
                color: Some(color.to_string()),
            },
            true,
        )?;
        created.push(category.id);
    }
    tracing::debug!(user, created = created.len(), "default categories seeded");
    Ok(created)
}
