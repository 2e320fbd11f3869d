// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::opt_text;
use crate::ledger::categories;
use crate::models::{CategoryUpdate, NewCategory};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, user: &str, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let category = categories::create_category(
                conn,
                user,
                NewCategory {
                    name: opt_text(sub, "name").unwrap_or_default(),
                    icon: opt_text(sub, "icon").unwrap_or_else(|| "tag".into()),
                    color: opt_text(sub, "color"),
                },
            )?;
            println!("Added category #{} '{}'", category.id, category.name);
        }
        Some(("list", sub)) => {
            let list = categories::list_categories(conn, user)?;
            if !maybe_print_json(sub.get_flag("json"), &list)? {
                let rows = list
                    .iter()
                    .map(|c| {
                        vec![
                            c.category.id.to_string(),
                            c.category.name.clone(),
                            c.category.color.clone(),
                            c.usage_count.to_string(),
                            if c.category.is_default { "yes".into() } else { String::new() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Category", "Color", "Used", "Default"], rows)
                );
            }
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let category = categories::update_category(
                conn,
                user,
                id,
                CategoryUpdate {
                    name: opt_text(sub, "name"),
                    icon: opt_text(sub, "icon"),
                    color: opt_text(sub, "color"),
                },
            )?;
            println!("Updated category #{} '{}'", category.id, category.name);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").context("--id is required")?;
            let reassign_to = sub.get_one::<i64>("reassign-to").copied();
            let deleted = categories::delete_category(conn, user, id, reassign_to)?;
            match deleted.reassigned_to {
                Some(target) => println!(
                    "Removed category #{} ({} transactions, {} recurring moved to #{})",
                    deleted.id, deleted.reassigned_transactions, deleted.reassigned_recurring, target
                ),
                None => println!("Removed category #{}", deleted.id),
            }
        }
        Some(("seed", _)) => {
            let created = categories::initialize_defaults(conn, user)?;
            println!("Created {} default categories", created.len());
        }
        _ => {}
    }
    Ok(())
}
