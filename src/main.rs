// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use pursebook::{cli, commands, db, utils};

fn main() -> Result<()> {
    utils::init_tracing();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let user = matches
        .get_one::<String>("user")
        .map_or("default", |s| s.as_str())
        .trim()
        .to_string();
    let db = matches.get_one::<String>("db").map(PathBuf::from);
    let mut conn = db::open_or_init(db.as_deref())?;
    let now = Utc::now();

    match matches.subcommand() {
        Some(("init", sub)) => commands::setup::init(&mut conn, &user, sub)?,
        Some(("status", sub)) => commands::setup::status(&conn, &user, sub)?,
        Some(("reset", sub)) => commands::setup::reset(&mut conn, &user, sub)?,
        Some(("account", sub)) => commands::accounts::handle(&mut conn, &user, sub)?,
        Some(("category", sub)) => commands::categories::handle(&mut conn, &user, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut conn, &user, sub)?,
        Some(("recurring", sub)) => commands::recurring::handle(&mut conn, &user, sub, now)?,
        Some(("sweep", sub)) => commands::recurring::sweep(&mut conn, sub, now)?,
        Some(("report", sub)) => commands::reports::handle(&conn, &user, sub, now)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, &user, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
