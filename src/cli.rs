// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(i64))
        .help(help)
}

fn opt_id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_parser(value_parser!(i64))
        .help(help)
}

fn text_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn amount_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .allow_negative_numbers(true)
        .help(help)
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of a table")
}

pub fn build_cli() -> Command {
    Command::new("pursebook")
        .about("Personal finance ledger: accounts, categories, transactions and recurring templates")
        .version(clap::crate_version!())
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .default_value("default")
                .help("Acting user; every command is scoped to this user"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Database file (overrides PURSEBOOK_DB and the platform data dir)"),
        )
        .subcommand(
            Command::new("init")
                .about("Create the default account and seed categories")
                .arg(text_arg("account-name", "Name of the first account"))
                .arg(text_arg("icon", "Icon tag of the first account"))
                .arg(amount_arg("opening", "Opening balance")),
        )
        .subcommand(Command::new("status").about("Show setup status").arg(json_flag()))
        .subcommand(
            Command::new("reset")
                .about("Delete every account, category, transaction and recurring template")
                .arg(
                    Arg::new("confirm")
                        .long("confirm")
                        .required(true)
                        .help("Must be exactly: DELETE ALL MY DATA"),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(text_arg("name", "Account name").required(true))
                        .arg(text_arg("icon", "Icon tag").default_value("wallet"))
                        .arg(amount_arg("opening", "Opening balance").default_value("0"))
                        .arg(text_arg("currency", "USD or EUR"))
                        .arg(text_arg("description", "Free-text description")),
                )
                .subcommand(Command::new("list").arg(json_flag()))
                .subcommand(
                    Command::new("show")
                        .arg(id_arg("id", "Account id"))
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg("id", "Account id"))
                        .arg(text_arg("name", "New name"))
                        .arg(text_arg("icon", "New icon tag"))
                        .arg(text_arg("currency", "USD, EUR, or 'none' to clear"))
                        .arg(text_arg("description", "New description ('' clears)"))
                        .arg(
                            Arg::new("active")
                                .long("active")
                                .value_parser(value_parser!(bool))
                                .help("Mark the account active or inactive"),
                        ),
                )
                .subcommand(Command::new("default").arg(id_arg("id", "Account id")))
                .subcommand(
                    Command::new("reorder").arg(
                        Arg::new("ids")
                            .long("ids")
                            .required(true)
                            .value_delimiter(',')
                            .value_parser(value_parser!(i64))
                            .help("Every account id, comma separated, in display order"),
                    ),
                )
                .subcommand(Command::new("rm").arg(id_arg("id", "Account id"))),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .arg(text_arg("name", "Category name").required(true))
                        .arg(text_arg("icon", "Icon tag").default_value("tag"))
                        .arg(text_arg("color", "Color tag, e.g. #FF7043")),
                )
                .subcommand(Command::new("list").arg(json_flag()))
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg("id", "Category id"))
                        .arg(text_arg("name", "New name"))
                        .arg(text_arg("icon", "New icon tag"))
                        .arg(text_arg("color", "New color tag")),
                )
                .subcommand(
                    Command::new("rm")
                        .arg(id_arg("id", "Category id"))
                        .arg(opt_id_arg(
                            "reassign-to",
                            "Category receiving its transactions (default: Other)",
                        )),
                )
                .subcommand(Command::new("seed").about("Insert missing default categories")),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and browse transactions")
                .subcommand(
                    Command::new("add")
                        .arg(id_arg("account", "Account id"))
                        .arg(amount_arg("amount", "Signed amount (negative = expense)").required(true))
                        .arg(opt_id_arg("category", "Category id"))
                        .arg(text_arg("description", "Description"))
                        .arg(text_arg("date", "YYYY-MM-DD or RFC 3339 (default: now)")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg("id", "Transaction id"))
                        .arg(opt_id_arg("account", "Move to account"))
                        .arg(amount_arg("amount", "New amount"))
                        .arg(opt_id_arg("category", "New category id"))
                        .arg(
                            Arg::new("uncategorize")
                                .long("uncategorize")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("category")
                                .help("Remove the category"),
                        )
                        .arg(text_arg("description", "New description ('' clears)"))
                        .arg(text_arg("date", "New date")),
                )
                .subcommand(Command::new("rm").arg(id_arg("id", "Transaction id")))
                .subcommand(
                    Command::new("show")
                        .arg(id_arg("id", "Transaction id"))
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt_id_arg("account", "Only this account"))
                        .arg(opt_id_arg("category", "Only this category"))
                        .arg(text_arg("from", "Earliest date (inclusive)"))
                        .arg(text_arg("to", "Latest date (inclusive)"))
                        .arg(amount_arg("min", "Minimum amount"))
                        .arg(amount_arg("max", "Maximum amount"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize))
                                .default_value("50")
                                .help("Page size"),
                        )
                        .arg(text_arg("after", "Continuation token from a previous page"))
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("recurring")
                .about("Manage recurring templates")
                .subcommand(
                    Command::new("add")
                        .arg(id_arg("account", "Account id"))
                        .arg(amount_arg("amount", "Signed amount").required(true))
                        .arg(text_arg("description", "Description").required(true))
                        .arg(
                            text_arg("frequency", "daily, weekly or monthly")
                                .required(true),
                        )
                        .arg(text_arg("next", "First execution date").required(true))
                        .arg(text_arg("end", "Last allowed execution date"))
                        .arg(opt_id_arg("category", "Category id")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt_id_arg("account", "Only this account"))
                        .arg(text_arg("frequency", "Only this frequency"))
                        .arg(
                            Arg::new("active")
                                .long("active")
                                .action(ArgAction::SetTrue)
                                .help("Only active templates"),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg("id", "Template id"))
                        .arg(opt_id_arg("account", "New account"))
                        .arg(amount_arg("amount", "New amount"))
                        .arg(text_arg("description", "New description"))
                        .arg(text_arg("frequency", "New frequency"))
                        .arg(text_arg("next", "New next execution date"))
                        .arg(text_arg("end", "New end date ('none' clears)"))
                        .arg(opt_id_arg("category", "New category id"))
                        .arg(
                            Arg::new("active")
                                .long("active")
                                .value_parser(value_parser!(bool))
                                .help("Activate or deactivate"),
                        ),
                )
                .subcommand(Command::new("pause").arg(id_arg("id", "Template id")))
                .subcommand(
                    Command::new("rm")
                        .arg(id_arg("id", "Template id"))
                        .arg(
                            Arg::new("delete-generated")
                                .long("delete-generated")
                                .action(ArgAction::SetTrue)
                                .help("Also delete the transactions it generated"),
                        ),
                ),
        )
        .subcommand(
            Command::new("sweep")
                .about("Fire every due recurring template (run from cron)")
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("report")
                .about("Balances and cash-flow summaries")
                .subcommand(
                    Command::new("balances")
                        .arg(
                            Arg::new("include-inactive")
                                .long("include-inactive")
                                .action(ArgAction::SetTrue)
                                .help("Include inactive accounts"),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("summary")
                        .arg(
                            Arg::new("days")
                                .long("days")
                                .value_parser(value_parser!(u32))
                                .default_value("30")
                                .help("Trailing window in days"),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("transactions")
                        .arg(text_arg("format", "csv or json").default_value("csv"))
                        .arg(text_arg("out", "Output file").required(true)),
                ),
        )
}
