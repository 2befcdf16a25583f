// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, arg, value_parser};

fn with_output_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Print JSON"))
        .arg(arg!(--jsonl "Print one JSON object per line"))
}

fn file_arg() -> Arg {
    arg!(--file <FILE> "JSON document to load").required(true)
}

fn include_reserved() -> Arg {
    Arg::new("include_reserved")
        .long("include-reserved")
        .action(ArgAction::SetTrue)
        .help("Keep units that are reserved for a salesperson")
}

pub fn build_cli() -> Command {
    Command::new("dealerdesk")
        .about("Dealership back office: prices, discounts, units and sales tracking")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("auth_user")
                .long("user")
                .global(true)
                .help("Username to act as"),
        )
        .arg(
            Arg::new("auth_password")
                .long("password")
                .global(true)
                .help("Password for --user"),
        )
        .subcommand(Command::new("init").about("Create the database and seed defaults"))
        .subcommand(prices_cmd())
        .subcommand(discounts_cmd())
        .subcommand(units_cmd())
        .subcommand(reserved_cmd())
        .subcommand(postponed_cmd())
        .subcommand(presale_cmd())
        .subcommand(with_output_flags(
            Command::new("ingest")
                .about("Reshape the factory stock spreadsheet into priced units")
                .arg(arg!(--path <PATH> "Spreadsheet (.xlsx, .xls or .csv)").required(true))
                .arg(arg!(--save "Replace the available units with the result")),
        ))
        .subcommand(observations_cmd())
        .subcommand(bi_cmd())
        .subcommand(users_cmd())
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("units")
                        .about("Available units with their current price")
                        .arg(arg!(--format <FORMAT> "csv|json").required(true))
                        .arg(arg!(--out <FILE> "Output path").required(true))
                        .arg(include_reserved()),
                ),
        )
        .subcommand(Command::new("doctor").about("Check data consistency"))
}

fn prices_cmd() -> Command {
    Command::new("prices")
        .about("Model price list")
        .subcommand(with_output_flags(
            Command::new("list").about("List models by family"),
        ))
        .subcommand(
            Command::new("set")
                .about("Create or update one model")
                .arg(arg!(<model> "Model name"))
                .arg(arg!(--ars <PRICE> "Base price in ARS"))
                .arg(arg!(--usd <PRICE> "Base price in USD"))
                .arg(arg!(--rate <RATE> "Exchange rate"))
                .arg(arg!(--discount <PCT> "Individual discount"))
                .arg(
                    Arg::new("future_discount")
                        .long("future-discount")
                        .value_name("PCT")
                        .help("Discount for units dispatched after this month"),
                )
                .arg(
                    Arg::new("discontinued")
                        .long("discontinued")
                        .value_name("BOOL")
                        .value_parser(value_parser!(bool)),
                )
                .arg(arg!(--hide "Hide from the price list"))
                .arg(arg!(--show "Show in the price list").conflicts_with("hide")),
        )
        .subcommand(
            Command::new("save")
                .about("Bulk update from {\"models\": [...], \"hidden\": [...]}")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("family-discount")
                .about("Set the individual discount of every model in a family")
                .arg(arg!(<family> "Family tag"))
                .arg(arg!([discount] "Percent (default 0)")),
        )
        .subcommand(Command::new("assign-families").about("Recompute family tags"))
}

fn discounts_cmd() -> Command {
    Command::new("discounts")
        .about("Additional discounts by stock, color and age")
        .subcommand(with_output_flags(Command::new("show")))
        .subcommand(
            Command::new("set")
                .arg(arg!(<category> "stock|color|age"))
                .arg(arg!(<key> "stock_discount, a color, months or discount"))
                .arg(arg!(<value> "Percent, or months for age.months")),
        )
}

fn units_cmd() -> Command {
    Command::new("units")
        .about("Available units")
        .subcommand(with_output_flags(
            Command::new("list")
                .about("Units with additional discounts resolved")
                .arg(include_reserved()),
        ))
        .subcommand(
            Command::new("save")
                .about("Replace all available units from a JSON array")
                .arg(file_arg()),
        )
        .subcommand(with_output_flags(
            Command::new("revenue").about("Unreserved value split by stock"),
        ))
}

fn reserved_cmd() -> Command {
    Command::new("reserved")
        .about("Units reserved for a salesperson")
        .subcommand(
            Command::new("add")
                .arg(arg!(<factory_number> "Factory number"))
                .arg(arg!(<salesperson> "Salesperson")),
        )
        .subcommand(with_output_flags(Command::new("list")))
        .subcommand(Command::new("rm").arg(arg!(<factory_number> "Factory number")))
}

fn postponed_cmd() -> Command {
    Command::new("postponed")
        .about("Units excluded from ingestion")
        .subcommand(
            Command::new("add")
                .arg(arg!(<factory_number> "Factory number"))
                .arg(arg!(--reason <REASON> "Why it is held back")),
        )
        .subcommand(with_output_flags(Command::new("list")))
        .subcommand(Command::new("rm").arg(arg!(<factory_number> "Factory number")))
}

fn presale_cmd() -> Command {
    Command::new("presale")
        .about("Pre-sale log")
        .subcommand(with_output_flags(Command::new("list")))
        .subcommand(
            Command::new("save")
                .about("Replace the log from a JSON array")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("convert").about("Publish pre-sales without salesperson as units"),
        )
}

fn observations_cmd() -> Command {
    Command::new("observations")
        .about("Paperwork observation codes")
        .subcommand(with_output_flags(Command::new("zones")))
        .subcommand(
            Command::new("set-zone")
                .arg(arg!(<zone> "Zone").value_parser(value_parser!(i64)))
                .arg(arg!(<standard_days> "Standard days").value_parser(value_parser!(i64)))
                .arg(arg!(<deviation_days> "Deviation days").value_parser(value_parser!(i64))),
        )
        .subcommand(with_output_flags(Command::new("matrix")))
        .subcommand(
            Command::new("save-matrix")
                .about("Replace the code matrix")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("record")
                .about("Record an observation code change")
                .arg(arg!(<operation> "Operation"))
                .arg(arg!(<code> "New code"))
                .arg(arg!(<zone> "New zone").value_parser(value_parser!(i64)))
                .arg(arg!(<executive> "Executive"))
                .arg(arg!(--json "Print JSON")),
        )
        .subcommand(with_output_flags(
            Command::new("stats").arg(arg!(<operation> "Operation")),
        ))
}

fn bi_cmd() -> Command {
    Command::new("bi")
        .about("Registrations, deliveries and the retail plan")
        .subcommand(
            Command::new("import-registrations")
                .arg(arg!(--kind <KIND> "brand|model").required(true))
                .arg(arg!(--location <LOCATION> "Region the figures cover").required(true))
                .arg(arg!(--path <PATH> "Wide CSV or spreadsheet").required(true)),
        )
        .subcommand(
            Command::new("import-deliveries")
                .arg(arg!(--source <SOURCE> "conventional|savings-plan").required(true))
                .arg(arg!(--path <PATH> "Delivery report").required(true)),
        )
        .subcommand(
            Command::new("plan")
                .about("Retail plan objectives")
                .subcommand(
                    Command::new("set")
                        .arg(arg!(<year> "Year").value_parser(value_parser!(i32)))
                        .arg(arg!(<family> "Family"))
                        .arg(arg!(<conventional> "Conventional").value_parser(value_parser!(i64)))
                        .arg(arg!(<special> "Special").value_parser(value_parser!(i64)))
                        .arg(arg!(<savings_plan> "Savings plan").value_parser(value_parser!(i64))),
                )
                .subcommand(with_output_flags(
                    Command::new("list").arg(arg!(<year> "Year").value_parser(value_parser!(i32))),
                )),
        )
        .subcommand(with_output_flags(
            Command::new("share")
                .about("Brand share of registrations")
                .arg(arg!(--period <PERIOD> "YYYY-MM").required(true))
                .arg(arg!(--location <LOCATION> "Restrict to one location")),
        ))
        .subcommand(with_output_flags(
            Command::new("plan-report")
                .about("Deliveries against the retail plan")
                .arg(arg!(<year> "Year").value_parser(value_parser!(i32)))
                .arg(arg!(--month <MONTH> "Year to date through this month").value_parser(value_parser!(u32))),
        ))
        .subcommand(with_output_flags(Command::new("uploads").about("Import history")))
}

fn password_arg() -> Arg {
    Arg::new("set_password")
        .long("set-password")
        .value_name("PASSWORD")
        .help("Password to store for the user")
}

fn module_list(name: &'static str, long: &'static str) -> Arg {
    Arg::new(name)
        .long(long)
        .value_name("MODULE")
        .action(ArgAction::Append)
        .help("planning|sales|paperwork|deliveries (repeatable)")
}

fn users_cmd() -> Command {
    Command::new("users")
        .about("User administration")
        .subcommand(
            Command::new("provision")
                .about("Create the first administrator")
                .arg(arg!(--username <USERNAME>))
                .arg(password_arg())
                .arg(arg!(--email <EMAIL>)),
        )
        .subcommand(
            Command::new("add")
                .arg(arg!(<username> "Username"))
                .arg(password_arg().required(true))
                .arg(arg!(--role <ROLE> "admin|user"))
                .arg(Arg::new("full_name").long("full-name").value_name("NAME"))
                .arg(arg!(--email <EMAIL>))
                .arg(module_list("grant", "grant")),
        )
        .subcommand(with_output_flags(Command::new("list")))
        .subcommand(
            Command::new("update")
                .arg(arg!(<username> "Username"))
                .arg(password_arg())
                .arg(arg!(--role <ROLE> "admin|user"))
                .arg(Arg::new("full_name").long("full-name").value_name("NAME"))
                .arg(arg!(--email <EMAIL>))
                .arg(
                    Arg::new("active")
                        .long("active")
                        .value_name("BOOL")
                        .value_parser(value_parser!(bool)),
                )
                .arg(module_list("grant", "grant"))
                .arg(module_list("revoke", "revoke")),
        )
        .subcommand(Command::new("rm").arg(arg!(<username> "Username")))
        .subcommand(Command::new("login").about("Check --user/--password"))
}
