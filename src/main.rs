// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::process::ExitCode;

use anyhow::Result;
use clap::ArgMatches;

use dealerdesk::config::AppConfig;
use dealerdesk::error::exit_code_for;
use dealerdesk::{access, cli, commands, db, logging};

fn main() -> ExitCode {
    let cfg = AppConfig::from_env();
    logging::init(&cfg.log_filter);

    let matches = cli::build_cli().get_matches();
    match run(&cfg, &matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cfg: &AppConfig, matches: &ArgMatches) -> Result<()> {
    let mut conn = db::open_or_init(cfg)?;

    let credentials = match (
        matches.get_one::<String>("auth_user"),
        matches.get_one::<String>("auth_password"),
    ) {
        (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
        _ => None,
    };

    let actor = match matches.subcommand() {
        Some((name, sub)) => match commands::capability_for(name, sub.subcommand_name()) {
            Some(need) => access::authorize(&conn, cfg.require_auth, credentials, need)?,
            None => None,
        },
        None => None,
    };
    let actor_name = actor.as_ref().map(|u| u.username.as_str());

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path(cfg)?.display());
        }
        Some(("prices", sub)) => commands::prices::handle(&mut conn, sub)?,
        Some(("discounts", sub)) => commands::discounts::handle(&conn, sub)?,
        Some(("units", sub)) => commands::units::handle(&mut conn, sub)?,
        Some(("reserved", sub)) => commands::reserved::handle(&conn, sub)?,
        Some(("postponed", sub)) => commands::postponed::handle(&conn, sub)?,
        Some(("presale", sub)) => commands::presale::handle(&mut conn, sub)?,
        Some(("ingest", sub)) => commands::ingest::handle(&mut conn, sub)?,
        Some(("observations", sub)) => commands::observations::handle(&mut conn, sub)?,
        Some(("bi", sub)) => commands::bi::handle(&mut conn, sub, cfg.bi_cache_ttl, actor_name)?,
        Some(("users", sub)) => commands::users::handle(&conn, sub, cfg, credentials)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
