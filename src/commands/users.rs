// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::{
    Module, NewUser, Permissions, Role, UserUpdate, authenticate, create_user, delete_user,
    list_users, provision_admin, update_user,
};
use crate::config::AppConfig;
use crate::error::DeskError;
use crate::utils::{maybe_print_json, optional_arg, pretty_table, required_arg};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(
    conn: &Connection,
    m: &clap::ArgMatches,
    cfg: &AppConfig,
    credentials: Option<(&str, &str)>,
) -> Result<()> {
    match m.subcommand() {
        Some(("provision", sub)) => {
            let username = optional_arg(sub, "username").or_else(|| cfg.admin_username.clone());
            let password = optional_arg(sub, "set_password").or_else(|| cfg.admin_password.clone());
            let email = optional_arg(sub, "email").or_else(|| cfg.admin_email.clone());
            let (Some(username), Some(password)) = (username, password) else {
                return Err(DeskError::validation(
                    "Set DEALERDESK_ADMIN_USERNAME and DEALERDESK_ADMIN_PASSWORD (or pass --username/--set-password)",
                )
                .into());
            };
            provision_admin(conn, &username, &password, email.as_deref())?;
            println!("Provisioned administrator '{}'", username);
        }
        Some(("add", sub)) => {
            let role = match optional_arg(sub, "role") {
                Some(r) => Some(r.parse::<Role>()?),
                None => None,
            };
            let mut permissions = Permissions::default();
            for module in modules(sub, "grant")? {
                permissions.set(module, true);
            }
            let new = NewUser {
                username: required_arg(sub, "username")?.to_string(),
                password: required_arg(sub, "set_password")?.to_string(),
                role,
                full_name: optional_arg(sub, "full_name"),
                email: optional_arg(sub, "email"),
                permissions,
            };
            create_user(conn, &new)?;
            println!("Added user '{}'", new.username.trim());
        }
        Some(("list", sub)) => {
            let users = list_users(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &users)? {
                return Ok(());
            }
            let data = users
                .into_iter()
                .map(|u| {
                    let modules = Module::ALL
                        .iter()
                        .filter(|m| u.can(**m))
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(",");
                    vec![
                        u.username,
                        u.role.as_str().to_string(),
                        u.full_name.unwrap_or_default(),
                        if u.active { "yes" } else { "no" }.to_string(),
                        modules,
                        u.last_login.unwrap_or_default(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &["Username", "Role", "Name", "Active", "Modules", "Last login"],
                    data
                )
            );
        }
        Some(("update", sub)) => {
            let username = required_arg(sub, "username")?;
            let upd = UserUpdate {
                password: optional_arg(sub, "set_password"),
                role: match optional_arg(sub, "role") {
                    Some(r) => Some(r.parse::<Role>()?),
                    None => None,
                },
                full_name: optional_arg(sub, "full_name"),
                email: optional_arg(sub, "email"),
                active: sub.get_one::<bool>("active").copied(),
                grant: modules(sub, "grant")?,
                revoke: modules(sub, "revoke")?,
            };
            update_user(conn, username, &upd)?;
            println!("Updated user '{}'", username);
        }
        Some(("rm", sub)) => {
            let username = required_arg(sub, "username")?;
            delete_user(conn, username)?;
            println!("Removed user '{}'", username);
        }
        Some(("login", _)) => {
            let Some((username, password)) = credentials else {
                return Err(DeskError::Unauthenticated("pass --user and --password".into()).into());
            };
            let user = authenticate(conn, username, password)?;
            println!(
                "Authenticated '{}' ({})",
                user.username,
                user.role.as_str()
            );
        }
        _ => {}
    }
    Ok(())
}

fn modules(m: &clap::ArgMatches, name: &str) -> Result<Vec<Module>> {
    let Some(values) = m.get_many::<String>(name) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for v in values {
        out.push(v.parse::<Module>()?);
    }
    Ok(out)
}
