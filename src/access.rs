// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Users, roles and per-module capabilities.
//!
//! There is no built-in account: the first administrator is created by
//! [`provision_admin`] from operator-supplied credentials.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{DeskError, is_unique_violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(DeskError::validation(format!(
                "Invalid role '{}' (use admin|user)",
                other
            ))),
        }
    }
}

/// Application areas a non-admin user can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Planning,
    Sales,
    Paperwork,
    Deliveries,
}

impl Module {
    pub const ALL: [Module; 4] = [
        Module::Planning,
        Module::Sales,
        Module::Paperwork,
        Module::Deliveries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Sales => "sales",
            Self::Paperwork => "paperwork",
            Self::Deliveries => "deliveries",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Planning => "perm_planning",
            Self::Sales => "perm_sales",
            Self::Paperwork => "perm_paperwork",
            Self::Deliveries => "perm_deliveries",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DeskError::validation(format!(
                    "Unknown module '{}' (use planning|sales|paperwork|deliveries)",
                    s.trim()
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub planning: bool,
    pub sales: bool,
    pub paperwork: bool,
    pub deliveries: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            planning: true,
            sales: true,
            paperwork: true,
            deliveries: true,
        }
    }

    pub fn allows(&self, module: Module) -> bool {
        match module {
            Module::Planning => self.planning,
            Module::Sales => self.sales,
            Module::Paperwork => self.paperwork,
            Module::Deliveries => self.deliveries,
        }
    }

    pub fn set(&mut self, module: Module, on: bool) {
        match module {
            Module::Planning => self.planning = on,
            Module::Sales => self.sales = on,
            Module::Paperwork => self.paperwork = on,
            Module::Deliveries => self.deliveries = on,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub active: bool,
    pub permissions: Permissions,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(&self, module: Module) -> bool {
        self.is_admin() || self.permissions.allows(module)
    }
}

/// What a command needs from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Module(Module),
    Admin,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(m) => write!(f, "module '{}'", m),
            Self::Admin => f.write_str("administration"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Option<Role>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub role: Option<Role>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub grant: Vec<Module>,
    pub revoke: Vec<Module>,
}

const USER_COLUMNS: &str = "id, username, role, full_name, email, active, \
     perm_planning, perm_sales, perm_paperwork, perm_deliveries, created_at, last_login";

fn user_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role: String = r.get(2)?;
    Ok(User {
        id: r.get(0)?,
        username: r.get(1)?,
        role: if role == "admin" { Role::Admin } else { Role::User },
        full_name: r.get(3)?,
        email: r.get(4)?,
        active: r.get(5)?,
        permissions: Permissions {
            planning: r.get(6)?,
            sales: r.get(7)?,
            paperwork: r.get(8)?,
            deliveries: r.get(9)?,
        },
        created_at: r.get(10)?,
        last_login: r.get(11)?,
    })
}

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("hash password")
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 {
        return Err(DeskError::validation("Password must be at least 8 characters").into());
    }
    Ok(())
}

pub fn find_user(conn: &Connection, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username=?1", USER_COLUMNS);
    let user = conn
        .query_row(&sql, params![username.trim()], user_from_row)
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
        USER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], user_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn create_user(conn: &Connection, new: &NewUser) -> Result<i64> {
    let username = new.username.trim();
    if username.is_empty() {
        return Err(DeskError::validation("Username must not be empty").into());
    }
    check_password(&new.password)?;
    let role = new.role.unwrap_or(Role::User);
    let perms = if role == Role::Admin {
        Permissions::all()
    } else {
        new.permissions
    };
    let hash = hash_password(&new.password)?;
    let res = conn.execute(
        "INSERT INTO users(username, password_hash, role, full_name, email,
                           perm_planning, perm_sales, perm_paperwork, perm_deliveries)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            username,
            hash,
            role.as_str(),
            new.full_name,
            new.email,
            perms.planning,
            perms.sales,
            perms.paperwork,
            perms.deliveries
        ],
    );
    match res {
        Ok(_) => {
            tracing::info!(username, role = role.as_str(), "user created");
            Ok(conn.last_insert_rowid())
        }
        Err(e) if is_unique_violation(&e) => {
            Err(DeskError::conflict(format!("User '{}' already exists", username)).into())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn update_user(conn: &Connection, username: &str, upd: &UserUpdate) -> Result<()> {
    let user = find_user(conn, username)?
        .ok_or_else(|| DeskError::NotFound(format!("User '{}'", username.trim())))?;

    let active_admin = user.is_admin() && user.active;
    let demotes_admin = active_admin && matches!(upd.role, Some(Role::User));
    let deactivates_admin = active_admin && upd.active == Some(false);
    if (demotes_admin || deactivates_admin) && active_admin_count(conn)? <= 1 {
        return Err(DeskError::conflict("Cannot demote or deactivate the only active administrator").into());
    }

    let tx = conn.unchecked_transaction()?;
    if let Some(pw) = &upd.password {
        check_password(pw)?;
        tx.execute(
            "UPDATE users SET password_hash=?1 WHERE id=?2",
            params![hash_password(pw)?, user.id],
        )?;
    }
    if let Some(role) = upd.role {
        tx.execute(
            "UPDATE users SET role=?1 WHERE id=?2",
            params![role.as_str(), user.id],
        )?;
    }
    if let Some(name) = &upd.full_name {
        tx.execute(
            "UPDATE users SET full_name=?1 WHERE id=?2",
            params![name, user.id],
        )?;
    }
    if let Some(email) = &upd.email {
        tx.execute(
            "UPDATE users SET email=?1 WHERE id=?2",
            params![email, user.id],
        )?;
    }
    if let Some(active) = upd.active {
        tx.execute(
            "UPDATE users SET active=?1 WHERE id=?2",
            params![active, user.id],
        )?;
    }
    for (modules, on) in [(&upd.grant, true), (&upd.revoke, false)] {
        for m in modules {
            // column names come from a closed enum
            let sql = format!("UPDATE users SET {}=?1 WHERE id=?2", m.column());
            tx.execute(&sql, params![on, user.id])?;
        }
    }
    tx.commit()?;
    tracing::info!(username = user.username.as_str(), "user updated");
    Ok(())
}

pub fn delete_user(conn: &Connection, username: &str) -> Result<()> {
    let user = find_user(conn, username)?
        .ok_or_else(|| DeskError::NotFound(format!("User '{}'", username.trim())))?;
    if user.is_admin() && user.active && active_admin_count(conn)? <= 1 {
        return Err(DeskError::conflict("Cannot delete the only active administrator").into());
    }
    conn.execute("DELETE FROM users WHERE id=?1", params![user.id])?;
    tracing::info!(username = user.username.as_str(), "user deleted");
    Ok(())
}

fn active_admin_count(conn: &Connection) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role='admin' AND active=1",
        [],
        |r| r.get(0),
    )?;
    Ok(n)
}

/// Verify credentials and stamp the login time.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User> {
    let denied = || DeskError::Unauthenticated("invalid username or password".into());
    let hash: Option<(String, bool)> = conn
        .query_row(
            "SELECT password_hash, active FROM users WHERE username=?1",
            params![username.trim()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((hash, active)) = hash else {
        tracing::warn!(username, "login for unknown user");
        return Err(denied().into());
    };
    if !bcrypt::verify(password, &hash).unwrap_or(false) {
        tracing::warn!(username, "login with wrong password");
        return Err(denied().into());
    }
    if !active {
        return Err(DeskError::Unauthenticated(format!("user '{}' is inactive", username.trim())).into());
    }
    conn.execute(
        "UPDATE users SET last_login=datetime('now') WHERE username=?1",
        params![username.trim()],
    )?;
    find_user(conn, username)?.ok_or_else(|| denied().into())
}

/// Create the first administrator. Refused once any user exists.
pub fn provision_admin(
    conn: &Connection,
    username: &str,
    password: &str,
    email: Option<&str>,
) -> Result<i64> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    if existing > 0 {
        return Err(DeskError::conflict("Users already provisioned").into());
    }
    create_user(
        conn,
        &NewUser {
            username: username.to_string(),
            password: password.to_string(),
            role: Some(Role::Admin),
            full_name: Some("Administrator".to_string()),
            email: email.map(str::to_string),
            permissions: Permissions::all(),
        },
    )
}

/// Authenticate (when credentials are given or required) and check `need`.
///
/// Returns the acting user, or `None` when auth is not enforced and no
/// credentials were supplied.
pub fn authorize(
    conn: &Connection,
    require_auth: bool,
    credentials: Option<(&str, &str)>,
    need: Capability,
) -> Result<Option<User>> {
    let Some((username, password)) = credentials else {
        if require_auth {
            return Err(DeskError::Unauthenticated("pass --user and --password".into()).into());
        }
        return Ok(None);
    };
    let user = authenticate(conn, username, password)?;
    let allowed = match need {
        Capability::Admin => user.is_admin(),
        Capability::Module(m) => user.can(m),
    };
    if !allowed {
        return Err(DeskError::Forbidden {
            user: user.username.clone(),
            capability: need.to_string(),
        }
        .into());
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_can_everything() {
        let admin = User {
            id: 1,
            username: "a".into(),
            role: Role::Admin,
            full_name: None,
            email: None,
            active: true,
            permissions: Permissions::default(),
            created_at: String::new(),
            last_login: None,
        };
        assert!(Module::ALL.iter().all(|m| admin.can(*m)));

        let mut perms = Permissions::default();
        perms.set(Module::Sales, true);
        let seller = User {
            role: Role::User,
            permissions: perms,
            ..admin
        };
        assert!(seller.can(Module::Sales));
        assert!(!seller.can(Module::Planning));
    }

    #[test]
    fn modules_parse_case_insensitively() {
        assert_eq!("Sales".parse::<Module>().unwrap(), Module::Sales);
        assert!("gestoria".parse::<Module>().is_err());
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }
}
