// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failures caused by the caller rather than by the store.
///
/// Anything that is not a `DeskError` is treated as an internal failure.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("user '{user}' lacks access to {capability}")]
    Forbidden { user: String, capability: String },
    #[error("authentication required: {0}")]
    Unauthenticated(String),
}

impl DeskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Process exit code for a failed command: 2 for caller errors, 1 otherwise.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<DeskError>().is_some() { 2 } else { 1 }
}

/// True when a statement failed on a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_exit_with_two() {
        let err = anyhow::Error::new(DeskError::validation("bad zone"));
        assert_eq!(exit_code_for(&err), 2);
        let err = anyhow::anyhow!("disk full");
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn only_uniqueness_failures_count_as_conflicts() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t(id INTEGER PRIMARY KEY, code TEXT NOT NULL UNIQUE, qty INTEGER CHECK (qty >= 0));
             INSERT INTO t(id, code, qty) VALUES (1, 'A', 1);",
        )
        .unwrap();
        let dup_code = conn
            .execute("INSERT INTO t(id, code, qty) VALUES (2, 'A', 1)", [])
            .unwrap_err();
        assert!(is_unique_violation(&dup_code));
        let dup_id = conn
            .execute("INSERT INTO t(id, code, qty) VALUES (1, 'B', 1)", [])
            .unwrap_err();
        assert!(is_unique_violation(&dup_id));
        let missing = conn
            .execute("INSERT INTO t(id, code, qty) VALUES (3, NULL, 1)", [])
            .unwrap_err();
        assert!(!is_unique_violation(&missing));
        let negative = conn
            .execute("INSERT INTO t(id, code, qty) VALUES (4, 'C', -1)", [])
            .unwrap_err();
        assert!(!is_unique_violation(&negative));
    }

    #[test]
    fn context_keeps_the_domain_error_reachable() {
        use anyhow::Context;
        let res: Result<(), DeskError> = Err(DeskError::NotFound("model 'X'".into()));
        let err = res.context("saving prices").unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }
}
