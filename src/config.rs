// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_FILTER: &str = "dealerdesk=info";
pub const DEFAULT_BI_CACHE_TTL_SECS: u64 = 300;

/// Process-level settings read from the environment.
///
/// Per-installation values that operators edit at runtime live in the
/// `settings` table instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Explicit database file; `None` means the platform data dir.
    pub db_path: Option<PathBuf>,
    pub log_filter: String,
    pub require_auth: bool,
    pub bi_cache_ttl: Duration,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            require_auth: false,
            bi_cache_ttl: Duration::from_secs(DEFAULT_BI_CACHE_TTL_SECS),
            admin_username: None,
            admin_password: None,
            admin_email: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        let bi_cache_ttl = get("DEALERDESK_BI_CACHE_TTL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.bi_cache_ttl);
        Self {
            db_path: get("DEALERDESK_DB").map(PathBuf::from),
            log_filter: get("DEALERDESK_LOG").unwrap_or(defaults.log_filter),
            require_auth: get("DEALERDESK_REQUIRE_AUTH")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            bi_cache_ttl,
            admin_username: get("DEALERDESK_ADMIN_USERNAME"),
            admin_password: get("DEALERDESK_ADMIN_PASSWORD"),
            admin_email: get("DEALERDESK_ADMIN_EMAIL"),
        }
    }
}

/// Lenient boolean used for env flags and imported spreadsheet cells.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
