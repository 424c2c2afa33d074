use std::path::PathBuf;

use nix::unistd::{getuid, User};
use tracing::warn;

use crate::history::HIST_MAX;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub history_size: usize,
    pub log_filter: String,
    pub home: PathBuf,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_size: HIST_MAX,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            home: PathBuf::from("/"),
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Self {
        let mut config = Self::from_vars(|name| std::env::var(name).ok());
        if std::env::var_os("HOME").is_none() {
            config.home = passwd_home().unwrap_or(config.home);
        }
        config
    }

    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PIPESH_HISTSIZE") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.history_size = n,
                _ => warn!(value = %raw, "ignoring invalid PIPESH_HISTSIZE"),
            }
        }
        if let Some(filter) = lookup("PIPESH_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        if let Some(home) = lookup("HOME").filter(|h| !h.is_empty()) {
            config.home = PathBuf::from(home);
        }

        config
    }
}

fn passwd_home() -> Option<PathBuf> {
    User::from_uid(getuid()).ok().flatten().map(|user| user.dir)
}
