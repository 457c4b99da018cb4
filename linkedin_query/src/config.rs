use crate::utils::APP_NAME;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub export_dir: Option<PathBuf>,
    pub owner_name: Option<String>,
    pub default_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            export_dir: None,
            owner_name: None,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryConfig {
    pub fn from_env() -> Self {
        let export_dir = non_empty_var("LINKEDIN_EXPORT_DIR").map(PathBuf::from);
        let owner_name = non_empty_var("LINKEDIN_OWNER_NAME");
        let default_limit = env::var("LINKEDIN_QUERY_LIMIT")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_LIMIT);
        tracing::debug!(app = APP_NAME, ?export_dir, default_limit, "loaded configuration");
        Self {
            export_dir,
            owner_name,
            default_limit,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Locations of the individual files inside an export directory.
#[derive(Debug, Clone, Default)]
pub struct ExportPaths {
    pub connections: PathBuf,
    pub shares: PathBuf,
    pub comments: PathBuf,
    pub reactions: PathBuf,
    pub messages: PathBuf,
}

impl ExportPaths {
    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref();
        Self {
            connections: base.join("Connections.csv"),
            shares: base.join("Shares.csv"),
            comments: base.join("Comments.csv"),
            reactions: base.join("Reactions.csv"),
            messages: base.join("messages.csv"),
        }
    }
}
