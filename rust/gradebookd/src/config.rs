use crate::store::Backend;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_LOG_FILTER: &str = "gradebookd=info";

/// `tracing` filter directives from `GRADEBOOKD_LOG`. Read before the rest of
/// the configuration so config problems can be logged.
pub fn log_filter() -> String {
    std::env::var("GRADEBOOKD_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string())
}

/// Process configuration, read from the environment.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Workspace opened at startup, before the first request.
    pub workspace: Option<PathBuf>,
    /// Backend used for the startup workspace and when `workspace.select`
    /// does not name one.
    pub backend: Backend,
}

impl Config {
    pub fn from_env() -> Self {
        let backend = match std::env::var("GRADEBOOKD_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring unknown GRADEBOOKD_BACKEND");
                Backend::default()
            }),
            Err(_) => Backend::default(),
        };
        Self {
            workspace: std::env::var_os("GRADEBOOKD_WORKSPACE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            backend,
        }
    }
}
