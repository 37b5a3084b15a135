use std::path::{Path, PathBuf};

pub const DEFAULT_ADMIN_TOKEN: &str = "ifc-sbs";
pub const DEFAULT_SNAPSHOT_RETENTION: usize = 30;

/// Runtime configuration, built once when the workspace is selected and
/// passed by reference into the stores and handlers.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub admin_token: String,
    pub snapshot_retention: usize,
}

impl Config {
    pub fn new(data_dir: PathBuf, admin_token: Option<String>, retention: Option<usize>) -> Config {
        Config {
            data_dir,
            admin_token: admin_token.unwrap_or_else(|| DEFAULT_ADMIN_TOKEN.to_string()),
            snapshot_retention: retention.unwrap_or(DEFAULT_SNAPSHOT_RETENTION),
        }
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("almoco.sqlite3")
    }

    pub fn token_matches(&self, supplied: &str) -> bool {
        supplied == self.admin_token
    }
}

pub fn db_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join("almoco.sqlite3")
}
