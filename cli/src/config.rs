use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

use cookhouse_core::db::DEFAULT_BUSY_TIMEOUT;

pub const DB_PATH_VAR: &str = "COOKHOUSE_DB";
pub const BUSY_TIMEOUT_VAR: &str = "COOKHOUSE_BUSY_TIMEOUT_MS";

pub struct Config {
    pub db_path: PathBuf,
    /// How long a write waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        let db_path = match std::env::var_os(DB_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => {
                let proj_dirs = ProjectDirs::from("", "", "cookhouse")
                    .context("Could not determine home directory")?;
                let data_dir = proj_dirs.data_dir().to_path_buf();
                std::fs::create_dir_all(&data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", data_dir.display())
                })?;
                data_dir.join("cookhouse.db")
            }
        };

        let busy_timeout = parse_busy_timeout(std::env::var(BUSY_TIMEOUT_VAR).ok().as_deref())?;

        Ok(Config {
            db_path,
            busy_timeout,
        })
    }
}

fn parse_busy_timeout(raw: Option<&str>) -> Result<Duration> {
    match raw {
        None => Ok(DEFAULT_BUSY_TIMEOUT),
        Some(ms) => {
            let ms: u64 = ms.trim().parse().with_context(|| {
                format!("Invalid {BUSY_TIMEOUT_VAR} '{ms}'. Use a number of milliseconds")
            })?;
            Ok(Duration::from_millis(ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_busy_timeout_default() {
        assert_eq!(parse_busy_timeout(None).unwrap(), DEFAULT_BUSY_TIMEOUT);
    }

    #[test]
    fn test_parse_busy_timeout_millis() {
        assert_eq!(
            parse_busy_timeout(Some(" 250 ")).unwrap(),
            Duration::from_millis(250)
        );
        assert!(parse_busy_timeout(Some("soon")).is_err());
        assert!(parse_busy_timeout(Some("-5")).is_err());
    }
}
