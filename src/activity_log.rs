use crate::paths::AppPaths;
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const ACTIVITY_LOG_ROTATE_BYTES: u64 = 1024 * 1024;
const ACTIVITY_LOG_MAX_BACKUPS: usize = 3;

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Appends one `{ts_ms, level, event, data}` line to the activity log.
pub fn log_line(
    paths: &AppPaths,
    level: &str,
    event: &str,
    data: serde_json::Value,
) -> Result<()> {
    let line = serde_json::json!({
        "ts_ms": now_ms(),
        "level": level,
        "event": event,
        "data": data
    })
    .to_string();

    let path = paths.activity_log_path();
    std::fs::create_dir_all(paths.logs_dir())?;
    rotate_log_if_needed(&path)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(format!("{line}\n").as_bytes())?;
    Ok(())
}

pub fn read_lines(paths: &AppPaths) -> Result<Vec<serde_json::Value>> {
    let path = paths.activity_log_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

fn rotate_log_if_needed(path: &Path) -> Result<()> {
    let oversized = std::fs::metadata(path)
        .map(|m| m.len() >= ACTIVITY_LOG_ROTATE_BYTES)
        .unwrap_or(false);
    if oversized {
        shift_backups(path, ACTIVITY_LOG_MAX_BACKUPS)?;
    }
    Ok(())
}

/// `activity.jsonl` -> `.1` -> `.2` ...; the oldest backup falls off.
fn shift_backups(path: &Path, keep: usize) -> std::io::Result<()> {
    if keep == 0 {
        return std::fs::remove_file(path).or(Ok(()));
    }
    let _ = std::fs::remove_file(backup_path(path, keep));
    for n in (1..keep).rev() {
        let from = backup_path(path, n);
        if from.exists() {
            std::fs::rename(&from, backup_path(path, n + 1))?;
        }
    }
    std::fs::rename(path, backup_path(path, 1))
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{n}"));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_line_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        log_line(&paths, "info", "info_loaded", serde_json::json!({"formats": 3})).expect("log");
        log_line(&paths, "error", "download_failed", serde_json::json!({})).expect("log");

        let lines = read_lines(&paths).expect("read");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "info_loaded");
        assert_eq!(lines[0]["data"]["formats"], 3);
        assert_eq!(lines[1]["level"], "error");
        assert!(lines[1]["ts_ms"].as_i64().unwrap_or(0) > 0);
    }

    #[test]
    fn backups_shift_and_oldest_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("activity.jsonl");
        for (p, text) in [(log.clone(), "live"), (backup_path(&log, 1), "one"), (backup_path(&log, 3), "three")] {
            std::fs::write(p, text).expect("write");
        }

        shift_backups(&log, 3).expect("shift");

        assert!(!log.exists());
        let read = |n| std::fs::read_to_string(backup_path(&log, n)).expect("backup");
        assert_eq!((read(1), read(2)), ("live".to_string(), "one".to_string()));
        assert!(!backup_path(&log, 3).exists());
    }

    #[test]
    fn oversized_log_rotates_before_append() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        std::fs::create_dir_all(paths.logs_dir()).expect("mkdir");
        let big = "x".repeat(ACTIVITY_LOG_ROTATE_BYTES as usize);
        std::fs::write(paths.activity_log_path(), &big).expect("write");

        log_line(&paths, "info", "settings_saved", serde_json::json!({})).expect("log");

        let lines = read_lines(&paths).expect("read");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "settings_saved");
        let backup = backup_path(&paths.activity_log_path(), 1);
        assert_eq!(std::fs::metadata(backup).expect("backup").len(), big.len() as u64);
    }
}
