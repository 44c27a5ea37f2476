use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
}

impl AppPaths {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolves the base dir from `DOWNLOADER_WEB_BASE_DIR`, falling back to
    /// the per-user data directory.
    pub fn from_env() -> Option<Self> {
        if let Ok(v) = std::env::var("DOWNLOADER_WEB_BASE_DIR") {
            let t = v.trim();
            if !t.is_empty() {
                return Some(Self::new(PathBuf::from(t)));
            }
        }
        default_data_dir().map(|dir| Self::new(dir.join("downloader_web")))
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    pub fn client_config_path(&self) -> PathBuf {
        self.config_dir().join("client.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn activity_log_path(&self) -> PathBuf {
        self.logs_dir().join("activity.jsonl")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

fn default_data_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        if let Ok(v) = std::env::var("APPDATA") {
            return Some(PathBuf::from(v));
        }
        return None;
    }

    if let Ok(v) = std::env::var("XDG_DATA_HOME") {
        if !v.trim().is_empty() {
            return Some(PathBuf::from(v));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if cfg!(target_os = "macos") {
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }
    Some(PathBuf::from(home).join(".local").join("share"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_base_dir() {
        let paths = AppPaths::new(PathBuf::from("/tmp/dlw"));
        assert_eq!(
            paths.client_config_path(),
            PathBuf::from("/tmp/dlw/config/client.json")
        );
        assert_eq!(
            paths.activity_log_path(),
            PathBuf::from("/tmp/dlw/logs/activity.jsonl")
        );
    }

    #[test]
    fn ensure_dirs_creates_config_and_logs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().join("base"));
        paths.ensure_dirs().expect("ensure");
        assert!(paths.config_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
