use std::path::{Path, PathBuf};

/// Overrides the per-user data root; used by tests and portable installs.
pub const ENV_DATA_DIR: &str = "ASFRAVAB_DATA_DIR";

const APP_DIR: &str = "ASFRAVA-B";

pub fn ensure_dir(path: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".permcheck");
    match std::fs::write(&probe, "ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

fn candidates() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(overridden) = std::env::var(ENV_DATA_DIR) {
        if !overridden.is_empty() {
            dirs.push(PathBuf::from(overridden));
        }
    }
    if let Some(config) = dirs::config_dir() {
        dirs.push(config.join(APP_DIR));
    }
    if let Some(data) = dirs::data_dir() {
        dirs.push(data.join(APP_DIR));
    }
    dirs
}

/// A writable per-user data directory: OS-standard locations first, the
/// system temp directory as the last resort.
pub fn user_data_dir() -> PathBuf {
    for candidate in candidates() {
        if is_writable(&candidate) {
            return candidate;
        }
    }
    let fallback = std::env::temp_dir().join(APP_DIR);
    let _ = std::fs::create_dir_all(&fallback);
    fallback
}

pub fn user_config_dir() -> PathBuf {
    let dir = user_data_dir().join("config");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

pub fn user_log_dir() -> PathBuf {
    let dir = user_data_dir().join("logs");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_honors_env_override() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_var(ENV_DATA_DIR, tmp.path());
        let dir = user_data_dir();
        assert_eq!(dir, tmp.path().to_path_buf());
        let cfg = user_config_dir();
        assert!(cfg.starts_with(tmp.path()));
        assert!(cfg.ends_with("config"));
        std::env::remove_var(ENV_DATA_DIR);
    }

    #[test]
    fn ensure_dir_creates_nested_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        let created = ensure_dir(&nested).unwrap();
        assert!(created.is_dir());
    }
}
