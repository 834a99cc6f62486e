use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const LOG_BACKUPS: usize = 3;

pub const LOG_FILENAME: &str = "asfravab.log";

struct SharedFile(Arc<File>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (&*self.0).flush()
    }
}

/// Shift `file` -> `file.1` -> ... once it exceeds the size cap.
pub fn rotate_if_needed(path: &Path) {
    let too_big = std::fs::metadata(path)
        .map(|m| m.len() >= MAX_LOG_BYTES)
        .unwrap_or(false);
    if !too_big {
        return;
    }
    for i in (1..LOG_BACKUPS).rev() {
        let from = backup_name(path, i);
        let to = backup_name(path, i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(path, backup_name(path, 1));
}

fn backup_name(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

fn env_filter(verbose: bool, base_level: &str) -> EnvFilter {
    if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asfravab=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("asfravab={}", base_level)))
    }
}

/// Console logger; call once near application start. The persisted settings
/// level applies unless `--verbose` or `RUST_LOG` overrides it. When
/// `log_file` is set the same events also go to a plain-format rotating file.
pub fn init_cli_logger(verbose: bool, base_level: &str, log_file: Option<&Path>) {
    let file_layer = log_file.and_then(|path| {
        rotate_if_needed(path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()?;
        let shared = Arc::new(file);
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(move || SharedFile(shared.clone())),
        )
    });

    tracing_subscriber::registry()
        .with(env_filter(verbose, base_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .init();
}
