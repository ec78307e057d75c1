use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const LOG_PREFIX: &str = "pppoe_";
const LOG_SUFFIX: &str = ".log";

/// Per-session daemon logs: `<dir>/pppoe_<timestamp>_<iface>.log`.
///
/// Logs outlive their session and are kept for diagnostics.
#[derive(Debug, Clone)]
pub struct SessionLogs {
    dir: PathBuf,
}

impl SessionLogs {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Fresh log path for a session on `interface`.
    ///
    /// Millisecond timestamps plus the interface name keep paths unique: one
    /// interface never runs two sessions at once.
    pub fn new_log_path(&self, interface: &str) -> PathBuf {
        let ts = chrono::Local::now().format("%Y%m%dT%H%M%S%.3f");
        self.dir
            .join(format!("{LOG_PREFIX}{ts}_{interface}{LOG_SUFFIX}"))
    }

    /// Most recently modified session log, if any.
    ///
    /// A missing directory counts as "no logs".
    pub async fn latest(&self) -> io::Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(LOG_PREFIX) || !name.ends_with(LOG_SUFFIX) {
                continue;
            }
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, entry.path()));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}
