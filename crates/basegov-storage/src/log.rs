//! Append-only per-stage log streams (audit results, failed files). These
//! are observability artifacts; no later stage reads them back.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

/// One append-only text log. Lines persist across runs; appends are
/// serialized through a mutex so parallel workers can share a log.
#[derive(Debug)]
pub struct StageLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl StageLog {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line and flush, so a killed run loses at most the line
    /// being written.
    pub fn append(&self, line: &str) -> anyhow::Result<()> {
        let mut file = self.file.lock().expect("log mutex not poisoned");
        writeln!(file, "{line}").with_context(|| format!("appending to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("flushing {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_survive_reopening() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("Logs").join("small_files.log");

        let log = StageLog::open(&path).expect("open");
        log.append("a.csv - 500 rows").expect("append");
        drop(log);

        let log = StageLog::open(&path).expect("reopen");
        log.append("b.csv - 480 rows").expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(text, "a.csv - 500 rows\nb.csv - 480 rows\n");
    }
}
