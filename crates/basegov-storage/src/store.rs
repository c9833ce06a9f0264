//! Filesystem partition store: canonical name -> raw bytes, one directory
//! per pipeline stage.

use std::path::{Path, PathBuf};

use anyhow::Context;
use basegov_core::Stage;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Key-value store over canonical partition names. Writes are atomic
/// (temp file + rename) so a killed run never leaves a truncated partition
/// that a later resume would mistake for a complete one.
#[derive(Debug, Clone)]
pub struct PartitionStore {
    root: PathBuf,
}

impl PartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    pub fn partition_path(&self, stage: Stage, name: &str) -> PathBuf {
        self.stage_dir(stage).join(name)
    }

    pub async fn exists(&self, stage: Stage, name: &str) -> anyhow::Result<bool> {
        let path = self.partition_path(stage, name);
        fs::try_exists(&path)
            .await
            .with_context(|| format!("checking partition {}", path.display()))
    }

    pub async fn read(&self, stage: Stage, name: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.partition_path(stage, name);
        fs::read(&path)
            .await
            .with_context(|| format!("reading partition {}", path.display()))
    }

    pub async fn write(&self, stage: Stage, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating stage directory {}", dir.display()))?;

        let final_path = dir.join(name);
        let temp_path = dir.join(format!(".{}.tmp", Uuid::new_v4()));

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp partition file {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp partition file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp partition file {}", temp_path.display()))?;
        drop(file);

        match fs::rename(&temp_path, &final_path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(err).with_context(|| {
                    format!(
                        "renaming temp partition {} -> {}",
                        temp_path.display(),
                        final_path.display()
                    )
                })
            }
        }
    }

    /// All `.csv` entries in a stage directory, sorted by name. A stage that
    /// has not run yet lists as empty rather than erroring.
    pub async fn list(&self, stage: Stage) -> anyhow::Result<Vec<String>> {
        let dir = self.stage_dir(stage);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("listing stage directory {}", dir.display()))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing stage directory {}", dir.display()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".csv") && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
