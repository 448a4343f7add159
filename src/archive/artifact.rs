use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone};
use tokio::io::AsyncWriteExt;

use super::error::{ArchiveError, ArchiveResult};
use crate::{
    config::{ArchiveConfig, ArtifactFormat},
    models::Record,
    observability::metrics,
};

/// Timestamp portion of artifact file names.
const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Give up after this many same-second collisions in one directory.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes one backup artifact per cycle into the backup directory.
///
/// Files are named `backup_<YYYYMMDD_HHMMSS>.<ext>` from local time. A file
/// is never overwritten: when a name is already taken, `_1`, `_2`, ... is
/// appended to the timestamp.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    extension: String,
    format: ArtifactFormat,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, format: ArtifactFormat) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            format,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(&config.backup_dir, &config.extension, config.format)
    }

    /// File name for an artifact created at `at`. `attempt` 0 is the plain name.
    pub fn file_name<Tz: TimeZone>(&self, at: &DateTime<Tz>, attempt: u32) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let stamp = at.format(ARTIFACT_TIMESTAMP_FORMAT);
        if attempt == 0 {
            format!("backup_{stamp}.{}", self.extension)
        } else {
            format!("backup_{stamp}_{attempt}.{}", self.extension)
        }
    }

    /// Render the artifact body, one line per record.
    pub fn render(&self, records: &[Record]) -> ArchiveResult<String> {
        let mut body = String::new();
        for record in records {
            match self.format {
                ArtifactFormat::Tuple => body.push_str(&record.to_string()),
                ArtifactFormat::JsonLines => {
                    let line = serde_json::to_string(record)
                        .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
                    body.push_str(&line);
                }
            }
            body.push('\n');
        }
        Ok(body)
    }

    /// Write `records` to a new artifact and return its path.
    ///
    /// The data is flushed to disk before returning, so a caller that deletes
    /// the rows afterwards never loses them.
    pub async fn write(&self, records: &[Record]) -> ArchiveResult<PathBuf> {
        let body = self.render(records)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ArchiveError::io(&self.dir, e))?;

        let now = Local::now();
        let (path, mut file) = self.create_unique(&now).await?;

        file.write_all(body.as_bytes())
            .await
            .map_err(|e| ArchiveError::io(&path, e))?;
        file.sync_all()
            .await
            .map_err(|e| ArchiveError::io(&path, e))?;

        metrics::record_artifact_written(records.len());
        tracing::info!(path = %path.display(), records = records.len(), "Backup saved");

        Ok(path)
    }

    async fn create_unique(&self, now: &DateTime<Local>) -> ArchiveResult<(PathBuf, tokio::fs::File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(self.file_name(now, attempt));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "Artifact name taken, trying next suffix");
                }
                Err(e) => return Err(ArchiveError::io(path, e)),
            }
        }

        Err(ArchiveError::io(
            &self.dir,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("no free artifact name after {MAX_NAME_ATTEMPTS} attempts"),
            ),
        ))
    }
}
