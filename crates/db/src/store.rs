use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repository::MatchHistory;
use crate::schema::{CsvMatchRow, HistoryError};

/// CSV file holding the full match history.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads and date-sorts the table. A missing file is an error.
    pub fn load(&self) -> Result<MatchHistory, HistoryError> {
        if !self.exists() {
            return Err(HistoryError::NotFound(self.path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<CsvMatchRow>().enumerate() {
            // Header is line 1.
            let line = index + 2;
            records.push(row?.into_record(line)?);
        }

        let history = MatchHistory::from_records(records);
        info!(
            "Loaded {} matches from {}",
            history.len(),
            self.path.display()
        );
        Ok(history)
    }

    /// Like [`load`](Self::load) but a missing file yields an empty table.
    pub fn load_or_empty(&self) -> Result<MatchHistory, HistoryError> {
        if self.exists() {
            self.load()
        } else {
            warn!("No dataset at {}, starting empty", self.path.display());
            Ok(MatchHistory::default())
        }
    }

    /// Rewrites the whole table. Rows go to a sibling temp file, unique per
    /// call, which is then renamed over the target, so readers never see a
    /// partial file.
    pub fn save(&self, history: &MatchHistory) -> Result<(), HistoryError> {
        self.ensure_parent()?;
        self.save_via(history, &self.sibling(&format!("{}.tmp", Uuid::new_v4())))
    }

    /// Takes the advisory update lock next to the table. A lock file older
    /// than [`LOCK_STALE_AFTER`] is treated as left behind by a dead process
    /// and replaced.
    pub fn lock(&self) -> Result<HistoryLock, HistoryError> {
        self.ensure_parent()?;
        let path = self.sibling("lock");

        let created = match create_lock_file(&path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists && lock_is_stale(&path) => {
                warn!("Replacing stale lock {}", path.display());
                fs::remove_file(&path).map_err(|source| HistoryError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                create_lock_file(&path)
            }
            other => other,
        };
        created.map_err(|source| match source.kind() {
            ErrorKind::AlreadyExists => HistoryError::Locked(path.display().to_string()),
            _ => HistoryError::Io {
                path: path.display().to_string(),
                source,
            },
        })?;

        debug!("Acquired {}", path.display());
        Ok(HistoryLock { path })
    }

    fn ensure_parent(&self) -> Result<(), HistoryError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|source| HistoryError::Io {
                    path: dir.display().to_string(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// `combined_matches.csv` -> `combined_matches.csv.<suffix>`
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn save_via(&self, history: &MatchHistory, tmp: &Path) -> Result<(), HistoryError> {
        if let Err(e) = write_rows(tmp, history) {
            remove_leftover(tmp);
            return Err(e);
        }

        fs::rename(tmp, &self.path).map_err(|source| {
            remove_leftover(tmp);
            HistoryError::Io {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        debug!("Wrote {} matches to {}", history.len(), self.path.display());
        Ok(())
    }
}

/// Held while an update rewrites the table. Dropping it releases the lock.
#[derive(Debug)]
pub struct HistoryLock {
    path: PathBuf,
}

impl HistoryLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}

/// Age after which an abandoned lock file is reclaimed.
pub const LOCK_STALE_AFTER: Duration = Duration::from_secs(30 * 60);

fn create_lock_file(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > LOCK_STALE_AFTER)
}

fn remove_leftover(tmp: &Path) {
    if tmp.is_file() {
        if let Err(e) = fs::remove_file(tmp) {
            warn!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
}

fn write_rows(path: &Path, history: &MatchHistory) -> Result<(), HistoryError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in history.records() {
        writer.serialize(CsvMatchRow::from(record))?;
    }
    let file = writer.into_inner().map_err(|e| HistoryError::Io {
        path: path.display().to_string(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|source| HistoryError::Io {
        path: path.display().to_string(),
        source,
    })
}
