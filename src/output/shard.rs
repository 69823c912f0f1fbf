//! Comment shard files
//!
//! Every page of comments is written to its own CSV file under a directory
//! derived from the parent submission's date:
//!
//! ```text
//! {root}/{year}/{month}/{day}/{submission_id}_comments_{NN}.csv
//! {root}/{year}/{month}/{day}/{submission_id}_comments.done
//! ```
//!
//! A shard is written to a temporary file and renamed into place once it is
//! complete, so a shard on disk always holds a whole page. An existing shard
//! is never overwritten. The `.done` marker is written after a submission's
//! pagination finishes; shards without a marker belong to an interrupted
//! harvest that can be resumed from the last shard. Failures here are local
//! resource problems and are not retried.

use crate::records::{ChildRecord, CommentRow};
use crate::{HarvestError, Result};
use chrono::{DateTime, Datelike, Utc};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Where an interrupted harvest left off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Highest shard number on disk
    pub sequence: u32,
    /// Oldest `dt` in that shard; `None` if it holds no rows
    pub cursor: Option<i64>,
    /// Comment ids in that shard
    pub seen: HashSet<String>,
}

/// Columns read back when resuming
#[derive(Debug, Deserialize)]
struct ShardEntry {
    comment_id: String,
    dt: i64,
}

/// Writes comment pages beneath a fixed root directory
#[derive(Debug, Clone)]
pub struct ShardWriter {
    root: PathBuf,
}

impl ShardWriter {
    /// Creates a writer rooted at `root` (typically `data/comment_data`)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the shards of submissions created on `date`
    pub fn shard_dir(&self, date: &DateTime<Utc>) -> PathBuf {
        self.root
            .join(date.year().to_string())
            .join(date.month().to_string())
            .join(date.day().to_string())
    }

    /// Full path of one shard
    pub fn shard_path(&self, parent_id: &str, date: &DateTime<Utc>, sequence: u32) -> PathBuf {
        self.shard_dir(date)
            .join(format!("{}_comments_{:02}.csv", parent_id, sequence))
    }

    /// Returns true if the shard is already on disk
    pub fn shard_exists(&self, parent_id: &str, date: &DateTime<Utc>, sequence: u32) -> bool {
        self.shard_path(parent_id, date, sequence).exists()
    }

    fn marker_path(&self, parent_id: &str, date: &DateTime<Utc>) -> PathBuf {
        self.shard_dir(date)
            .join(format!("{}_comments.done", parent_id))
    }

    /// Returns true if pagination for the submission ran to completion
    pub fn is_complete(&self, parent_id: &str, date: &DateTime<Utc>) -> bool {
        self.marker_path(parent_id, date).exists()
    }

    /// Records that pagination for the submission ran to completion
    pub fn mark_complete(&self, parent_id: &str, date: &DateTime<Utc>) -> Result<()> {
        let dir = self.shard_dir(date);
        fs::create_dir_all(&dir).map_err(|source| HarvestError::Output {
            path: dir.display().to_string(),
            source,
        })?;

        let path = self.marker_path(parent_id, date);
        File::create(&path).map_err(|source| HarvestError::Output {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Highest contiguous shard number on disk, 0 if there is none
    pub fn last_sequence(&self, parent_id: &str, date: &DateTime<Utc>) -> u32 {
        let mut sequence = 0;
        while self.shard_exists(parent_id, date, sequence + 1) {
            sequence += 1;
        }
        sequence
    }

    /// Reads back the last shard of an unfinished harvest
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No shards on disk
    /// * `Ok(Some(Checkpoint))` - Resume after shard `sequence`
    /// * `Err(HarvestError)` - The last shard could not be read
    pub fn checkpoint(&self, parent_id: &str, date: &DateTime<Utc>) -> Result<Option<Checkpoint>> {
        let sequence = self.last_sequence(parent_id, date);
        if sequence == 0 {
            return Ok(None);
        }

        let path = self.shard_path(parent_id, date, sequence);
        let file = File::open(&path).map_err(|source| HarvestError::Output {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = ReaderBuilder::new().from_reader(file);

        let mut cursor: Option<i64> = None;
        let mut seen = HashSet::new();
        for entry in reader.deserialize::<ShardEntry>() {
            let entry = entry?;
            cursor = Some(cursor.map_or(entry.dt, |c| c.min(entry.dt)));
            seen.insert(entry.comment_id);
        }

        Ok(Some(Checkpoint {
            sequence,
            cursor,
            seen,
        }))
    }

    /// Writes one page of comments as a new shard
    ///
    /// The page is written to `{shard}.tmp` first and renamed into place
    /// after the last row is flushed.
    ///
    /// # Arguments
    ///
    /// * `parent_id` - Submission the comments belong to
    /// * `date` - Creation date of the submission
    /// * `sequence` - Shard number, starting at 1 for each submission
    /// * `records` - The page to persist
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Path of the written shard
    /// * `Err(HarvestError)` - Directory creation or the write failed, or the
    ///   shard already exists
    pub fn write_shard(
        &self,
        parent_id: &str,
        date: &DateTime<Utc>,
        sequence: u32,
        records: &[ChildRecord],
    ) -> Result<PathBuf> {
        let dir = self.shard_dir(date);
        fs::create_dir_all(&dir).map_err(|source| HarvestError::Output {
            path: dir.display().to_string(),
            source,
        })?;

        let path = self.shard_path(parent_id, date, sequence);
        if path.exists() {
            return Err(HarvestError::Output {
                path: path.display().to_string(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "shard already exists"),
            });
        }

        let tmp_path = path.with_extension("csv.tmp");
        if let Err(e) = write_rows(&tmp_path, records) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|source| HarvestError::Output {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(
            "Wrote {} comments to {}",
            records.len(),
            path.display()
        );

        Ok(path)
    }
}

fn write_rows(path: &Path, records: &[ChildRecord]) -> Result<()> {
    let file = File::create(path).map_err(|source| HarvestError::Output {
        path: path.display().to_string(),
        source,
    })?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(file);
    for record in records {
        writer.serialize(CommentRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}
