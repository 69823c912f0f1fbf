//! Submission output
//!
//! The enriched submission set is written once per run as a JSON array.

use crate::records::{ParentRecord, SubmissionRow};
use crate::{HarvestError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the submission set to `path`, creating parent directories
///
/// Entries keep the field order of [`SubmissionRow`] and are indented with
/// four spaces.
pub fn write_submissions(path: &Path, records: &[ParentRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| HarvestError::Output {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let file = File::create(path).map_err(|source| HarvestError::Output {
        path: path.display().to_string(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let rows: Vec<SubmissionRow<'_>> = records.iter().map(SubmissionRow::from).collect();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    rows.serialize(&mut serializer)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} submissions to {}",
        records.len(),
        path.display()
    );

    Ok(())
}
