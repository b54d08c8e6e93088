use std::fs;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsError, Series};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Read,
    Missing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct IngestionBatch {
    /// All-string frame holding every row of every readable file.
    pub frame: DataFrame,
    pub reports: Vec<FileReport>,
}

impl IngestionBatch {
    pub fn files_read(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == FileStatus::Read)
            .count()
    }
}

/// Reads every path that exists and merges the results row-wise. Missing,
/// unreadable or unparseable files are reported and skipped; the batch fails
/// only when no file could be read at all.
pub fn read_and_merge(paths: &[PathBuf]) -> Result<IngestionBatch> {
    let mut frames = Vec::new();
    let mut reports = Vec::with_capacity(paths.len());

    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "Input file not found");
            reports.push(FileReport {
                path: path.display().to_string(),
                status: FileStatus::Missing,
                hash: None,
                rows: 0,
                columns: 0,
                error: None,
            });
            continue;
        }

        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not open input file");
                reports.push(FileReport {
                    path: path.display().to_string(),
                    status: FileStatus::Failed,
                    hash: None,
                    rows: 0,
                    columns: 0,
                    error: Some(err.to_string()),
                });
                continue;
            }
        };
        let hash = compute_hash(&contents);

        match read_csv_bytes(&contents) {
            Ok(frame) => {
                info!(
                    path = %path.display(),
                    rows = frame.height(),
                    columns = frame.width(),
                    "Read input file"
                );
                reports.push(FileReport {
                    path: path.display().to_string(),
                    status: FileStatus::Read,
                    hash: Some(hash),
                    rows: frame.height(),
                    columns: frame.width(),
                    error: None,
                });
                frames.push(frame);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read input file");
                reports.push(FileReport {
                    path: path.display().to_string(),
                    status: FileStatus::Failed,
                    hash: Some(hash),
                    rows: 0,
                    columns: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    if frames.is_empty() {
        return Err(EtlError::NoInputFiles {
            checked: paths.to_vec(),
        });
    }

    if frames.len() > 1 {
        info!(files = frames.len(), "Merging input files");
    }
    let frame = merge_frames(frames)?;
    info!(rows = frame.height(), columns = frame.width(), "Merged input");

    Ok(IngestionBatch { frame, reports })
}

/// Parses delimited text with a header row into an all-string frame. Empty
/// cells become nulls.
pub fn read_csv_bytes(contents: &[u8]) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (idx, column) in values.iter_mut().enumerate() {
            let cell = record.get(idx).filter(|cell| !cell.is_empty());
            column.push(cell.map(str::to_string));
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (name, column_values) in headers.iter().zip(values) {
        if columns.iter().any(|existing| existing.name().as_str() == name.as_str()) {
            warn!(column = %name, "Duplicate header; keeping the first occurrence");
            continue;
        }
        columns.push(Series::new(name.as_str().into(), column_values).into());
    }

    Ok(DataFrame::new(columns)?)
}

pub fn read_csv_path(path: &Path) -> Result<DataFrame> {
    let contents = fs::read(path)?;
    read_csv_bytes(&contents)
}

/// Stacks all-string frames whose column sets differ. The merged frame holds
/// the union of columns in first-seen order; a column a file lacks is null
/// for that file's rows.
pub fn merge_frames(frames: Vec<DataFrame>) -> std::result::Result<DataFrame, PolarsError> {
    let mut union: Vec<String> = Vec::new();
    for frame in &frames {
        for name in frame.get_column_names() {
            if !union.iter().any(|existing| existing.as_str() == name.as_str()) {
                union.push(name.to_string());
            }
        }
    }

    let mut aligned = frames
        .into_iter()
        .map(|frame| align_to(frame, &union))
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter();

    let Some(mut combined) = aligned.next() else {
        return Ok(DataFrame::default());
    };
    for frame in aligned {
        combined.vstack_mut(&frame)?;
    }
    Ok(combined)
}

fn align_to(mut frame: DataFrame, names: &[String]) -> std::result::Result<DataFrame, PolarsError> {
    let height = frame.height();
    for name in names {
        if frame.column(name).is_err() {
            frame.with_column(Series::full_null(name.as_str().into(), height, &DataType::String))?;
        }
    }
    frame.select(names.iter().map(String::as_str))
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
