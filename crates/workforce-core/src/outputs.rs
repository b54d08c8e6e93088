use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::benchmarks::ValidationReport;
use crate::error::Result;
use crate::ingestion::FileReport;
use crate::normalize::NormalizationSummary;
use crate::quality::DataQualityReport;
use crate::reconcile::{AliasUse, SynthesizedColumn};

pub const VALIDATION_FILE: &str = "validation_results.json";
pub const QUALITY_FILE: &str = "data_quality_report.json";
pub const CLEANED_FILE: &str = "cleaned_survey_data.csv";

/// The quality report as written to disk, with provenance for the run.
#[derive(Debug, Serialize)]
pub struct QualityDocument<'a> {
    pub generated_at: String,
    #[serde(flatten)]
    pub quality: &'a DataQualityReport,
    pub input_files: &'a [FileReport],
    pub aliased_columns: &'a [AliasUse],
    pub synthesized_columns: &'a [SynthesizedColumn],
    pub normalization: &'a NormalizationSummary,
}

impl<'a> QualityDocument<'a> {
    pub fn new(
        quality: &'a DataQualityReport,
        input_files: &'a [FileReport],
        aliased_columns: &'a [AliasUse],
        synthesized_columns: &'a [SynthesizedColumn],
        normalization: &'a NormalizationSummary,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            quality,
            input_files,
            aliased_columns,
            synthesized_columns,
            normalization,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub validation: PathBuf,
    pub quality: PathBuf,
    pub cleaned: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            validation: dir.join(VALIDATION_FILE),
            quality: dir.join(QUALITY_FILE),
            cleaned: dir.join(CLEANED_FILE),
        }
    }
}

/// Writes both reports and the cleaned dataset, creating `output_dir` if
/// needed.
pub fn write_outputs(
    output_dir: &Path,
    validation: &ValidationReport,
    quality: &QualityDocument<'_>,
    cleaned: &mut DataFrame,
) -> Result<OutputPaths> {
    fs::create_dir_all(output_dir)?;
    let paths = OutputPaths::in_dir(output_dir);

    write_json(&paths.validation, validation)?;
    write_json(&paths.quality, quality)?;
    write_cleaned_csv(&paths.cleaned, cleaned)?;

    info!(dir = %output_dir.display(), "Wrote reports and cleaned data");
    Ok(paths)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_cleaned_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!(path = %path.display(), rows = df.height(), "Wrote cleaned dataset");
    Ok(())
}
