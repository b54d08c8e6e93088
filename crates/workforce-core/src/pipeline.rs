use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::benchmarks::{self, BenchmarkStatus, ValidationReport};
use crate::config::PipelineConfig;
use crate::db;
use crate::error::{EtlError, Result};
use crate::ingestion::{self, FileReport};
use crate::loader::{self, LoadReport, SchemaOutcome, WriteMode};
use crate::normalize::{self, NormalizationSummary};
use crate::outputs::{self, OutputPaths, QualityDocument};
use crate::quality::{self, DataQualityReport};
use crate::random::RandomSource;
use crate::reconcile::{self, SynthesizedColumn};
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Succeeded,
    /// Outputs were written but the load failed or did not verify.
    SucceededWithWarnings,
}

#[derive(Debug, Serialize)]
pub struct PipelineSummary {
    pub status: PipelineStatus,
    pub seed: Option<u64>,
    pub files: Vec<FileReport>,
    pub rows: usize,
    pub validation: ValidationReport,
    pub quality: DataQualityReport,
    pub normalization: NormalizationSummary,
    pub synthesized_columns: Vec<SynthesizedColumn>,
    pub outputs: OutputPaths,
    pub load: Option<LoadReport>,
    pub warnings: Vec<String>,
}

impl PipelineSummary {
    pub fn benchmark_warnings(&self) -> usize {
        self.validation
            .values()
            .filter(|result| result.status == BenchmarkStatus::Warning)
            .count()
    }
}

/// Runs ingestion, reconciliation, normalization, validation and reporting,
/// writes the output files, then loads the cleaned batch unless the config
/// is a dry run.
pub async fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    let mut rng = RandomSource::from_optional_seed(config.seed);
    info!(seed = ?config.seed, inputs = config.inputs.len(), "Starting pipeline");

    let batch = ingestion::read_and_merge(&config.inputs)?;
    info!(files = batch.files_read(), rows = batch.frame.height(), "Ingestion complete");

    let reconciliation = reconcile::reconcile(&batch.frame, &mut rng)?;
    let (mut cleaned, normalization) = normalize::normalize(&reconciliation.frame, &mut rng)?;

    let validation = benchmarks::validate_against_benchmarks(&cleaned, &config.benchmarks)?;
    let quality = quality::generate_data_quality_report(&cleaned);

    let document = QualityDocument::new(
        &quality,
        &batch.reports,
        &reconciliation.aliased,
        &reconciliation.synthesized,
        &normalization,
    );
    let output_paths = outputs::write_outputs(&config.output_dir, &validation, &document, &mut cleaned)?;

    let mut warnings = Vec::new();
    let load = match config.database_url.as_deref() {
        None => {
            info!("Dry run; skipping load");
            None
        }
        Some(database_url) => match loader::load_frame(database_url, &cleaned, config.write_mode).await {
            Ok(report) if config.strict_load && !report.is_verified() => {
                return Err(EtlError::Load(report.warnings.join("; ")));
            }
            Ok(report) => {
                warnings.extend(report.warnings.iter().cloned());
                Some(report)
            }
            Err(err) if config.strict_load => return Err(EtlError::Load(err.to_string())),
            Err(err) => {
                warn!(error = %err, "Load failed; outputs were still written");
                warnings.push(format!("load failed: {err}"));
                None
            }
        },
    };

    let status = if warnings.is_empty() {
        PipelineStatus::Succeeded
    } else {
        PipelineStatus::SucceededWithWarnings
    };
    info!(?status, rows = cleaned.height(), "Pipeline finished");

    Ok(PipelineSummary {
        status,
        seed: rng.seed(),
        files: batch.reports,
        rows: cleaned.height(),
        validation,
        quality,
        normalization,
        synthesized_columns: reconciliation.synthesized,
        outputs: output_paths,
        load,
        warnings,
    })
}

/// Reloads a previously written cleaned dataset, truncating the table first.
/// Columns outside the Respondent Record are ignored.
pub async fn load_cleaned(path: &Path, database_url: &str) -> Result<LoadReport> {
    if !path.is_file() {
        return Err(EtlError::NoInputFiles {
            checked: vec![path.to_path_buf()],
        });
    }

    let raw = ingestion::read_csv_path(path)?;
    if raw.column(schema::RESPONDENT_ID).is_err() {
        return Err(EtlError::MissingColumn(schema::RESPONDENT_ID.to_string()));
    }
    let ignored: Vec<String> = raw
        .get_column_names()
        .into_iter()
        .filter(|name| schema::column_spec(name.as_str()).is_none())
        .map(|name| name.to_string())
        .collect();
    if !ignored.is_empty() {
        info!(columns = ?ignored, "Ignoring columns outside the target table");
    }

    let typed = schema::coerce_to_schema(&raw)?;
    info!(path = %path.display(), rows = typed.height(), columns = typed.width(), "Read cleaned dataset");

    loader::load_frame(database_url, &typed, WriteMode::TruncateAppend).await
}

/// Applies a schema script to the sink. The file is checked before any
/// connection is made.
pub async fn setup_schema(schema_path: &Path, database_url: &str) -> Result<SchemaOutcome> {
    let sql = loader::read_schema_file(schema_path)?;
    let pool = db::connect(database_url).await?;
    let outcome = loader::apply_schema(&pool, &sql).await;
    pool.close().await;
    outcome
}
