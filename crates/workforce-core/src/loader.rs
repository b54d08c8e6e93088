use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use tracing::{info, warn};

use crate::db::{self, DbPool};
use crate::error::{EtlError, Result};
use crate::schema::{self, records_from_frame, RespondentRecord, RESPONDENT_COLUMNS};

pub const TABLE_NAME: &str = "survey_respondents";

/// 28 bound columns per row keeps each statement well under the Postgres
/// limit of 65535 parameters.
const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Drop and recreate the table, then insert.
    #[default]
    Replace,
    /// Truncate the existing table (structure kept, identity restarted),
    /// then insert.
    TruncateAppend,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Replace => write!(f, "replace"),
            WriteMode::TruncateAppend => write!(f, "truncate-append"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = EtlError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "replace" => Ok(WriteMode::Replace),
            "truncate-append" | "truncate_append" | "append" => Ok(WriteMode::TruncateAppend),
            other => Err(EtlError::Config(format!(
                "unknown write mode '{}' (expected 'replace' or 'truncate-append')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub mode: WriteMode,
    pub expected_rows: usize,
    pub loaded_rows: i64,
    pub ai_users: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adoption_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_productivity_change: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn is_verified(&self) -> bool {
        self.warnings.is_empty() && self.loaded_rows == self.expected_rows as i64
    }
}

pub fn create_table_sql() -> String {
    let mut columns = vec!["    id BIGSERIAL PRIMARY KEY".to_string()];
    for spec in RESPONDENT_COLUMNS {
        if spec.name == schema::RESPONDENT_ID {
            columns.push(format!("    {} TEXT UNIQUE NOT NULL", spec.name));
        } else {
            columns.push(format!("    {} {}", spec.name, spec.column_type.sql_type()));
        }
    }
    columns.push("    created_at TIMESTAMPTZ DEFAULT NOW()".to_string());
    format!("CREATE TABLE {} (\n{}\n)", TABLE_NAME, columns.join(",\n"))
}

/// Connects, writes the frame as one batch, verifies, and closes the
/// connection whatever the outcome.
pub async fn load_frame(database_url: &str, df: &DataFrame, mode: WriteMode) -> Result<LoadReport> {
    let records = records_from_frame(df)?;
    let pool = db::connect(database_url).await?;
    let result = load_records(&pool, &records, mode).await;
    pool.close().await;
    result
}

pub async fn load_records(
    pool: &DbPool,
    records: &[RespondentRecord],
    mode: WriteMode,
) -> Result<LoadReport> {
    prepare_table(pool, mode).await?;
    info!(%mode, table = TABLE_NAME, "Prepared target table");

    let mut tx = pool.begin().await?;
    for chunk in records.chunks(INSERT_CHUNK_ROWS) {
        insert_chunk(&mut tx, chunk).await?;
    }
    tx.commit().await?;
    info!(rows = records.len(), table = TABLE_NAME, "Inserted records");

    verify_load(pool, records.len(), mode).await
}

async fn prepare_table(pool: &DbPool, mode: WriteMode) -> Result<()> {
    match mode {
        WriteMode::Replace => {
            let drop_sql = format!("DROP TABLE IF EXISTS {} CASCADE", TABLE_NAME);
            sqlx::query(&drop_sql).execute(pool).await?;
            let create_sql = create_table_sql();
            sqlx::query(&create_sql).execute(pool).await?;
        }
        WriteMode::TruncateAppend => {
            let truncate_sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", TABLE_NAME);
            sqlx::query(&truncate_sql).execute(pool).await?;
        }
    }
    Ok(())
}

async fn insert_chunk(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    chunk: &[RespondentRecord],
) -> Result<()> {
    let column_list = RESPONDENT_COLUMNS
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ");
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("INSERT INTO {} ({}) ", TABLE_NAME, column_list));

    // Bind order follows RESPONDENT_COLUMNS.
    builder.push_values(chunk, |mut row, record| {
        row.push_bind(record.respondent_id.clone())
            .push_bind(record.age_group.clone())
            .push_bind(record.education_level.clone())
            .push_bind(record.income_level)
            .push_bind(record.industry_sector.clone())
            .push_bind(record.job_role.clone())
            .push_bind(record.company_size.clone())
            .push_bind(record.years_experience)
            .push_bind(record.is_ai_user)
            .push_bind(record.ai_usage_frequency.clone())
            .push_bind(record.ai_comfort_level)
            .push_bind(record.ai_training_received)
            .push_bind(record.ai_tools_used_count)
            .push_bind(record.ai_agents_awareness_level)
            .push_bind(record.is_worried)
            .push_bind(record.is_hopeful)
            .push_bind(record.is_overwhelmed)
            .push_bind(record.is_excited)
            .push_bind(record.job_opportunity_outlook.clone())
            .push_bind(record.automation_risk_perception)
            .push_bind(record.workflow_automation_potential)
            .push_bind(record.org_ai_adoption_level.clone())
            .push_bind(record.org_ai_investment_trend.clone())
            .push_bind(record.org_has_ai_policy)
            .push_bind(record.org_ai_sustainability_use)
            .push_bind(record.wage_premium_ai_skills)
            .push_bind(record.productivity_change)
            .push_bind(record.wage_premium_pct);
    });

    builder.build().execute(&mut **tx).await?;
    Ok(())
}

/// Re-queries the sink after a write. A row-count mismatch becomes a warning
/// on the report rather than an error.
pub async fn verify_load(pool: &DbPool, expected_rows: usize, mode: WriteMode) -> Result<LoadReport> {
    let count_sql = format!("SELECT COUNT(*) FROM {}", TABLE_NAME);
    let loaded_rows: i64 = sqlx::query_scalar(&count_sql).fetch_one(pool).await?;

    let ai_users_sql = format!("SELECT COUNT(*) FROM {} WHERE is_ai_user = TRUE", TABLE_NAME);
    let ai_users: i64 = sqlx::query_scalar(&ai_users_sql).fetch_one(pool).await?;

    let productivity_sql = format!(
        "SELECT AVG(productivity_change) FROM {} WHERE productivity_change IS NOT NULL",
        TABLE_NAME
    );
    let avg_productivity_change: Option<f64> =
        sqlx::query_scalar(&productivity_sql).fetch_one(pool).await?;

    let adoption_rate = (loaded_rows > 0).then(|| ai_users as f64 * 100.0 / loaded_rows as f64);

    let mut warnings = Vec::new();
    if loaded_rows != expected_rows as i64 {
        warn!(
            expected = expected_rows,
            actual = loaded_rows,
            "Row count mismatch after load"
        );
        warnings.push(format!(
            "expected {} rows in {}, found {}",
            expected_rows, TABLE_NAME, loaded_rows
        ));
    } else {
        info!(rows = loaded_rows, ai_users, ?adoption_rate, "Verified load");
    }

    Ok(LoadReport {
        mode,
        expected_rows,
        loaded_rows,
        ai_users,
        adoption_rate,
        avg_productivity_change,
        warnings,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOutcome {
    Applied,
    /// The schema file was rejected; the built-in table definition was used.
    FellBack { reason: String },
}

/// Reads a schema file, failing with a configuration error when it is absent.
pub fn read_schema_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(EtlError::Config(format!(
            "schema file not found: {}",
            path.display()
        )));
    }
    Ok(fs::read_to_string(path)?)
}

/// Applies a multi-statement schema script. When the script is rejected the
/// table is recreated from [`create_table_sql`].
pub async fn apply_schema(pool: &DbPool, schema_sql: &str) -> Result<SchemaOutcome> {
    match sqlx::raw_sql(schema_sql).execute(pool).await {
        Ok(_) => {
            info!("Schema applied");
            Ok(SchemaOutcome::Applied)
        }
        Err(err) => {
            let reason = err.to_string();
            warn!(error = %reason, "Schema script rejected; creating base table");
            prepare_table(pool, WriteMode::Replace).await?;
            Ok(SchemaOutcome::FellBack { reason })
        }
    }
}
