use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::schema;

/// How a benchmark's value is computed from the normalized frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metric {
    /// Percentage of records where a boolean field is true.
    Rate { field: String },
    /// Rate of `outcome` among records with `group` true, minus the rate
    /// among records with `group` false, in percentage points.
    RateLift { outcome: String, group: String },
    /// Mean of the non-null values of a numeric field.
    Mean { field: String },
}

impl Metric {
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Metric::Rate { field } | Metric::Mean { field } => vec![field.as_str()],
            Metric::RateLift { outcome, group } => vec![outcome.as_str(), group.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub name: String,
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub source: String,
    pub metric: Metric,
}

impl Benchmark {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && self.low <= value && value <= self.high
    }
}

#[derive(Debug, Deserialize)]
struct BenchmarkFile {
    #[serde(rename = "benchmark")]
    benchmarks: Vec<Benchmark>,
}

pub fn default_benchmarks() -> Vec<Benchmark> {
    vec![
        Benchmark {
            name: "ai_adoption_rate".to_string(),
            low: 12.0,
            high: 20.0,
            source: "McKinsey 2024".to_string(),
            metric: Metric::Rate {
                field: schema::IS_AI_USER.to_string(),
            },
        },
        Benchmark {
            name: "worry_sentiment".to_string(),
            low: 45.0,
            high: 60.0,
            source: "Pew Research 2023".to_string(),
            metric: Metric::Rate {
                field: schema::IS_WORRIED.to_string(),
            },
        },
        Benchmark {
            name: "policy_adoption".to_string(),
            low: 25.0,
            high: 45.0,
            source: "Deloitte 2024".to_string(),
            metric: Metric::Rate {
                field: schema::ORG_HAS_AI_POLICY.to_string(),
            },
        },
        Benchmark {
            name: "training_effectiveness".to_string(),
            low: 20.0,
            high: 30.0,
            source: "MIT/IBM 2024".to_string(),
            metric: Metric::RateLift {
                outcome: schema::IS_AI_USER.to_string(),
                group: schema::AI_TRAINING_RECEIVED.to_string(),
            },
        },
    ]
}

/// Reads a benchmark table from TOML:
///
/// ```toml
/// [[benchmark]]
/// name = "ai_adoption_rate"
/// low = 12.0
/// high = 20.0
/// source = "McKinsey 2024"
/// metric = { kind = "rate", field = "is_ai_user" }
/// ```
pub fn load_benchmarks(path: &Path) -> Result<Vec<Benchmark>> {
    let contents = fs::read_to_string(path)?;
    parse_benchmarks(&contents)
}

pub fn parse_benchmarks(contents: &str) -> Result<Vec<Benchmark>> {
    let file: BenchmarkFile = toml::from_str(contents)?;
    Ok(file.benchmarks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BenchmarkStatus {
    Pass,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub value: f64,
    pub benchmark: BenchmarkRange,
    pub status: BenchmarkStatus,
    pub source: String,
}

pub type ValidationReport = BTreeMap<String, BenchmarkResult>;

/// Compares every benchmark whose fields exist in the frame. Benchmarks with
/// a missing field are left out of the report; out-of-range values are
/// reported as [`BenchmarkStatus::Warning`] and never fail the call.
pub fn validate_against_benchmarks(
    df: &DataFrame,
    benchmarks: &[Benchmark],
) -> PolarsResult<ValidationReport> {
    let mut report = ValidationReport::new();

    for benchmark in benchmarks {
        if benchmark
            .metric
            .fields()
            .iter()
            .any(|field| df.column(field).is_err())
        {
            continue;
        }

        let value = compute_metric(df, &benchmark.metric)?;
        let status = if benchmark.contains(value) {
            BenchmarkStatus::Pass
        } else {
            BenchmarkStatus::Warning
        };

        match status {
            BenchmarkStatus::Pass => info!(
                benchmark = %benchmark.name,
                value,
                low = benchmark.low,
                high = benchmark.high,
                "Benchmark within range"
            ),
            BenchmarkStatus::Warning => warn!(
                benchmark = %benchmark.name,
                value,
                low = benchmark.low,
                high = benchmark.high,
                "Benchmark outside range"
            ),
        }

        report.insert(
            benchmark.name.clone(),
            BenchmarkResult {
                value,
                benchmark: BenchmarkRange {
                    low: benchmark.low,
                    high: benchmark.high,
                },
                status,
                source: benchmark.source.clone(),
            },
        );
    }

    Ok(report)
}

pub fn compute_metric(df: &DataFrame, metric: &Metric) -> PolarsResult<f64> {
    match metric {
        Metric::Rate { field } => {
            let values = bool_values(df, field)?;
            Ok(rate(values.iter().copied()))
        }
        Metric::RateLift { outcome, group } => {
            let outcomes = bool_values(df, outcome)?;
            let groups = bool_values(df, group)?;
            let pairs: Vec<(bool, bool)> = outcomes.into_iter().zip(groups).collect();
            let in_group = rate(pairs.iter().filter(|(_, g)| *g).map(|(o, _)| *o));
            let out_group = rate(pairs.iter().filter(|(_, g)| !*g).map(|(o, _)| *o));
            Ok(in_group - out_group)
        }
        Metric::Mean { field } => {
            let column = df.column(field)?.cast(&DataType::Float64)?;
            Ok(column.f64()?.mean().unwrap_or(f64::NAN))
        }
    }
}

/// Percentage of `true` values; NaN for an empty input.
fn rate(values: impl Iterator<Item = bool>) -> f64 {
    let (hits, total) = values.fold((0usize, 0usize), |(hits, total), value| {
        (hits + usize::from(value), total + 1)
    });
    if total == 0 {
        f64::NAN
    } else {
        hits as f64 * 100.0 / total as f64
    }
}

/// Boolean values with nulls read as `false`, matching normalization.
fn bool_values(df: &DataFrame, field: &str) -> PolarsResult<Vec<bool>> {
    Ok(df
        .column(field)?
        .bool()?
        .into_iter()
        .map(|value| value.unwrap_or(false))
        .collect())
}
