use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::schema;

#[derive(Debug, Clone, Serialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_values: BTreeMap<String, usize>,
    pub duplicate_respondents: usize,
    pub data_types: BTreeMap<String, String>,
}

impl DataQualityReport {
    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }
}

/// Structural metrics over a frame. Pure; never fails.
pub fn generate_data_quality_report(df: &DataFrame) -> DataQualityReport {
    let mut missing_values = BTreeMap::new();
    let mut data_types = BTreeMap::new();
    for column in df.get_columns() {
        missing_values.insert(column.name().to_string(), column.null_count());
        data_types.insert(column.name().to_string(), column.dtype().to_string());
    }

    let report = DataQualityReport {
        total_rows: df.height(),
        total_columns: df.width(),
        missing_values,
        duplicate_respondents: count_duplicate_ids(df),
        data_types,
    };

    info!(
        rows = report.total_rows,
        columns = report.total_columns,
        duplicate_respondents = report.duplicate_respondents,
        "Data quality report"
    );
    let missing = report.total_missing();
    if missing > 0 {
        for (column, count) in report.missing_values.iter().filter(|(_, count)| **count > 0) {
            warn!(column = %column, missing = count, "Missing values");
        }
    }

    report
}

/// Rows whose identifier already appeared earlier in the frame; two records
/// sharing one identifier count as one duplicate. Null identifiers are not
/// counted.
pub fn count_duplicate_ids(df: &DataFrame) -> usize {
    let Ok(ids) = schema::string_values(df, schema::RESPONDENT_ID) else {
        return 0;
    };

    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter()
        .flatten()
        .filter(|id| !seen.insert(id.clone()))
        .count()
}
