use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::random::RandomSource;
use crate::schema::{self, parse_float, string_values};

/// Canonicalization applied to one column.
#[derive(Debug, Clone, Copy)]
pub enum Transform {
    /// Lower-cased, trimmed truthy/falsy literals; anything else is `false`.
    Boolean,
    /// Lower-cased, trimmed lookup through `mapping`.
    Categorical {
        mapping: &'static [(&'static str, &'static str)],
        fallback: CategoryFallback,
    },
    /// Saturating clamp into `[min, max]`.
    Clamp { min: f64, max: f64, integer: bool },
    Text,
    Integer,
    Float,
}

/// What an unmapped categorical value becomes. Fields differ on purpose:
/// education keeps unmapped values, the others collapse to a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFallback {
    Constant(&'static str),
    PassThrough,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub transform: Transform,
}

const TRUE_LITERALS: &[&str] = &["true", "1", "yes", "t"];
const FALSE_LITERALS: &[&str] = &["false", "0", "no", "f"];

const USAGE_FREQUENCY_MAP: &[(&str, &str)] = &[
    ("never", "Never"),
    ("rarely", "Rarely"),
    ("monthly", "Monthly"),
    ("weekly", "Weekly"),
    ("daily", "Daily"),
];

const EDUCATION_MAP: &[(&str, &str)] = &[
    ("high school", "High School"),
    ("some college", "Some College"),
    ("bachelor", "Bachelor"),
    ("bachelors", "Bachelor"),
    ("master", "Master"),
    ("masters", "Master"),
    ("phd", "PhD"),
    ("doctorate", "PhD"),
];

const JOB_ROLE_MAP: &[(&str, &str)] = &[
    ("ic", "Individual Contributor"),
    ("individual contributor", "Individual Contributor"),
    ("manager", "Manager"),
    ("executive", "Executive"),
    ("exec", "Executive"),
    ("other", "Other"),
];

pub static FIELD_RULES: &[FieldRule] = &[
    FieldRule { field: schema::RESPONDENT_ID, transform: Transform::Text },
    FieldRule { field: schema::AGE_GROUP, transform: Transform::Text },
    FieldRule {
        field: schema::EDUCATION_LEVEL,
        transform: Transform::Categorical {
            mapping: EDUCATION_MAP,
            fallback: CategoryFallback::PassThrough,
        },
    },
    FieldRule { field: schema::INCOME_LEVEL, transform: Transform::Float },
    FieldRule { field: schema::INDUSTRY_SECTOR, transform: Transform::Text },
    FieldRule {
        field: schema::JOB_ROLE,
        transform: Transform::Categorical {
            mapping: JOB_ROLE_MAP,
            fallback: CategoryFallback::Constant("Other"),
        },
    },
    FieldRule { field: schema::COMPANY_SIZE, transform: Transform::Text },
    FieldRule { field: schema::YEARS_EXPERIENCE, transform: Transform::Integer },
    FieldRule { field: schema::IS_AI_USER, transform: Transform::Boolean },
    FieldRule {
        field: schema::AI_USAGE_FREQUENCY,
        transform: Transform::Categorical {
            mapping: USAGE_FREQUENCY_MAP,
            fallback: CategoryFallback::Constant("Rarely"),
        },
    },
    FieldRule {
        field: schema::AI_COMFORT_LEVEL,
        transform: Transform::Clamp { min: 1.0, max: 5.0, integer: true },
    },
    FieldRule { field: schema::AI_TRAINING_RECEIVED, transform: Transform::Boolean },
    FieldRule { field: schema::AI_TOOLS_USED_COUNT, transform: Transform::Integer },
    FieldRule {
        field: schema::AI_AGENTS_AWARENESS_LEVEL,
        transform: Transform::Clamp { min: 1.0, max: 5.0, integer: true },
    },
    FieldRule { field: schema::IS_WORRIED, transform: Transform::Boolean },
    FieldRule { field: schema::IS_HOPEFUL, transform: Transform::Boolean },
    FieldRule { field: schema::IS_OVERWHELMED, transform: Transform::Boolean },
    FieldRule { field: schema::IS_EXCITED, transform: Transform::Boolean },
    FieldRule { field: schema::JOB_OPPORTUNITY_OUTLOOK, transform: Transform::Text },
    FieldRule {
        field: schema::AUTOMATION_RISK_PERCEPTION,
        transform: Transform::Clamp { min: 1.0, max: 10.0, integer: true },
    },
    FieldRule {
        field: schema::WORKFLOW_AUTOMATION_POTENTIAL,
        transform: Transform::Clamp { min: 1.0, max: 5.0, integer: true },
    },
    FieldRule { field: schema::ORG_AI_ADOPTION_LEVEL, transform: Transform::Text },
    FieldRule { field: schema::ORG_AI_INVESTMENT_TREND, transform: Transform::Text },
    FieldRule { field: schema::ORG_HAS_AI_POLICY, transform: Transform::Boolean },
    FieldRule { field: schema::ORG_AI_SUSTAINABILITY_USE, transform: Transform::Boolean },
    FieldRule { field: schema::WAGE_PREMIUM_AI_SKILLS, transform: Transform::Float },
    FieldRule {
        field: schema::PRODUCTIVITY_CHANGE,
        transform: Transform::Clamp { min: -100.0, max: 100.0, integer: false },
    },
];

/// Maximum plausible years of experience per age bracket (bracket upper age
/// minus a working start age of 15; `50+` is capped at 70).
pub const MAX_EXPERIENCE_BY_AGE: &[(&str, i64)] = &[("18-29", 14), ("30-49", 34), ("50+", 55)];

/// Median above which raw wage premiums are read as currency amounts.
pub const CURRENCY_MEDIAN_THRESHOLD: f64 = 1000.0;
pub const PREMIUM_PCT_MIN: f64 = -100.0;
pub const PREMIUM_PCT_MAX: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WagePremiumUnit {
    Currency,
    Percentage,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationSummary {
    pub normalized_fields: Vec<String>,
    /// Records whose experience was resampled, keyed by age bracket.
    pub experience_repairs: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wage_premium_unit: Option<WagePremiumUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wage_premium_median: Option<f64>,
}

impl NormalizationSummary {
    pub fn total_experience_repairs(&self) -> usize {
        self.experience_repairs.values().sum()
    }
}

/// Runs the full normalization pass over a reconciled frame. Individual bad
/// values never fail the pass; they are mapped, clamped or resampled.
pub fn normalize(
    df: &DataFrame,
    rng: &mut RandomSource,
) -> PolarsResult<(DataFrame, NormalizationSummary)> {
    let mut summary = NormalizationSummary::default();
    let mut output = apply_field_rules(df, &mut summary)?;

    summary.experience_repairs = repair_age_experience(&mut output, rng)?;

    if let Some((unit, median)) = detect_wage_premium_unit(&output)? {
        summary.wage_premium_unit = Some(unit);
        summary.wage_premium_median = Some(median);
        apply_wage_premium(&mut output, unit)?;
    }

    Ok((output, summary))
}

/// Applies [`FIELD_RULES`] to every rule field present in the frame.
pub fn apply_field_rules(
    df: &DataFrame,
    summary: &mut NormalizationSummary,
) -> PolarsResult<DataFrame> {
    let mut output = df.clone();
    for rule in FIELD_RULES {
        if df.column(rule.field).is_err() {
            continue;
        }
        let raw = string_values(df, rule.field)?;
        let series = apply_transform(rule.field, rule.transform, &raw);
        output.with_column(series)?;
        debug!(column = rule.field, transform = ?rule.transform, "Normalized column");
        summary.normalized_fields.push(rule.field.to_string());
    }
    Ok(output)
}

pub fn apply_transform(name: &str, transform: Transform, raw: &[Option<String>]) -> Series {
    let name: PlSmallStr = name.into();
    match transform {
        Transform::Boolean => {
            let values: Vec<bool> = raw.iter().map(|value| normalize_bool(value.as_deref())).collect();
            Series::new(name, values)
        }
        Transform::Categorical { mapping, fallback } => {
            let values: Vec<Option<String>> = raw
                .iter()
                .map(|value| normalize_category(value.as_deref(), mapping, fallback))
                .collect();
            Series::new(name, values)
        }
        Transform::Clamp { min, max, integer } => {
            let clamped = raw
                .iter()
                .map(|value| value.as_deref().and_then(parse_float).map(|v| v.clamp(min, max)));
            if integer {
                let values: Vec<Option<i64>> = clamped.map(|value| value.map(|v| v.round() as i64)).collect();
                Series::new(name, values)
            } else {
                let values: Vec<Option<f64>> = clamped.collect();
                Series::new(name, values)
            }
        }
        Transform::Text => {
            let values: Vec<Option<String>> = raw
                .iter()
                .map(|value| value.as_deref().map(|v| v.trim().to_string()))
                .collect();
            Series::new(name, values)
        }
        Transform::Integer => {
            let values: Vec<Option<i64>> = raw
                .iter()
                .map(|value| value.as_deref().and_then(parse_float).map(|v| v.round() as i64))
                .collect();
            Series::new(name, values)
        }
        Transform::Float => {
            let values: Vec<Option<f64>> = raw
                .iter()
                .map(|value| value.as_deref().and_then(parse_float))
                .collect();
            Series::new(name, values)
        }
    }
}

/// Recognized truthy/falsy literal, after lower-casing and trimming.
pub fn bool_literal(raw: &str) -> Option<bool> {
    let cleaned = raw.trim().to_lowercase();
    if TRUE_LITERALS.contains(&cleaned.as_str()) {
        Some(true)
    } else if FALSE_LITERALS.contains(&cleaned.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Unrecognized and missing values are `false`; this default is lossy.
pub fn normalize_bool(raw: Option<&str>) -> bool {
    raw.and_then(bool_literal).unwrap_or(false)
}

pub fn normalize_category(
    raw: Option<&str>,
    mapping: &[(&str, &str)],
    fallback: CategoryFallback,
) -> Option<String> {
    let cleaned = raw.map(|value| value.trim().to_lowercase());
    let mapped = cleaned.as_deref().and_then(|key| {
        mapping
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| to.to_string())
    });

    match (mapped, fallback) {
        (Some(value), _) => Some(value),
        (None, CategoryFallback::Constant(constant)) => Some(constant.to_string()),
        (None, CategoryFallback::PassThrough) => cleaned,
    }
}

pub fn max_experience_for(age_group: &str) -> Option<i64> {
    MAX_EXPERIENCE_BY_AGE
        .iter()
        .find(|(bracket, _)| *bracket == age_group)
        .map(|(_, max)| *max)
}

/// Resamples `years_experience` uniformly in `[0, max]` for every record
/// whose experience exceeds its age bracket's maximum. Returns repair counts
/// per bracket.
pub fn repair_age_experience(
    df: &mut DataFrame,
    rng: &mut RandomSource,
) -> PolarsResult<BTreeMap<String, usize>> {
    let mut repairs = BTreeMap::new();
    if df.column(schema::AGE_GROUP).is_err() || df.column(schema::YEARS_EXPERIENCE).is_err() {
        return Ok(repairs);
    }

    let age_groups = string_values(df, schema::AGE_GROUP)?;
    let mut experience: Vec<Option<i64>> = df
        .column(schema::YEARS_EXPERIENCE)?
        .cast(&DataType::Int64)?
        .i64()?
        .into_iter()
        .collect();

    for (age_group, years) in age_groups.iter().zip(experience.iter_mut()) {
        let (Some(age_group), Some(current)) = (age_group.as_deref(), *years) else {
            continue;
        };
        let Some(max) = max_experience_for(age_group) else {
            continue;
        };
        if current > max {
            *years = Some(rng.int_inclusive(0, max));
            *repairs.entry(age_group.to_string()).or_insert(0) += 1;
        }
    }

    for (bracket, count) in &repairs {
        info!(age_group = %bracket, repaired = count, "Resampled implausible experience");
    }

    df.with_column(Series::new(schema::YEARS_EXPERIENCE.into(), experience))?;
    Ok(repairs)
}

/// One decision for the whole batch: currency when the median raw premium
/// exceeds [`CURRENCY_MEDIAN_THRESHOLD`]. `None` when the column is absent
/// or has no values.
pub fn detect_wage_premium_unit(df: &DataFrame) -> PolarsResult<Option<(WagePremiumUnit, f64)>> {
    let Ok(column) = df.column(schema::WAGE_PREMIUM_AI_SKILLS) else {
        return Ok(None);
    };
    let values = column.cast(&DataType::Float64)?;
    let Some(median) = values.f64()?.median() else {
        return Ok(None);
    };

    let unit = if median > CURRENCY_MEDIAN_THRESHOLD {
        WagePremiumUnit::Currency
    } else {
        WagePremiumUnit::Percentage
    };
    info!(?unit, median, "Detected wage premium unit");
    Ok(Some((unit, median)))
}

/// Derives `wage_premium_pct` from the raw premium using the batch-level unit.
pub fn apply_wage_premium(df: &mut DataFrame, unit: WagePremiumUnit) -> PolarsResult<()> {
    let raw: Vec<Option<f64>> = df
        .column(schema::WAGE_PREMIUM_AI_SKILLS)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect();

    let pct: Vec<Option<f64>> = match unit {
        WagePremiumUnit::Percentage => raw,
        WagePremiumUnit::Currency => match df.column(schema::INCOME_LEVEL) {
            Ok(income_column) => {
                let income: Vec<Option<f64>> = income_column
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .collect();
                raw.iter()
                    .zip(income)
                    .map(|(premium, income)| match (premium, income) {
                        (Some(premium), Some(income)) => premium_pct_of_income(*premium, income),
                        _ => None,
                    })
                    .collect()
            }
            Err(_) => raw
                .iter()
                .map(|premium| premium.map(|value| (value / 100_000.0 * 50.0).clamp(0.0, 100.0)))
                .collect(),
        },
    };

    df.with_column(Series::new(schema::WAGE_PREMIUM_PCT.into(), pct))?;
    Ok(())
}

/// `clip((premium - income) / income * 100, -100, 200)`.
pub fn premium_pct_of_income(premium: f64, income: f64) -> Option<f64> {
    let pct = (premium - income) / income * 100.0;
    if pct.is_nan() {
        None
    } else {
        Some(pct.clamp(PREMIUM_PCT_MIN, PREMIUM_PCT_MAX))
    }
}
