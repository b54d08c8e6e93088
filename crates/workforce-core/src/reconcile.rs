//! Maps heterogeneous source columns onto the Respondent Record schema.
//!
//! Every target column is resolved in one of three ways: coalesced from the
//! source aliases present, synthesized as sequential identifiers, or
//! filled from a [`FillRule`]. Filled columns are simulated data for
//! demonstration runs; they are logged at `warn` and listed in
//! [`Reconciliation::synthesized`] so they can never pass for survey answers.

use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::random::RandomSource;
use crate::schema::{self, string_values, ColumnSpec};

/// How a target column is produced when none of its aliases is present.
#[derive(Debug, Clone, Copy)]
pub enum FillRule {
    Text(&'static str),
    Float(f64),
    /// Bernoulli draw with the given probability of `true`.
    Chance(f64),
    IntRange { low: i64, high: i64 },
    FloatRange { low: f64, high: f64 },
    Uniform(&'static [&'static str]),
    Weighted(&'static [(&'static str, f64)]),
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSource {
    pub target: &'static str,
    /// Source column names in priority order.
    pub aliases: &'static [&'static str],
    pub fill: FillRule,
}

const AGE_BRACKETS: &[&str] = &["18-29", "30-49", "50+"];
const EDUCATION_LEVELS: &[&str] = &["High School", "Some College", "Bachelor", "Master", "PhD"];
const COMPANY_SIZES: &[&str] = &["1-50", "51-200", "201-1000", "1000+"];
const USAGE_FREQUENCIES: &[&str] = &["Never", "Rarely", "Monthly", "Weekly", "Daily"];
const OUTLOOKS: &[&str] = &["More", "Same", "Fewer", "Unsure"];
const ADOPTION_STAGES: &[&str] = &["Not Started", "Exploring", "Piloting", "Scaling", "Advanced"];
const INVESTMENT_TRENDS: &[(&str, f64)] =
    &[("Decreasing", 0.15), ("Maintaining", 0.35), ("Increasing", 0.50)];

pub const ID_PREFIX: &str = "RESP_";
pub const ID_WIDTH: usize = 5;

/// Source resolution for every column except `respondent_id`, which is
/// either copied or generated.
pub static COLUMN_SOURCES: &[ColumnSource] = &[
    ColumnSource {
        target: schema::AGE_GROUP,
        aliases: &["age_bracket", "age_group"],
        fill: FillRule::Uniform(AGE_BRACKETS),
    },
    ColumnSource {
        target: schema::EDUCATION_LEVEL,
        aliases: &["education_level"],
        fill: FillRule::Uniform(EDUCATION_LEVELS),
    },
    ColumnSource {
        target: schema::INCOME_LEVEL,
        aliases: &["income_level"],
        fill: FillRule::Float(50_000.0),
    },
    ColumnSource {
        target: schema::INDUSTRY_SECTOR,
        aliases: &["industry_sector"],
        fill: FillRule::Text("Unknown"),
    },
    ColumnSource {
        target: schema::JOB_ROLE,
        aliases: &["job_type", "job_role"],
        fill: FillRule::Text("Other"),
    },
    ColumnSource {
        target: schema::COMPANY_SIZE,
        aliases: &["company_size"],
        fill: FillRule::Uniform(COMPANY_SIZES),
    },
    ColumnSource {
        target: schema::YEARS_EXPERIENCE,
        aliases: &["years_experience"],
        fill: FillRule::IntRange { low: 0, high: 29 },
    },
    ColumnSource {
        target: schema::IS_AI_USER,
        aliases: &["has_used_ai_on_job", "is_ai_user"],
        fill: FillRule::Chance(0.15),
    },
    ColumnSource {
        target: schema::AI_USAGE_FREQUENCY,
        aliases: &["ai_use_frequency", "ai_usage_frequency"],
        fill: FillRule::Uniform(USAGE_FREQUENCIES),
    },
    ColumnSource {
        target: schema::AI_COMFORT_LEVEL,
        aliases: &["ai_comfort_level"],
        fill: FillRule::IntRange { low: 1, high: 5 },
    },
    ColumnSource {
        target: schema::AI_TRAINING_RECEIVED,
        aliases: &["ai_training_received"],
        fill: FillRule::Chance(0.30),
    },
    ColumnSource {
        target: schema::AI_TOOLS_USED_COUNT,
        aliases: &["ai_tools_used_count"],
        fill: FillRule::IntRange { low: 0, high: 5 },
    },
    ColumnSource {
        target: schema::AI_AGENTS_AWARENESS_LEVEL,
        aliases: &["ai_agents_awareness_level"],
        fill: FillRule::IntRange { low: 1, high: 5 },
    },
    ColumnSource {
        target: schema::IS_WORRIED,
        aliases: &["is_worried"],
        fill: FillRule::Chance(0.55),
    },
    ColumnSource {
        target: schema::IS_HOPEFUL,
        aliases: &["is_hopeful"],
        fill: FillRule::Chance(0.40),
    },
    ColumnSource {
        target: schema::IS_OVERWHELMED,
        aliases: &["is_overwhelmed"],
        fill: FillRule::Chance(0.35),
    },
    ColumnSource {
        target: schema::IS_EXCITED,
        aliases: &["is_excited"],
        fill: FillRule::Chance(0.25),
    },
    ColumnSource {
        target: schema::JOB_OPPORTUNITY_OUTLOOK,
        aliases: &["job_opportunity_outlook"],
        fill: FillRule::Uniform(OUTLOOKS),
    },
    ColumnSource {
        target: schema::AUTOMATION_RISK_PERCEPTION,
        aliases: &["automation_risk_perception"],
        fill: FillRule::IntRange { low: 1, high: 10 },
    },
    ColumnSource {
        target: schema::WORKFLOW_AUTOMATION_POTENTIAL,
        aliases: &["workflow_automation_potential"],
        fill: FillRule::IntRange { low: 1, high: 5 },
    },
    ColumnSource {
        target: schema::ORG_AI_ADOPTION_LEVEL,
        aliases: &["org_ai_adoption_level"],
        fill: FillRule::Uniform(ADOPTION_STAGES),
    },
    ColumnSource {
        target: schema::ORG_AI_INVESTMENT_TREND,
        aliases: &["org_ai_investment_trend"],
        fill: FillRule::Weighted(INVESTMENT_TRENDS),
    },
    ColumnSource {
        target: schema::ORG_HAS_AI_POLICY,
        aliases: &["org_has_ai_policy"],
        fill: FillRule::Chance(0.35),
    },
    ColumnSource {
        target: schema::ORG_AI_SUSTAINABILITY_USE,
        aliases: &["org_ai_sustainability_use"],
        fill: FillRule::Chance(0.25),
    },
    ColumnSource {
        target: schema::WAGE_PREMIUM_AI_SKILLS,
        aliases: &["wage_premium_ai_skills"],
        fill: FillRule::FloatRange { low: 0.0, high: 25_000.0 },
    },
    ColumnSource {
        target: schema::PRODUCTIVITY_CHANGE,
        aliases: &["self_reported_productivity_change_pct", "productivity_change"],
        fill: FillRule::FloatRange { low: -10.0, high: 30.0 },
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct AliasUse {
    pub target: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedColumn {
    pub column: String,
    pub rule: String,
}

#[derive(Debug)]
pub struct Reconciliation {
    pub frame: DataFrame,
    pub aliased: Vec<AliasUse>,
    pub synthesized: Vec<SynthesizedColumn>,
    pub generated_ids: bool,
}

pub fn column_source(target: &str) -> Option<&'static ColumnSource> {
    COLUMN_SOURCES.iter().find(|source| source.target == target)
}

/// Produces a frame with exactly the source columns of the Respondent Record,
/// in table order. Source columns that map to no target are dropped.
pub fn reconcile(raw: &DataFrame, rng: &mut RandomSource) -> PolarsResult<Reconciliation> {
    let height = raw.height();
    let mut columns: Vec<Column> = Vec::with_capacity(COLUMN_SOURCES.len() + 1);
    let mut aliased = Vec::new();
    let mut synthesized = Vec::new();

    let generated_ids = raw.column(schema::RESPONDENT_ID).is_err();
    if generated_ids {
        columns.push(generate_respondent_ids(height).into());
        info!(rows = height, "Generated respondent identifiers");
    } else {
        let mut ids = string_values(raw, schema::RESPONDENT_ID)?;
        let mut taken: HashSet<String> = ids.iter().flatten().cloned().collect();
        let mut position = 0usize;
        let mut filled = 0usize;
        for id in ids.iter_mut().filter(|id| id.is_none()) {
            // Tokens already used by another row are skipped.
            let token = loop {
                position += 1;
                let candidate = respondent_token(position);
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            *id = Some(token);
            filled += 1;
        }
        if filled > 0 {
            warn!(rows = filled, "Generated identifiers for rows without one");
        }
        columns.push(Series::new(schema::RESPONDENT_ID.into(), ids).into());
        info!("Respondent identifiers already present");
    }

    for spec in schema::source_columns() {
        if spec.name == schema::RESPONDENT_ID {
            continue;
        }
        let Some(source) = column_source(spec.name) else {
            continue;
        };

        let present: Vec<&str> = source
            .aliases
            .iter()
            .copied()
            .filter(|alias| raw.column(alias).is_ok())
            .collect();

        match present.split_first() {
            Some((&alias, fallbacks)) => {
                let values = coalesce_aliases(raw, alias, fallbacks)?;
                columns.push(Series::new(spec.name.into(), values).into());
                if alias != spec.name {
                    info!(column = spec.name, source = alias, "Mapped aliased column");
                }
                if !fallbacks.is_empty() {
                    info!(column = spec.name, sources = ?present, "Coalesced aliased columns row by row");
                }
                aliased.push(AliasUse {
                    target: spec.name.to_string(),
                    source: alias.to_string(),
                });
            }
            None => {
                let series = synthesize_column(spec, source.fill, height, rng);
                warn!(
                    column = spec.name,
                    rule = ?source.fill,
                    rows = height,
                    "No source column; filling with simulated values"
                );
                synthesized.push(SynthesizedColumn {
                    column: spec.name.to_string(),
                    rule: format!("{:?}", source.fill),
                });
                columns.push(series.into());
            }
        }
    }

    let dropped: Vec<String> = raw
        .get_column_names()
        .into_iter()
        .filter(|name| {
            name.as_str() != schema::RESPONDENT_ID
                && !COLUMN_SOURCES
                    .iter()
                    .any(|source| source.aliases.iter().any(|alias| *alias == name.as_str()))
        })
        .map(|name| name.to_string())
        .collect();
    if !dropped.is_empty() {
        info!(columns = ?dropped, "Dropping source columns outside the target schema");
    }

    Ok(Reconciliation {
        frame: DataFrame::new(columns)?,
        aliased,
        synthesized,
        generated_ids,
    })
}

/// `RESP_00001`, `RESP_00002`, ... one per row, starting at 1.
pub fn generate_respondent_ids(height: usize) -> Series {
    let ids: Vec<String> = (1..=height).map(respondent_token).collect();
    Series::new(schema::RESPONDENT_ID.into(), ids)
}

/// Takes each row from the first alias that has a value. Files merged with
/// different headers leave the other aliases null on their rows.
fn coalesce_aliases(
    raw: &DataFrame,
    primary: &str,
    fallbacks: &[&str],
) -> PolarsResult<Vec<Option<String>>> {
    let mut values = string_values(raw, primary)?;
    for alias in fallbacks {
        if values.iter().all(Option::is_some) {
            break;
        }
        let other = string_values(raw, alias)?;
        for (value, candidate) in values.iter_mut().zip(other) {
            if value.is_none() {
                *value = candidate;
            }
        }
    }
    Ok(values)
}

fn respondent_token(position: usize) -> String {
    format!("{ID_PREFIX}{position:0width$}", width = ID_WIDTH)
}

fn synthesize_column(
    spec: &ColumnSpec,
    fill: FillRule,
    height: usize,
    rng: &mut RandomSource,
) -> Series {
    let name: PlSmallStr = spec.name.into();
    match fill {
        FillRule::Text(value) => Series::new(name, vec![value; height]),
        FillRule::Float(value) => Series::new(name, vec![value; height]),
        FillRule::Chance(probability) => {
            let values: Vec<bool> = (0..height).map(|_| rng.chance(probability)).collect();
            Series::new(name, values)
        }
        FillRule::IntRange { low, high } => {
            let values: Vec<i64> = (0..height).map(|_| rng.int_inclusive(low, high)).collect();
            Series::new(name, values)
        }
        FillRule::FloatRange { low, high } => {
            let values: Vec<f64> = (0..height).map(|_| rng.float_between(low, high)).collect();
            Series::new(name, values)
        }
        FillRule::Uniform(options) => {
            let values: Vec<Option<&str>> = (0..height)
                .map(|_| rng.uniform_pick(options).copied())
                .collect();
            Series::new(name, values)
        }
        FillRule::Weighted(options) => {
            let values: Vec<Option<&str>> = (0..height)
                .map(|_| rng.weighted_pick(options).copied())
                .collect();
            Series::new(name, values)
        }
    }
}
