use std::collections::HashMap;

use once_cell::sync::Lazy;
use polars::prelude::*;

use crate::normalize::bool_literal;

pub const RESPONDENT_ID: &str = "respondent_id";
pub const AGE_GROUP: &str = "age_group";
pub const EDUCATION_LEVEL: &str = "education_level";
pub const INCOME_LEVEL: &str = "income_level";
pub const INDUSTRY_SECTOR: &str = "industry_sector";
pub const JOB_ROLE: &str = "job_role";
pub const COMPANY_SIZE: &str = "company_size";
pub const YEARS_EXPERIENCE: &str = "years_experience";
pub const IS_AI_USER: &str = "is_ai_user";
pub const AI_USAGE_FREQUENCY: &str = "ai_usage_frequency";
pub const AI_COMFORT_LEVEL: &str = "ai_comfort_level";
pub const AI_TRAINING_RECEIVED: &str = "ai_training_received";
pub const AI_TOOLS_USED_COUNT: &str = "ai_tools_used_count";
pub const AI_AGENTS_AWARENESS_LEVEL: &str = "ai_agents_awareness_level";
pub const IS_WORRIED: &str = "is_worried";
pub const IS_HOPEFUL: &str = "is_hopeful";
pub const IS_OVERWHELMED: &str = "is_overwhelmed";
pub const IS_EXCITED: &str = "is_excited";
pub const JOB_OPPORTUNITY_OUTLOOK: &str = "job_opportunity_outlook";
pub const AUTOMATION_RISK_PERCEPTION: &str = "automation_risk_perception";
pub const WORKFLOW_AUTOMATION_POTENTIAL: &str = "workflow_automation_potential";
pub const ORG_AI_ADOPTION_LEVEL: &str = "org_ai_adoption_level";
pub const ORG_AI_INVESTMENT_TREND: &str = "org_ai_investment_trend";
pub const ORG_HAS_AI_POLICY: &str = "org_has_ai_policy";
pub const ORG_AI_SUSTAINABILITY_USE: &str = "org_ai_sustainability_use";
pub const WAGE_PREMIUM_AI_SKILLS: &str = "wage_premium_ai_skills";
pub const PRODUCTIVITY_CHANGE: &str = "productivity_change";
pub const WAGE_PREMIUM_PCT: &str = "wage_premium_pct";

/// Storage type of a Respondent Record column, both in the cleaned frame and
/// in the `survey_respondents` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ColumnType {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnType::Text => DataType::String,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN DEFAULT FALSE",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
}

const fn column(name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec { name, column_type }
}

/// Respondent Record columns in table order. `wage_premium_pct` is derived
/// during normalization and never read from the source files.
pub static RESPONDENT_COLUMNS: &[ColumnSpec] = &[
    column(RESPONDENT_ID, ColumnType::Text),
    column(AGE_GROUP, ColumnType::Text),
    column(EDUCATION_LEVEL, ColumnType::Text),
    column(INCOME_LEVEL, ColumnType::Float),
    column(INDUSTRY_SECTOR, ColumnType::Text),
    column(JOB_ROLE, ColumnType::Text),
    column(COMPANY_SIZE, ColumnType::Text),
    column(YEARS_EXPERIENCE, ColumnType::Integer),
    column(IS_AI_USER, ColumnType::Boolean),
    column(AI_USAGE_FREQUENCY, ColumnType::Text),
    column(AI_COMFORT_LEVEL, ColumnType::Integer),
    column(AI_TRAINING_RECEIVED, ColumnType::Boolean),
    column(AI_TOOLS_USED_COUNT, ColumnType::Integer),
    column(AI_AGENTS_AWARENESS_LEVEL, ColumnType::Integer),
    column(IS_WORRIED, ColumnType::Boolean),
    column(IS_HOPEFUL, ColumnType::Boolean),
    column(IS_OVERWHELMED, ColumnType::Boolean),
    column(IS_EXCITED, ColumnType::Boolean),
    column(JOB_OPPORTUNITY_OUTLOOK, ColumnType::Text),
    column(AUTOMATION_RISK_PERCEPTION, ColumnType::Integer),
    column(WORKFLOW_AUTOMATION_POTENTIAL, ColumnType::Integer),
    column(ORG_AI_ADOPTION_LEVEL, ColumnType::Text),
    column(ORG_AI_INVESTMENT_TREND, ColumnType::Text),
    column(ORG_HAS_AI_POLICY, ColumnType::Boolean),
    column(ORG_AI_SUSTAINABILITY_USE, ColumnType::Boolean),
    column(WAGE_PREMIUM_AI_SKILLS, ColumnType::Float),
    column(PRODUCTIVITY_CHANGE, ColumnType::Float),
    column(WAGE_PREMIUM_PCT, ColumnType::Float),
];

static COLUMN_INDEX: Lazy<HashMap<&'static str, &'static ColumnSpec>> = Lazy::new(|| {
    RESPONDENT_COLUMNS
        .iter()
        .map(|spec| (spec.name, spec))
        .collect()
});

pub fn column_spec(name: &str) -> Option<&'static ColumnSpec> {
    COLUMN_INDEX.get(name).copied()
}

/// Columns supplied by (or synthesized for) the source data, i.e. everything
/// except derived columns.
pub fn source_columns() -> impl Iterator<Item = &'static ColumnSpec> {
    RESPONDENT_COLUMNS
        .iter()
        .filter(|spec| spec.name != WAGE_PREMIUM_PCT)
}

/// Reads any column as optional strings, casting non-string columns first.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Parses a raw cell as a float, tolerating surrounding whitespace.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// A typed Respondent Record, as written to the sink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RespondentRecord {
    pub respondent_id: String,
    pub age_group: Option<String>,
    pub education_level: Option<String>,
    pub income_level: Option<f64>,
    pub industry_sector: Option<String>,
    pub job_role: Option<String>,
    pub company_size: Option<String>,
    pub years_experience: Option<i64>,
    pub is_ai_user: Option<bool>,
    pub ai_usage_frequency: Option<String>,
    pub ai_comfort_level: Option<i64>,
    pub ai_training_received: Option<bool>,
    pub ai_tools_used_count: Option<i64>,
    pub ai_agents_awareness_level: Option<i64>,
    pub is_worried: Option<bool>,
    pub is_hopeful: Option<bool>,
    pub is_overwhelmed: Option<bool>,
    pub is_excited: Option<bool>,
    pub job_opportunity_outlook: Option<String>,
    pub automation_risk_perception: Option<i64>,
    pub workflow_automation_potential: Option<i64>,
    pub org_ai_adoption_level: Option<String>,
    pub org_ai_investment_trend: Option<String>,
    pub org_has_ai_policy: Option<bool>,
    pub org_ai_sustainability_use: Option<bool>,
    pub wage_premium_ai_skills: Option<f64>,
    pub productivity_change: Option<f64>,
    pub wage_premium_pct: Option<f64>,
}

/// Converts a typed frame into records. Columns missing from the frame load
/// as NULL; the identifier column is mandatory.
pub fn records_from_frame(df: &DataFrame) -> PolarsResult<Vec<RespondentRecord>> {
    let height = df.height();
    let ids = df.column(RESPONDENT_ID)?.str()?;

    let text = |name: &str| -> PolarsResult<Vec<Option<String>>> {
        match df.column(name) {
            Ok(column) => Ok(column
                .str()?
                .into_iter()
                .map(|value| value.map(str::to_string))
                .collect()),
            Err(_) => Ok(vec![None; height]),
        }
    };
    let integer = |name: &str| -> PolarsResult<Vec<Option<i64>>> {
        match df.column(name) {
            Ok(column) => Ok(column.i64()?.into_iter().collect()),
            Err(_) => Ok(vec![None; height]),
        }
    };
    let float = |name: &str| -> PolarsResult<Vec<Option<f64>>> {
        match df.column(name) {
            Ok(column) => Ok(column.f64()?.into_iter().collect()),
            Err(_) => Ok(vec![None; height]),
        }
    };
    let boolean = |name: &str| -> PolarsResult<Vec<Option<bool>>> {
        match df.column(name) {
            Ok(column) => Ok(column.bool()?.into_iter().collect()),
            Err(_) => Ok(vec![None; height]),
        }
    };

    let age_group = text(AGE_GROUP)?;
    let education_level = text(EDUCATION_LEVEL)?;
    let income_level = float(INCOME_LEVEL)?;
    let industry_sector = text(INDUSTRY_SECTOR)?;
    let job_role = text(JOB_ROLE)?;
    let company_size = text(COMPANY_SIZE)?;
    let years_experience = integer(YEARS_EXPERIENCE)?;
    let is_ai_user = boolean(IS_AI_USER)?;
    let ai_usage_frequency = text(AI_USAGE_FREQUENCY)?;
    let ai_comfort_level = integer(AI_COMFORT_LEVEL)?;
    let ai_training_received = boolean(AI_TRAINING_RECEIVED)?;
    let ai_tools_used_count = integer(AI_TOOLS_USED_COUNT)?;
    let ai_agents_awareness_level = integer(AI_AGENTS_AWARENESS_LEVEL)?;
    let is_worried = boolean(IS_WORRIED)?;
    let is_hopeful = boolean(IS_HOPEFUL)?;
    let is_overwhelmed = boolean(IS_OVERWHELMED)?;
    let is_excited = boolean(IS_EXCITED)?;
    let job_opportunity_outlook = text(JOB_OPPORTUNITY_OUTLOOK)?;
    let automation_risk_perception = integer(AUTOMATION_RISK_PERCEPTION)?;
    let workflow_automation_potential = integer(WORKFLOW_AUTOMATION_POTENTIAL)?;
    let org_ai_adoption_level = text(ORG_AI_ADOPTION_LEVEL)?;
    let org_ai_investment_trend = text(ORG_AI_INVESTMENT_TREND)?;
    let org_has_ai_policy = boolean(ORG_HAS_AI_POLICY)?;
    let org_ai_sustainability_use = boolean(ORG_AI_SUSTAINABILITY_USE)?;
    let wage_premium_ai_skills = float(WAGE_PREMIUM_AI_SKILLS)?;
    let productivity_change = float(PRODUCTIVITY_CHANGE)?;
    let wage_premium_pct = float(WAGE_PREMIUM_PCT)?;

    let mut records = Vec::with_capacity(height);
    for idx in 0..height {
        let Some(respondent_id) = ids.get(idx) else {
            return Err(PolarsError::ComputeError(
                format!("row {} has a null {}", idx, RESPONDENT_ID).into(),
            ));
        };

        records.push(RespondentRecord {
            respondent_id: respondent_id.to_string(),
            age_group: age_group[idx].clone(),
            education_level: education_level[idx].clone(),
            income_level: income_level[idx],
            industry_sector: industry_sector[idx].clone(),
            job_role: job_role[idx].clone(),
            company_size: company_size[idx].clone(),
            years_experience: years_experience[idx],
            is_ai_user: is_ai_user[idx],
            ai_usage_frequency: ai_usage_frequency[idx].clone(),
            ai_comfort_level: ai_comfort_level[idx],
            ai_training_received: ai_training_received[idx],
            ai_tools_used_count: ai_tools_used_count[idx],
            ai_agents_awareness_level: ai_agents_awareness_level[idx],
            is_worried: is_worried[idx],
            is_hopeful: is_hopeful[idx],
            is_overwhelmed: is_overwhelmed[idx],
            is_excited: is_excited[idx],
            job_opportunity_outlook: job_opportunity_outlook[idx].clone(),
            automation_risk_perception: automation_risk_perception[idx],
            workflow_automation_potential: workflow_automation_potential[idx],
            org_ai_adoption_level: org_ai_adoption_level[idx].clone(),
            org_ai_investment_trend: org_ai_investment_trend[idx].clone(),
            org_has_ai_policy: org_has_ai_policy[idx],
            org_ai_sustainability_use: org_ai_sustainability_use[idx],
            wage_premium_ai_skills: wage_premium_ai_skills[idx],
            productivity_change: productivity_change[idx],
            wage_premium_pct: wage_premium_pct[idx],
        });
    }

    Ok(records)
}

/// Casts every known column of an all-string frame to its storage type and
/// drops columns that are not part of the Respondent Record.
pub fn coerce_to_schema(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut columns: Vec<Column> = Vec::new();
    for spec in RESPONDENT_COLUMNS {
        let Ok(existing) = df.column(spec.name) else {
            continue;
        };
        let series = match spec.column_type {
            ColumnType::Text => existing.cast(&spec.column_type.dtype())?,
            ColumnType::Boolean => {
                let values: Vec<Option<bool>> = string_values(df, spec.name)?
                    .into_iter()
                    .map(|value| value.and_then(|raw| bool_literal(&raw)))
                    .collect();
                Series::new(spec.name.into(), values).into()
            }
            ColumnType::Integer => {
                let values: Vec<Option<i64>> = string_values(df, spec.name)?
                    .into_iter()
                    .map(|value| value.and_then(|raw| parse_float(&raw)).map(|v| v.round() as i64))
                    .collect();
                Series::new(spec.name.into(), values).into()
            }
            ColumnType::Float => {
                let values: Vec<Option<f64>> = string_values(df, spec.name)?
                    .into_iter()
                    .map(|value| value.and_then(|raw| parse_float(&raw)))
                    .collect();
                Series::new(spec.name.into(), values).into()
            }
        };
        columns.push(series);
    }
    DataFrame::new(columns)
}
