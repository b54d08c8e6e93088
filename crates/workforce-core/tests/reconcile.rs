use std::path::{Path, PathBuf};

use polars::prelude::*;
use workforce_core::ingestion::read_and_merge;
use workforce_core::quality::count_duplicate_ids;
use workforce_core::random::RandomSource;
use workforce_core::reconcile::{generate_respondent_ids, reconcile};
use workforce_core::schema;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn survey_frame() -> DataFrame {
    df!(
        "age_bracket" => &["18-29", "30-49", "50+"],
        "has_used_ai_on_job" => &["yes", "no", "1"],
        "ai_use_frequency" => &["daily", "never", "weekly"],
        "job_type" => &["manager", "ic", "exec"],
        "self_reported_productivity_change_pct" => &["12", "-5", "30"],
        "favorite_color" => &["red", "blue", "green"],
    )
    .unwrap()
}

#[test]
fn generates_sequential_unique_identifiers() {
    let ids = generate_respondent_ids(12);
    let values: Vec<&str> = ids.str().unwrap().into_iter().flatten().collect();

    assert_eq!(values.len(), 12);
    assert_eq!(values[0], "RESP_00001");
    assert_eq!(values[11], "RESP_00012");
    assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn reconciled_frame_matches_target_schema() {
    let mut rng = RandomSource::seeded(3);
    let result = reconcile(&survey_frame(), &mut rng).unwrap();

    let expected: Vec<&str> = schema::source_columns().map(|spec| spec.name).collect();
    let actual: Vec<String> = result
        .frame
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(actual, expected);
    assert_eq!(result.frame.height(), 3);
    assert!(result.frame.column("favorite_color").is_err());
    assert!(result.generated_ids);

    let ids = result.frame.column(schema::RESPONDENT_ID).unwrap().str().unwrap();
    assert_eq!(ids.get(2), Some("RESP_00003"));
}

#[test]
fn first_present_alias_wins() {
    let df = df!(
        "age_bracket" => &["18-29", "50+"],
        "age_group" => &["30-49", "30-49"],
        "productivity_change" => &["1", "2"],
    )
    .unwrap();

    let mut rng = RandomSource::seeded(3);
    let result = reconcile(&df, &mut rng).unwrap();

    let ages = result.frame.column(schema::AGE_GROUP).unwrap().str().unwrap();
    assert_eq!(ages.get(0), Some("18-29"));
    assert_eq!(ages.get(1), Some("50+"));

    let age_alias = result
        .aliased
        .iter()
        .find(|alias| alias.target == schema::AGE_GROUP)
        .unwrap();
    assert_eq!(age_alias.source, "age_bracket");

    let productivity = result
        .aliased
        .iter()
        .find(|alias| alias.target == schema::PRODUCTIVITY_CHANGE)
        .unwrap();
    assert_eq!(productivity.source, "productivity_change");
}

#[test]
fn existing_identifiers_are_kept() {
    let df = df!(
        "respondent_id" => &["A-1", "A-2"],
        "is_ai_user" => &["true", "false"],
    )
    .unwrap();

    let mut rng = RandomSource::seeded(3);
    let result = reconcile(&df, &mut rng).unwrap();

    assert!(!result.generated_ids);
    let ids = result.frame.column(schema::RESPONDENT_ID).unwrap().str().unwrap();
    assert_eq!(ids.get(0), Some("A-1"));
    assert_eq!(ids.get(1), Some("A-2"));
}

#[test]
fn missing_columns_are_flagged_as_synthesized() {
    let mut rng = RandomSource::seeded(3);
    let result = reconcile(&survey_frame(), &mut rng).unwrap();

    let synthesized: Vec<&str> = result
        .synthesized
        .iter()
        .map(|column| column.column.as_str())
        .collect();
    assert!(synthesized.contains(&schema::IS_WORRIED));
    assert!(synthesized.contains(&schema::INCOME_LEVEL));
    assert!(!synthesized.contains(&schema::IS_AI_USER));
    assert!(!synthesized.contains(&schema::AGE_GROUP));

    let income = result.frame.column(schema::INCOME_LEVEL).unwrap().f64().unwrap();
    assert!(income.into_iter().all(|value| value == Some(50_000.0)));

    let sector = result.frame.column(schema::INDUSTRY_SECTOR).unwrap().str().unwrap();
    assert!(sector.into_iter().all(|value| value == Some("Unknown")));

    let risk = result
        .frame
        .column(schema::AUTOMATION_RISK_PERCEPTION)
        .unwrap()
        .i64()
        .unwrap();
    assert!(risk.into_iter().flatten().all(|value| (1..=10).contains(&value)));
}

#[test]
fn synthesized_values_are_reproducible_with_a_seed() {
    let first = reconcile(&survey_frame(), &mut RandomSource::seeded(11)).unwrap();
    let second = reconcile(&survey_frame(), &mut RandomSource::seeded(11)).unwrap();
    assert!(first.frame.equals_missing(&second.frame));
}

#[test]
fn rows_without_identifier_get_unused_tokens() {
    let df = df!(
        "respondent_id" => &[Some("A-1"), None, Some("RESP_00001"), None],
        "is_ai_user" => &["true", "false", "true", "false"],
    )
    .unwrap();

    let mut rng = RandomSource::seeded(3);
    let result = reconcile(&df, &mut rng).unwrap();

    let ids = result.frame.column(schema::RESPONDENT_ID).unwrap();
    assert_eq!(ids.null_count(), 0);
    let values = ids.str().unwrap();
    assert_eq!(values.get(1), Some("RESP_00002"));
    assert_eq!(values.get(2), Some("RESP_00001"));
    assert_eq!(values.get(3), Some("RESP_00003"));
    assert_eq!(count_duplicate_ids(&result.frame), 0);
}

#[test]
fn token_matching_an_existing_identifier_is_skipped() {
    let df = df!(
        "respondent_id" => &[Some("RESP_00002"), None],
    )
    .unwrap();

    let result = reconcile(&df, &mut RandomSource::seeded(3)).unwrap();
    let ids = result.frame.column(schema::RESPONDENT_ID).unwrap().str().unwrap();
    assert_eq!(ids.get(0), Some("RESP_00002"));
    assert_eq!(ids.get(1), Some("RESP_00001"));
    assert_eq!(count_duplicate_ids(&result.frame), 0);
}

#[test]
fn merged_files_with_different_headers_keep_every_value() {
    let batch = read_and_merge(&[
        fixture("survey_responses.csv"),
        fixture("opinion_responses.csv"),
    ])
    .unwrap();
    assert_eq!(batch.frame.height(), 8);

    let result = reconcile(&batch.frame, &mut RandomSource::seeded(3)).unwrap();

    let ages = result.frame.column(schema::AGE_GROUP).unwrap();
    assert_eq!(ages.null_count(), 0);
    let ages = ages.str().unwrap();
    assert_eq!(ages.get(5), Some("50+"));
    assert_eq!(ages.get(6), Some("18-29"));
    assert_eq!(ages.get(7), Some("30-49"));

    let age_alias = result
        .aliased
        .iter()
        .find(|alias| alias.target == schema::AGE_GROUP)
        .unwrap();
    assert_eq!(age_alias.source, "age_bracket");
}
