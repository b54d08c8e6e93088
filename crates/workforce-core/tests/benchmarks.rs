use polars::prelude::*;
use workforce_core::benchmarks::{
    compute_metric, default_benchmarks, parse_benchmarks, validate_against_benchmarks, Benchmark,
    BenchmarkStatus, Metric,
};

fn adoption_frame(users: usize, total: usize) -> DataFrame {
    let values: Vec<bool> = (0..total).map(|idx| idx < users).collect();
    df!("is_ai_user" => values).unwrap()
}

#[test]
fn adoption_rate_inside_range_passes() {
    let df = adoption_frame(16, 100);
    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();

    let adoption = report.get("ai_adoption_rate").unwrap();
    assert_eq!(adoption.value, 16.0);
    assert_eq!(adoption.status, BenchmarkStatus::Pass);
    assert_eq!(adoption.benchmark.low, 12.0);
    assert_eq!(adoption.benchmark.high, 20.0);
    assert_eq!(adoption.source, "McKinsey 2024");
}

#[test]
fn out_of_range_value_is_a_warning() {
    let df = adoption_frame(40, 100);
    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();

    let adoption = report.get("ai_adoption_rate").unwrap();
    assert_eq!(adoption.value, 40.0);
    assert_eq!(adoption.status, BenchmarkStatus::Warning);
}

#[test]
fn range_bounds_are_inclusive() {
    let df = adoption_frame(12, 100);
    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();
    assert_eq!(report["ai_adoption_rate"].status, BenchmarkStatus::Pass);

    let df = adoption_frame(20, 100);
    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();
    assert_eq!(report["ai_adoption_rate"].status, BenchmarkStatus::Pass);
}

#[test]
fn benchmarks_with_missing_fields_are_skipped() {
    let df = adoption_frame(16, 100);
    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();

    assert_eq!(report.len(), 1);
    assert!(!report.contains_key("worry_sentiment"));
    assert!(!report.contains_key("training_effectiveness"));
}

#[test]
fn training_effectiveness_is_difference_of_conditional_rates() {
    // Trained: 3 of 4 use AI (75%). Untrained: 1 of 4 (25%).
    let df = df!(
        "is_ai_user" => &[true, true, true, false, true, false, false, false],
        "ai_training_received" => &[true, true, true, true, false, false, false, false],
    )
    .unwrap();

    let metric = Metric::RateLift {
        outcome: "is_ai_user".to_string(),
        group: "ai_training_received".to_string(),
    };
    let lift = compute_metric(&df, &metric).unwrap();
    assert!((lift - 50.0).abs() < 1e-9);

    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();
    assert_eq!(report["training_effectiveness"].status, BenchmarkStatus::Warning);
}

#[test]
fn empty_group_yields_warning() {
    let df = df!(
        "is_ai_user" => &[true, false],
        "ai_training_received" => &[false, false],
    )
    .unwrap();

    let report = validate_against_benchmarks(&df, &default_benchmarks()).unwrap();
    let training = &report["training_effectiveness"];
    assert!(training.value.is_nan());
    assert_eq!(training.status, BenchmarkStatus::Warning);
}

#[test]
fn mean_metric_averages_non_null_values() {
    let df = df!("wage_premium_pct" => &[Some(40.0f64), None, Some(60.0)]).unwrap();
    let table = vec![Benchmark {
        name: "wage_premium".to_string(),
        low: 45.0,
        high: 65.0,
        source: "Stanford HAI".to_string(),
        metric: Metric::Mean {
            field: "wage_premium_pct".to_string(),
        },
    }];
    let report = validate_against_benchmarks(&df, &table).unwrap();

    let premium = &report["wage_premium"];
    assert_eq!(premium.value, 50.0);
    assert_eq!(premium.status, BenchmarkStatus::Pass);
}

#[test]
fn default_table_has_no_mean_benchmarks() {
    let table = default_benchmarks();
    assert_eq!(table.len(), 4);
    assert!(table.iter().all(|benchmark| benchmark.name != "wage_premium"));
    assert!(table
        .iter()
        .all(|benchmark| !matches!(benchmark.metric, Metric::Mean { .. })));

    let df = df!("wage_premium_pct" => &[Some(40.0f64), Some(60.0)]).unwrap();
    let report = validate_against_benchmarks(&df, &table).unwrap();
    assert!(report.is_empty());
}

#[test]
fn benchmark_table_parses_from_toml() {
    let table = parse_benchmarks(
        r#"
[[benchmark]]
name = "adoption"
low = 10.0
high = 30.0
source = "Internal panel"
metric = { kind = "rate", field = "is_ai_user" }

[[benchmark]]
name = "training"
low = 0.0
high = 100.0
metric = { kind = "rate_lift", outcome = "is_ai_user", group = "ai_training_received" }
"#,
    )
    .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(
        table[0],
        Benchmark {
            name: "adoption".to_string(),
            low: 10.0,
            high: 30.0,
            source: "Internal panel".to_string(),
            metric: Metric::Rate {
                field: "is_ai_user".to_string()
            },
        }
    );
    assert_eq!(table[1].source, "");

    let report = validate_against_benchmarks(&adoption_frame(16, 100), &table).unwrap();
    assert_eq!(report["adoption"].status, BenchmarkStatus::Pass);
}

#[test]
fn validation_report_serializes_status_in_upper_case() {
    let report = validate_against_benchmarks(&adoption_frame(16, 100), &default_benchmarks()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["ai_adoption_rate"]["status"], "PASS");
    assert_eq!(json["ai_adoption_rate"]["value"], 16.0);
    assert_eq!(json["ai_adoption_rate"]["benchmark"]["low"], 12.0);
}
