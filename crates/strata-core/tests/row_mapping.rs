//! Row-to-label mapping tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::json;

use strata_core::{map_rows, LabelField, Row, Sample, TimeWindow};

const CATEGORY: LabelField = LabelField::new("category", "uncategorized");
const LEVEL: LabelField = LabelField::new("automation_level", "manual");

fn row(v: serde_json::Value) -> Row {
    Row::from(v)
}

#[test]
fn tickets_hourly_scenario() {
    let rows = vec![
        row(json!({ "category": "plumbing", "count": 12 })),
        row(json!({ "category": null, "count": 3 })),
    ];
    let samples = map_rows(&rows, &[CATEGORY], "count");

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].label("category"), Some("plumbing"));
    assert_eq!(samples[0].value, 12.0);
    assert_eq!(samples[1].label("category"), Some("uncategorized"));
    assert_eq!(samples[1].value, 3.0);
}

#[test]
fn missing_and_null_labels_use_fallback() {
    let cases = [
        json!({ "value": 1 }),
        json!({ "category": null, "automation_level": null, "value": 1 }),
        json!({ "category": "", "value": 1 }),
        json!({ "category": ["nested"], "value": 1 }),
    ];
    for c in cases {
        let s = Sample::from_row(&row(c.clone()), &[CATEGORY, LEVEL], "value");
        assert_eq!(s.label("category"), Some("uncategorized"), "row={c}");
        assert_eq!(s.label("automation_level"), Some("manual"), "row={c}");
    }
}

#[test]
fn null_or_non_numeric_values_map_to_zero() {
    let cases = [
        json!({}),
        json!({ "value": null }),
        json!({ "value": "n/a" }),
        json!({ "value": "" }),
        json!({ "value": true }),
        json!({ "value": "NaN" }),
        json!({ "value": { "x": 1 } }),
    ];
    for c in cases {
        assert_eq!(row(c.clone()).value("value"), 0.0, "row={c}");
    }
}

#[test]
fn numeric_strings_are_parsed() {
    // Postgres NUMERIC aggregates may arrive as text.
    assert_eq!(row(json!({ "avg": "4.25" })).value("avg"), 4.25);
    assert_eq!(row(json!({ "avg": " 17 " })).value("avg"), 17.0);
    assert_eq!(row(json!({ "avg": 0.5 })).value("avg"), 0.5);
}

#[test]
fn labels_fall_back_to_metadata_document() {
    let r = row(json!({
        "metadata": { "provider": "anthropic", "limit_type": null },
        "provider": null,
        "metric_value": 42
    }));
    assert_eq!(r.label("provider", "unknown"), "anthropic");
    assert_eq!(r.label("limit_type", "requests"), "requests");
    assert_eq!(r.value("metric_value"), 42.0);
}

#[test]
fn top_level_column_wins_over_metadata() {
    let r = row(json!({ "category": "billing", "metadata": { "category": "other" } }));
    assert_eq!(r.label("category", "unknown"), "billing");
}

#[test]
fn non_object_row_maps_to_defaults() {
    let s = Sample::from_row(&row(json!([1, 2, 3])), &[CATEGORY], "count");
    assert_eq!(s.label("category"), Some("uncategorized"));
    assert_eq!(s.value, 0.0);
}

#[test]
fn numeric_labels_are_stringified() {
    let r = row(json!({ "category": 7 }));
    assert_eq!(r.label("category", "unknown"), "7");
}

#[test]
fn window_predicates() {
    assert_eq!(
        TimeWindow::FiveMinutes.predicate(),
        "timestamp > NOW() - INTERVAL '5 minutes'"
    );
    assert_eq!(TimeWindow::OneHour.sql_interval(), "1 hour");
    assert_eq!(TimeWindow::TwentyFourHours.sql_interval(), "24 hours");
}
