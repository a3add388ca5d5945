//! End-to-end generation properties, driven through the task registry with
//! the DevNull sink collecting rows in delivery order.

use std::sync::{Arc, Mutex};

use sdvg_core::config::{
    Column, ColumnKind, DateTimeParams, GenerationConfig, IntegerParams, Range, StringParams,
};
use sdvg_core::task::{TaskConfig, TaskRegistry};
use sdvg_core::Value;

use sdvg_testutil::{enum_null_column, fk_column, int_column, model_config};

/// Run a prepared config against the DevNull sink and collect the rows in
/// delivery order.
async fn run_collect(mut config: GenerationConfig) -> Vec<Vec<Value>> {
    let dir = tempfile::tempdir().unwrap();
    config.output.dir = dir.path().to_path_buf();
    config.prepare().unwrap();

    let rows: Arc<Mutex<Vec<Vec<Value>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&rows);
    let registry = TaskRegistry::new();
    let task = registry
        .create_task(TaskConfig {
            config,
            continue_generation: false,
            force: false,
            confirm: None,
            devnull_handler: Some(Arc::new(move |row: &[Value]| {
                sink.lock().unwrap().push(row.to_vec());
            })),
        })
        .await
        .unwrap();
    task.wait_result().await.unwrap();

    Arc::try_unwrap(rows).unwrap().into_inner().unwrap()
}

fn ints(rows: &[Vec<Value>], col: usize) -> Vec<Option<i64>> {
    rows.iter()
        .map(|r| match &r[col] {
            Value::Int(i) => Some(*i),
            Value::Null => None,
            other => panic!("expected int or null, got {:?}", other),
        })
        .collect()
}

#[tokio::test]
async fn same_seed_reproduces_identical_rows() {
    let build = || model_config("m", 200, 77, vec![int_column("a", 0, 1_000_000)]);
    let first = run_collect(build()).await;
    let second = run_collect(build()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn different_seeds_produce_different_rows() {
    let first = run_collect(model_config("m", 200, 1, vec![int_column("a", 0, 1_000_000)])).await;
    let second =
        run_collect(model_config("m", 200, 2, vec![int_column("a", 0, 1_000_000)])).await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn full_distinct_budget_yields_unique_values() {
    let mut column = int_column("a", 0, 1_000_000);
    column.ranges[0].distinct_percentage = Some(1.0);
    let rows = run_collect(model_config("m", 500, 5, vec![column])).await;
    let values = ints(&rows, 0);
    let set: std::collections::HashSet<_> = values.iter().collect();
    assert_eq!(set.len(), 500);
}

#[tokio::test]
async fn ordered_column_is_non_decreasing() {
    let mut column = int_column("a", 0, 100_000);
    column.ranges[0].ordered = Some(true);
    let rows = run_collect(model_config("m", 300, 9, vec![column])).await;
    let values = ints(&rows, 0);
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "{:?} > {:?}", pair[0], pair[1]);
    }
}

#[tokio::test]
async fn values_stay_inside_configured_bounds() {
    let datetime_column = Column {
        name: "t".to_string(),
        kind: Some(ColumnKind::DateTime),
        ranges: vec![Range {
            datetime_params: Some(DateTimeParams {
                from: Some("2021-03-01T00:00:00Z".parse().unwrap()),
                to: Some("2021-03-31T23:59:59Z".parse().unwrap()),
            }),
            ..Range::default()
        }],
        ..Column::default()
    };
    let string_column = Column {
        name: "s".to_string(),
        kind: Some(ColumnKind::String),
        ranges: vec![Range {
            string_params: Some(StringParams {
                min_length: 4,
                max_length: 8,
                ..StringParams::default()
            }),
            ..Range::default()
        }],
        ..Column::default()
    };
    let config = model_config(
        "m",
        250,
        13,
        vec![int_column("i", -50, 50), datetime_column, string_column],
    );
    let rows = run_collect(config).await;

    let from: chrono::DateTime<chrono::Utc> = "2021-03-01T00:00:00Z".parse().unwrap();
    let to: chrono::DateTime<chrono::Utc> = "2021-03-31T23:59:59Z".parse().unwrap();
    for row in &rows {
        match &row[0] {
            Value::Int(i) => assert!((-50..=50).contains(i)),
            other => panic!("expected int, got {:?}", other),
        }
        match &row[1] {
            Value::Timestamp(ts) => assert!(*ts >= from && *ts <= to),
            other => panic!("expected timestamp, got {:?}", other),
        }
        match &row[2] {
            Value::String(s) => assert!((4..=8).contains(&s.len()), "bad length: {:?}", s),
            other => panic!("expected string, got {:?}", other),
        }
    }
}

/// The three-range split scenario: 200 rows over shares 0.25 / 0.5 / 0.25.
#[tokio::test]
async fn multi_range_rows_route_by_row_index() {
    let column = Column {
        name: "a".to_string(),
        kind: Some(ColumnKind::Integer),
        ranges: vec![
            Range {
                range_percentage: Some(0.25),
                ordered: Some(true),
                distinct_count: Some(10),
                integer_params: Some(IntegerParams {
                    bit_width: 16,
                    from: Some(1),
                    to: Some(11),
                }),
                ..Range::default()
            },
            Range {
                range_percentage: Some(0.5),
                ordered: Some(true),
                distinct_percentage: Some(1.0),
                null_percentage: 0.2,
                integer_params: Some(IntegerParams {
                    bit_width: 64,
                    from: Some(100),
                    to: Some(1100),
                }),
                ..Range::default()
            },
            Range {
                range_percentage: Some(0.25),
                null_percentage: 0.2,
                values: Some(vec![serde_json::Value::Null, serde_json::json!(999)]),
                ..Range::default()
            },
        ],
        ..Column::default()
    };
    let rows = run_collect(model_config("m", 200, 21, vec![column])).await;
    assert_eq!(rows.len(), 200);
    let values = ints(&rows, 0);

    for (g, value) in values.iter().enumerate() {
        match g {
            0..=49 => {
                let v = value.expect("first range has no nulls");
                assert!((1..=11).contains(&v), "row {} value {}", g, v);
            }
            50..=149 => {
                if let Some(v) = value {
                    assert!((100..=1100).contains(v), "row {} value {}", g, v);
                }
            }
            _ => {
                assert!(
                    value.is_none() || *value == Some(999),
                    "row {} value {:?}",
                    g,
                    value
                );
            }
        }
    }
}

/// The enum determinism scenario: values `[222, null, "111"]`, 9 rows,
/// batch 2, one worker.
#[tokio::test]
async fn enum_with_null_emits_sorted_buckets() {
    let mut config = model_config("m", 9, 1738591926070236604, vec![enum_null_column("a")]);
    config.workers_count = 1;
    config.batch_size = 2;
    let rows = run_collect(config).await;
    let values = ints(&rows, 0);
    assert_eq!(
        values,
        vec![
            None,
            None,
            None,
            Some(111),
            Some(111),
            Some(111),
            Some(222),
            Some(222),
            Some(222),
        ]
    );
}

#[tokio::test]
async fn foreign_key_values_appear_in_target() {
    for ordered in [false, true] {
        for null_pct in [0.0, 0.3] {
            let parent_column = || {
                let mut c = int_column("id", 1000, 1300);
                c.ranges[0].null_percentage = null_pct;
                c
            };

            // Parent-only run: determinism makes these the same values the
            // combined run generates for the parent.
            let parent_rows = run_collect(model_config("parent", 40, 17, vec![parent_column()])).await;
            let parent_values: std::collections::HashSet<i64> = parent_rows
                .iter()
                .filter_map(|r| match &r[0] {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            assert!(!parent_values.is_empty());

            // Combined run delivering only the child (the parent stays a
            // foreign-key target but is ignored for generation).
            let mut config = model_config("parent", 40, 17, vec![parent_column()]);
            config.models.insert(
                "child".to_string(),
                sdvg_core::config::Model {
                    rows_count: 120,
                    columns: vec![fk_column("parent_id", "parent.id", ordered)],
                    ..sdvg_core::config::Model::default()
                },
            );
            config.models_to_ignore = vec!["parent".to_string()];
            let child_rows = run_collect(config).await;
            assert_eq!(child_rows.len(), 120);

            for row in &child_rows {
                if let Value::Int(v) = &row[0] {
                    assert!(
                        parent_values.contains(v),
                        "fk value {} missing from parent (ordered={}, null={})",
                        v,
                        ordered,
                        null_pct
                    );
                }
            }
        }
    }
}

#[tokio::test]
async fn template_column_renders_referenced_values() {
    let template_column = Column {
        name: "label".to_string(),
        kind: Some(ColumnKind::String),
        ranges: vec![Range {
            string_params: Some(StringParams {
                template: Some("id={{ id }}".to_string()),
                ..StringParams::default()
            }),
            ..Range::default()
        }],
        ..Column::default()
    };
    // Template declared before the column it references.
    let config = model_config("m", 50, 3, vec![template_column, int_column("id", 0, 10_000)]);
    let rows = run_collect(config).await;
    for row in &rows {
        let Value::String(label) = &row[0] else {
            panic!("expected string, got {:?}", row[0])
        };
        let Value::Int(id) = &row[1] else {
            panic!("expected int, got {:?}", row[1])
        };
        assert_eq!(label, &format!("id={}", id));
    }
}
