//! Shared config fixtures for SDVG tests.
//!
//! Builders produce *unprepared* configs; call
//! `GenerationConfig::prepare()` (or let the task registry do it through
//! `read_config`) before handing them to the engine. The integration
//! suites prepare them explicitly so fixture mutations stay possible.

use sdvg_core::config::{
    Column, ColumnKind, CsvParams, GenerationConfig, IntegerParams, Model, OutputConfig,
    PartitionColumn, Range, SinkConfig,
};

/// An integer column over `[from, to]`.
pub fn int_column(name: &str, from: i64, to: i64) -> Column {
    Column {
        name: name.to_string(),
        kind: Some(ColumnKind::Integer),
        ranges: vec![Range {
            integer_params: Some(IntegerParams {
                bit_width: 64,
                from: Some(from),
                to: Some(to),
            }),
            ..Range::default()
        }],
        ..Column::default()
    }
}

/// A foreign key column referencing `target` (`"model.column"`).
pub fn fk_column(name: &str, target: &str, ordered: bool) -> Column {
    Column {
        name: name.to_string(),
        foreign_key: Some(target.to_string()),
        foreign_key_order: ordered,
        ..Column::default()
    }
}

/// A single-model config with the given columns, DevNull sink.
pub fn model_config(model_name: &str, rows: u64, seed: u64, columns: Vec<Column>) -> GenerationConfig {
    let mut config = GenerationConfig {
        workers_count: 2,
        batch_size: 10,
        random_seed: seed,
        ..GenerationConfig::default()
    };
    config.models.insert(
        model_name.to_string(),
        Model {
            rows_count: rows,
            columns,
            ..Model::default()
        },
    );
    config
}

/// Switch a config to the CSV sink writing into `dir`.
pub fn with_csv_sink(mut config: GenerationConfig, dir: &std::path::Path) -> GenerationConfig {
    config.output = OutputConfig {
        dir: dir.to_path_buf(),
        sink: SinkConfig::Csv(CsvParams::default()),
        ..OutputConfig::default()
    };
    config
}

/// Add a partition column to the named model.
pub fn with_partition(mut config: GenerationConfig, model: &str, column: &str) -> GenerationConfig {
    config
        .models
        .get_mut(model)
        .expect("model exists")
        .partition_columns
        .push(PartitionColumn {
            name: column.to_string(),
            writable: true,
        });
    config
}

/// The enum-with-null scenario column: `values = [222, null, "111"]`.
pub fn enum_null_column(name: &str) -> Column {
    Column {
        name: name.to_string(),
        kind: Some(ColumnKind::Integer),
        ranges: vec![Range {
            values: Some(vec![
                serde_json::json!(222),
                serde_json::Value::Null,
                serde_json::json!("111"),
            ]),
            ..Range::default()
        }],
        ..Column::default()
    }
}
