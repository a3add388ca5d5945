//! Semantic validation that serde cannot enforce.
//!
//! All failures are collected and reported as one collated `Config` error so
//! a broken config surfaces every problem in a single run.

use super::*;
use crate::generate::topo;
use crate::generate::value::Value;

impl GenerationConfig {
    pub(super) fn validate(&self) -> Result<()> {
        let mut fails: Vec<String> = Vec::new();

        if self.workers_count == 0 {
            fails.push("workers_count must be positive".to_string());
        }
        if self.batch_size == 0 {
            fails.push("batch_size must be positive".to_string());
        }
        if self.models.is_empty() {
            fails.push("at least one model is required".to_string());
        }

        for ignored in &self.models_to_ignore {
            if !self.models.contains_key(ignored) {
                fails.push(format!(
                    "models_to_ignore entry '{}' does not name a model",
                    ignored
                ));
            }
        }
        if !self.models.is_empty() && self.models_to_ignore.len() >= self.models.len() {
            fails.push("models_to_ignore must be a strict subset of models".to_string());
        }

        for (name, model) in &self.models {
            validate_model(name, model, &self.models, &mut fails);
        }

        validate_output(&self.output, &mut fails);

        if fails.is_empty() {
            Ok(())
        } else {
            Err(SdvgError::config_report(fails))
        }
    }
}

fn validate_model(
    name: &str,
    model: &Model,
    models: &IndexMap<String, Model>,
    fails: &mut Vec<String>,
) {
    if model.rows_count == 0 {
        fails.push(format!("model '{}': rows_count must be positive", name));
    }
    let to = model.generate_to.unwrap_or(model.rows_count);
    if model.generate_from > to {
        fails.push(format!(
            "model '{}': generate_from {} exceeds generate_to {}",
            name, model.generate_from, to
        ));
    }
    if to > model.rows_count {
        fails.push(format!(
            "model '{}': generate_to {} exceeds rows_count {}",
            name, to, model.rows_count
        ));
    }
    if model.columns.is_empty() {
        fails.push(format!("model '{}': at least one column is required", name));
    }

    let mut seen = std::collections::HashSet::new();
    for column in &model.columns {
        if !seen.insert(column.name.as_str()) {
            fails.push(format!(
                "model '{}': duplicate column name '{}'",
                name, column.name
            ));
        }
    }

    for pc in &model.partition_columns {
        if model.column(&pc.name).is_none() {
            fails.push(format!(
                "model '{}': partition column '{}' does not name a column",
                name, pc.name
            ));
        }
    }

    for column in &model.columns {
        validate_column(name, column, models, fails);
    }

    // Template references form a per-model DAG; cycles and unknown
    // references are config errors, not generation-time surprises.
    if let Err(e) = topo::intra_row_order(model) {
        fails.push(format!("model '{}': {}", name, e));
    }
}

fn validate_column(
    model_name: &str,
    column: &Column,
    models: &IndexMap<String, Model>,
    fails: &mut Vec<String>,
) {
    let loc = format!("column '{}.{}'", model_name, column.name);

    if column.name.is_empty() {
        fails.push(format!("model '{}': column with empty name", model_name));
        return;
    }

    match (&column.kind, &column.foreign_key) {
        (Some(_), Some(_)) => {
            fails.push(format!("{}: type and foreign_key are mutually exclusive", loc));
            return;
        }
        (None, None) => {
            fails.push(format!("{}: either type or foreign_key is required", loc));
            return;
        }
        (None, Some(_)) => {
            validate_foreign_key(model_name, column, models, fails);
            return;
        }
        (Some(_), None) => {}
    }

    let kind = column.kind.expect("checked above");
    let mut explicit_share = 0.0;
    for (idx, range) in column.ranges.iter().enumerate() {
        validate_range(&format!("{} range {}", loc, idx), kind, range, fails);
        if let Some(share) = range.range_percentage {
            explicit_share += share;
        }
    }
    if explicit_share > 1.0 + 1e-9 {
        fails.push(format!(
            "{}: range_percentage values sum to {} (more than 1)",
            loc, explicit_share
        ));
    }
}

fn validate_foreign_key(
    model_name: &str,
    column: &Column,
    models: &IndexMap<String, Model>,
    fails: &mut Vec<String>,
) {
    let loc = format!("column '{}.{}'", model_name, column.name);
    if !column.ranges.is_empty() {
        fails.push(format!("{}: foreign_key is mutually exclusive with ranges", loc));
    }

    let Some((target_model, target_column)) = column.foreign_key_parts() else {
        fails.push(format!(
            "{}: foreign_key must have the form '<model>.<column>'",
            loc
        ));
        return;
    };

    let Some(target) = models.get(target_model) else {
        fails.push(format!(
            "{}: foreign_key target model '{}' does not exist",
            loc, target_model
        ));
        return;
    };
    let Some(target_col) = target.column(target_column) else {
        fails.push(format!(
            "{}: foreign_key target column '{}.{}' does not exist",
            loc, target_model, target_column
        ));
        return;
    };
    if target_col.foreign_key.is_some() {
        fails.push(format!(
            "{}: foreign_key target '{}.{}' is itself a foreign key",
            loc, target_model, target_column
        ));
    }
}

fn validate_range(loc: &str, kind: ColumnKind, range: &Range, fails: &mut Vec<String>) {
    if let Some(share) = range.range_percentage {
        if share <= 0.0 || share > 1.0 {
            fails.push(format!("{}: range_percentage must be in (0, 1]", loc));
        }
    }
    if !(0.0..=1.0).contains(&range.null_percentage) {
        fails.push(format!("{}: null_percentage must be in [0, 1]", loc));
    }
    if range.distinct_percentage.is_some() && range.distinct_count.is_some() {
        fails.push(format!(
            "{}: distinct_percentage and distinct_count are mutually exclusive",
            loc
        ));
    }
    if let Some(pct) = range.distinct_percentage {
        if !(0.0..=1.0).contains(&pct) {
            fails.push(format!("{}: distinct_percentage must be in [0, 1]", loc));
        }
    }
    if range.distinct_count == Some(0) {
        fails.push(format!("{}: distinct_count must be positive", loc));
    }

    let param_sections = [
        (range.integer_params.is_some(), ColumnKind::Integer, "integer_params"),
        (range.float_params.is_some(), ColumnKind::Float, "float_params"),
        (range.string_params.is_some(), ColumnKind::String, "string_params"),
        (range.datetime_params.is_some(), ColumnKind::DateTime, "datetime_params"),
    ];
    for (present, section_kind, section_name) in param_sections {
        if present && section_kind != kind {
            fails.push(format!(
                "{}: {} is not valid for a {:?} column",
                loc, section_name, kind
            ));
        }
        if present && range.values.is_some() {
            fails.push(format!(
                "{}: values and {} are mutually exclusive",
                loc, section_name
            ));
        }
    }

    if let Some(values) = &range.values {
        if values.is_empty() {
            fails.push(format!("{}: values must not be empty", loc));
        }
        if range.distinct_percentage.is_some() || range.distinct_count.is_some() {
            fails.push(format!(
                "{}: distinct constraints are not valid for a values range",
                loc
            ));
        }
        for raw in values {
            if let Err(e) = Value::coerce(raw, kind) {
                fails.push(format!("{}: {}", loc, e));
            }
        }
    }

    match kind {
        ColumnKind::Integer => {
            let params = range.integer_params.clone().unwrap_or_default();
            if ![8, 16, 32, 64].contains(&params.bit_width) {
                fails.push(format!("{}: bit_width must be one of 8, 16, 32, 64", loc));
            } else {
                let (width_lo, width_hi) = params.width_bounds();
                let (from, to) = params.bounds();
                if from > to {
                    fails.push(format!("{}: from {} exceeds to {}", loc, from, to));
                }
                if from < width_lo || to > width_hi {
                    fails.push(format!(
                        "{}: [{}, {}] does not fit a {}-bit integer",
                        loc, from, to, params.bit_width
                    ));
                }
            }
        }
        ColumnKind::Float => {
            let params = range.float_params.clone().unwrap_or_default();
            if ![32, 64].contains(&params.bit_width) {
                fails.push(format!("{}: bit_width must be 32 or 64", loc));
            }
            let (from, to) = params.bounds();
            if from > to {
                fails.push(format!("{}: from {} exceeds to {}", loc, from, to));
            }
        }
        ColumnKind::DateTime => {
            let params = range.datetime_params.clone().unwrap_or_default();
            let (from, to) = params.bounds();
            if from > to {
                fails.push(format!("{}: from {} exceeds to {}", loc, from, to));
            }
        }
        ColumnKind::String => validate_string_params(loc, range, fails),
        ColumnKind::Uuid => {}
    }
}

fn validate_string_params(loc: &str, range: &Range, fails: &mut Vec<String>) {
    let params = range.string_params.clone().unwrap_or_default();

    if params.min_length == 0 {
        fails.push(format!("{}: min_length must be positive", loc));
    }
    if params.min_length > params.max_length {
        fails.push(format!(
            "{}: min_length {} exceeds max_length {}",
            loc, params.min_length, params.max_length
        ));
    }
    if params.template.is_some() && params.pattern.is_some() {
        fails.push(format!("{}: template and pattern are mutually exclusive", loc));
    }
    if (params.template.is_some() || params.pattern.is_some())
        && params.logical_type != LogicalType::Simple
    {
        fails.push(format!(
            "{}: template/pattern are only valid for the simple logical type",
            loc
        ));
    }
    if params.template.is_some()
        && (range.distinct_percentage.is_some()
            || range.distinct_count.is_some()
            || range.ordered == Some(true))
    {
        fails.push(format!(
            "{}: distinct and ordered constraints are not guaranteed for template columns",
            loc
        ));
    }
    if params.logical_type == LogicalType::Simple
        && params.template.is_none()
        && params.pattern.is_none()
        && params.without_large_letters
        && params.without_small_letters
        && params.without_digits
        && params.without_special_chars
    {
        fails.push(format!("{}: every character class is excluded", loc));
    }
}

fn validate_output(output: &OutputConfig, fails: &mut Vec<String>) {
    if output.partition_files_limit == 0 {
        fails.push("output: partition_files_limit must be positive".to_string());
    }
    match &output.sink {
        SinkConfig::Http(params) | SinkConfig::Tcs(params) => {
            if params.endpoint.is_empty() {
                fails.push("output: http endpoint is required".to_string());
            } else if let Err(e) = url::Url::parse(&params.endpoint) {
                fails.push(format!(
                    "output: http endpoint '{}' is not a valid URL: {}",
                    params.endpoint, e
                ));
            }
            if params.workers_count == 0 {
                fails.push("output: http workers_count must be positive".to_string());
            }
        }
        SinkConfig::Csv(_) | SinkConfig::Parquet(_) | SinkConfig::DevNull => {}
    }
}
