//! # Generation Engine
//!
//! Deterministic value production: sequencer-driven positions flow through
//! range routing into per-kind producers, batched into replayable snapshots
//! that workers turn into rows in template-dependency order.

pub mod batch;
pub mod column;
pub mod datetime;
pub mod enums;
pub mod numeric;
pub mod producer;
pub mod random;
pub mod range;
pub mod strings;
pub mod topo;
pub mod uuid;
pub mod value;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::GenerationConfig;
use crate::error::{Result, SdvgError};

use batch::ModelColumns;
use column::ColumnGenerator;

/// Build the column generators for every model.
///
/// Regular columns first, foreign keys second: a foreign key borrows the
/// target column's prepared ranges, and targets may not themselves be
/// foreign keys, so two passes always suffice. Ignored models still get
/// generators because they may be foreign-key targets.
pub fn build_generators(
    config: &GenerationConfig,
) -> Result<IndexMap<String, Arc<ModelColumns>>> {
    let seed = config.random_seed;
    let mut regular: HashMap<(String, String), Arc<ColumnGenerator>> = HashMap::new();

    for model in config.models.values() {
        for column in &model.columns {
            if column.foreign_key.is_none() {
                let generator =
                    ColumnGenerator::new(&model.name, column, model.rows_count, seed)?;
                regular.insert(
                    (model.name.clone(), column.name.clone()),
                    Arc::new(generator),
                );
            }
        }
    }

    let mut result = IndexMap::new();
    for model in config.models.values() {
        let mut columns = Vec::with_capacity(model.columns.len());
        for column in &model.columns {
            let generator = if let Some((target_model, target_column)) =
                column.foreign_key_parts()
            {
                let target = regular
                    .get(&(target_model.to_string(), target_column.to_string()))
                    .ok_or_else(|| SdvgError::Internal {
                        message: format!(
                            "foreign key target '{}.{}' has no generator",
                            target_model, target_column
                        ),
                    })?;
                Arc::new(ColumnGenerator::new_foreign_key(
                    &model.name,
                    column,
                    target,
                    model.rows_count,
                    seed,
                )?)
            } else {
                Arc::clone(&regular[&(model.name.clone(), column.name.clone())])
            };
            columns.push(generator);
        }
        let order = topo::intra_row_order(model)?;
        result.insert(
            model.name.clone(),
            Arc::new(ModelColumns { columns, order }),
        );
    }
    Ok(result)
}
