//! Column generators.
//!
//! A regular column routes each row index to a range by row slots and draws
//! the next local position from that range's sequencer. A foreign-key
//! column reuses the target column's prepared ranges (producers, seeds,
//! budgets) but walks them with its own sequencer over the target's total
//! distinct domain, so every value it emits is one the target emits too,
//! presented in an independent order (or the target's order when
//! `foreign_key_order` is set).
//!
//! Batch snapshots are consumed under the per-column lock; everything else
//! is immutable and shared across workers.

use std::sync::{Arc, Mutex};

use sha1::{Digest, Sha1};

use crate::config::{Column, ColumnKind};
use crate::error::{Result, SdvgError};
use crate::generate::producer::RowValues;
use crate::generate::random::fast_random_float;
use crate::generate::range::{
    prepare_ranges, range_for_position, range_for_row, PreparedRange,
};
use crate::generate::value::Value;
use crate::sequence::Sequencer;

/// One sequencer emission, snapshotted for replay by any worker.
#[derive(Debug, Clone, Copy)]
pub struct BatchEntry {
    pub range_idx: usize,
    pub number: f64,
    pub null: bool,
}

/// Column seed: the run seed plus the byte sum of `sha1(model.column)`, so
/// renaming or re-scoping a column moves its stream.
pub fn derive_seed(base_seed: u64, model: &str, column: &str) -> u64 {
    let digest = Sha1::digest(format!("{}.{}", model, column).as_bytes());
    let sum: u64 = digest.iter().map(|b| *b as u64).sum();
    base_seed.wrapping_add(sum)
}

enum Wiring {
    /// Row-routed ranges with one sub-sequencer per range.
    Regular { sequencers: Vec<Sequencer> },
    /// A single sequencer over the target's total distinct domain.
    ForeignKey { sequencer: Sequencer },
}

struct ColumnState {
    row_cursor: u64,
    wiring: Wiring,
}

pub struct ColumnGenerator {
    pub model_name: String,
    pub name: String,
    pub kind: ColumnKind,
    ranges: Arc<Vec<PreparedRange>>,
    total_distinct: u64,
    state: Mutex<ColumnState>,
}

impl ColumnGenerator {
    /// Build a regular (non-FK) column generator over `rows` rows.
    pub fn new(
        model_name: &str,
        column: &Column,
        rows: u64,
        base_seed: u64,
    ) -> Result<ColumnGenerator> {
        let kind = column.kind.ok_or_else(|| SdvgError::Internal {
            message: format!(
                "regular column '{}.{}' has no kind",
                model_name, column.name
            ),
        })?;
        let seed = derive_seed(base_seed, model_name, &column.name);
        let ranges = prepare_ranges(model_name, column, rows, seed)?;
        let sequencers = ranges
            .iter()
            .map(|r| Sequencer::new(r.ordered, r.distinct, r.row_count.max(1), r.seed))
            .collect();
        let total_distinct = ranges.iter().map(|r| r.distinct).sum();

        Ok(ColumnGenerator {
            model_name: model_name.to_string(),
            name: column.name.clone(),
            kind,
            ranges: Arc::new(ranges),
            total_distinct,
            state: Mutex::new(ColumnState {
                row_cursor: 0,
                wiring: Wiring::Regular { sequencers },
            }),
        })
    }

    /// Build a foreign-key generator mirroring `target` over `rows` rows of
    /// the referencing model.
    pub fn new_foreign_key(
        model_name: &str,
        column: &Column,
        target: &ColumnGenerator,
        rows: u64,
        base_seed: u64,
    ) -> Result<ColumnGenerator> {
        let seed = derive_seed(base_seed, model_name, &column.name);
        let sequencer = Sequencer::new(
            column.foreign_key_order,
            target.total_distinct,
            rows.max(1),
            seed,
        );
        Ok(ColumnGenerator {
            model_name: model_name.to_string(),
            name: column.name.clone(),
            kind: target.kind,
            ranges: Arc::clone(&target.ranges),
            total_distinct: target.total_distinct,
            state: Mutex::new(ColumnState {
                row_cursor: 0,
                wiring: Wiring::ForeignKey { sequencer },
            }),
        })
    }

    pub fn total_distinct(&self) -> u64 {
        self.total_distinct
    }

    /// Snapshot `size` emissions under the column lock. Workers replay the
    /// snapshot in any order; the captured numbers are pure functions of
    /// the emitted positions.
    pub fn next_batch(&self, size: usize) -> Result<Vec<BatchEntry>> {
        let mut state = self.state.lock().map_err(|_| SdvgError::Internal {
            message: format!("column '{}' state lock poisoned", self.name),
        })?;
        let mut entries = Vec::with_capacity(size);
        for _ in 0..size {
            let g = state.row_cursor;
            state.row_cursor += 1;
            let (range_idx, position) = match &mut state.wiring {
                Wiring::Regular { sequencers } => {
                    let idx = range_for_row(&self.ranges, g)?;
                    (idx, sequencers[idx].next())
                }
                Wiring::ForeignKey { sequencer } => {
                    let p = sequencer.next();
                    let idx = range_for_position(&self.ranges, p)?;
                    (idx, p - self.ranges[idx].distinct_offset)
                }
            };
            entries.push(self.entry_for(range_idx, position));
        }
        Ok(entries)
    }

    /// Advance past `n` rows without materializing values.
    pub fn skip_rows(&self, n: u64) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| SdvgError::Internal {
            message: format!("column '{}' state lock poisoned", self.name),
        })?;
        let start = state.row_cursor;
        match &mut state.wiring {
            Wiring::Regular { sequencers } => {
                for (idx, r) in self.ranges.iter().enumerate() {
                    let lo = (r.row_offset).max(start);
                    let hi = (r.row_offset + r.row_count).min(start + n);
                    if hi > lo {
                        sequencers[idx].skip(hi - lo);
                    }
                }
            }
            Wiring::ForeignKey { sequencer } => sequencer.skip(n),
        }
        state.row_cursor = start + n;
        Ok(())
    }

    /// Produce the value for a snapshotted entry. `row` carries the columns
    /// already generated for this row, for template producers.
    pub fn value_at(&self, entry: &BatchEntry, row: &RowValues) -> Result<Value> {
        self.ranges[entry.range_idx]
            .producer
            .value(entry.number, row)
    }

    fn entry_for(&self, range_idx: usize, position: u64) -> BatchEntry {
        // Decorrelates null sampling from the value smear; both stay keyed
        // by the range seed and position so foreign keys reproduce them.
        const NULL_SALT: u64 = 0xA076_1D64_78BD_642F;

        let r = &self.ranges[range_idx];
        let smear = fast_random_float(r.seed.wrapping_add(position)) * r.data_factor;
        let null = r.null_percentage > 0.0
            && fast_random_float((r.seed ^ NULL_SALT).wrapping_add(position))
                < r.null_percentage;
        BatchEntry {
            range_idx,
            number: position as f64 + smear,
            null,
        }
    }
}
