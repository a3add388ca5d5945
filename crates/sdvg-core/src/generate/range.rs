//! Range preparation: row slots, distinct budgets and producers.
//!
//! A column's rows are split across its ranges by weight: each range
//! reserves `ceil(rows * share)` row slots left-to-right and the last range
//! absorbs the residue so the slots sum to exactly `rows`. Each range owns
//! a producer and a distinct budget; the budget caps how many distinct
//! positions the range's sequencer may emit.

use std::sync::Arc;

use crate::config::{Column, ColumnKind, Range};
use crate::error::{Result, SdvgError};
use crate::generate::datetime::DateTimeProducer;
use crate::generate::enums::EnumProducer;
use crate::generate::numeric::{FloatProducer, IntegerProducer};
use crate::generate::producer::ValueProducer;
use crate::generate::strings::make_string_producer;
use crate::generate::uuid::UuidProducer;

/// One range, fully resolved for generation.
pub struct PreparedRange {
    /// First row index of this range's slot span.
    pub row_offset: u64,
    /// Rows in the span. The last range absorbs the rounding residue.
    pub row_count: u64,
    /// Distinct position budget of this range.
    pub distinct: u64,
    /// Cumulative distinct offset, used by foreign keys to route a global
    /// position to a range.
    pub distinct_offset: u64,
    pub null_percentage: f64,
    pub ordered: bool,
    /// Seed of this range's sequencer, smear and null sampling. Foreign
    /// keys reuse the target's prepared ranges, so values and nulls
    /// coincide at equal positions.
    pub seed: u64,
    /// `1 - distinct / capacity`: scales the fractional value smear and
    /// vanishes when the budget saturates the producer.
    pub data_factor: f64,
    pub producer: Arc<dyn ValueProducer>,
}

impl std::fmt::Debug for PreparedRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRange")
            .field("row_offset", &self.row_offset)
            .field("row_count", &self.row_count)
            .field("distinct", &self.distinct)
            .field("distinct_offset", &self.distinct_offset)
            .field("null_percentage", &self.null_percentage)
            .field("ordered", &self.ordered)
            .field("seed", &self.seed)
            .field("data_factor", &self.data_factor)
            .finish()
    }
}

/// Resolve the ranges of a typed column over `rows` rows.
pub fn prepare_ranges(
    model_name: &str,
    column: &Column,
    rows: u64,
    column_seed: u64,
) -> Result<Vec<PreparedRange>> {
    let kind = column.kind.ok_or_else(|| SdvgError::Internal {
        message: format!(
            "prepare_ranges on foreign key column '{}.{}'",
            model_name, column.name
        ),
    })?;

    let mut prepared = Vec::with_capacity(column.ranges.len());
    let mut row_offset = 0u64;
    let mut distinct_offset = 0u64;
    let last = column.ranges.len().saturating_sub(1);

    for (idx, range) in column.ranges.iter().enumerate() {
        let remaining = rows.saturating_sub(row_offset);
        let row_count = if idx == last {
            remaining
        } else {
            let reserved = (rows as f64 * range.share()).ceil() as u64;
            reserved.min(remaining)
        };

        let mut producer = make_producer(column, kind, range)?;
        let capacity = producer.values_count().max(1);

        let mut distinct = row_count.max(1);
        if let Some(pct) = range.distinct_percentage {
            distinct = ((distinct as f64 * pct).ceil() as u64).max(1);
        } else if let Some(count) = range.distinct_count {
            if count > capacity {
                return Err(SdvgError::Config {
                    message: format!(
                        "column '{}.{}' range {}: distinct_count {} exceeds the {} distinct values this range can produce",
                        model_name, column.name, idx, count, capacity
                    ),
                });
            }
            distinct = count;
        }
        distinct = distinct.min(capacity);
        producer.set_total_count(distinct);

        prepared.push(PreparedRange {
            row_offset,
            row_count,
            distinct,
            distinct_offset,
            null_percentage: range.null_percentage,
            ordered: range.ordered(),
            seed: column_seed.wrapping_add(idx as u64),
            data_factor: 1.0 - distinct as f64 / capacity as f64,
            producer: Arc::from(producer),
        });
        row_offset += row_count;
        distinct_offset += distinct;
    }

    Ok(prepared)
}

/// Index of the range owning row `g`, by row-slot spans.
pub fn range_for_row(ranges: &[PreparedRange], g: u64) -> Result<usize> {
    for (idx, r) in ranges.iter().enumerate() {
        if g >= r.row_offset && g < r.row_offset + r.row_count {
            return Ok(idx);
        }
    }
    Err(SdvgError::Internal {
        message: format!("row index {} falls outside every range", g),
    })
}

/// Index of the range owning the global distinct position `p`, by
/// cumulative distinct offsets. Foreign-key routing.
pub fn range_for_position(ranges: &[PreparedRange], p: u64) -> Result<usize> {
    for (idx, r) in ranges.iter().enumerate() {
        if p >= r.distinct_offset && p < r.distinct_offset + r.distinct {
            return Ok(idx);
        }
    }
    Err(SdvgError::Internal {
        message: format!("distinct position {} falls outside every range", p),
    })
}

fn make_producer(
    column: &Column,
    kind: ColumnKind,
    range: &Range,
) -> Result<Box<dyn ValueProducer>> {
    if let Some(values) = &range.values {
        return Ok(Box::new(EnumProducer::new(values, kind)?));
    }
    let producer: Box<dyn ValueProducer> = match kind {
        ColumnKind::Integer => Box::new(IntegerProducer::new(
            &range.integer_params.clone().unwrap_or_default(),
        )),
        ColumnKind::Float => Box::new(FloatProducer::new(
            &range.float_params.clone().unwrap_or_default(),
        )),
        ColumnKind::DateTime => Box::new(DateTimeProducer::new(
            &range.datetime_params.clone().unwrap_or_default(),
        )),
        ColumnKind::Uuid => Box::new(UuidProducer::new()),
        ColumnKind::String => make_string_producer(
            &column.name,
            &range.string_params.clone().unwrap_or_default(),
        )?,
    };
    Ok(producer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntegerParams;

    fn int_column(ranges: Vec<Range>) -> Column {
        Column {
            name: "a".to_string(),
            kind: Some(ColumnKind::Integer),
            ranges,
            ..Column::default()
        }
    }

    fn shared(share: f64) -> Range {
        Range {
            range_percentage: Some(share),
            ..Range::default()
        }
    }

    #[test]
    fn test_row_slots_ceil_and_last_absorbs() {
        // 3 ranges over 10 rows: ceil(10 * 0.33) = 4, ceil = 4, last = 2
        let column = int_column(vec![shared(0.33), shared(0.33), shared(0.34)]);
        let ranges = prepare_ranges("m", &column, 10, 7).unwrap();
        assert_eq!(ranges[0].row_count, 4);
        assert_eq!(ranges[1].row_count, 4);
        assert_eq!(ranges[2].row_count, 2);
        let total: u64 = ranges.iter().map(|r| r.row_count).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_range_for_row_routing() {
        let column = int_column(vec![shared(0.25), shared(0.5), shared(0.25)]);
        let ranges = prepare_ranges("m", &column, 200, 0).unwrap();
        assert_eq!(range_for_row(&ranges, 0).unwrap(), 0);
        assert_eq!(range_for_row(&ranges, 49).unwrap(), 0);
        assert_eq!(range_for_row(&ranges, 50).unwrap(), 1);
        assert_eq!(range_for_row(&ranges, 149).unwrap(), 1);
        assert_eq!(range_for_row(&ranges, 150).unwrap(), 2);
        assert_eq!(range_for_row(&ranges, 199).unwrap(), 2);
        assert!(range_for_row(&ranges, 200).is_err());
    }

    #[test]
    fn test_distinct_budget_clamped_to_capacity() {
        // Domain of [1, 5] holds 5 values; budget must clamp from 100 to 5.
        let column = int_column(vec![Range {
            integer_params: Some(IntegerParams {
                bit_width: 8,
                from: Some(1),
                to: Some(5),
            }),
            ..Range::default()
        }]);
        let ranges = prepare_ranges("m", &column, 100, 0).unwrap();
        assert_eq!(ranges[0].distinct, 5);
        assert!(ranges[0].data_factor.abs() < f64::EPSILON);
    }

    #[test]
    fn test_explicit_distinct_over_capacity_rejected() {
        let column = int_column(vec![Range {
            distinct_count: Some(100),
            integer_params: Some(IntegerParams {
                bit_width: 8,
                from: Some(1),
                to: Some(5),
            }),
            ..Range::default()
        }]);
        let err = prepare_ranges("m", &column, 100, 0).unwrap_err();
        assert!(format!("{}", err).contains("distinct_count 100 exceeds"));
    }

    #[test]
    fn test_distinct_percentage_scales_budget() {
        let column = int_column(vec![Range {
            distinct_percentage: Some(0.1),
            ..Range::default()
        }]);
        let ranges = prepare_ranges("m", &column, 1000, 0).unwrap();
        assert_eq!(ranges[0].distinct, 100);
    }

    #[test]
    fn test_distinct_offsets_cumulative() {
        let column = int_column(vec![
            Range {
                range_percentage: Some(0.5),
                distinct_count: Some(10),
                ..Range::default()
            },
            Range {
                range_percentage: Some(0.5),
                distinct_count: Some(7),
                ..Range::default()
            },
        ]);
        let ranges = prepare_ranges("m", &column, 100, 0).unwrap();
        assert_eq!(ranges[0].distinct_offset, 0);
        assert_eq!(ranges[1].distinct_offset, 10);
        assert_eq!(range_for_position(&ranges, 9).unwrap(), 0);
        assert_eq!(range_for_position(&ranges, 10).unwrap(), 1);
        assert_eq!(range_for_position(&ranges, 16).unwrap(), 1);
        assert!(range_for_position(&ranges, 17).is_err());
    }
}
