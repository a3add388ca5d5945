//! The uniform value-producer contract.
//!
//! A producer maps a fractional position to a typed value. The integer part
//! of the position is a sequencer emission in `[0, total)`; the fractional
//! part is a deterministic smear that breaks degeneracy when a column has
//! more rows than distinct values. Producers are immutable after
//! `set_total_count` and shared across worker tasks.

use indexmap::IndexMap;

use crate::error::Result;
use crate::generate::value::Value;

/// Values of the columns already generated for the current row, keyed by
/// column name. Only template producers read it.
pub type RowValues = IndexMap<String, Value>;

/// Cap on reported capacities for producers whose true domain exceeds what
/// an f64 position can address without collisions.
pub const MAX_PRODUCER_VALUES: u64 = 1 << 53;

pub trait ValueProducer: Send + Sync {
    /// Maximum number of distinct values this producer can emit.
    fn values_count(&self) -> u64;

    /// Fix the nominal position count. Called once with the range's distinct
    /// budget (already clamped to `values_count`) before generation starts.
    fn set_total_count(&mut self, total: u64);

    /// The value at the given fractional position.
    fn value(&self, number: f64, row: &RowValues) -> Result<Value>;
}

/// Fractional sub-index descent: repeatedly scales the normalized position
/// across a radix, yielding one digit per call. The UUID and pattern
/// producers walk their slots with this.
pub struct FracWalk {
    frac: f64,
}

impl FracWalk {
    pub fn new(number: f64, total: u64) -> FracWalk {
        let total = total.max(1) as f64;
        FracWalk {
            frac: (number / total).clamp(0.0, 1.0 - f64::EPSILON),
        }
    }

    pub fn next(&mut self, radix: usize) -> usize {
        let scaled = self.frac * radix as f64;
        let idx = (scaled as usize).min(radix.saturating_sub(1));
        self.frac = (scaled - idx as f64).clamp(0.0, 1.0 - f64::EPSILON);
        idx
    }
}
