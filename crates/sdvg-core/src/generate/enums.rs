//! Enum producer: a sorted value list (nulls first) indexed by
//! `floor(position / rows_per_value)` where
//! `rows_per_value = ceil(total / len)`.

use crate::config::ColumnKind;
use crate::error::Result;
use crate::generate::producer::{RowValues, ValueProducer};
use crate::generate::value::Value;

pub struct EnumProducer {
    values: Vec<Value>,
    total: u64,
    rows_per_value: u64,
}

impl EnumProducer {
    /// Coerces the raw config entries to the column kind and sorts them for
    /// deterministic indexing. Validation has already vetted coercibility.
    pub fn new(raw: &[serde_json::Value], kind: ColumnKind) -> Result<EnumProducer> {
        let mut values = raw
            .iter()
            .map(|v| Value::coerce(v, kind))
            .collect::<Result<Vec<_>>>()?;
        values.sort_by(|a, b| a.sort_cmp(b));
        Ok(EnumProducer {
            values,
            total: 1,
            rows_per_value: 1,
        })
    }
}

impl ValueProducer for EnumProducer {
    fn values_count(&self) -> u64 {
        self.values.len() as u64
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
        self.rows_per_value = self.total.div_ceil(self.values.len() as u64).max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let idx = ((number / self.rows_per_value as f64) as usize).min(self.values.len() - 1);
        Ok(self.values[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_sorted_nulls_first() {
        let raw = vec![
            serde_json::json!(222),
            serde_json::Value::Null,
            serde_json::json!("111"),
        ];
        let mut p = EnumProducer::new(&raw, ColumnKind::Integer).unwrap();
        p.set_total_count(3);
        let row = RowValues::new();
        assert_eq!(p.value(0.0, &row).unwrap(), Value::Null);
        assert_eq!(p.value(1.0, &row).unwrap(), Value::Int(111));
        assert_eq!(p.value(2.0, &row).unwrap(), Value::Int(222));
    }

    #[test]
    fn test_rows_per_value_buckets() {
        let raw = vec![serde_json::json!("a"), serde_json::json!("b")];
        let mut p = EnumProducer::new(&raw, ColumnKind::String).unwrap();
        p.set_total_count(5);
        // ceil(5 / 2) = 3 rows per value
        let row = RowValues::new();
        for i in 0..3 {
            assert_eq!(
                p.value(i as f64, &row).unwrap(),
                Value::String("a".to_string())
            );
        }
        for i in 3..5 {
            assert_eq!(
                p.value(i as f64, &row).unwrap(),
                Value::String("b".to_string())
            );
        }
    }

    #[test]
    fn test_capacity_is_value_count() {
        let raw = vec![serde_json::json!(1), serde_json::json!(2)];
        let p = EnumProducer::new(&raw, ColumnKind::Integer).unwrap();
        assert_eq!(p.values_count(), 2);
    }

    #[test]
    fn test_fractional_positions_stay_in_bucket() {
        let raw = vec![serde_json::json!(1), serde_json::json!(2)];
        let mut p = EnumProducer::new(&raw, ColumnKind::Integer).unwrap();
        p.set_total_count(2);
        let row = RowValues::new();
        assert_eq!(p.value(0.9, &row).unwrap(), Value::Int(1));
        assert_eq!(p.value(1.9, &row).unwrap(), Value::Int(2));
    }
}
