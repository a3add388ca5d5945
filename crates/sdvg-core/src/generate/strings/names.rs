//! Locale-backed producers: names by linear index into the sorted list,
//! phone numbers by substituting the position's digits into the locale's
//! `#` slots.

use crate::error::Result;
use crate::generate::producer::{RowValues, ValueProducer};
use crate::generate::value::Value;

/// First or last names picked from a sorted locale table.
pub struct NameProducer {
    list: &'static [&'static str],
    total: u64,
}

impl NameProducer {
    pub fn new(list: &'static [&'static str]) -> NameProducer {
        NameProducer { list, total: 1 }
    }
}

impl ValueProducer for NameProducer {
    fn values_count(&self) -> u64 {
        self.list.len() as u64
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let idx = (number as usize).min(self.list.len() - 1);
        Ok(Value::String(self.list[idx].to_string()))
    }
}

/// Phone numbers: the locale shape with every `#` replaced by one digit of
/// the zero-padded ordered position.
pub struct PhoneProducer {
    pattern: &'static str,
    slots: usize,
    total: u64,
}

impl PhoneProducer {
    pub fn new(pattern: &'static str) -> PhoneProducer {
        PhoneProducer {
            pattern,
            slots: pattern.chars().filter(|&c| c == '#').count(),
            total: 1,
        }
    }
}

impl ValueProducer for PhoneProducer {
    fn values_count(&self) -> u64 {
        10u64.checked_pow(self.slots as u32).unwrap_or(u64::MAX)
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let digits = format!("{:0width$}", number as u64, width = self.slots);
        let mut next = digits.chars();
        let out: String = self
            .pattern
            .chars()
            .map(|c| {
                if c == '#' {
                    next.next().unwrap_or('0')
                } else {
                    c
                }
            })
            .collect();
        Ok(Value::String(out))
    }
}
