//! ISBN-13 producer: `978` prefix, nine ranked digits, and the standard
//! alternating-weight check digit.

use crate::error::Result;
use crate::generate::producer::{RowValues, ValueProducer};
use crate::generate::value::Value;

pub struct IsbnProducer {
    total: u64,
}

impl IsbnProducer {
    pub fn new() -> IsbnProducer {
        IsbnProducer { total: 1 }
    }
}

impl Default for IsbnProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueProducer for IsbnProducer {
    fn values_count(&self) -> u64 {
        1_000_000_000
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let body = format!("978{:09}", number as u64);
        let sum: u32 = body
            .bytes()
            .enumerate()
            .map(|(i, b)| {
                let digit = (b - b'0') as u32;
                if i % 2 == 0 {
                    digit
                } else {
                    digit * 3
                }
            })
            .sum();
        let check = (10 - sum % 10) % 10;
        Ok(Value::String(format!("{}{}", body, check)))
    }
}
