//! Integer and float producers: linear position-to-value maps over
//! `[from, to]`, monotone in the position and injective whenever the domain
//! holds at least as many values as the nominal count.

use crate::config::{FloatParams, IntegerParams};
use crate::error::Result;
use crate::generate::producer::{RowValues, ValueProducer, MAX_PRODUCER_VALUES};
use crate::generate::value::Value;

pub struct IntegerProducer {
    from: i64,
    to: i64,
    /// Inclusive domain size; `i128` because the full 64-bit span does not
    /// fit a u64.
    domain: i128,
    total: u64,
}

impl IntegerProducer {
    pub fn new(params: &IntegerParams) -> IntegerProducer {
        let (from, to) = params.bounds();
        IntegerProducer {
            from,
            to,
            domain: to as i128 - from as i128 + 1,
            total: 1,
        }
    }
}

impl ValueProducer for IntegerProducer {
    fn values_count(&self) -> u64 {
        self.domain.min(MAX_PRODUCER_VALUES as i128) as u64
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let frac = number / self.total as f64;
        let offset = (frac * self.domain as f64) as i128;
        let v = (self.from as i128 + offset).clamp(self.from as i128, self.to as i128);
        Ok(Value::Int(v as i64))
    }
}

pub struct FloatProducer {
    from: f64,
    to: f64,
    single: bool,
    total: u64,
}

impl FloatProducer {
    pub fn new(params: &FloatParams) -> FloatProducer {
        let (from, to) = params.bounds();
        FloatProducer {
            from,
            to,
            single: params.bit_width == 32,
            total: 1,
        }
    }
}

impl ValueProducer for FloatProducer {
    fn values_count(&self) -> u64 {
        MAX_PRODUCER_VALUES
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let frac = number / self.total as f64;
        let mut v = self.from + frac * (self.to - self.from);
        if self.single {
            v = v as f32 as f64;
        }
        Ok(Value::Float(v.clamp(self.from, self.to)))
    }
}
