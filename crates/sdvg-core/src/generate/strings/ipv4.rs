//! IPv4 producer: the 256 octet strings sorted lexicographically form a
//! radix table; the position's base-256 digits pick one octet per dot
//! segment, so the produced addresses are lexicographically ordered as
//! strings.

use crate::error::Result;
use crate::generate::producer::{RowValues, ValueProducer};
use crate::generate::value::Value;

pub struct Ipv4Producer {
    octets: Vec<String>,
    total: u64,
}

impl Ipv4Producer {
    pub fn new() -> Ipv4Producer {
        let mut octets: Vec<String> = (0u16..256).map(|o| o.to_string()).collect();
        octets.sort_unstable();
        Ipv4Producer { octets, total: 1 }
    }
}

impl Default for Ipv4Producer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueProducer for Ipv4Producer {
    fn values_count(&self) -> u64 {
        1 << 32
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let rank = number as u64;
        let segments = [
            (rank >> 24) & 0xFF,
            (rank >> 16) & 0xFF,
            (rank >> 8) & 0xFF,
            rank & 0xFF,
        ];
        let out = segments
            .iter()
            .map(|&i| self.octets[i as usize].as_str())
            .collect::<Vec<_>>()
            .join(".");
        Ok(Value::String(out))
    }
}
