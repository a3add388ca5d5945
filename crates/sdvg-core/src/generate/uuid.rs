//! UUID producer: walks 16 bytes by fractional sub-index descent over
//! `[0, 255]`, then stamps the version-4 and variant bits.

use uuid::Uuid;

use crate::error::Result;
use crate::generate::producer::{FracWalk, RowValues, ValueProducer, MAX_PRODUCER_VALUES};
use crate::generate::value::Value;

pub struct UuidProducer {
    total: u64,
}

impl UuidProducer {
    pub fn new() -> UuidProducer {
        UuidProducer { total: 1 }
    }
}

impl Default for UuidProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueProducer for UuidProducer {
    fn values_count(&self) -> u64 {
        MAX_PRODUCER_VALUES
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let mut walk = FracWalk::new(number, self.total);
        let mut bytes = [0u8; 16];
        for byte in bytes.iter_mut() {
            *byte = walk.next(256) as u8;
        }
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Ok(Value::Uuid(Uuid::from_bytes(bytes)))
    }
}
