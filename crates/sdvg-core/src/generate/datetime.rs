//! Datetime producer: interpolates seconds and nanoseconds separately over
//! `[from, to]`, carrying any nanosecond overflow into the seconds.

use chrono::{DateTime, Utc};

use crate::config::DateTimeParams;
use crate::error::{Result, SdvgError};
use crate::generate::producer::{RowValues, ValueProducer, MAX_PRODUCER_VALUES};
use crate::generate::value::Value;

pub struct DateTimeProducer {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    span_secs: i64,
    total: u64,
}

impl DateTimeProducer {
    pub fn new(params: &DateTimeParams) -> DateTimeProducer {
        let (from, to) = params.bounds();
        DateTimeProducer {
            from,
            to,
            span_secs: to.timestamp() - from.timestamp(),
            total: 1,
        }
    }
}

impl ValueProducer for DateTimeProducer {
    fn values_count(&self) -> u64 {
        (self.span_secs as u64)
            .saturating_add(1)
            .min(MAX_PRODUCER_VALUES)
    }

    fn set_total_count(&mut self, total: u64) {
        self.total = total.max(1);
    }

    fn value(&self, number: f64, _row: &RowValues) -> Result<Value> {
        let frac = number / self.total as f64;
        let sec_pos = frac * (self.span_secs as f64 + 1.0);
        let whole = sec_pos.floor();

        let mut secs = self.from.timestamp() + whole as i64;
        let mut nanos =
            self.from.timestamp_subsec_nanos() as i64 + ((sec_pos - whole) * 1e9) as i64;
        if nanos >= 1_000_000_000 {
            secs += 1;
            nanos -= 1_000_000_000;
        }

        let ts = DateTime::<Utc>::from_timestamp(secs, nanos as u32).ok_or_else(|| {
            SdvgError::Internal {
                message: format!("datetime producer built an invalid timestamp {}s", secs),
            }
        })?;
        Ok(Value::Timestamp(ts.min(self.to).max(self.from)))
    }
}
