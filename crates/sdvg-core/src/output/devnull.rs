//! The null sink: rows go to a user-supplied handler or nowhere. Tests and
//! throughput benches use it to exercise the pipeline without I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::generate::value::Value;

pub type RowHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

pub struct DevNullWriter {
    handler: Option<RowHandler>,
    rows_flushed: Arc<AtomicU64>,
}

impl DevNullWriter {
    pub fn new(handler: Option<RowHandler>, rows_flushed: Arc<AtomicU64>) -> DevNullWriter {
        DevNullWriter {
            handler,
            rows_flushed,
        }
    }

    pub fn write_row(&mut self, row: &[Value]) -> Result<()> {
        if let Some(handler) = &self.handler {
            handler(row);
        }
        self.rows_flushed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}
