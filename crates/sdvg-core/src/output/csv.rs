//! CSV writer for one partition directory.
//!
//! Files roll at `rows_per_file` rows as `<model>_<i>.csv`, each with a
//! header row unless suppressed. A 1-second flush ticker commits the
//! buffered writer and moves the pending-row delta to the durable counter
//! backing checkpoints; flush errors surface on the next `write_row`. On
//! resume the writer appends to the highest-numbered existing file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::CsvParams;
use crate::error::{Result, SdvgError};
use crate::generate::value::Value;

const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

pub struct CsvWriter {
    dir: PathBuf,
    model_name: String,
    params: CsvParams,
    header: Option<String>,
    rows_per_file: u64,
    file_index: u64,
    rows_in_file: u64,
    /// Current file, shared with the flush ticker. `None` between files.
    out: Arc<Mutex<Option<BufWriter<File>>>>,
    /// Rows written but not yet committed by a flush.
    pending: Arc<AtomicU64>,
    /// Durable row counter shared with the model's checkpoint ticker.
    rows_flushed: Arc<AtomicU64>,
    flush_error: Arc<Mutex<Option<String>>>,
    ticker: Option<JoinHandle<()>>,
}

impl CsvWriter {
    pub fn new(
        dir: PathBuf,
        model_name: &str,
        params: CsvParams,
        column_names: &[String],
        rows_per_file: u64,
        resume: bool,
        rows_flushed: Arc<AtomicU64>,
    ) -> Result<CsvWriter> {
        std::fs::create_dir_all(&dir).map_err(|e| SdvgError::Io {
            message: format!("creating partition dir {}", dir.display()),
            source: e,
        })?;

        let header = if params.without_headers {
            None
        } else {
            Some(
                column_names
                    .iter()
                    .map(|c| csv_escape(c))
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };

        let mut writer = CsvWriter {
            dir,
            model_name: model_name.to_string(),
            params,
            header,
            rows_per_file: rows_per_file.max(1),
            file_index: 0,
            rows_in_file: 0,
            out: Arc::new(Mutex::new(None)),
            pending: Arc::new(AtomicU64::new(0)),
            rows_flushed,
            flush_error: Arc::new(Mutex::new(None)),
            ticker: None,
        };

        if resume {
            writer.reopen_last_file()?;
        }
        writer.start_ticker();
        Ok(writer)
    }

    /// Find the highest-numbered existing data file and continue filling it,
    /// so a resumed run is byte-identical to an uninterrupted one.
    fn reopen_last_file(&mut self) -> Result<()> {
        let prefix = format!("{}_", self.model_name);
        let mut last: Option<u64> = None;
        let entries = std::fs::read_dir(&self.dir).map_err(|e| SdvgError::Io {
            message: format!("scanning {}", self.dir.display()),
            source: e,
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(idx) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|n| n.parse::<u64>().ok())
            {
                last = Some(last.map_or(idx, |l: u64| l.max(idx)));
            }
        }
        let Some(idx) = last else { return Ok(()) };

        let path = self.file_path(idx);
        let file = File::open(&path).map_err(|e| SdvgError::Io {
            message: format!("reading {}", path.display()),
            source: e,
        })?;
        let mut lines = BufReader::new(file).lines().count() as u64;
        if self.header.is_some() {
            lines = lines.saturating_sub(1);
        }

        if lines >= self.rows_per_file {
            self.file_index = idx + 1;
            self.rows_in_file = 0;
            return Ok(());
        }

        self.file_index = idx;
        self.rows_in_file = lines;
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| SdvgError::Io {
                message: format!("appending to {}", path.display()),
                source: e,
            })?;
        *self.out.lock().expect("csv buffer") = Some(BufWriter::new(file));
        Ok(())
    }

    /// Periodic commit. Skipped outside a tokio runtime (sync unit tests);
    /// `teardown` always performs the final flush.
    fn start_ticker(&mut self) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        let out = Arc::clone(&self.out);
        let pending = Arc::clone(&self.pending);
        let rows_flushed = Arc::clone(&self.rows_flushed);
        let flush_error = Arc::clone(&self.flush_error);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut guard = out.lock().expect("csv buffer");
                if let Some(buf) = guard.as_mut() {
                    let delta = pending.swap(0, Ordering::SeqCst);
                    match buf.flush() {
                        Ok(()) => {
                            rows_flushed.fetch_add(delta, Ordering::SeqCst);
                        }
                        Err(e) => {
                            pending.fetch_add(delta, Ordering::SeqCst);
                            *flush_error.lock().expect("flush error") = Some(e.to_string());
                        }
                    }
                }
            }
        }));
    }

    fn file_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.model_name, index))
    }

    fn open_next_file(&mut self) -> Result<()> {
        let path = self.file_path(self.file_index);
        let file = File::create(&path).map_err(|e| SdvgError::Io {
            message: format!("creating {}", path.display()),
            source: e,
        })?;
        let mut buf = BufWriter::new(file);
        if let Some(header) = &self.header {
            writeln!(buf, "{}", header).map_err(|e| SdvgError::Io {
                message: format!("writing header to {}", path.display()),
                source: e,
            })?;
        }
        *self.out.lock().expect("csv buffer") = Some(buf);
        Ok(())
    }

    /// Flush and drop the current file, crediting the durable counter.
    fn commit_current(&mut self) -> Result<()> {
        let mut guard = self.out.lock().expect("csv buffer");
        if let Some(mut buf) = guard.take() {
            buf.flush().map_err(|e| SdvgError::Io {
                message: format!("flushing {}", self.file_path(self.file_index).display()),
                source: e,
            })?;
            self.rows_flushed
                .fetch_add(self.pending.swap(0, Ordering::SeqCst), Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn write_row(&mut self, row: &[Value]) -> Result<()> {
        if let Some(message) = self.flush_error.lock().expect("flush error").take() {
            return Err(SdvgError::Sink {
                model: self.model_name.clone(),
                message: format!("csv flush failed: {}", message),
            });
        }

        if self.rows_in_file >= self.rows_per_file {
            self.commit_current()?;
            self.file_index += 1;
            self.rows_in_file = 0;
        }
        if self.out.lock().expect("csv buffer").is_none() {
            self.open_next_file()?;
        }

        let line = row
            .iter()
            .map(|v| {
                csv_escape(
                    &v.to_csv_field(self.params.float_precision, &self.params.datetime_format),
                )
            })
            .collect::<Vec<_>>()
            .join(",");

        let mut guard = self.out.lock().expect("csv buffer");
        let buf = guard.as_mut().expect("file opened above");
        writeln!(buf, "{}", line).map_err(|e| SdvgError::Io {
            message: format!("writing row to {}", self.file_path(self.file_index).display()),
            source: e,
        })?;
        drop(guard);

        self.rows_in_file += 1;
        self.pending.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn teardown(&mut self) -> Result<()> {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.commit_current()
    }
}

impl Drop for CsvWriter {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Quote a field when it holds a comma, quote or newline.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CsvParams {
        CsvParams::default()
    }

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let flushed = Arc::new(AtomicU64::new(0));
        let mut writer = CsvWriter::new(
            dir.path().to_path_buf(),
            "users",
            params(),
            &columns(),
            100,
            false,
            Arc::clone(&flushed),
        )
        .unwrap();

        writer
            .write_row(&[Value::Int(1), Value::String("Ada".into())])
            .unwrap();
        writer.write_row(&[Value::Int(2), Value::Null]).unwrap();
        writer.teardown().unwrap();

        let content = read(dir.path().join("users_0.csv"));
        assert_eq!(content, "id,name\n1,Ada\n2,\n");
        assert_eq!(flushed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rolls_at_rows_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let flushed = Arc::new(AtomicU64::new(0));
        let mut writer = CsvWriter::new(
            dir.path().to_path_buf(),
            "m",
            CsvParams {
                without_headers: true,
                ..params()
            },
            &columns(),
            3,
            false,
            flushed,
        )
        .unwrap();

        for i in 0..7 {
            writer.write_row(&[Value::Int(i), Value::Null]).unwrap();
        }
        writer.teardown().unwrap();

        assert_eq!(read(dir.path().join("m_0.csv")).lines().count(), 3);
        assert_eq!(read(dir.path().join("m_1.csv")).lines().count(), 3);
        assert_eq!(read(dir.path().join("m_2.csv")).lines().count(), 1);
    }

    #[test]
    fn test_resume_appends_to_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let flushed = Arc::new(AtomicU64::new(0));
        let mut first = CsvWriter::new(
            dir.path().to_path_buf(),
            "m",
            CsvParams {
                without_headers: true,
                ..params()
            },
            &columns(),
            4,
            false,
            Arc::clone(&flushed),
        )
        .unwrap();
        for i in 0..6 {
            first.write_row(&[Value::Int(i), Value::Null]).unwrap();
        }
        first.teardown().unwrap();

        let mut resumed = CsvWriter::new(
            dir.path().to_path_buf(),
            "m",
            CsvParams {
                without_headers: true,
                ..params()
            },
            &columns(),
            4,
            true,
            flushed,
        )
        .unwrap();
        for i in 6..8 {
            resumed.write_row(&[Value::Int(i), Value::Null]).unwrap();
        }
        resumed.teardown().unwrap();

        assert_eq!(read(dir.path().join("m_0.csv")), "0,\n1,\n2,\n3,\n");
        assert_eq!(read(dir.path().join("m_1.csv")), "4,\n5,\n6,\n7,\n");
    }

    #[test]
    fn test_float_precision_and_unix_datetime() {
        let dir = tempfile::tempdir().unwrap();
        let flushed = Arc::new(AtomicU64::new(0));
        let mut writer = CsvWriter::new(
            dir.path().to_path_buf(),
            "m",
            CsvParams {
                without_headers: true,
                float_precision: 2,
                datetime_format: "unix".to_string(),
            },
            &columns(),
            10,
            false,
            flushed,
        )
        .unwrap();

        let ts = chrono::DateTime::from_timestamp(1700000000, 0).unwrap();
        writer
            .write_row(&[Value::Float(1.23456), Value::Timestamp(ts)])
            .unwrap();
        writer.teardown().unwrap();

        assert_eq!(read(dir.path().join("m_0.csv")), "1.23,1700000000\n");
    }
}
