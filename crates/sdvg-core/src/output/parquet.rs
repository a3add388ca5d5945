//! Parquet writer for one partition directory.
//!
//! Rows buffer into Arrow record batches and land in
//! `<model>_<i>_<part>.parquet`: `i` rolls with `rows_per_file`, `part` is
//! the resume generation (each resumed run opens fresh files one past the
//! highest existing part, and the row count of existing files restores the
//! rolling state). Column physical types are the smallest that cover the
//! configured bit widths; encodings come from a fixed per-kind table with
//! per-column overrides.

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float32Builder, Float64Builder, Int16Builder, Int32Builder, Int64Builder,
    Int8Builder, StringBuilder, TimestampMicrosecondBuilder, TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, Encoding};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::schema::types::ColumnPath;

use crate::config::{ColumnKind, ParquetEncoding, ParquetParams, TimestampUnit};
use crate::error::{Result, SdvgError};
use crate::generate::value::{DataRow, Value};
use crate::output::ColumnMeta;

/// Rows buffered before they are cut into a record batch.
const BATCH_ROWS: usize = 1024;

pub struct ParquetWriter {
    dir: PathBuf,
    model_name: String,
    unit: TimestampUnit,
    columns: Vec<ColumnMeta>,
    schema: SchemaRef,
    props: WriterProperties,
    rows_per_file: u64,
    file_index: u64,
    rows_in_file: u64,
    part: u64,
    writer: Option<ArrowWriter<File>>,
    buffer: Vec<DataRow>,
    rows_flushed: Arc<AtomicU64>,
}

impl ParquetWriter {
    pub fn new(
        dir: PathBuf,
        model_name: &str,
        params: &ParquetParams,
        columns: Vec<ColumnMeta>,
        rows_per_file: u64,
        resume: bool,
        rows_flushed: Arc<AtomicU64>,
    ) -> Result<ParquetWriter> {
        std::fs::create_dir_all(&dir).map_err(|e| SdvgError::Io {
            message: format!("creating partition dir {}", dir.display()),
            source: e,
        })?;

        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|meta| Field::new(&meta.name, arrow_type(meta, params.datetime_format), meta.nullable))
                .collect::<Vec<_>>(),
        ));
        let props = writer_properties(&columns, params)?;

        let mut writer = ParquetWriter {
            dir,
            model_name: model_name.to_string(),
            unit: params.datetime_format,
            columns,
            schema,
            props,
            rows_per_file: rows_per_file.max(1),
            file_index: 0,
            rows_in_file: 0,
            part: 0,
            writer: None,
            buffer: Vec::with_capacity(BATCH_ROWS),
            rows_flushed,
        };
        if resume {
            writer.restore_rolling_state()?;
        }
        Ok(writer)
    }

    /// On resume: the next part number is one past the highest existing
    /// part, and the rolling position comes from the row counts of every
    /// existing file's metadata.
    fn restore_rolling_state(&mut self) -> Result<()> {
        let prefix = format!("{}_", self.model_name);
        let mut max_part: Option<u64> = None;
        let mut total_rows = 0u64;

        let entries = std::fs::read_dir(&self.dir).map_err(|e| SdvgError::Io {
            message: format!("scanning {}", self.dir.display()),
            source: e,
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".parquet"))
            else {
                continue;
            };
            let Some((_, part)) = stem.split_once('_') else {
                continue;
            };
            let Ok(part) = part.parse::<u64>() else {
                continue;
            };
            max_part = Some(max_part.map_or(part, |p: u64| p.max(part)));

            let file = File::open(entry.path()).map_err(|e| SdvgError::Io {
                message: format!("reading {}", entry.path().display()),
                source: e,
            })?;
            let reader = SerializedFileReader::new(file).map_err(|e| SdvgError::Sink {
                model: self.model_name.clone(),
                message: format!("reading parquet metadata of {}: {}", name, e),
            })?;
            total_rows += reader.metadata().file_metadata().num_rows() as u64;
        }

        self.part = max_part.map_or(0, |p| p + 1);
        self.file_index = total_rows / self.rows_per_file;
        self.rows_in_file = total_rows % self.rows_per_file;
        Ok(())
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.parquet",
            self.model_name, self.file_index, self.part
        ))
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        if self.writer.is_none() {
            let path = self.file_path();
            let file = File::create(&path).map_err(|e| SdvgError::Io {
                message: format!("creating {}", path.display()),
                source: e,
            })?;
            self.writer = Some(
                ArrowWriter::try_new(file, Arc::clone(&self.schema), Some(self.props.clone()))
                    .map_err(|e| SdvgError::Sink {
                        model: self.model_name.clone(),
                        message: format!("opening parquet writer: {}", e),
                    })?,
            );
        }

        let arrays: Vec<ArrayRef> = self
            .columns
            .iter()
            .enumerate()
            .map(|(ci, meta)| build_array(meta, self.unit, &self.buffer, ci))
            .collect::<Result<_>>()?;
        let batch =
            RecordBatch::try_new(Arc::clone(&self.schema), arrays).map_err(|e| SdvgError::Sink {
                model: self.model_name.clone(),
                message: format!("building record batch: {}", e),
            })?;

        let writer = self.writer.as_mut().expect("opened above");
        writer.write(&batch).map_err(|e| SdvgError::Sink {
            model: self.model_name.clone(),
            message: format!("writing record batch: {}", e),
        })?;
        writer.flush().map_err(|e| SdvgError::Sink {
            model: self.model_name.clone(),
            message: format!("flushing row group: {}", e),
        })?;

        self.rows_flushed
            .fetch_add(self.buffer.len() as u64, Ordering::SeqCst);
        self.buffer.clear();
        Ok(())
    }

    fn close_file(&mut self) -> Result<()> {
        self.flush_batch()?;
        if let Some(writer) = self.writer.take() {
            writer.close().map_err(|e| SdvgError::Sink {
                model: self.model_name.clone(),
                message: format!("closing parquet file: {}", e),
            })?;
        }
        Ok(())
    }

    pub fn write_row(&mut self, row: &[Value]) -> Result<()> {
        if self.rows_in_file >= self.rows_per_file {
            self.close_file()?;
            self.file_index += 1;
            self.rows_in_file = 0;
        }
        self.buffer.push(row.to_vec());
        self.rows_in_file += 1;
        if self.buffer.len() >= BATCH_ROWS {
            self.flush_batch()?;
        }
        Ok(())
    }

    pub fn teardown(&mut self) -> Result<()> {
        self.close_file()
    }
}

fn arrow_type(meta: &ColumnMeta, unit: TimestampUnit) -> DataType {
    match meta.kind {
        ColumnKind::Integer => match meta.int_bits {
            8 => DataType::Int8,
            16 => DataType::Int16,
            32 => DataType::Int32,
            _ => DataType::Int64,
        },
        ColumnKind::Float => {
            if meta.float_bits == 64 {
                DataType::Float64
            } else {
                DataType::Float32
            }
        }
        ColumnKind::String | ColumnKind::Uuid => DataType::Utf8,
        ColumnKind::DateTime => match unit {
            TimestampUnit::Millis => DataType::Timestamp(TimeUnit::Millisecond, None),
            TimestampUnit::Micros => DataType::Timestamp(TimeUnit::Microsecond, None),
        },
    }
}

/// Encoding table: strings dictionary-encode by default, numerics stay
/// plain; `PLAIN_DICT`/`RLE_DICTIONARY` overrides map to dictionary
/// enablement, anything else to the raw encoding.
fn writer_properties(columns: &[ColumnMeta], params: &ParquetParams) -> Result<WriterProperties> {
    let compression = match &params.compression {
        Some(name) => name.parse::<Compression>().map_err(|e| {
            SdvgError::Config {
                message: format!("unknown parquet compression '{}': {}", name, e),
            }
        })?,
        None => Compression::SNAPPY,
    };

    let mut builder = WriterProperties::builder().set_compression(compression);
    for meta in columns {
        let path = ColumnPath::from(meta.name.clone());
        let default_dictionary = matches!(meta.kind, ColumnKind::String | ColumnKind::Uuid);
        match meta.encoding {
            None => {
                builder = builder.set_column_dictionary_enabled(path, default_dictionary);
            }
            Some(ParquetEncoding::PlainDict) | Some(ParquetEncoding::RleDictionary) => {
                builder = builder.set_column_dictionary_enabled(path, true);
            }
            Some(ParquetEncoding::Plain) => {
                builder = builder
                    .set_column_dictionary_enabled(path.clone(), false)
                    .set_column_encoding(path, Encoding::PLAIN);
            }
            Some(ParquetEncoding::DeltaBinaryPacked) => {
                builder = builder
                    .set_column_dictionary_enabled(path.clone(), false)
                    .set_column_encoding(path, Encoding::DELTA_BINARY_PACKED);
            }
            Some(ParquetEncoding::DeltaByteArray) => {
                builder = builder
                    .set_column_dictionary_enabled(path.clone(), false)
                    .set_column_encoding(path, Encoding::DELTA_BYTE_ARRAY);
            }
            Some(ParquetEncoding::ByteStreamSplit) => {
                builder = builder
                    .set_column_dictionary_enabled(path.clone(), false)
                    .set_column_encoding(path, Encoding::BYTE_STREAM_SPLIT);
            }
        }
    }
    Ok(builder.build())
}

fn type_mismatch(meta: &ColumnMeta, value: &Value) -> SdvgError {
    SdvgError::Internal {
        message: format!(
            "column '{}' expected {:?} but the row holds {:?}",
            meta.name, meta.kind, value
        ),
    }
}

fn build_array(
    meta: &ColumnMeta,
    unit: TimestampUnit,
    rows: &[DataRow],
    ci: usize,
) -> Result<ArrayRef> {
    macro_rules! numeric_array {
        ($builder:ty, $conv:expr) => {{
            let mut builder = <$builder>::with_capacity(rows.len());
            for row in rows {
                match &row[ci] {
                    Value::Null => builder.append_null(),
                    value => builder.append_value($conv(value).ok_or_else(|| {
                        type_mismatch(meta, value)
                    })?),
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }};
    }

    match meta.kind {
        ColumnKind::Integer => match meta.int_bits {
            8 => numeric_array!(Int8Builder, |v: &Value| match v {
                Value::Int(i) => Some(*i as i8),
                _ => None,
            }),
            16 => numeric_array!(Int16Builder, |v: &Value| match v {
                Value::Int(i) => Some(*i as i16),
                _ => None,
            }),
            32 => numeric_array!(Int32Builder, |v: &Value| match v {
                Value::Int(i) => Some(*i as i32),
                _ => None,
            }),
            _ => numeric_array!(Int64Builder, |v: &Value| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            }),
        },
        ColumnKind::Float => {
            if meta.float_bits == 64 {
                numeric_array!(Float64Builder, |v: &Value| match v {
                    Value::Float(f) => Some(*f),
                    _ => None,
                })
            } else {
                numeric_array!(Float32Builder, |v: &Value| match v {
                    Value::Float(f) => Some(*f as f32),
                    _ => None,
                })
            }
        }
        ColumnKind::DateTime => match unit {
            TimestampUnit::Millis => numeric_array!(TimestampMillisecondBuilder, |v: &Value| {
                match v {
                    Value::Timestamp(ts) => Some(ts.timestamp_millis()),
                    _ => None,
                }
            }),
            TimestampUnit::Micros => numeric_array!(TimestampMicrosecondBuilder, |v: &Value| {
                match v {
                    Value::Timestamp(ts) => Some(ts.timestamp_micros()),
                    _ => None,
                }
            }),
        },
        ColumnKind::String | ColumnKind::Uuid => {
            let mut builder = StringBuilder::new();
            for row in rows {
                match &row[ci] {
                    Value::Null => builder.append_null(),
                    Value::String(s) => builder.append_value(s),
                    Value::Uuid(u) => builder.append_value(u.to_string()),
                    other => return Err(type_mismatch(meta, other)),
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }
    }
}
