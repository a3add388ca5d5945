//! # Generation Config
//!
//! The post-validation data model for a generation run. Parsed from YAML or
//! JSON (chosen by file extension, unknown fields rejected), then finalized:
//! model names are derived from map keys, defaults are resolved, range shares
//! are distributed, and non-writable partition columns move to the end of the
//! column list.
//!
//! Fields that shape the generated data carry into `backup.json` (see the
//! `backup` module); performance knobs (`workers_count`, `batch_size`,
//! `checkpoint_interval_secs`) and the output directory are excluded with
//! `skip_serializing` so they may vary between a run and its resume.

mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdvgError};

/// Root configuration for a generation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Worker task count. Defaults to 4x the CPU count.
    #[serde(skip_serializing)]
    pub workers_count: usize,
    /// Rows per generation batch.
    #[serde(skip_serializing)]
    pub batch_size: u64,
    /// Seed for the whole run. 0 means "derive from the wall clock once at
    /// task start"; the resolved value is written to the backup so resumes
    /// reproduce the stream.
    pub random_seed: u64,
    /// Models keyed by name. Insertion order is generation order.
    pub models: IndexMap<String, Model>,
    /// Models to parse and validate but not generate. Must be a strict
    /// subset of `models`.
    pub models_to_ignore: Vec<String>,
    pub output: OutputConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            workers_count: num_cpus::get() * 4,
            batch_size: 1000,
            random_seed: 0,
            models: IndexMap::new(),
            models_to_ignore: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

/// One table-shaped model.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Model {
    /// Derived from the `models` map key during finalization.
    #[serde(skip)]
    pub name: String,
    pub rows_count: u64,
    /// First row index to generate. Raised once on resume to the
    /// checkpointed rows-saved count. A run-window control, not part of
    /// the backup.
    #[serde(skip_serializing)]
    pub generate_from: u64,
    /// One-past-last row index. Defaults to `rows_count`. A run-window
    /// control, not part of the backup.
    #[serde(skip_serializing)]
    pub generate_to: Option<u64>,
    /// File rolling threshold. Defaults to `rows_count` (single file).
    pub rows_per_file: Option<u64>,
    /// Subdirectory under the output dir when `create_model_dir` is set.
    /// Defaults to the model name.
    pub model_dir: Option<String>,
    pub columns: Vec<Column>,
    pub partition_columns: Vec<PartitionColumn>,
}

impl Model {
    pub fn generate_to(&self) -> u64 {
        self.generate_to.unwrap_or(self.rows_count)
    }

    pub fn rows_per_file(&self) -> u64 {
        self.rows_per_file.unwrap_or(self.rows_count)
    }

    pub fn model_dir(&self) -> &str {
        self.model_dir.as_deref().unwrap_or(&self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column indices of the partition columns, in declared partition order.
    pub fn partition_indices(&self) -> Vec<usize> {
        self.partition_columns
            .iter()
            .filter_map(|pc| self.columns.iter().position(|c| c.name == pc.name))
            .collect()
    }

    /// Number of trailing columns that exist only for partitioning and must
    /// not be written to the sink. Finalization moved them to the end.
    pub fn non_writable_tail(&self) -> usize {
        self.columns
            .iter()
            .rev()
            .take_while(|c| {
                self.partition_columns
                    .iter()
                    .any(|pc| pc.name == c.name && !pc.writable)
            })
            .count()
    }
}

/// A column used to build `col=value` partition paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartitionColumn {
    pub name: String,
    /// When false the column partitions the output but is dropped from the
    /// written rows.
    pub writable: bool,
}

impl Default for PartitionColumn {
    fn default() -> Self {
        PartitionColumn {
            name: String::new(),
            writable: true,
        }
    }
}

/// Concrete value kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    String,
    #[serde(rename = "datetime")]
    DateTime,
    Uuid,
}

/// One column of a model: either a typed column with ranges, or a foreign
/// key mirroring another model's column.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<ColumnKind>,
    /// `"<model>.<column>"`. Mutually exclusive with `type` and `ranges`.
    /// The target may not itself be a foreign key.
    pub foreign_key: Option<String>,
    /// Present the referenced values in the target column's own order
    /// instead of this column's independent order.
    pub foreign_key_order: bool,
    pub ranges: Vec<Range>,
    /// Parquet physical encoding override for this column.
    pub parquet_encoding: Option<ParquetEncoding>,
}

impl Column {
    /// Split a `model.column` foreign key reference.
    pub fn foreign_key_parts(&self) -> Option<(&str, &str)> {
        self.foreign_key.as_deref().and_then(|fk| fk.split_once('.'))
    }

    /// The template strings of this column's ranges, if any.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.ranges
            .iter()
            .filter_map(|r| r.string_params.as_ref())
            .filter_map(|sp| sp.template.as_deref())
    }
}

/// Parquet column encodings. `PLAIN_DICT` and `RLE_DICTIONARY` map to
/// dictionary enablement rather than a raw encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParquetEncoding {
    Plain,
    PlainDict,
    RleDictionary,
    DeltaBinaryPacked,
    DeltaByteArray,
    ByteStreamSplit,
}

/// A contiguous sub-span of a column's rows with its own value distribution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Range {
    /// Share of the column's rows, in (0, 1]. Shares of a column sum to 1;
    /// unset shares split the remainder evenly and the last range absorbs
    /// the rounding residue.
    pub range_percentage: Option<f64>,
    pub null_percentage: f64,
    /// Fraction of this range's rows that carry distinct values.
    /// Mutually exclusive with `distinct_count`.
    pub distinct_percentage: Option<f64>,
    pub distinct_count: Option<u64>,
    /// Emit values in non-decreasing order. Defaults to true for enum
    /// (`values`) ranges and false otherwise.
    pub ordered: Option<bool>,
    /// Enum value list. Null entries are legal and sort first.
    pub values: Option<Vec<serde_json::Value>>,
    pub integer_params: Option<IntegerParams>,
    pub float_params: Option<FloatParams>,
    pub string_params: Option<StringParams>,
    pub datetime_params: Option<DateTimeParams>,
}

impl Range {
    pub fn ordered(&self) -> bool {
        self.ordered.unwrap_or(self.values.is_some())
    }

    pub fn share(&self) -> f64 {
        self.range_percentage.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegerParams {
    /// One of 8, 16, 32, 64.
    pub bit_width: u8,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl Default for IntegerParams {
    fn default() -> Self {
        IntegerParams {
            bit_width: 64,
            from: None,
            to: None,
        }
    }
}

impl IntegerParams {
    /// Inclusive bounds of the representable range at this bit width.
    pub fn width_bounds(&self) -> (i64, i64) {
        match self.bit_width {
            8 => (i8::MIN as i64, i8::MAX as i64),
            16 => (i16::MIN as i64, i16::MAX as i64),
            32 => (i32::MIN as i64, i32::MAX as i64),
            _ => (i64::MIN, i64::MAX),
        }
    }

    /// Effective `[from, to]` with defaults spanning the full bit range.
    pub fn bounds(&self) -> (i64, i64) {
        let (lo, hi) = self.width_bounds();
        (self.from.unwrap_or(lo), self.to.unwrap_or(hi))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloatParams {
    /// One of 32, 64.
    pub bit_width: u8,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

impl Default for FloatParams {
    fn default() -> Self {
        FloatParams {
            bit_width: 64,
            from: None,
            to: None,
        }
    }
}

impl FloatParams {
    /// Effective `[from, to]` with defaults spanning ±max finite at width.
    pub fn bounds(&self) -> (f64, f64) {
        let max = if self.bit_width == 32 {
            f32::MAX as f64
        } else {
            f64::MAX
        };
        (self.from.unwrap_or(-max), self.to.unwrap_or(max))
    }
}

/// Locale of the tabular constants (name lists, word lists, phone shapes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleCode {
    #[default]
    En,
    Ru,
}

/// Semantic family of a string column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    #[default]
    #[serde(rename = "simple", alias = "")]
    Simple,
    FirstName,
    LastName,
    Phone,
    Text,
    Ipv4,
    Isbn,
    Hex,
    Base64,
    Base64url,
    Base64rawurl,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StringParams {
    pub min_length: u32,
    pub max_length: u32,
    pub locale: LocaleCode,
    pub logical_type: LogicalType,
    /// `{{ other_column | upper }}` style row template. Mutually exclusive
    /// with `pattern`; forces intra-row ordering after its referenced
    /// columns.
    pub template: Option<String>,
    /// Literal string where `A` is a large letter, `a` a small letter,
    /// `0` a digit, `#` a special char; other characters pass through.
    pub pattern: Option<String>,
    pub without_large_letters: bool,
    pub without_small_letters: bool,
    pub without_digits: bool,
    pub without_special_chars: bool,
}

impl Default for StringParams {
    fn default() -> Self {
        StringParams {
            min_length: 1,
            max_length: 16,
            locale: LocaleCode::En,
            logical_type: LogicalType::Simple,
            template: None,
            pattern: None,
            without_large_letters: false,
            without_small_letters: false,
            without_digits: false,
            without_special_chars: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateTimeParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Default for DateTimeParams {
    fn default() -> Self {
        DateTimeParams {
            from: None,
            to: None,
        }
    }
}

impl DateTimeParams {
    /// Effective `[from, to]`; defaults span the Unix epoch through 2100.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let lo = self
            .from
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
        let hi = self
            .to
            .unwrap_or_else(|| Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap());
        (lo, hi)
    }
}

/// Output sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Target directory. Excluded from the backup so a result tree can be
    /// relocated and still resumed.
    #[serde(skip_serializing)]
    pub dir: PathBuf,
    pub sink: SinkConfig,
    /// Create a per-model subdirectory under `dir`.
    pub create_model_dir: bool,
    #[serde(skip_serializing)]
    pub checkpoint_interval_secs: u64,
    /// Cap on distinct partition writers per model; exceeding it asks the
    /// user for confirmation.
    pub partition_files_limit: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("./output"),
            sink: SinkConfig::DevNull,
            create_model_dir: false,
            checkpoint_interval_secs: 10,
            partition_files_limit: 1000,
        }
    }
}

/// Which sink receives the rows.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Csv(CsvParams),
    Parquet(ParquetParams),
    Http(HttpParams),
    Tcs(HttpParams),
    DevNull,
}

impl SinkConfig {
    /// Data file extension of file-producing sinks.
    pub fn file_extension(&self) -> Option<&'static str> {
        match self {
            SinkConfig::Csv(_) => Some("csv"),
            SinkConfig::Parquet(_) => Some("parquet"),
            _ => None,
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, SinkConfig::Http(_) | SinkConfig::Tcs(_))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsvParams {
    /// Suppress the header row.
    pub without_headers: bool,
    pub float_precision: usize,
    /// chrono format string, or the literal `unix` for epoch seconds.
    pub datetime_format: String,
}

impl Default for CsvParams {
    fn default() -> Self {
        CsvParams {
            without_headers: false,
            float_precision: 6,
            datetime_format: "%Y-%m-%dT%H:%M:%SZ".to_string(),
        }
    }
}

/// Timestamp resolution of parquet datetime columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    #[default]
    Millis,
    Micros,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ParquetParams {
    /// Parquet compression codec name, e.g. SNAPPY, ZSTD, UNCOMPRESSED.
    pub compression: Option<String>,
    pub datetime_format: TimestampUnit,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpParams {
    pub endpoint: String,
    pub headers: BTreeMap<String, String>,
    /// Body template rendered per batch with `model_name`, `rows` and
    /// `column_names` in scope. Defaults to a rows-array JSON body.
    pub format_template: Option<String>,
    /// Rows per POST. Defaults to the run's `batch_size`.
    pub batch_size: Option<u64>,
    /// Concurrent request dispatchers inside the writer.
    pub workers_count: usize,
    /// Total per-request budget including retries.
    pub timeout_secs: u64,
    pub retry_wait_min_ms: u64,
    pub retry_wait_max_ms: u64,
}

impl Default for HttpParams {
    fn default() -> Self {
        HttpParams {
            endpoint: String::new(),
            headers: BTreeMap::new(),
            format_template: None,
            batch_size: None,
            workers_count: 1,
            timeout_secs: 60,
            retry_wait_min_ms: 100,
            retry_wait_max_ms: 5000,
        }
    }
}

/// Read, validate and finalize a config file. The format is chosen by
/// extension: `.yaml`/`.yml` or `.json`.
pub fn read_config(path: &Path) -> Result<GenerationConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SdvgError::ConfigRead {
        path: path.display().to_string(),
        source: e,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let mut config: GenerationConfig = match ext {
        "yaml" | "yml" => {
            serde_yaml::from_str(&content).map_err(|e| SdvgError::ConfigParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        }
        "json" => serde_json::from_str(&content).map_err(|e| SdvgError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?,
        other => {
            return Err(SdvgError::ConfigParse {
                path: path.display().to_string(),
                message: format!(
                    "unsupported config extension '{}' (expected yaml, yml or json)",
                    other
                ),
            })
        }
    };

    config.prepare()?;
    Ok(config)
}

impl GenerationConfig {
    /// Validate and finalize a config built in memory. `read_config` calls
    /// this; tests building configs programmatically must call it too.
    pub fn prepare(&mut self) -> Result<()> {
        self.validate()?;
        self.finalize();
        Ok(())
    }

    /// Resolve derived fields after validation: model names from map keys,
    /// even distribution of unset range shares, and the move of
    /// non-writable partition columns to the end of each column list.
    fn finalize(&mut self) {
        for (name, model) in self.models.iter_mut() {
            model.name = name.clone();
            // generate_to, rows_per_file and model_dir stay None when
            // defaulted: the accessors resolve them, and the backup then
            // carries the user's input rather than values derived from
            // rows_count (a rows_count change must diff as one path).

            // Move non-writable partition columns to the end of the column
            // list, preserving relative order everywhere.
            let non_writable: Vec<String> = model
                .partition_columns
                .iter()
                .filter(|pc| !pc.writable)
                .map(|pc| pc.name.clone())
                .collect();
            if !non_writable.is_empty() {
                let (tail, head): (Vec<Column>, Vec<Column>) = model
                    .columns
                    .drain(..)
                    .partition(|c| non_writable.contains(&c.name));
                model.columns = head;
                model.columns.extend(tail);
            }

            for column in &mut model.columns {
                if column.ranges.is_empty() && column.foreign_key.is_none() {
                    column.ranges.push(Range::default());
                }
                distribute_shares(&mut column.ranges);
            }
        }
    }
}

/// Distribute unset range shares evenly over the remainder left by explicit
/// shares. The last range absorbs the floating point residue so the shares
/// sum to exactly 1.
fn distribute_shares(ranges: &mut [Range]) {
    if ranges.is_empty() {
        return;
    }
    let explicit_sum: f64 = ranges.iter().filter_map(|r| r.range_percentage).sum();
    let unset = ranges.iter().filter(|r| r.range_percentage.is_none()).count();
    if unset > 0 {
        let even = (1.0 - explicit_sum).max(0.0) / unset as f64;
        for range in ranges.iter_mut() {
            if range.range_percentage.is_none() {
                range.range_percentage = Some(even);
            }
        }
    }
    let total: f64 = ranges.iter().map(|r| r.share()).sum();
    let residue = 1.0 - total;
    if residue != 0.0 {
        if let Some(last) = ranges.last_mut() {
            last.range_percentage = Some(last.share() + residue);
        }
    }
}
