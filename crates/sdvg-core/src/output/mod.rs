//! # Partitioned Output
//!
//! `Output` owns one `ModelWriter` per generated model. A `ModelWriter`
//! demultiplexes each row to a partition-keyed format writer
//! (`<base>/col=value/...`), lazily creating writers up to the partition
//! files limit (beyond it, a user confirmation decides), dropping the
//! trailing non-writable partition values, and ticking a periodic
//! checkpoint of durably written rows.

pub mod conflict;
pub mod csv;
pub mod devnull;
pub mod http;
pub mod parquet;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::backup::checkpoint;
use crate::config::{
    Column, ColumnKind, GenerationConfig, Model, OutputConfig, ParquetEncoding, Range, SinkConfig,
};
use crate::error::{Result, SdvgError};
use crate::generate::value::{DataRow, Value};
use crate::runtime::CancelCause;

pub use devnull::{DevNullWriter, RowHandler};

use csv::CsvWriter;
use http::HttpWriter;
use parquet::ParquetWriter;

/// Callback deciding whether to exceed the partition files limit.
pub type ConfirmFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Column metadata the writers need: resolved kind (through foreign keys),
/// nullability and the physical widths.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub int_bits: u8,
    pub float_bits: u8,
    pub encoding: Option<ParquetEncoding>,
}

impl ColumnMeta {
    fn from_column(config: &GenerationConfig, column: &Column) -> Result<ColumnMeta> {
        let (kind, ranges) = resolve_column(config, column)?;
        let nullable = ranges.iter().any(|r| {
            r.null_percentage > 0.0
                || r.values
                    .as_ref()
                    .is_some_and(|vs| vs.iter().any(|v| v.is_null()))
        });
        let int_bits = ranges
            .iter()
            .map(|r| r.integer_params.clone().unwrap_or_default().bit_width)
            .max()
            .unwrap_or(64);
        let float_bits = ranges
            .iter()
            .map(|r| r.float_params.clone().unwrap_or_default().bit_width)
            .max()
            .unwrap_or(64);
        Ok(ColumnMeta {
            name: column.name.clone(),
            kind,
            nullable,
            int_bits,
            float_bits,
            encoding: column.parquet_encoding,
        })
    }
}

/// Kind and ranges of a column, following a foreign key one hop.
fn resolve_column<'a>(
    config: &'a GenerationConfig,
    column: &'a Column,
) -> Result<(ColumnKind, &'a [Range])> {
    if let Some(kind) = column.kind {
        return Ok((kind, &column.ranges));
    }
    let (target_model, target_column) =
        column.foreign_key_parts().ok_or_else(|| SdvgError::Internal {
            message: format!("column '{}' has neither kind nor foreign key", column.name),
        })?;
    let target = config
        .models
        .get(target_model)
        .and_then(|m| m.column(target_column))
        .ok_or_else(|| SdvgError::Internal {
            message: format!("unresolved foreign key '{}.{}'", target_model, target_column),
        })?;
    let kind = target.kind.ok_or_else(|| SdvgError::Internal {
        message: format!("foreign key target '{}' has no kind", target.name),
    })?;
    Ok((kind, &target.ranges))
}

/// Writer-facing view of one model.
#[derive(Debug, Clone)]
pub struct WriterModel {
    pub name: String,
    pub rows_per_file: u64,
    /// All columns in row order; the last `columns.len() - writable_count`
    /// exist only for partitioning.
    pub columns: Vec<ColumnMeta>,
    pub partition_indices: Vec<usize>,
    pub writable_count: usize,
}

impl WriterModel {
    pub fn from_config(config: &GenerationConfig, model: &Model) -> Result<WriterModel> {
        let columns = model
            .columns
            .iter()
            .map(|c| ColumnMeta::from_column(config, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(WriterModel {
            name: model.name.clone(),
            rows_per_file: model.rows_per_file(),
            writable_count: model.columns.len() - model.non_writable_tail(),
            partition_indices: model.partition_indices(),
            columns,
        })
    }

    fn writable_names(&self) -> Vec<String> {
        self.columns[..self.writable_count]
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }
}

/// One format writer behind a partition path.
pub enum SinkWriter {
    Csv(CsvWriter),
    Parquet(ParquetWriter),
    Http(HttpWriter),
    DevNull(DevNullWriter),
}

impl SinkWriter {
    pub async fn write_row(&mut self, row: &[Value]) -> Result<()> {
        match self {
            SinkWriter::Csv(w) => w.write_row(row),
            SinkWriter::Parquet(w) => w.write_row(row),
            SinkWriter::Http(w) => w.write_row(row).await,
            SinkWriter::DevNull(w) => w.write_row(row),
        }
    }

    pub async fn teardown(&mut self) -> Result<()> {
        match self {
            SinkWriter::Csv(w) => w.teardown(),
            SinkWriter::Parquet(w) => w.teardown(),
            SinkWriter::Http(w) => w.teardown().await,
            SinkWriter::DevNull(w) => w.teardown(),
        }
    }
}

/// Partition-keyed writer multiplexer for one model.
pub struct ModelWriter {
    model: WriterModel,
    base_path: PathBuf,
    sink: SinkConfig,
    run_batch_size: u64,
    resume: bool,
    partition_limit: u64,
    limit_confirmed: AtomicBool,
    confirm: ConfirmFn,
    devnull_handler: Option<RowHandler>,
    cancel: CancelCause,
    writers: RwLock<HashMap<String, Arc<Mutex<SinkWriter>>>>,
    rows_flushed: Arc<AtomicU64>,
    checkpoint_ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ModelWriter {
    #[allow(clippy::too_many_arguments)]
    fn new(
        model: WriterModel,
        base_path: PathBuf,
        output: &OutputConfig,
        run_batch_size: u64,
        resume: bool,
        initial_rows: u64,
        confirm: ConfirmFn,
        devnull_handler: Option<RowHandler>,
        cancel: CancelCause,
    ) -> Result<ModelWriter> {
        std::fs::create_dir_all(&base_path).map_err(|e| SdvgError::Io {
            message: format!("creating output dir {}", base_path.display()),
            source: e,
        })?;

        let writer = ModelWriter {
            model,
            base_path,
            sink: output.sink.clone(),
            run_batch_size,
            resume,
            partition_limit: output.partition_files_limit,
            limit_confirmed: AtomicBool::new(false),
            confirm,
            devnull_handler,
            cancel,
            writers: RwLock::new(HashMap::new()),
            rows_flushed: Arc::new(AtomicU64::new(initial_rows)),
            checkpoint_ticker: std::sync::Mutex::new(None),
        };
        writer.start_checkpoint_ticker(output.checkpoint_interval_secs);
        Ok(writer)
    }

    /// Rows durably handed to the sink, as the checkpoint sees them.
    pub fn rows_flushed(&self) -> u64 {
        self.rows_flushed.load(Ordering::SeqCst)
    }

    fn start_checkpoint_ticker(&self, interval_secs: u64) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        let base = self.base_path.clone();
        let name = self.model.name.clone();
        let rows = Arc::clone(&self.rows_flushed);
        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick fires immediately; skip it so a fresh run doesn't
            // checkpoint zero before writing anything.
            interval.tick().await;
            loop {
                interval.tick().await;
                let saved = rows.load(Ordering::SeqCst);
                if let Err(e) = checkpoint::write_checkpoint(&base, &name, saved) {
                    tracing::warn!("checkpoint write for '{}' failed: {}", name, e);
                }
            }
        });
        *self.checkpoint_ticker.lock().expect("ticker slot") = Some(handle);
    }

    fn partition_key(&self, row: &DataRow) -> String {
        let mut key = String::new();
        for &idx in &self.model.partition_indices {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&self.model.columns[idx].name);
            key.push('=');
            key.push_str(&row[idx].to_partition_segment());
        }
        key
    }

    async fn writer_for(&self, key: &str) -> Result<Arc<Mutex<SinkWriter>>> {
        if let Some(writer) = self.writers.read().await.get(key) {
            return Ok(Arc::clone(writer));
        }

        let mut writers = self.writers.write().await;
        if let Some(writer) = writers.get(key) {
            return Ok(Arc::clone(writer));
        }

        if writers.len() as u64 >= self.partition_limit
            && !self.limit_confirmed.load(Ordering::SeqCst)
        {
            let prompt = format!(
                "model '{}' is about to exceed the partition files limit of {}; continue?",
                self.model.name, self.partition_limit
            );
            if !(self.confirm)(&prompt) {
                return Err(SdvgError::PartitionFilesLimitExceeded {
                    model: self.model.name.clone(),
                    limit: self.partition_limit,
                });
            }
            self.limit_confirmed.store(true, Ordering::SeqCst);
        }

        let dir = if key.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(key)
        };
        let writer = Arc::new(Mutex::new(self.make_writer(dir)?));
        writers.insert(key.to_string(), Arc::clone(&writer));
        Ok(writer)
    }

    fn make_writer(&self, dir: PathBuf) -> Result<SinkWriter> {
        let names = self.model.writable_names();
        let writer = match &self.sink {
            SinkConfig::Csv(params) => SinkWriter::Csv(CsvWriter::new(
                dir,
                &self.model.name,
                params.clone(),
                &names,
                self.model.rows_per_file,
                self.resume,
                Arc::clone(&self.rows_flushed),
            )?),
            SinkConfig::Parquet(params) => SinkWriter::Parquet(ParquetWriter::new(
                dir,
                &self.model.name,
                params,
                self.model.columns[..self.model.writable_count].to_vec(),
                self.model.rows_per_file,
                self.resume,
                Arc::clone(&self.rows_flushed),
            )?),
            SinkConfig::Http(params) => SinkWriter::Http(HttpWriter::new(
                &self.model.name,
                names,
                params.clone(),
                self.run_batch_size,
                Arc::clone(&self.rows_flushed),
                self.cancel.clone(),
            )?),
            SinkConfig::Tcs(params) => SinkWriter::Http(HttpWriter::new_tcs(
                &self.model.name,
                names,
                params.clone(),
                self.run_batch_size,
                Arc::clone(&self.rows_flushed),
                self.cancel.clone(),
            )?),
            SinkConfig::DevNull => SinkWriter::DevNull(DevNullWriter::new(
                self.devnull_handler.clone(),
                Arc::clone(&self.rows_flushed),
            )),
        };
        Ok(writer)
    }

    /// Deliver one batch. Called in submission order via the model's
    /// syncer, so rows land in their partitions deterministically.
    pub async fn write_rows(&self, rows: Vec<DataRow>) -> Result<()> {
        for row in &rows {
            if row.len() != self.model.columns.len() {
                return Err(SdvgError::Internal {
                    message: format!(
                        "model '{}' row holds {} values for {} columns",
                        self.model.name,
                        row.len(),
                        self.model.columns.len()
                    ),
                });
            }
            let key = self.partition_key(row);
            let writer = self.writer_for(&key).await?;
            let mut writer = writer.lock().await;
            writer.write_row(&row[..self.model.writable_count]).await?;
        }
        Ok(())
    }

    /// Tear down every partition writer in parallel, stop the ticker and
    /// write the final checkpoint.
    pub async fn teardown(&self) -> Result<()> {
        if let Some(ticker) = self.checkpoint_ticker.lock().expect("ticker slot").take() {
            ticker.abort();
        }

        let writers: Vec<(String, Arc<Mutex<SinkWriter>>)> =
            self.writers.write().await.drain().collect();
        let results = futures::future::join_all(writers.into_iter().map(
            |(key, writer)| async move {
                let mut writer = writer.lock().await;
                writer.teardown().await.map_err(|e| (key, e))
            },
        ))
        .await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|r| r.err())
            .map(|(key, e)| format!("partition '{}': {}", key, e))
            .collect();

        checkpoint::write_checkpoint(&self.base_path, &self.model.name, self.rows_flushed())?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SdvgError::Sink {
                model: self.model.name.clone(),
                message: failures.join("; "),
            })
        }
    }
}

/// Options controlling output setup.
#[derive(Default)]
pub struct OutputOptions {
    pub resume: bool,
    pub force: bool,
    pub confirm: Option<ConfirmFn>,
    pub devnull_handler: Option<RowHandler>,
}

/// All model writers of a run.
pub struct Output {
    writers: HashMap<String, Arc<ModelWriter>>,
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("writers", &self.writers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Output {
    /// Conflict-check the target directory and build one writer per
    /// generated model. `initial_rows` carries the per-model checkpointed
    /// counters on resume.
    pub fn setup(
        config: &GenerationConfig,
        opts: &OutputOptions,
        cancel: &CancelCause,
        initial_rows: &HashMap<String, u64>,
    ) -> Result<Output> {
        if config.output.sink.file_extension().is_some() && !opts.resume {
            let conflicts = conflict::scan_conflicts(&config.output, &config.models)?;
            if !conflicts.is_empty() {
                if opts.force {
                    conflict::remove_conflicts(&conflicts)?;
                } else {
                    return Err(SdvgError::OutputConflict {
                        dir: config.output.dir.display().to_string(),
                        conflicts: conflict::render_conflicts(&conflicts),
                    });
                }
            }
        }

        let confirm: ConfirmFn = opts
            .confirm
            .clone()
            .unwrap_or_else(|| Arc::new(|_prompt: &str| false));

        let mut writers = HashMap::new();
        for model in config.models.values() {
            if config.models_to_ignore.contains(&model.name) {
                continue;
            }
            let base_path = model_base_path(&config.output, model);
            let writer_model = WriterModel::from_config(config, model)?;
            let writer = ModelWriter::new(
                writer_model,
                base_path,
                &config.output,
                config.batch_size,
                opts.resume,
                initial_rows.get(&model.name).copied().unwrap_or(0),
                Arc::clone(&confirm),
                opts.devnull_handler.clone(),
                cancel.clone(),
            )?;
            writers.insert(model.name.clone(), Arc::new(writer));
        }
        Ok(Output { writers })
    }

    pub fn writer(&self, model: &str) -> Option<Arc<ModelWriter>> {
        self.writers.get(model).cloned()
    }

    pub fn writers(&self) -> impl Iterator<Item = &Arc<ModelWriter>> {
        self.writers.values()
    }

    /// Tear every model writer down in parallel and aggregate failures.
    pub async fn teardown(&self) -> Result<()> {
        let results =
            futures::future::join_all(self.writers.values().map(|w| w.teardown())).await;
        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|r| r.err())
            .map(|e| e.to_string())
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SdvgError::Sink {
                model: "<all>".to_string(),
                message: failures.join("; "),
            })
        }
    }
}

/// `output.dir[/model_dir]`.
pub fn model_base_path(output: &OutputConfig, model: &Model) -> PathBuf {
    if output.create_model_dir {
        output.dir.join(model.model_dir())
    } else {
        output.dir.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CsvParams;
    use std::path::Path;

    fn config_with_partitions(dir: &Path, limit: u64) -> GenerationConfig {
        let mut config = GenerationConfig {
            batch_size: 10,
            ..GenerationConfig::default()
        };
        config.models.insert(
            "m".to_string(),
            Model {
                rows_count: 10,
                columns: vec![
                    Column {
                        name: "id".to_string(),
                        kind: Some(ColumnKind::Integer),
                        ..Column::default()
                    },
                    Column {
                        name: "region".to_string(),
                        kind: Some(ColumnKind::Integer),
                        ..Column::default()
                    },
                ],
                partition_columns: vec![crate::config::PartitionColumn {
                    name: "region".to_string(),
                    writable: true,
                }],
                ..Model::default()
            },
        );
        config.output = OutputConfig {
            dir: dir.to_path_buf(),
            sink: SinkConfig::Csv(CsvParams::default()),
            partition_files_limit: limit,
            ..OutputConfig::default()
        };
        config.prepare().unwrap();
        config
    }

    fn row(id: i64, region: i64) -> DataRow {
        vec![Value::Int(id), Value::Int(region)]
    }

    #[tokio::test]
    async fn test_rows_routed_by_partition_value() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_partitions(dir.path(), 100);
        let output = Output::setup(
            &config,
            &OutputOptions::default(),
            &CancelCause::new(),
            &HashMap::new(),
        )
        .unwrap();
        let writer = output.writer("m").unwrap();

        writer
            .write_rows(vec![row(1, 10), row(2, 20), row(3, 10)])
            .await
            .unwrap();
        output.teardown().await.unwrap();

        assert!(dir.path().join("region=10").join("m_0.csv").exists());
        assert!(dir.path().join("region=20").join("m_0.csv").exists());
        let ten = std::fs::read_to_string(dir.path().join("region=10").join("m_0.csv")).unwrap();
        assert_eq!(ten.lines().count(), 3); // header + 2 rows
    }

    #[tokio::test]
    async fn test_partition_limit_refusal_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_partitions(dir.path(), 2);
        let output = Output::setup(
            &config,
            &OutputOptions::default(),
            &CancelCause::new(),
            &HashMap::new(),
        )
        .unwrap();
        let writer = output.writer("m").unwrap();

        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(row(i, i));
        }
        let err = writer.write_rows(rows).await.unwrap_err();
        assert!(matches!(
            err,
            SdvgError::PartitionFilesLimitExceeded { limit: 2, .. }
        ));
        output.teardown().await.unwrap();

        // Exactly the two allowed partitions exist.
        let partitions = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains('='))
            .count();
        assert_eq!(partitions, 2);
    }

    #[tokio::test]
    async fn test_partition_limit_confirmation_allows_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_partitions(dir.path(), 2);
        let opts = OutputOptions {
            confirm: Some(Arc::new(|_prompt: &str| true)),
            ..OutputOptions::default()
        };
        let output = Output::setup(&config, &opts, &CancelCause::new(), &HashMap::new()).unwrap();
        let writer = output.writer("m").unwrap();

        let rows: Vec<DataRow> = (0..5).map(|i| row(i, i)).collect();
        writer.write_rows(rows).await.unwrap();
        output.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_setup_reports_conflicts_without_force() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backup.json"), "{}").unwrap();
        let config = config_with_partitions(dir.path(), 10);
        let err = Output::setup(
            &config,
            &OutputOptions::default(),
            &CancelCause::new(),
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SdvgError::OutputConflict { .. }));
    }

    #[tokio::test]
    async fn test_setup_force_clears_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backup.json"), "{}").unwrap();
        std::fs::write(dir.path().join("m_0.csv"), "stale\n").unwrap();
        let config = config_with_partitions(dir.path(), 10);
        let opts = OutputOptions {
            force: true,
            ..OutputOptions::default()
        };
        let output = Output::setup(&config, &opts, &CancelCause::new(), &HashMap::new()).unwrap();
        assert!(!dir.path().join("backup.json").exists());
        assert!(!dir.path().join("m_0.csv").exists());
        output.teardown().await.unwrap();
    }

    #[test]
    fn test_writer_model_resolves_fk_kind() {
        let mut config = GenerationConfig::default();
        config.models.insert(
            "parent".to_string(),
            Model {
                rows_count: 5,
                columns: vec![Column {
                    name: "id".to_string(),
                    kind: Some(ColumnKind::Integer),
                    ..Column::default()
                }],
                ..Model::default()
            },
        );
        config.models.insert(
            "child".to_string(),
            Model {
                rows_count: 5,
                columns: vec![Column {
                    name: "parent_id".to_string(),
                    foreign_key: Some("parent.id".to_string()),
                    ..Column::default()
                }],
                ..Model::default()
            },
        );
        config.prepare().unwrap();

        let meta = WriterModel::from_config(&config, &config.models["child"]).unwrap();
        assert_eq!(meta.columns[0].kind, ColumnKind::Integer);
    }

    #[test]
    fn test_column_meta_nullability() {
        let config = GenerationConfig::default();
        let column = Column {
            name: "c".to_string(),
            kind: Some(ColumnKind::Integer),
            ranges: vec![Range {
                values: Some(vec![serde_json::Value::Null, serde_json::json!(1)]),
                ..Range::default()
            }],
            ..Column::default()
        };
        let meta = ColumnMeta::from_column(&config, &column).unwrap();
        assert!(meta.nullable);
    }

    #[test]
    fn test_model_base_path() {
        let output = OutputConfig {
            dir: PathBuf::from("/out"),
            create_model_dir: true,
            ..OutputConfig::default()
        };
        let model = Model {
            name: "m".to_string(),
            model_dir: Some("custom".to_string()),
            ..Model::default()
        };
        assert_eq!(model_base_path(&output, &model), PathBuf::from("/out/custom"));
    }
}
