//! # Task Orchestration
//!
//! A task owns one run: seed resolution, output setup, backup or resume
//! processing, generator construction, the per-model batch loops feeding
//! the worker pool through each model's syncer, cooperative cancellation
//! and teardown. Tasks live in a registry keyed by UUID and evict
//! themselves five minutes after completion.

pub mod progress;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use tokio::sync::watch;
use uuid::Uuid;

use crate::backup;
use crate::config::GenerationConfig;
use crate::error::{Result, SdvgError};
use crate::generate::batch::{BatchGenerator, ModelColumns};
use crate::generate::build_generators;
use crate::output::{ConfirmFn, ModelWriter, Output, OutputOptions, RowHandler};
use crate::runtime::{CancelCause, Syncer, WorkerPool};

use progress::{Progress, ProgressSnapshot};

/// How long a finished task stays queryable in the registry.
const EVICTION_DELAY: Duration = Duration::from_secs(5 * 60);

/// Inputs for one run.
pub struct TaskConfig {
    pub config: GenerationConfig,
    pub continue_generation: bool,
    pub force: bool,
    /// Partition-limit confirmation. Defaults to refusing.
    pub confirm: Option<ConfirmFn>,
    /// Row handler for the DevNull sink.
    pub devnull_handler: Option<RowHandler>,
}

/// Final state of a task, kept for late `get_result` callers after the
/// typed error was handed to the first `wait_result`.
#[derive(Default)]
struct Outcome {
    completed: bool,
    error: Option<SdvgError>,
    error_message: Option<String>,
}

pub struct Task {
    pub id: Uuid,
    progress: Arc<Progress>,
    cancel: CancelCause,
    outcome: Mutex<Outcome>,
    done_rx: watch::Receiver<bool>,
}

impl Task {
    pub fn get_progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Non-blocking: `(completed, error message)` once the task finished.
    pub fn get_result(&self) -> Option<(bool, Option<String>)> {
        let outcome = self.outcome.lock().expect("outcome lock");
        if *self.done_rx.borrow() {
            Some((outcome.completed, outcome.error_message.clone()))
        } else {
            None
        }
    }

    /// Block until the task finishes. The first caller receives the typed
    /// error; later callers get its rendered message.
    pub async fn wait_result(&self) -> Result<()> {
        let mut done_rx = self.done_rx.clone();
        while !*done_rx.borrow_and_update() {
            if done_rx.changed().await.is_err() {
                break;
            }
        }
        let mut outcome = self.outcome.lock().expect("outcome lock");
        if let Some(error) = outcome.error.take() {
            return Err(error);
        }
        if let Some(message) = &outcome.error_message {
            return Err(SdvgError::Internal {
                message: message.clone(),
            });
        }
        Ok(())
    }

    /// Cooperative cancellation with a cause; the first cause wins.
    pub fn cancel(&self, cause: SdvgError) {
        self.cancel.cancel(cause);
    }
}

/// Process-wide task registry.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<Uuid, Arc<Task>>>>,
}

impl TaskRegistry {
    pub fn new() -> TaskRegistry {
        TaskRegistry::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Task>> {
        self.tasks.read().expect("registry lock").get(id).cloned()
    }

    /// Validate inputs, set the output up and launch the run. Returns as
    /// soon as the task is running; await `wait_result` for the outcome.
    pub async fn create_task(&self, task_config: TaskConfig) -> Result<Arc<Task>> {
        let TaskConfig {
            mut config,
            continue_generation,
            force,
            confirm,
            devnull_handler,
        } = task_config;

        let id = Uuid::new_v4();

        // HTTP-delivered tasks can run concurrently; scope their work dirs
        // by task id so they never collide.
        if config.output.sink.is_http() {
            config.output.dir = config.output.dir.join(id.to_string());
        }

        if config.random_seed == 0 && !continue_generation {
            config.random_seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(1);
        }

        let cancel = CancelCause::new();
        let saved_rows = if continue_generation {
            backup::process_continue_generation(&mut config)?
        } else {
            HashMap::new()
        };

        let output = Output::setup(
            &config,
            &OutputOptions {
                resume: continue_generation,
                force,
                confirm,
                devnull_handler,
            },
            &cancel,
            &saved_rows,
        )?;

        if !continue_generation {
            backup::save_backup(&config, &config.output.dir)?;
        }

        let generators = build_generators(&config)?;

        let progress = Arc::new(Progress::new());
        for model in config.models.values() {
            if !config.models_to_ignore.contains(&model.name) {
                progress.add_total(model.generate_to() - model.generate_from);
            }
        }

        let (done_tx, done_rx) = watch::channel(false);
        let task = Arc::new(Task {
            id,
            progress: Arc::clone(&progress),
            cancel: cancel.clone(),
            outcome: Mutex::new(Outcome::default()),
            done_rx,
        });
        self.tasks
            .write()
            .expect("registry lock")
            .insert(id, Arc::clone(&task));

        let registry = self.clone();
        let run_task = Arc::clone(&task);
        tokio::spawn(async move {
            let result = run(config, generators, output, progress, cancel.clone()).await;
            {
                let mut outcome = run_task.outcome.lock().expect("outcome lock");
                match result {
                    Ok(()) => outcome.completed = true,
                    Err(e) => {
                        outcome.error_message = Some(e.to_string());
                        outcome.error = Some(e);
                    }
                }
            }
            let _ = done_tx.send(true);

            tokio::time::sleep(EVICTION_DELAY).await;
            registry
                .tasks
                .write()
                .expect("registry lock")
                .remove(&run_task.id);
        });

        Ok(task)
    }
}

/// The run itself: skip to the resume point, drive every model's batch
/// loop through the pool, then tear the output down and report the first
/// meaningful cause.
async fn run(
    config: GenerationConfig,
    generators: IndexMap<String, Arc<ModelColumns>>,
    output: Output,
    progress: Arc<Progress>,
    cancel: CancelCause,
) -> Result<()> {
    // Fast-forward each generated model's columns past the resume point
    // without materializing values.
    for model in config.models.values() {
        if config.models_to_ignore.contains(&model.name) {
            continue;
        }
        if model.generate_from > 0 {
            for column in &generators[&model.name].columns {
                column.skip_rows(model.generate_from)?;
            }
        }
    }

    let pool = Arc::new(WorkerPool::new(config.workers_count));
    let mut producers = Vec::new();

    for model in config.models.values() {
        if config.models_to_ignore.contains(&model.name) {
            continue;
        }
        let columns = Arc::clone(&generators[&model.name]);
        let writer = output.writer(&model.name).ok_or_else(|| {
            SdvgError::Internal {
                message: format!("no writer for model '{}'", model.name),
            }
        })?;
        producers.push(tokio::spawn(produce_model_batches(
            model.name.clone(),
            model.generate_from,
            model.generate_to(),
            config.batch_size,
            columns,
            writer,
            Arc::clone(&pool),
            Arc::clone(&progress),
            cancel.clone(),
        )));
    }

    for producer in producers {
        if let Err(e) = producer.await {
            cancel.cancel(SdvgError::Internal {
                message: format!("batch producer panicked: {}", e),
            });
        }
    }
    let pool_error = pool.wait().await;
    pool.stop();
    // On an error path some jobs may still be in flight; let them observe
    // the cancellation and finish before the writers are torn down.
    pool.drain().await;

    let teardown_result = output.teardown().await;

    // First meaningful cause wins: whatever latched the cancellation, then
    // the pool's first job error, then teardown failures.
    if let Some(cause) = cancel.take_cause() {
        return Err(cause);
    }
    if let Some(error) = pool_error {
        return Err(error);
    }
    teardown_result
}

/// One model's batch loop: snapshot, ticket, submit. Runs on its own task
/// so models generate concurrently while the pool bounds the parallelism.
#[allow(clippy::too_many_arguments)]
async fn produce_model_batches(
    model_name: String,
    from: u64,
    to: u64,
    batch_size: u64,
    columns: Arc<ModelColumns>,
    writer: Arc<ModelWriter>,
    pool: Arc<WorkerPool>,
    progress: Arc<Progress>,
    cancel: CancelCause,
) {
    let mut syncer = Syncer::new();
    let mut start = from;
    while start < to {
        if cancel.is_cancelled() {
            return;
        }
        let size = batch_size.min(to - start) as usize;
        let generator = match BatchGenerator::new(Arc::clone(&columns), size) {
            Ok(g) => g,
            Err(e) => {
                cancel.cancel(e);
                return;
            }
        };
        let mut ticket = syncer.ticket();
        let writer = Arc::clone(&writer);
        let progress = Arc::clone(&progress);
        let cancel_for_job = cancel.clone();
        let job = Box::pin(async move {
            let result: Result<()> = async {
                let rows = generator.rows()?;
                ticket.wait_previous(&cancel_for_job).await?;
                writer.write_rows(rows).await?;
                progress.add_generated(size as u64);
                ticket.done();
                Ok(())
            }
            .await;
            if let Err(e) = result {
                let message = e.to_string();
                cancel_for_job.cancel(e);
                return Err(SdvgError::Canceled { cause: message });
            }
            Ok(())
        });
        if let Err(e) = pool.submit(job).await {
            cancel.cancel(e);
            return;
        }
        start += size as u64;
    }
    tracing::debug!("model '{}' submitted all batches", model_name);
}
