//! # Backup & Resume
//!
//! A non-resume run snapshots the generation-shaping config fields to
//! `<output.dir>/backup.json` (performance knobs and the directory itself
//! are excluded via `skip_serializing`). A `--continue` run re-reads the
//! backup, adopts its seed when the live seed is 0, structurally diffs the
//! live snapshot against it, and loads the per-model checkpoints to raise
//! each model's `generate_from`.

pub mod checkpoint;
pub mod diff;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::config::GenerationConfig;
use crate::error::{Result, SdvgError};
use crate::output::model_base_path;

pub const BACKUP_FILE_NAME: &str = "backup.json";

/// The canonical backup tree of a config: exactly the backup-eligible
/// fields, times as RFC3339, UUIDs as canonical strings (both courtesy of
/// the serde impls), integers as JSON numbers.
pub fn backup_snapshot(config: &GenerationConfig) -> Result<serde_json::Value> {
    serde_json::to_value(config).map_err(|e| SdvgError::Internal {
        message: format!("serializing config snapshot: {}", e),
    })
}

/// Write `backup.json` atomically. Called once on every non-resume start.
pub fn save_backup(config: &GenerationConfig, dir: &Path) -> Result<()> {
    let snapshot = backup_snapshot(config)?;
    let json = serde_json::to_string_pretty(&snapshot).map_err(|e| SdvgError::Internal {
        message: format!("serializing backup: {}", e),
    })?;

    std::fs::create_dir_all(dir).map_err(|e| SdvgError::Io {
        message: format!("creating {}", dir.display()),
        source: e,
    })?;
    let tmp_path = dir.join(".backup.json.tmp");
    let mut file = std::fs::File::create(&tmp_path).map_err(|e| SdvgError::Io {
        message: format!("creating {}", tmp_path.display()),
        source: e,
    })?;
    file.write_all(json.as_bytes()).map_err(|e| SdvgError::Io {
        message: format!("writing {}", tmp_path.display()),
        source: e,
    })?;
    file.sync_all().map_err(|e| SdvgError::Io {
        message: format!("syncing {}", tmp_path.display()),
        source: e,
    })?;
    std::fs::rename(&tmp_path, dir.join(BACKUP_FILE_NAME)).map_err(|e| SdvgError::Io {
        message: format!("renaming {} into place", tmp_path.display()),
        source: e,
    })?;
    Ok(())
}

pub fn load_backup(dir: &Path) -> Result<serde_json::Value> {
    let path = dir.join(BACKUP_FILE_NAME);
    let content = std::fs::read_to_string(&path).map_err(|e| SdvgError::Io {
        message: format!(
            "reading {} (is this directory the result of a previous run?)",
            path.display()
        ),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| SdvgError::ConfigParse {
        path: path.display().to_string(),
        message: format!("invalid backup: {}", e),
    })
}

/// Validate a `--continue` start and load the resume offsets.
///
/// Adopts the backup's seed when the live seed is 0, verifies structural
/// equivalence, then clamps each model's `generate_from` to
/// `min(checkpointed rows, generate_to)`. Returns the per-model
/// checkpointed counters for the output writers.
pub fn process_continue_generation(
    config: &mut GenerationConfig,
) -> Result<HashMap<String, u64>> {
    let backup = load_backup(&config.output.dir)?;

    if config.random_seed == 0 {
        if let Some(seed) = backup.get("random_seed").and_then(|v| v.as_u64()) {
            config.random_seed = seed;
        }
    }

    let live = backup_snapshot(config)?;
    let entries = diff::diff(&backup, &live);
    if !entries.is_empty() {
        return Err(SdvgError::BackupMismatch {
            diff: diff::render_diff(&entries),
        });
    }

    let mut saved = HashMap::new();
    let output = config.output.clone();
    for model in config.models.values_mut() {
        let base = model_base_path(&output, model);
        if let Some(rows) = checkpoint::read_checkpoint(&base, &model.name)? {
            let clamped = rows.min(model.generate_to());
            model.generate_from = model.generate_from.max(clamped);
            saved.insert(model.name.clone(), clamped);
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Column, ColumnKind, Model};

    fn config(dir: &Path, rows: u64, seed: u64) -> GenerationConfig {
        let mut config = GenerationConfig {
            random_seed: seed,
            ..GenerationConfig::default()
        };
        config.models.insert(
            "test_model".to_string(),
            Model {
                rows_count: rows,
                columns: vec![Column {
                    name: "a".to_string(),
                    kind: Some(ColumnKind::Integer),
                    ..Column::default()
                }],
                ..Model::default()
            },
        );
        config.output.dir = dir.to_path_buf();
        config.prepare().unwrap();
        config
    }

    #[test]
    fn test_snapshot_excludes_performance_knobs() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = backup_snapshot(&config(dir.path(), 1, 123)).unwrap();
        assert!(snapshot.get("workers_count").is_none());
        assert!(snapshot.get("batch_size").is_none());
        assert!(snapshot["output"].get("dir").is_none());
        assert_eq!(snapshot["random_seed"], serde_json::json!(123));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 5, 7);
        save_backup(&cfg, dir.path()).unwrap();
        let loaded = load_backup(dir.path()).unwrap();
        assert_eq!(loaded, backup_snapshot(&cfg).unwrap());
    }

    #[test]
    fn test_matching_resume_passes_and_loads_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 36, 9);
        save_backup(&cfg, dir.path()).unwrap();
        checkpoint::write_checkpoint(dir.path(), "test_model", 18).unwrap();

        let mut resumed = config(dir.path(), 36, 9);
        let saved = process_continue_generation(&mut resumed).unwrap();
        assert_eq!(saved["test_model"], 18);
        assert_eq!(resumed.models["test_model"].generate_from, 18);
    }

    #[test]
    fn test_rows_count_change_is_backup_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 1, 123);
        save_backup(&cfg, dir.path()).unwrap();

        let mut resumed = config(dir.path(), 2, 123);
        let err = process_continue_generation(&mut resumed).unwrap_err();
        let msg = format!("{}", err);
        assert!(
            msg.contains("models[test_model].rows_count 1 -> 2"),
            "unexpected diff: {}",
            msg
        );
        // Exactly one divergent path.
        assert_eq!(msg.matches(" -> ").count(), 1);
    }

    #[test]
    fn test_zero_seed_adopts_backup_seed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 3, 555);
        save_backup(&cfg, dir.path()).unwrap();

        let mut resumed = config(dir.path(), 3, 0);
        process_continue_generation(&mut resumed).unwrap();
        assert_eq!(resumed.random_seed, 555);
    }

    #[test]
    fn test_checkpoint_clamped_to_generate_to() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 10, 1);
        save_backup(&cfg, dir.path()).unwrap();
        checkpoint::write_checkpoint(dir.path(), "test_model", 99).unwrap();

        let mut resumed = config(dir.path(), 10, 1);
        let saved = process_continue_generation(&mut resumed).unwrap();
        assert_eq!(saved["test_model"], 10);
        assert_eq!(resumed.models["test_model"].generate_from, 10);
    }

    #[test]
    fn test_missing_backup_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut resumed = config(dir.path(), 1, 1);
        assert!(process_continue_generation(&mut resumed).is_err());
    }
}
