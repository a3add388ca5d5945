//! Fresh-start conflict scan.
//!
//! Before a non-resume run touches a directory that may hold a previous
//! run's results, four categories of leftovers are enumerated: backup and
//! checkpoint files, per-model data files matching the sink extension,
//! `col=value` partition directories, and non-empty model subdirectories.
//! The caller either reports them or force-deletes the lot.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::{Model, OutputConfig};
use crate::error::{Result, SdvgError};

/// Enumerate the paths a previous run left behind.
pub fn scan_conflicts(output: &OutputConfig, models: &IndexMap<String, Model>) -> Result<Vec<PathBuf>> {
    let dir = &output.dir;
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut conflicts = Vec::new();

    let backup = dir.join("backup.json");
    if backup.exists() {
        conflicts.push(backup);
    }

    for model in models.values() {
        let base = if output.create_model_dir {
            dir.join(model.model_dir())
        } else {
            dir.clone()
        };

        let checkpoint = base.join(format!("{}_checkpoint.json", model.name));
        if checkpoint.exists() {
            conflicts.push(checkpoint);
        }

        if output.create_model_dir {
            // A non-empty model dir is a conflict wholesale.
            if base.exists() && dir_has_entries(&base)? {
                conflicts.push(base);
            }
            continue;
        }

        if let Some(ext) = output.sink.file_extension() {
            collect_data_files(dir, &model.name, ext, &mut conflicts)?;
        }
    }

    if !output.create_model_dir {
        // Stale partition directories are recognizable by the `=` in their
        // name.
        for entry in read_dir(dir)? {
            let path = entry.path();
            if path.is_dir() && entry.file_name().to_string_lossy().contains('=') {
                conflicts.push(path);
            }
        }
    }

    conflicts.sort();
    conflicts.dedup();
    Ok(conflicts)
}

/// Delete every conflicting path. Used by force-generation.
pub fn remove_conflicts(conflicts: &[PathBuf]) -> Result<()> {
    for path in conflicts {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SdvgError::Io {
                    message: format!("removing {}", path.display()),
                    source: e,
                })
            }
        }
    }
    Ok(())
}

/// Render a conflict list for the `OutputConflict` error.
pub fn render_conflicts(conflicts: &[PathBuf]) -> String {
    conflicts
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_data_files(
    dir: &Path,
    model_name: &str,
    ext: &str,
    conflicts: &mut Vec<PathBuf>,
) -> Result<()> {
    let prefix = format!("{}_", model_name);
    let suffix = format!(".{}", ext);
    for entry in read_dir(dir)? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && name.ends_with(&suffix) {
            conflicts.push(entry.path());
        }
    }
    Ok(())
}

fn dir_has_entries(dir: &Path) -> Result<bool> {
    Ok(read_dir(dir)?.next().is_some())
}

fn read_dir(dir: &Path) -> Result<impl Iterator<Item = std::fs::DirEntry>> {
    let entries = std::fs::read_dir(dir).map_err(|e| SdvgError::Io {
        message: format!("scanning {}", dir.display()),
        source: e,
    })?;
    Ok(entries.flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CsvParams, SinkConfig};

    fn output(dir: &Path, create_model_dir: bool) -> OutputConfig {
        OutputConfig {
            dir: dir.to_path_buf(),
            sink: SinkConfig::Csv(CsvParams::default()),
            create_model_dir,
            ..OutputConfig::default()
        }
    }

    fn models(names: &[&str]) -> IndexMap<String, Model> {
        names
            .iter()
            .map(|n| {
                (
                    n.to_string(),
                    Model {
                        name: n.to_string(),
                        rows_count: 1,
                        model_dir: Some(n.to_string()),
                        ..Model::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_dir_no_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let conflicts = scan_conflicts(&output(dir.path(), false), &models(&["m"])).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_backup_checkpoint_and_data_files_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backup.json"), "{}").unwrap();
        std::fs::write(dir.path().join("m_checkpoint.json"), "{}").unwrap();
        std::fs::write(dir.path().join("m_0.csv"), "a,b\n").unwrap();
        std::fs::write(dir.path().join("other_0.csv"), "x\n").unwrap();

        let conflicts = scan_conflicts(&output(dir.path(), false), &models(&["m"])).unwrap();
        let names: Vec<String> = conflicts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"backup.json".to_string()));
        assert!(names.contains(&"m_checkpoint.json".to_string()));
        assert!(names.contains(&"m_0.csv".to_string()));
        assert!(!names.contains(&"other_0.csv".to_string()));
    }

    #[test]
    fn test_partition_dirs_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("region=eu")).unwrap();
        std::fs::create_dir(dir.path().join("plain")).unwrap();

        let conflicts = scan_conflicts(&output(dir.path(), false), &models(&["m"])).unwrap();
        let names: Vec<String> = conflicts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["region=eu"]);
    }

    #[test]
    fn test_non_empty_model_dir_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("m")).unwrap();
        std::fs::write(dir.path().join("m").join("m_0.csv"), "x\n").unwrap();
        std::fs::create_dir(dir.path().join("empty_model")).unwrap();

        let conflicts =
            scan_conflicts(&output(dir.path(), true), &models(&["m", "empty_model"])).unwrap();
        let names: Vec<String> = conflicts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["m"]);
    }

    #[test]
    fn test_remove_conflicts_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backup.json"), "{}").unwrap();
        std::fs::write(dir.path().join("m_0.csv"), "x\n").unwrap();
        std::fs::create_dir(dir.path().join("region=eu")).unwrap();

        let conflicts = scan_conflicts(&output(dir.path(), false), &models(&["m"])).unwrap();
        assert_eq!(conflicts.len(), 3);
        remove_conflicts(&conflicts).unwrap();
        let remaining = scan_conflicts(&output(dir.path(), false), &models(&["m"])).unwrap();
        assert!(remaining.is_empty());
    }
}
