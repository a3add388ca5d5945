//! Per-model checkpoints: `<base>/<model>_checkpoint.json` holding the
//! rows durably written so far. Written atomically (temp file + rename) so
//! a crash mid-write leaves the previous checkpoint intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdvgError};

#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    saved_rows: u64,
}

pub fn checkpoint_path(base: &Path, model: &str) -> PathBuf {
    base.join(format!("{}_checkpoint.json", model))
}

pub fn write_checkpoint(base: &Path, model: &str, saved_rows: u64) -> Result<()> {
    let path = checkpoint_path(base, model);
    let json = serde_json::to_string(&Checkpoint { saved_rows }).map_err(|e| SdvgError::Io {
        message: format!("serializing checkpoint for '{}'", model),
        source: std::io::Error::other(e),
    })?;

    let tmp_path = base.join(format!(".{}_checkpoint.json.tmp", model));
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
    std::fs::rename(&tmp_path, &path).map_err(|e| SdvgError::Io {
        message: format!("renaming {} into place", tmp_path.display()),
        source: e,
    })?;
    Ok(())
}

/// The checkpointed row count, or `None` when no checkpoint exists.
pub fn read_checkpoint(base: &Path, model: &str) -> Result<Option<u64>> {
    let path = checkpoint_path(base, model);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SdvgError::Io {
                message: format!("reading {}", path.display()),
                source: e,
            })
        }
    };
    let checkpoint: Checkpoint =
        serde_json::from_str(&content).map_err(|e| SdvgError::ConfigParse {
            path: path.display().to_string(),
            message: format!("invalid checkpoint: {}", e),
        })?;
    Ok(Some(checkpoint.saved_rows))
}
