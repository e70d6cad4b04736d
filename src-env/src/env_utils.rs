//! Environment variable utilities for AutoPID
//!
//! This module locates the directory where the tuner keeps its checkpoint
//! and its CSV logs. On the robot this is the root of the SD card; on a
//! workstation it is `data_generated` under `AUTOPID_DIR` or under the
//! current directory.

use crate::constants::{AUTOPID_DIR, DATA_GENERATED};
use std::env;
use std::path::{Path, PathBuf};

/// Error type for environment variable issues
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error(
        "AUTOPID_DIR environment variable is not set. Please set it to the AutoPID working directory (e.g., export AUTOPID_DIR=/path/to/autopid)"
    )]
    AutopidDirNotSet,

    #[error("AUTOPID_DIR points to a non-existent directory: {0}")]
    AutopidDirNotFound(PathBuf),

    #[error("Failed to create data directory {path}: {source}")]
    DataDirCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Get the AUTOPID_DIR environment variable and validate it exists
///
/// # Errors
///
/// Returns an error if:
/// - AUTOPID_DIR is not set
/// - AUTOPID_DIR points to a non-existent directory
///
/// # Example
///
/// ```no_run
/// use autopid_env::env_utils::get_autopid_dir;
///
/// let autopid_dir = get_autopid_dir()?;
/// println!("AutoPID directory: {}", autopid_dir.display());
/// # Ok::<(), autopid_env::env_utils::EnvError>(())
/// ```
pub fn get_autopid_dir() -> Result<PathBuf, EnvError> {
    let autopid_dir = env::var(AUTOPID_DIR).map_err(|_| EnvError::AutopidDirNotSet)?;
    existing_dir(PathBuf::from(autopid_dir))
}

/// Get the path to `$AUTOPID_DIR/data_generated`, creating it if necessary
pub fn get_data_generated_dir() -> Result<PathBuf, EnvError> {
    let autopid_dir = get_autopid_dir()?;
    ensure_dir(autopid_dir.join(DATA_GENERATED))
}

/// Resolve the data directory used for checkpoints and logs
///
/// Resolution order:
/// 1. `explicit` when given (created if missing)
/// 2. `$AUTOPID_DIR/data_generated` when `AUTOPID_DIR` is set
/// 3. `./data_generated`
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, EnvError> {
    resolve_data_dir_from(explicit, env::var(AUTOPID_DIR).ok())
}

fn resolve_data_dir_from(
    explicit: Option<&Path>,
    autopid_dir: Option<String>,
) -> Result<PathBuf, EnvError> {
    if let Some(path) = explicit {
        return ensure_dir(path.to_path_buf());
    }
    match autopid_dir {
        Some(dir) => {
            let root = existing_dir(PathBuf::from(dir))?;
            ensure_dir(root.join(DATA_GENERATED))
        }
        None => {
            log::debug!("{} not set, using ./{}", AUTOPID_DIR, DATA_GENERATED);
            ensure_dir(PathBuf::from(DATA_GENERATED))
        }
    }
}

fn existing_dir(path: PathBuf) -> Result<PathBuf, EnvError> {
    if !path.exists() {
        return Err(EnvError::AutopidDirNotFound(path));
    }
    Ok(path)
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, EnvError> {
    if !path.exists() {
        std::fs::create_dir_all(&path)
            .map_err(|source| EnvError::DataDirCreationFailed { path: path.clone(), source })?;
    }
    Ok(path)
}
