//! Environment utilities and constants shared by the AutoPID crates

pub mod constants;
pub mod env_utils;

pub use constants::*;
pub use env_utils::{EnvError, get_autopid_dir, get_data_generated_dir, resolve_data_dir};
