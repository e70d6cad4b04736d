/// Name of the environment variable pointing at the AutoPID working directory
pub const AUTOPID_DIR: &str = "AUTOPID_DIR";

/// Directory (relative to `AUTOPID_DIR` or the current directory) holding
/// checkpoints and logs
pub const DATA_GENERATED: &str = "data_generated";
