use compkit_core::{Error, PipelineConfig, Result};
use std::fs;
use std::path::Path;

/// Reads a job file: a JSON [`PipelineConfig`].
pub fn load_pipeline<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::Config(format!("Invalid job file {}: {}", path.display(), e)))
}
