//! JSON exchange for search configs and fit results.
//!
//! Configs are partial: any field left out takes its default. Results are the
//! full `FitOutput` and round-trip through `read_result_json`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::{FitOutput, SearchConfig};
use crate::error::{CollapseError, ErrorKind};

/// Parse a search config from a JSON string.
pub fn config_from_json_str(json: &str) -> Result<SearchConfig, CollapseError> {
    serde_json::from_str(json)
        .map_err(|e| CollapseError::new(ErrorKind::InvalidConfig, format!("Invalid search config JSON: {e}")))
}

/// Read a search config JSON file.
pub fn read_config_json(path: &Path) -> Result<SearchConfig, CollapseError> {
    let file = File::open(path).map_err(|e| {
        CollapseError::new(
            ErrorKind::Io,
            format!("Failed to open config JSON '{}': {e}", path.display()),
        )
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CollapseError::new(ErrorKind::InvalidConfig, format!("Invalid search config JSON: {e}")))
}

/// Write a fit result as pretty JSON.
pub fn write_result_json(path: &Path, output: &FitOutput) -> Result<(), CollapseError> {
    let file = File::create(path).map_err(|e| {
        CollapseError::new(
            ErrorKind::Io,
            format!("Failed to create result JSON '{}': {e}", path.display()),
        )
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, output)
        .map_err(|e| CollapseError::new(ErrorKind::Io, format!("Failed to write result JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| CollapseError::new(ErrorKind::Io, format!("Failed to write result JSON: {e}")))
}

/// Read a fit result JSON file.
pub fn read_result_json(path: &Path) -> Result<FitOutput, CollapseError> {
    let file = File::open(path).map_err(|e| {
        CollapseError::new(
            ErrorKind::Io,
            format!("Failed to open result JSON '{}': {e}", path.display()),
        )
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CollapseError::new(ErrorKind::Io, format!("Invalid result JSON: {e}")))
}
