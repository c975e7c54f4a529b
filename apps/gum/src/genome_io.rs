//! # Genome & Run-State Files
//!
//! Loading genome documents (`.json` or `.toml`) and reading/writing
//! run-state checkpoints. Every file is size-checked before it is read.

use gum_core::formats::MAX_CHECKPOINT_SIZE;
use gum_core::{GenomeDocument, GumError, RunState, state_from_bytes, state_to_bytes};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum genome document size (10 MB).
pub const MAX_GENOME_FILE_SIZE: u64 = 10 * 1024 * 1024;

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), GumError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GumError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(GumError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize `path` and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, GumError> {
    let canonical = path.canonicalize().map_err(|e| {
        GumError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(GumError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// GENOME DOCUMENTS
// =============================================================================

/// Text encodings a genome document may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenomeFormat {
    Json,
    Toml,
}

impl GenomeFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, GumError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            _ => Err(GumError::InvalidGenome(format!(
                "unsupported genome file '{}': expected .json or .toml",
                path.display()
            ))),
        }
    }
}

/// Parse genome text and validate its rules and seed graph.
pub fn parse_genome(text: &str, format: GenomeFormat) -> Result<GenomeDocument, GumError> {
    let document: GenomeDocument = match format {
        GenomeFormat::Json => {
            serde_json::from_str(text).map_err(|e| GumError::InvalidGenome(e.to_string()))?
        }
        GenomeFormat::Toml => {
            toml::from_str(text).map_err(|e| GumError::InvalidGenome(e.to_string()))?
        }
    };

    document.rule_table()?;
    document.initial_graph()?;
    Ok(document)
}

/// Load and validate a genome document from disk.
pub fn load_genome(path: &Path) -> Result<GenomeDocument, GumError> {
    let format = GenomeFormat::from_path(path)?;
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_GENOME_FILE_SIZE)?;

    let text = std::fs::read_to_string(&path)
        .map_err(|e| GumError::IoError(format!("Failed to read genome: {}", e)))?;
    let document = parse_genome(&text, format)?;

    tracing::debug!(
        path = %path.display(),
        rules = document.rules.len(),
        seed_nodes = document.init_graph.nodes.len(),
        "genome loaded"
    );
    Ok(document)
}

// =============================================================================
// RUN-STATE FILES
// =============================================================================

/// Read a checkpoint. A missing file is not an error.
pub fn read_state(path: &Path) -> Result<Option<RunState>, GumError> {
    if !path.exists() {
        return Ok(None);
    }
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_CHECKPOINT_SIZE as u64)?;

    let bytes = std::fs::read(&path)
        .map_err(|e| GumError::IoError(format!("Failed to read run state: {}", e)))?;
    state_from_bytes(&bytes).map(Some)
}

/// Read a checkpoint that must exist.
pub fn require_state(path: &Path) -> Result<RunState, GumError> {
    read_state(path)?.ok_or_else(|| {
        GumError::IoError(format!("Run state '{}' does not exist", path.display()))
    })
}

/// Write a checkpoint, replacing any previous one.
pub fn write_state(path: &Path, state: &RunState) -> Result<(), GumError> {
    let bytes = state_to_bytes(state)?;
    std::fs::write(path, &bytes)
        .map_err(|e| GumError::IoError(format!("Failed to write run state: {}", e)))?;
    tracing::debug!(path = %path.display(), step = state.step, bytes = bytes.len(), "run state saved");
    Ok(())
}
