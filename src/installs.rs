use crate::error::{ConfigureError, Result};
use crate::render::write_atomic;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file copied to a directory by `make install`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl InstallEntry {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), destination: destination.into() }
    }

    /// Name the file has once installed.
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Lists the spec files under `module_root`, then the config module under
/// `config_module_dir`. Order is exactly the declaration order.
pub fn compute_installs(
    spec_files: &[PathBuf],
    config_module: &Path,
    module_root: &Path,
    config_module_dir: &Path,
) -> Vec<InstallEntry> {
    let mut installs: Vec<InstallEntry> =
        spec_files.iter().map(|f| InstallEntry::new(f.clone(), module_root)).collect();
    installs.push(InstallEntry::new(config_module, config_module_dir));
    installs
}

/// Writes the manifest as a JSON array of `{source, destination}` objects.
pub fn write_manifest(path: &Path, installs: &[InstallEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(installs)
        .map_err(|e| ConfigureError::BuildScriptWrite { path: path.to_path_buf(), source: e.into() })?;
    write_atomic(path, &(json + "\n"))
        .map_err(|source| ConfigureError::BuildScriptWrite { path: path.to_path_buf(), source })
}
