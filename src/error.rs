use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failure of one step of the configure run. Every variant is fatal.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("generator: {program} {}", describe_status(.status))]
    GeneratorFailure {
        program: String,
        /// `None` when the process could not be started at all.
        status: Option<ExitStatus>,
        stdout: String,
        stderr: String,
    },

    #[error("generator: invalid build file {}: {source}", .path.display())]
    InvalidBuildFile {
        path: PathBuf,
        #[source]
        source: BuildFileError,
    },

    #[error("build script: failed to write {}: {source}", .path.display())]
    BuildScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config module: {0}")]
    TemplateRender(String),
}

/// Why the generator's build file could not be used.
#[derive(Debug, Error)]
pub enum BuildFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] sbf_parser::ParseError),
}

impl ConfigureError {
    /// Process exit code for this failure, following `sysexits.h`.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigureError::Configuration(_) => 78,
            ConfigureError::GeneratorFailure { .. } | ConfigureError::InvalidBuildFile { .. } => 70,
            ConfigureError::BuildScriptWrite { .. } => 74,
            ConfigureError::TemplateRender(_) => 65,
        }
    }
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(status) => format!("failed with {status}"),
        None => "could not be started".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ConfigureError>;
