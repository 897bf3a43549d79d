use crate::config::{BindingConfig, BuildConfig};
use crate::error::{ConfigureError, Result};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use tracing::{debug, error, info};

/// One call of the interface generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInvocation {
    pub program: PathBuf,
    pub spec_dir: PathBuf,
    pub build_file: String,
    pub search_dir: PathBuf,
    pub extra_include_dirs: Vec<PathBuf>,
    pub src_ext: String,
    pub extra_flags: Vec<String>,
    pub spec_file: PathBuf,
    pub working_dir: PathBuf,
}

impl GeneratorInvocation {
    pub fn new(config: &BuildConfig, binding: &BindingConfig, working_dir: &Path) -> Self {
        Self {
            program: config.sip_bin.clone(),
            spec_dir: binding.spec_dir.clone(),
            build_file: binding.build_file(),
            search_dir: config.default_sip_dir.clone(),
            extra_include_dirs: binding.sip_include_dirs.clone(),
            src_ext: binding.src_ext.clone(),
            extra_flags: binding.sip_flags.clone(),
            spec_file: binding.spec_file(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Arguments in the order the generator expects:
    /// `-c <spec_dir> -b <build_file> -I <search_dir> [-I <dir>]... -s <ext> [flags]... <spec_file>`.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-c".into(),
            self.spec_dir.clone().into(),
            "-b".into(),
            self.build_file.clone().into(),
            "-I".into(),
            self.search_dir.clone().into(),
        ];
        for dir in &self.extra_include_dirs {
            args.push("-I".into());
            args.push(dir.clone().into());
        }
        args.push("-s".into());
        args.push(self.src_ext.clone().into());
        args.extend(self.extra_flags.iter().filter(|f| !f.is_empty()).map(OsString::from));
        args.push(self.spec_file.clone().into());
        args
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args().iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Runs the generator. The process implementation is [`ProcessGenerator`].
pub trait Generator {
    fn run(&self, invocation: &GeneratorInvocation) -> io::Result<Output>;
}

/// Spawns the generator as a child process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGenerator;

impl Generator for ProcessGenerator {
    fn run(&self, invocation: &GeneratorInvocation) -> io::Result<Output> {
        Command::new(&invocation.program)
            .args(invocation.args())
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .output()
    }
}

/// Runs the generator and checks its exit status.
///
/// A non-zero exit or a failure to spawn becomes
/// [`ConfigureError::GeneratorFailure`] with the captured output attached.
pub fn invoke_generator(
    generator: &dyn Generator,
    invocation: &GeneratorInvocation,
) -> Result<ExitStatus> {
    info!("Running {}", invocation.command_line());
    let program = invocation.program.display().to_string();

    match generator.run(invocation) {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                debug!("generator output:\n{}", stdout.trim_end());
            }
            Ok(output.status)
        }
        Ok(output) => {
            error!("Generate failed with status: {}", output.status);
            Err(ConfigureError::GeneratorFailure {
                program,
                status: Some(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        Err(e) => {
            error!("Failed to execute {}: {}", program, e);
            Err(ConfigureError::GeneratorFailure {
                program,
                status: None,
                stdout: String::new(),
                stderr: e.to_string(),
            })
        }
    }
}
