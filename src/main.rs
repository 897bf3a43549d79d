mod config;
mod config_module;
mod contexts;
mod error;
mod generator;
mod installs;
mod makefile;
mod orchestrator;
mod render;
mod templates;

use crate::config::{ResolvedConfig, resolve_config};
use crate::error::ConfigureError;
use crate::generator::ProcessGenerator;
use crate::orchestrator::Orchestrator;
use anyhow::Context;
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};

/// Generates the Makefile and config module for a SIP binding.
#[derive(Parser)]
#[command(name = "sip-configure", version)]
struct Cli {
    /// Config file (defaults to $SIP_CONFIGURE_CONFIG, then ./configure.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory the generator runs in and outputs are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Module name, e.g. YmUtils
    #[arg(short, long)]
    module_name: Option<String>,
    /// Interface-spec file passed to the generator
    #[arg(short, long)]
    spec_file: Option<PathBuf>,
    /// Build file the generator writes
    #[arg(short, long)]
    build_file: Option<String>,
    /// Library to link against (repeatable; replaces the configured list)
    #[arg(short = 'l', long = "extra-lib")]
    extra_libs: Vec<String>,
    /// Compiler include directory (repeatable)
    #[arg(short = 'I', long = "include-dir")]
    include_dirs: Vec<PathBuf>,
    /// Linker library directory (repeatable)
    #[arg(short = 'L', long = "lib-dir")]
    lib_dirs: Vec<PathBuf>,
    /// Extra generator flag (repeatable)
    #[arg(long = "sip-flag", allow_hyphen_values = true)]
    sip_flags: Vec<String>,
    /// Write the install manifest as JSON (relative paths are under the output directory)
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut ResolvedConfig) {
        let binding = &mut config.binding;
        if let Some(module) = &self.module_name {
            binding.module = module.clone();
        }
        if let Some(spec_file) = &self.spec_file {
            binding.spec_file = Some(spec_file.clone());
        }
        if let Some(build_file) = &self.build_file {
            binding.build_file = Some(build_file.clone());
        }
        if !self.extra_libs.is_empty() {
            binding.extra_libs = self.extra_libs.clone();
        }
        binding.extra_include_dirs.extend(self.include_dirs.iter().cloned());
        binding.extra_lib_dirs.extend(self.lib_dirs.iter().cloned());
        binding.sip_flags.extend(self.sip_flags.iter().cloned());
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = resolve_config(cli.config.as_deref(), Path::new("."), |k| std::env::var(k).ok())
        .context("resolving configuration")?;
    cli.apply(&mut config);

    let generator = ProcessGenerator;
    let mut orchestrator = Orchestrator::new(config, &cli.output_dir, &generator);
    if let Some(manifest) = &cli.manifest {
        orchestrator = orchestrator.with_manifest(manifest);
    }

    let outcome = orchestrator.run().context("configure failed")?;
    info!(
        "Wrote {} and {} ({} install entries)",
        outcome.makefile.display(),
        outcome.config_module.display(),
        outcome.installs.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            let Some(cause) = err.downcast_ref::<ConfigureError>() else {
                return ExitCode::FAILURE;
            };
            if let ConfigureError::GeneratorFailure { stdout, stderr, .. } = cause {
                if !stdout.trim().is_empty() {
                    error!("generator stdout:\n{}", stdout.trim_end());
                }
                if !stderr.trim().is_empty() {
                    error!("generator stderr:\n{}", stderr.trim_end());
                }
            }
            ExitCode::from(cause.exit_code())
        }
    }
}
