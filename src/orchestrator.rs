use crate::config::ResolvedConfig;
use crate::config_module::{ModuleTemplateContext, render_config_module};
use crate::error::Result;
use crate::generator::{Generator, GeneratorInvocation, invoke_generator};
use crate::installs::{InstallEntry, compute_installs, write_manifest};
use crate::makefile::generate_build_script;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    InvokeGenerator,
    ComputeInstalls,
    GenerateBuildScript,
    RenderConfigModule,
    WriteManifest,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::InvokeGenerator => "invoke-generator",
            Step::ComputeInstalls => "compute-installs",
            Step::GenerateBuildScript => "generate-build-script",
            Step::RenderConfigModule => "render-config-module",
            Step::WriteManifest => "write-manifest",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub makefile: PathBuf,
    pub config_module: PathBuf,
    pub installs: Vec<InstallEntry>,
}

/// Runs generator, install planning, Makefile and config module in that
/// order, stopping at the first failure.
pub struct Orchestrator<'g> {
    config: ResolvedConfig,
    output_dir: PathBuf,
    generator: &'g dyn Generator,
    manifest: Option<PathBuf>,
}

impl<'g> Orchestrator<'g> {
    pub fn new(config: ResolvedConfig, output_dir: impl Into<PathBuf>, generator: &'g dyn Generator) -> Self {
        Self { config, output_dir: output_dir.into(), generator, manifest: None }
    }

    /// Also write the install manifest as JSON to `path`, relative to the
    /// output directory.
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    /// Values published in the config module.
    pub fn module_context(&self) -> ModuleTemplateContext {
        let ResolvedConfig { build, binding } = &self.config;
        let mut context = binding.module_values.clone();
        context.insert(
            format!("{}_sip_dir", binding.module),
            binding.sip_install_dir(build).display().to_string(),
        );
        let flags: Vec<&str> =
            binding.sip_flags.iter().map(String::as_str).filter(|f| !f.is_empty()).collect();
        context.insert(format!("{}_sip_flags", binding.module), flags.join(" "));
        context
    }

    pub fn run(&self) -> Result<Outcome> {
        let ResolvedConfig { build, binding } = &self.config;
        let _span = info_span!("configure", module = %binding.module).entered();
        let out = |p: &Path| self.output_dir.join(p);

        info!(step = %Step::InvokeGenerator, "Starting step");
        let invocation = GeneratorInvocation::new(build, binding, &self.output_dir);
        invoke_generator(self.generator, &invocation)?;

        info!(step = %Step::ComputeInstalls, "Starting step");
        let module_root = binding.sip_install_dir(build).join(&binding.spec_subdir);
        let config_module = PathBuf::from(binding.config_module());
        let installs = compute_installs(
            &binding.spec_files(),
            &config_module,
            &module_root,
            &build.default_mod_dir,
        );
        for entry in &installs {
            info!("Install {} -> {}", entry.source.display(), entry.destination.display());
        }

        info!(step = %Step::GenerateBuildScript, "Starting step");
        let makefile = out(Path::new(&binding.makefile));
        generate_build_script(
            build,
            &out(Path::new(&binding.build_file())),
            &makefile,
            &installs,
            &binding.extra_libs,
            &binding.extra_include_dirs,
            &binding.extra_lib_dirs,
        )?;

        info!(step = %Step::RenderConfigModule, "Starting step");
        let config_module = out(&config_module);
        render_config_module(
            &config_module,
            &out(Path::new(&binding.config_template())),
            &self.module_context(),
        )?;

        if let Some(path) = &self.manifest {
            info!(step = %Step::WriteManifest, "Starting step");
            write_manifest(&out(path), &installs)?;
        }

        info!("Configuration of {} complete", binding.module);
        Ok(Outcome { makefile, config_module, installs })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::BindingConfig;
    use crate::error::ConfigureError;
    use crate::generator::tests::build_config;
    use std::cell::RefCell;
    use std::fs;
    use std::io;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use tempfile::tempdir;

    /// Writes a fixed build file like the real generator would, or fails.
    struct StubGenerator {
        exit_code: i32,
        calls: RefCell<Vec<String>>,
    }

    impl StubGenerator {
        fn new(exit_code: i32) -> Self {
            Self { exit_code, calls: RefCell::new(Vec::new()) }
        }
    }

    impl Generator for StubGenerator {
        fn run(&self, invocation: &GeneratorInvocation) -> io::Result<Output> {
            self.calls.borrow_mut().push(invocation.command_line());
            if self.exit_code == 0 {
                fs::write(
                    invocation.working_dir.join(&invocation.build_file),
                    "target = Widget\nsources = sipWidgetcmodule.cc sipWidgetWidget.cc\nheaders = sipAPIWidget.h\n",
                )?;
            }
            Ok(Output {
                status: ExitStatus::from_raw(self.exit_code << 8),
                stdout: Vec::new(),
                stderr: b"Widget_mod.sip:1: parse error".to_vec(),
            })
        }
    }

    fn widget_config() -> ResolvedConfig {
        ResolvedConfig {
            build: build_config(),
            binding: BindingConfig {
                module: "Widget".into(),
                spec_file: Some("Widget_mod.sip".into()),
                build_file: Some("Widget.sbf".into()),
                sip_install_dir: Some("/opt/specs".into()),
                extra_libs: vec!["widget_core".into()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn end_to_end_with_successful_generator() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("WidgetConfig.py.in"),
            "sip_dir = '@Widget_sip_dir@'\nflags = '@Widget_sip_flags@'\n",
        )
        .unwrap();
        let stub = StubGenerator::new(0);
        let manifest = dir.path().join("installs.json");

        let outcome =
            Orchestrator::new(widget_config(), dir.path(), &stub).with_manifest(&manifest).run().unwrap();

        assert_eq!(
            stub.calls.borrow().as_slice(),
            ["/usr/bin/sip -c . -b Widget.sbf -I /usr/share/sip -s .cc Widget_mod.sip"]
        );
        let mk = fs::read_to_string(&outcome.makefile).unwrap();
        assert!(mk.contains("-lwidget_core"));
        assert_eq!(
            outcome.installs,
            vec![
                InstallEntry::new("Widget_mod.sip", "/opt/specs/OthCore"),
                InstallEntry::new("WidgetConfig.py", "/usr/lib/python3/dist-packages"),
            ]
        );
        assert_eq!(
            fs::read_to_string(&outcome.config_module).unwrap(),
            "sip_dir = '/opt/specs'\nflags = ''\n"
        );
        assert!(manifest.exists());
    }

    #[test]
    fn generator_failure_stops_before_build_script() {
        let dir = tempdir().unwrap();
        let makefile = dir.path().join("Makefile");
        fs::write(&makefile, "previous").unwrap();
        fs::write(dir.path().join("WidgetConfig.py.in"), "x").unwrap();
        let stub = StubGenerator::new(1);

        let err = Orchestrator::new(widget_config(), dir.path(), &stub).run().unwrap_err();

        match err {
            ConfigureError::GeneratorFailure { stderr, .. } => assert!(stderr.contains("parse error")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&makefile).unwrap(), "previous");
        assert!(!dir.path().join("WidgetConfig.py").exists());
    }

    #[test]
    fn missing_config_template_fails_after_makefile() {
        let dir = tempdir().unwrap();
        let stub = StubGenerator::new(0);

        let err = Orchestrator::new(widget_config(), dir.path(), &stub).run().unwrap_err();

        assert!(matches!(err, ConfigureError::TemplateRender(_)));
        assert!(dir.path().join("Makefile").exists());
        assert!(!dir.path().join("WidgetConfig.py").exists());
    }

    #[test]
    fn relative_manifest_lands_in_output_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("WidgetConfig.py.in"), "x\n").unwrap();
        let stub = StubGenerator::new(0);

        Orchestrator::new(widget_config(), dir.path(), &stub)
            .with_manifest("installs.json")
            .run()
            .unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("installs.json")).unwrap()).unwrap();
        assert_eq!(manifest[0]["source"], "Widget_mod.sip");
    }

    #[test]
    fn module_values_are_published() {
        let mut config = widget_config();
        config.binding.module_values.insert("Widget_version".into(), "1.2".into());
        config.binding.sip_flags = vec!["-x".into(), String::new(), "Py_v3".into()];
        let stub = StubGenerator::new(0);
        let orchestrator = Orchestrator::new(config, ".", &stub);

        let context = orchestrator.module_context();
        assert_eq!(context["Widget_version"], "1.2");
        assert_eq!(context["Widget_sip_flags"], "-x Py_v3");
        assert_eq!(context["Widget_sip_dir"], "/opt/specs");
    }
}
