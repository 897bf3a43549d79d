use crate::config::BuildConfig;
use crate::contexts::{InstallRule, MakefileContext, SuffixRule};
use crate::error::{BuildFileError, ConfigureError, Result};
use crate::installs::InstallEntry;
use crate::render::{render_template, write_atomic};
use crate::templates;
use sbf_parser::{BuildFile, parse_build_file};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads the generator's build file and writes a Makefile that compiles,
/// links and installs the module.
pub fn generate_build_script(
    config: &BuildConfig,
    build_file: &Path,
    output: &Path,
    installs: &[InstallEntry],
    extra_libs: &[String],
    extra_include_dirs: &[PathBuf],
    extra_lib_dirs: &[PathBuf],
) -> Result<()> {
    let parsed = read_build_file(build_file)?;
    for (key, values) in &parsed.extra {
        debug!("Ignoring build file key {} ({} values)", key, values.len());
    }
    let build_file_name = build_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ctx = makefile_context(
        config,
        &build_file_name,
        &parsed,
        installs,
        extra_libs,
        extra_include_dirs,
        extra_lib_dirs,
    );

    let write_error = |source: io::Error| ConfigureError::BuildScriptWrite {
        path: output.to_path_buf(),
        source,
    };
    let template = templates::get(templates::MAKEFILE)
        .ok_or_else(|| write_error(io::Error::new(io::ErrorKind::NotFound, "Makefile template not embedded")))?;
    let content = render_template(template, &ctx).map_err(|e| write_error(io::Error::other(e)))?;

    write_atomic(output, &content).map_err(write_error)?;
    info!("Generated {} for target {}", output.display(), ctx.target);
    Ok(())
}

fn read_build_file(path: &Path) -> Result<BuildFile> {
    let invalid = |source: BuildFileError| ConfigureError::InvalidBuildFile {
        path: path.to_path_buf(),
        source,
    };
    let content = fs::read_to_string(path).map_err(|e| invalid(e.into()))?;
    parse_build_file(&content).map_err(|e| invalid(e.into()))
}

fn makefile_context<'a>(
    config: &'a BuildConfig,
    build_file_name: &'a str,
    parsed: &BuildFile,
    installs: &[InstallEntry],
    extra_libs: &[String],
    extra_include_dirs: &[PathBuf],
    extra_lib_dirs: &[PathBuf],
) -> MakefileContext<'a> {
    let tc = &config.toolchain;

    let mut incpath = vec!["-I.".to_string()];
    for dir in config.sip_inc_dir.iter().chain(config.py_inc_dir.iter()).chain(extra_include_dirs) {
        let flag = format!("-I{}", dir.display());
        if !incpath.contains(&flag) {
            incpath.push(flag);
        }
    }

    let libs: Vec<String> = extra_lib_dirs
        .iter()
        .map(|d| format!("-L{}", d.display()))
        .chain(extra_libs.iter().map(|l| format!("-l{l}")))
        .collect();

    let suffix_rules = parsed
        .source_extensions()
        .into_iter()
        .map(|ext| {
            let command = if ext == ".c" {
                "$(CC) -c $(CFLAGS) $(CPPFLAGS) $(INCPATH)"
            } else {
                "$(CXX) -c $(CXXFLAGS) $(CPPFLAGS) $(INCPATH)"
            };
            SuffixRule { ext, command: command.to_string() }
        })
        .collect();

    let objects = parsed.objects();
    let clean_files = objects
        .iter()
        .chain(&parsed.sources)
        .chain(&parsed.headers)
        .cloned()
        .collect();

    MakefileContext {
        build_file: build_file_name,
        target: format!("{}.{}", parsed.target, tc.so_ext),
        ofiles: objects.join(" "),
        hfiles: parsed.headers.join(" "),
        cc: &tc.cc,
        cxx: &tc.cxx,
        link: &tc.link,
        cppflags: tc.cppflags.join(" "),
        cflags: tc.cflags.join(" "),
        cxxflags: tc.cxxflags.join(" "),
        incpath: incpath.join(" "),
        lflags: tc.lflags.join(" "),
        libs: libs.join(" "),
        suffix_rules,
        module_dir: config.default_mod_dir.display().to_string(),
        installs: installs
            .iter()
            .map(|e| InstallRule {
                source: e.source.display().to_string(),
                destination: e.destination.display().to_string(),
                file_name: e.file_name(),
            })
            .collect(),
        clean_files,
    }
}
