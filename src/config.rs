use crate::error::{ConfigureError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "configure.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SIP_CONFIGURE_CONFIG";

const ENV_SIP_BIN: &str = "SIP_BIN";
const ENV_DEFAULT_SIP_DIR: &str = "SIP_DEFAULT_SIP_DIR";
const ENV_DEFAULT_MOD_DIR: &str = "SIP_DEFAULT_MOD_DIR";
const ENV_PY_INC_DIR: &str = "SIP_PY_INC_DIR";

/// Compiler and linker settings baked into the Makefile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Toolchain {
    pub cc: String,
    pub cxx: String,
    pub link: String,
    pub cppflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub lflags: Vec<String>,
    pub so_ext: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            cc: "gcc".into(),
            cxx: "g++".into(),
            link: "g++".into(),
            cppflags: vec!["-DNDEBUG".into()],
            cflags: vec!["-pipe".into(), "-fPIC".into(), "-O2".into(), "-Wall".into(), "-W".into()],
            cxxflags: vec!["-pipe".into(), "-fPIC".into(), "-O2".into(), "-Wall".into(), "-W".into()],
            lflags: vec!["-shared".into()],
            so_ext: "so".into(),
        }
    }
}

/// Where the generator lives and where things get installed by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub sip_bin: PathBuf,
    pub default_sip_dir: PathBuf,
    pub default_mod_dir: PathBuf,
    pub py_inc_dir: Option<PathBuf>,
    pub sip_inc_dir: Option<PathBuf>,
    pub toolchain: Toolchain,
}

/// Everything about the binding being configured.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    pub module: String,
    pub spec_file: Option<PathBuf>,
    pub extra_spec_files: Vec<PathBuf>,
    pub build_file: Option<String>,
    /// Root the interface-spec files are installed under and the value
    /// published as `<module>_sip_dir`. Falls back to `default_sip_dir`.
    pub sip_install_dir: Option<PathBuf>,
    pub spec_subdir: String,
    pub spec_dir: PathBuf,
    pub src_ext: String,
    pub sip_flags: Vec<String>,
    /// Extra `-I` directories searched by the generator for imported specs.
    pub sip_include_dirs: Vec<PathBuf>,
    pub extra_libs: Vec<String>,
    pub extra_include_dirs: Vec<PathBuf>,
    pub extra_lib_dirs: Vec<PathBuf>,
    pub config_module: Option<String>,
    /// Extra values published in the config module next to the defaults.
    pub module_values: BTreeMap<String, String>,
    pub makefile: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            module: "YmUtils".into(),
            spec_file: None,
            extra_spec_files: Vec::new(),
            build_file: None,
            sip_install_dir: None,
            spec_subdir: "OthCore".into(),
            spec_dir: PathBuf::from("."),
            src_ext: ".cc".into(),
            sip_flags: Vec::new(),
            sip_include_dirs: Vec::new(),
            extra_libs: vec!["ym_utils".into()],
            extra_include_dirs: Vec::new(),
            extra_lib_dirs: Vec::new(),
            config_module: None,
            module_values: BTreeMap::new(),
            makefile: "Makefile".into(),
        }
    }
}

impl BindingConfig {
    pub fn spec_file(&self) -> PathBuf {
        self.spec_file.clone().unwrap_or_else(|| PathBuf::from(format!("{}_mod.sip", self.module)))
    }

    pub fn build_file(&self) -> String {
        self.build_file.clone().unwrap_or_else(|| format!("Py{}.sbf", self.module))
    }

    pub fn config_module(&self) -> String {
        self.config_module.clone().unwrap_or_else(|| format!("{}Config.py", self.module))
    }

    /// Template the config module is rendered from: the module name plus `.in`.
    pub fn config_template(&self) -> String {
        format!("{}.in", self.config_module())
    }

    /// Every interface-spec file to install, primary first.
    pub fn spec_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.spec_file()];
        files.extend(self.extra_spec_files.iter().cloned());
        files
    }

    pub fn sip_install_dir(&self, build: &BuildConfig) -> PathBuf {
        self.sip_install_dir.clone().unwrap_or_else(|| build.default_sip_dir.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SipSection {
    bin: Option<PathBuf>,
    default_sip_dir: Option<PathBuf>,
    default_mod_dir: Option<PathBuf>,
    py_inc_dir: Option<PathBuf>,
    sip_inc_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    sip: SipSection,
    toolchain: Toolchain,
    binding: BindingConfig,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub build: BuildConfig,
    pub binding: BindingConfig,
}

/// Loads configuration from a TOML file and the environment.
///
/// `explicit` (or `$SIP_CONFIGURE_CONFIG`) must exist when given; otherwise
/// `configure.toml` in `search_dir` is read if present. `SIP_BIN`,
/// `SIP_DEFAULT_SIP_DIR`, `SIP_DEFAULT_MOD_DIR` and `SIP_PY_INC_DIR` override
/// the file.
pub fn resolve_config(
    explicit: Option<&Path>,
    search_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let named = explicit.map(Path::to_path_buf).or_else(|| env(CONFIG_ENV).map(PathBuf::from));

    let file = match named {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigureError::Configuration(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            load_file(&path)?
        }
        None => {
            let fallback = search_dir.join(DEFAULT_CONFIG_FILE);
            if fallback.is_file() {
                load_file(&fallback)?
            } else {
                debug!("No {} found, using environment only", fallback.display());
                ConfigFile::default()
            }
        }
    };

    let ConfigFile { sip, toolchain, binding } = file;
    let env_path = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    let sip_bin = env_path(ENV_SIP_BIN).or(sip.bin);
    let default_sip_dir = env_path(ENV_DEFAULT_SIP_DIR).or(sip.default_sip_dir);
    let default_mod_dir = env_path(ENV_DEFAULT_MOD_DIR).or(sip.default_mod_dir);
    let py_inc_dir = env_path(ENV_PY_INC_DIR).or(sip.py_inc_dir);

    let build = BuildConfig {
        sip_bin: required(sip_bin, "sip.bin", ENV_SIP_BIN)?,
        default_sip_dir: required(default_sip_dir, "sip.default_sip_dir", ENV_DEFAULT_SIP_DIR)?,
        default_mod_dir: required(default_mod_dir, "sip.default_mod_dir", ENV_DEFAULT_MOD_DIR)?,
        py_inc_dir,
        sip_inc_dir: sip.sip_inc_dir,
        toolchain,
    };

    if binding.module.is_empty() {
        return Err(ConfigureError::Configuration("binding.module must not be empty".into()));
    }

    Ok(ResolvedConfig { build, binding })
}

fn load_file(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path).map_err(|e| {
        ConfigureError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;
    let file = toml::from_str(&text).map_err(|e| {
        ConfigureError::Configuration(format!("malformed {}: {e}", path.display()))
    })?;
    debug!("Loaded config from {}", path.display());
    Ok(file)
}

fn required(value: Option<PathBuf>, key: &str, env_key: &str) -> Result<PathBuf> {
    match value {
        Some(v) if !v.as_os_str().is_empty() => Ok(v),
        _ => Err(ConfigureError::Configuration(format!("{key} is not set (or set ${env_key})"))),
    }
}
