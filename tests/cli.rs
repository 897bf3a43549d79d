#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const GOOD_GENERATOR: &str = r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
    case "$1" in
        -b) shift; out="$1" ;;
    esac
    shift
done
printf 'target = Widget\nsources = sipWidgetcmodule.cc sipWidgetWidget.cc\nheaders = sipAPIWidget.h\n' > "$out"
"#;

const BAD_GENERATOR: &str = "#!/bin/sh\necho 'Widget_mod.sip:4: syntax error' >&2\nexit 3\n";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn workspace(generator: &str) -> TempDir {
    let dir = tempdir().unwrap();
    let sip = write_script(dir.path(), "fake-sip", generator);
    fs::write(
        dir.path().join("configure.toml"),
        format!(
            r#"[sip]
bin = "{}"
default_sip_dir = "/usr/share/sip"
default_mod_dir = "/site"

[binding]
module = "Widget"
spec_file = "Widget_mod.sip"
build_file = "Widget.sbf"
sip_install_dir = "/opt/specs"
extra_spec_files = ["Gadget.sip"]

[binding.module_values]
Widget_dir = "/opt/specs"
"#,
            sip.display()
        ),
    )
    .unwrap();
    fs::write(dir.path().join("WidgetConfig.py.in"), "widget_dir = '@Widget_dir@'\n").unwrap();
    dir
}

fn configure(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sip-configure").unwrap();
    cmd.current_dir(dir)
        .env_remove("SIP_CONFIGURE_CONFIG")
        .env_remove("SIP_BIN")
        .env_remove("SIP_DEFAULT_SIP_DIR")
        .env_remove("SIP_DEFAULT_MOD_DIR")
        .env_remove("SIP_PY_INC_DIR");
    cmd
}

#[test]
fn generates_makefile_config_module_and_manifest() {
    let dir = workspace(GOOD_GENERATOR);

    configure(dir.path())
        .args(["-l", "widget_core", "--manifest", "installs.json"])
        .assert()
        .success();

    let makefile = fs::read_to_string(dir.path().join("Makefile")).unwrap();
    assert!(makefile.contains("LIBS = -lwidget_core\n"));
    assert!(makefile.contains("TARGET = Widget.so\n"));

    let config_module = fs::read_to_string(dir.path().join("WidgetConfig.py")).unwrap();
    assert_eq!(config_module, "widget_dir = '/opt/specs'\n");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("installs.json")).unwrap()).unwrap();
    let sources: Vec<&str> =
        manifest.as_array().unwrap().iter().map(|e| e["source"].as_str().unwrap()).collect();
    assert_eq!(sources, ["Widget_mod.sip", "Gadget.sip", "WidgetConfig.py"]);
    assert_eq!(manifest[0]["destination"], "/opt/specs/OthCore");
    assert_eq!(manifest[2]["destination"], "/site");
}

#[test]
fn generator_failure_exits_70_and_writes_nothing() {
    let dir = workspace(BAD_GENERATOR);

    configure(dir.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("syntax error"));

    assert!(!dir.path().join("Makefile").exists());
    assert!(!dir.path().join("WidgetConfig.py").exists());
}

#[test]
fn missing_configuration_exits_78() {
    let dir = tempdir().unwrap();

    configure(dir.path())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("sip.bin is not set"));
}

#[test]
fn environment_supplies_configuration() {
    let dir = tempdir().unwrap();
    let sip = write_script(dir.path(), "fake-sip", GOOD_GENERATOR);
    fs::write(dir.path().join("WidgetConfig.py.in"), "flags = '@Widget_sip_flags@'\n").unwrap();

    configure(dir.path())
        .env("SIP_BIN", &sip)
        .env("SIP_DEFAULT_SIP_DIR", "/usr/share/sip")
        .env("SIP_DEFAULT_MOD_DIR", "/site")
        .args(["-m", "Widget", "--sip-flag", "-x", "--sip-flag", "Py_v3"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("WidgetConfig.py")).unwrap(),
        "flags = '-x Py_v3'\n"
    );
    assert!(dir.path().join("PyWidget.sbf").exists());
}

#[test]
fn undefined_placeholder_exits_65() {
    let dir = workspace(GOOD_GENERATOR);
    fs::write(dir.path().join("WidgetConfig.py.in"), "x = '@Widget_missing@'\n").unwrap();

    configure(dir.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("@Widget_missing@"));

    assert!(dir.path().join("Makefile").exists());
    assert!(!dir.path().join("WidgetConfig.py").exists());
}

#[test]
fn config_is_read_from_working_dir_when_output_dir_differs() {
    let dir = workspace(GOOD_GENERATOR);
    let build = dir.path().join("build");
    fs::create_dir(&build).unwrap();
    fs::rename(dir.path().join("WidgetConfig.py.in"), build.join("WidgetConfig.py.in")).unwrap();

    configure(dir.path())
        .args(["-o", "build", "--manifest", "installs.json"])
        .assert()
        .success();

    assert!(build.join("Widget.sbf").exists());
    assert!(build.join("Makefile").exists());
    assert_eq!(
        fs::read_to_string(build.join("WidgetConfig.py")).unwrap(),
        "widget_dir = '/opt/specs'\n"
    );
    assert!(build.join("installs.json").exists());
    assert!(!dir.path().join("Makefile").exists());
}
