use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tinytemplate::TinyTemplate;
use tracing::debug;

fn generate_random_string(length: usize) -> String {
    let mut rng = rng();
    (0..length).map(|_| rng.sample(Alphanumeric)).map(char::from).collect()
}

/// Renders a tinytemplate without HTML escaping.
pub fn render_template<T: Serialize>(
    template: &str,
    ctx: &T,
) -> Result<String, tinytemplate::error::Error> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("tpl", template)?;
    tt.render("tpl", ctx)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp-{}", name, generate_random_string(8)))
}

/// Writes `content` next to `path` and renames it into place, so `path` is
/// either the old file or the complete new one.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    let result = (|| -> io::Result<()> {
        let mut file = File::create_new(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    } else {
        debug!("Wrote {}", path.display());
    }
    result
}
