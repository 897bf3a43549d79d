use include_dir::{Dir, include_dir};

static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/src/templates");

pub const MAKEFILE: &str = "Makefile.tmpl";

/// Looks up an embedded template by file name.
pub fn get(name: &str) -> Option<&'static str> {
    TEMPLATES.get_file(name).and_then(|f| f.contents_utf8())
}
