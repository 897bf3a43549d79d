use std::collections::BTreeMap;

/// Contents of a generator build file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    pub target: String,
    pub sources: Vec<String>,
    pub headers: Vec<String>,
    /// Keys the Makefile emitter does not use, e.g. `moc_headers`.
    pub extra: BTreeMap<String, Vec<String>>,
}

impl BuildFile {
    /// Object file names for every source, in source order.
    pub fn objects(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| match s.rfind('.') {
                Some(dot) => format!("{}.o", &s[..dot]),
                None => format!("{s}.o"),
            })
            .collect()
    }

    /// Distinct source extensions (with the leading dot) in first-seen order.
    pub fn source_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = Vec::new();
        for s in &self.sources {
            if let Some(dot) = s.rfind('.') {
                let ext = s[dot..].to_string();
                if !exts.contains(&ext) {
                    exts.push(ext);
                }
            }
        }
        exts
    }
}
