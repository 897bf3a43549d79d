mod model;

pub use crate::model::BuildFile;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static RE_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_-]+)\s*=\s*(.*)$").expect("valid assignment regex"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: invalid line {text:?}")]
    InvalidLine { line: usize, text: String },
    #[error("no target defined")]
    MissingTarget,
    #[error("no sources defined")]
    MissingSources,
}

/// Joins backslash-continued lines, keeping the number of the first physical line.
fn unfold_multiline(content: &str) -> Vec<(usize, String)> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    for (idx, l) in content.lines().enumerate() {
        if current.is_empty() {
            start = idx + 1;
        }
        let trimmed = l.trim_end();
        if let Some(head) = trimmed.strip_suffix('\\') {
            current.push_str(head);
            current.push(' ');
        } else {
            current.push_str(trimmed);
            result.push((start, std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        result.push((start, current));
    }
    result
}

/// Parses a build file written by the interface generator.
///
/// Each non-blank, non-comment line is `key = value`, where the value is a
/// whitespace separated list. `target` and `sources` are required.
pub fn parse_build_file(content: &str) -> Result<BuildFile, ParseError> {
    let mut target = None;
    let mut sources = None;
    let mut headers = Vec::new();
    let mut extra: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (line_no, line) in unfold_multiline(content) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(cap) = RE_ASSIGN.captures(line) else {
            return Err(ParseError::InvalidLine { line: line_no, text: line.to_string() });
        };
        let key = &cap[1];
        let values: Vec<String> = cap[2].split_whitespace().map(|s| s.to_string()).collect();

        match key {
            "target" => target = values.into_iter().next(),
            "sources" => sources = Some(values),
            "headers" => headers = values,
            _ => {
                extra.insert(key.to_string(), values);
            }
        }
    }

    let target = target.ok_or(ParseError::MissingTarget)?;
    let sources = match sources {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ParseError::MissingSources),
    };

    Ok(BuildFile { target, sources, headers, extra })
}
