use crate::error::{ConfigureError, Result};
use crate::render::write_atomic;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

/// Template variable name to value. Ordered so output never depends on
/// insertion order.
pub type ModuleTemplateContext = BTreeMap<String, String>;

/// Expands to the whole context as a Python dict unless the context defines it.
pub const CONFIGURATION_PLACEHOLDER: &str = "SIP_CONFIGURATION";

static RE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)@").expect("valid placeholder regex")
});

/// Replaces every `@name@` in `template_path` with its context value and
/// writes the result to `output_path`.
///
/// Fails without touching `output_path` when the template is missing or
/// names a placeholder the context lacks.
pub fn render_config_module(
    output_path: &Path,
    template_path: &Path,
    context: &ModuleTemplateContext,
) -> Result<()> {
    let template = fs::read_to_string(template_path).map_err(|e| {
        ConfigureError::TemplateRender(format!("cannot read template {}: {e}", template_path.display()))
    })?;

    let content = substitute(&template, context).map_err(|missing| {
        ConfigureError::TemplateRender(format!(
            "{}: undefined placeholder(s) {}",
            template_path.display(),
            missing.iter().map(|m| format!("@{m}@")).collect::<Vec<_>>().join(", ")
        ))
    })?;

    write_atomic(output_path, &content).map_err(|e| {
        ConfigureError::TemplateRender(format!("cannot write {}: {e}", output_path.display()))
    })?;
    info!("Generated {} from {}", output_path.display(), template_path.display());
    Ok(())
}

/// Returns the rendered text, or the unresolved placeholder names in order
/// of first appearance.
pub fn substitute(
    template: &str,
    context: &ModuleTemplateContext,
) -> std::result::Result<String, Vec<String>> {
    let mut missing: Vec<String> = Vec::new();
    let rendered = RE_PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        if let Some(value) = context.get(name) {
            value.clone()
        } else if name == CONFIGURATION_PLACEHOLDER {
            python_dict(context)
        } else {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
            String::new()
        }
    });

    if missing.is_empty() { Ok(rendered.into_owned()) } else { Err(missing) }
}

fn python_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn python_dict(context: &ModuleTemplateContext) -> String {
    let mut out = String::from("_pkg_config = {\n");
    for (key, value) in context {
        out.push_str(&format!("    {}: {},\n", python_str(key), python_str(value)));
    }
    out.push('}');
    out
}
