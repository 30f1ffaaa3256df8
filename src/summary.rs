//! Human and machine renderings of a [`ResolvedInvocation`].
//!
//! Both renderers are pure functions of the resolved invocation. The text
//! form flattens list values to comma-joined strings for the aligned column;
//! the JSON form keeps them as native arrays. That asymmetry is intentional:
//! JSON consumers expect structured values, text consumers expect a flat
//! column.

use std::fmt::Write as _;

use serde_json::json;

use crate::resolver::ResolvedInvocation;
use crate::{Error, Result};

/// Output format for invocation summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    #[default]
    Text,
    Json,
}

impl SummaryFormat {
    /// Parse from string, case-insensitive. Anything but `text` or `json`
    /// is a hard error.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(SummaryFormat::Text),
            "json" => Ok(SummaryFormat::Json),
            _ => Err(Error::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryFormat::Text => "text",
            SummaryFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render the resolved invocation in the requested format.
pub fn render(resolved: &ResolvedInvocation, format: SummaryFormat) -> Result<String> {
    match format {
        SummaryFormat::Text => Ok(render_text(resolved)),
        SummaryFormat::Json => render_json(resolved),
    }
}

/// Tab-separated block: header lines (empty ones omitted), a blank line,
/// then the sorted `flag  value  source` table.
fn render_text(resolved: &ResolvedInvocation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "command:\t{}", resolved.command_path);
    if !resolved.source_path.as_os_str().is_empty() {
        let _ = writeln!(out, "config:\t{}", resolved.source_path.display());
    }
    if !resolved.profiles.is_empty() {
        let _ = writeln!(out, "profiles:\t{}", resolved.profiles.join(", "));
    }
    if !resolved.overrides.is_empty() {
        let _ = writeln!(out, "overrides:\t{}", resolved.overrides.join(", "));
    }
    if !resolved.warnings.is_empty() {
        let _ = writeln!(out, "warnings:\t{}", resolved.warnings.join(", "));
    }
    let _ = writeln!(out);
    for (name, sv) in &resolved.flags {
        let _ = writeln!(out, "{name}\t{}\t{}", sv.value.render(), sv.source);
    }
    out
}

fn render_json(resolved: &ResolvedInvocation) -> Result<String> {
    let flags: Vec<serde_json::Value> = resolved
        .flags
        .iter()
        .map(|(name, sv)| {
            json!({
                "name": name,
                "value": sv.value.to_json(),
                "source": sv.source.as_str(),
            })
        })
        .collect();

    let mut doc = serde_json::Map::new();
    doc.insert("commandPath".into(), json!(resolved.command_path));
    doc.insert(
        "sourcePath".into(),
        json!(resolved.source_path.display().to_string()),
    );
    doc.insert("flags".into(), serde_json::Value::Array(flags));
    if !resolved.profiles.is_empty() {
        doc.insert("profiles".into(), json!(resolved.profiles));
    }
    if !resolved.overrides.is_empty() {
        doc.insert("overrides".into(), json!(resolved.overrides));
    }
    if !resolved.warnings.is_empty() {
        doc.insert("warnings".into(), json!(resolved.warnings));
    }

    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(
        doc,
    ))?)
}
