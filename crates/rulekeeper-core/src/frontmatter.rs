//! Frontmatter decoding for rule documents.
//!
//! A rule file starts with a YAML block delimited by `---` lines that must
//! carry an `appliesTo` mapping:
//!
//! ```markdown
//! ---
//! appliesTo:
//!   groups: [global]
//!   techs: [react]
//! tags: [style]
//! description: House style for React components
//! ---
//! # React
//! ...
//! ```

use crate::{AppliesTo, Result, RuleDocument, RulesError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrontmatter {
    #[serde(default)]
    applies_to: Option<serde_yaml::Value>,
    // Display-only metadata: decoded leniently so a stray number or list
    // never costs the whole rule store.
    #[serde(default)]
    tags: Option<serde_yaml::Value>,
    #[serde(default)]
    description: Option<serde_yaml::Value>,
}

/// Text of a YAML scalar. `None` for null, sequences and mappings.
fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}

fn decode_tags(path: &str, value: Option<serde_yaml::Value>) -> Vec<String> {
    match value {
        None | Some(serde_yaml::Value::Null) => Vec::new(),
        Some(serde_yaml::Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| {
                let tag = scalar_text(item);
                if tag.is_none() {
                    tracing::warn!(path, "ignoring non-scalar entry in 'tags'");
                }
                tag
            })
            .collect(),
        Some(other) => match scalar_text(&other) {
            Some(tag) => vec![tag],
            None => {
                tracing::warn!(path, "ignoring 'tags': expected a string or a list");
                Vec::new()
            }
        },
    }
}

fn decode_description(path: &str, value: Option<serde_yaml::Value>) -> Option<String> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    let description = scalar_text(&value);
    if description.is_none() {
        tracing::warn!(path, "ignoring 'description': expected a string");
    }
    description
}

/// Split `raw` into its frontmatter YAML and the markdown body.
/// Returns `None` when the document does not open with a closed `---` block.
pub fn split(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            return Some((&raw[yaml_start..offset], &raw[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse one rule file into a validated [`RuleDocument`].
pub fn parse_rule(path: &str, raw: &str) -> Result<RuleDocument> {
    let (yaml, body) = split(raw)
        .ok_or_else(|| RulesError::document(path, "missing frontmatter block"))?;

    let value: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| RulesError::document(path, format!("malformed frontmatter: {}", e)))?;
    if !value.is_mapping() {
        return Err(RulesError::document(
            path,
            "missing or invalid 'appliesTo' field",
        ));
    }
    let front: RawFrontmatter = serde_yaml::from_value(value)
        .map_err(|e| RulesError::document(path, format!("malformed frontmatter: {}", e)))?;

    let applies_to = match front.applies_to {
        Some(value @ serde_yaml::Value::Mapping(_)) => serde_yaml::from_value::<AppliesTo>(value)
            .map_err(|e| RulesError::document(path, format!("invalid 'appliesTo': {}", e)))?,
        None | Some(serde_yaml::Value::Null) => {
            return Err(RulesError::document(path, "missing 'appliesTo' field"))
        }
        Some(_) => {
            return Err(RulesError::document(
                path,
                "'appliesTo' field must be a mapping",
            ))
        }
    };

    let mut doc = RuleDocument::new(path, applies_to, body)?;
    doc.tags = decode_tags(path, front.tags);
    doc.description = decode_description(path, front.description);
    Ok(doc)
}
