//! Where manifests and rule documents come from.
//!
//! Every request loads both afresh so edits to rule files show up on the next
//! call. A caching layer, if one is ever wanted, belongs in another
//! [`RuleSource`] wrapping [`FsRuleSource`].

use crate::frontmatter::parse_rule;
use crate::manifest::load_manifest;
use crate::{Manifest, Result, RuleDocument, RulesConfig, RulesError};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Supplies the two inputs of a resolution cycle.
pub trait RuleSource: Send + Sync {
    fn load_manifest(&self) -> Result<Manifest>;
    fn load_rules(&self) -> Result<Vec<RuleDocument>>;
}

/// Rules and manifest read from a rules directory on disk.
#[derive(Debug, Clone)]
pub struct FsRuleSource {
    config: RulesConfig,
}

impl FsRuleSource {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }
}

impl RuleSource for FsRuleSource {
    fn load_manifest(&self) -> Result<Manifest> {
        load_manifest(&self.config.manifest_path)
    }

    fn load_rules(&self) -> Result<Vec<RuleDocument>> {
        load_rules_dir(&self.config.rules_dir)
    }
}

/// Fixed in-memory inputs, for tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuleSource {
    pub manifest: Manifest,
    pub rules: Vec<RuleDocument>,
}

impl MemoryRuleSource {
    pub fn new(manifest: Manifest, rules: Vec<RuleDocument>) -> Self {
        Self { manifest, rules }
    }
}

impl RuleSource for MemoryRuleSource {
    fn load_manifest(&self) -> Result<Manifest> {
        Ok(self.manifest.clone())
    }

    fn load_rules(&self) -> Result<Vec<RuleDocument>> {
        Ok(self.rules.clone())
    }
}

/// Load every `*.md` file below `dir` as a rule document, sorted by path.
///
/// A missing directory is an empty rule store. Any document that fails
/// validation aborts the whole load.
pub fn load_rules_dir(dir: &Path) -> Result<Vec<RuleDocument>> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "rules directory does not exist");
        return Ok(Vec::new());
    }

    let mut files = find_markdown_files(dir)?;
    files.sort();

    let mut rules = Vec::with_capacity(files.len());
    for file in files {
        let raw = std::fs::read_to_string(&file).map_err(|e| RulesError::io(&file, e))?;
        rules.push(parse_rule(&relative_id(dir, &file), &raw)?);
    }
    tracing::debug!(dir = %dir.display(), count = rules.len(), "loaded rule documents");
    Ok(rules)
}

fn find_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkBuilder::new(dir)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            RulesError::io(
                dir,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message)),
            )
        })?;
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        let is_markdown = entry.path().extension().is_some_and(|ext| ext == "md");
        if is_file && is_markdown {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `dir/backend/api.md` → `backend/api.md`, with `/` on every platform.
fn relative_id(dir: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(dir).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
