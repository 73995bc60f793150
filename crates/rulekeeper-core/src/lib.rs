pub mod error;
pub mod frontmatter;
pub mod manifest;
pub mod matcher;
pub mod merge;
pub mod resolver;
pub mod search;
pub mod service;
pub mod source;

pub use error::{Result, RulesError};
pub use manifest::{
    Manifest, ManifestDefaults, ManifestGroup, ManifestLanguage, ManifestProject, ManifestTech,
};
pub use matcher::match_rules;
pub use merge::{merge_rules, NO_RULES_PLACEHOLDER};
pub use resolver::{resolve_scopes, ResolvedScopes};
pub use search::{format_search_results, search_rules, SearchHit, SearchQuery};
pub use service::{rules_for_request, RuleService};
pub use source::{load_rules_dir, FsRuleSource, MemoryRuleSource, RuleSource};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// --- Types ---

/// The four request categories. Also the four `appliesTo` lists of a rule.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    Project,
    Group,
    Tech,
    Language,
}

impl RuleScope {
    pub const ALL: [RuleScope; 4] = [
        RuleScope::Project,
        RuleScope::Group,
        RuleScope::Tech,
        RuleScope::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Project => "project",
            RuleScope::Group => "group",
            RuleScope::Tech => "tech",
            RuleScope::Language => "language",
        }
    }

    /// Name of the manifest category and `appliesTo` list for this scope.
    pub fn plural(&self) -> &'static str {
        match self {
            RuleScope::Project => "projects",
            RuleScope::Group => "groups",
            RuleScope::Tech => "techs",
            RuleScope::Language => "languages",
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleScope {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "project" => Ok(RuleScope::Project),
            "group" => Ok(RuleScope::Group),
            "tech" => Ok(RuleScope::Tech),
            "language" => Ok(RuleScope::Language),
            other => Err(RulesError::Request(format!(
                "unknown scope '{}' (expected project, group, tech or language)",
                other
            ))),
        }
    }
}

/// A request for the rules of one project, group, tech or language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRequest {
    pub scope: RuleScope,
    pub id: String,
}

impl RuleRequest {
    pub fn new(scope: RuleScope, id: impl Into<String>) -> Self {
        Self {
            scope,
            id: id.into(),
        }
    }

    /// Boundary check for loosely shaped requests.
    ///
    /// Both parts absent (or blank) is "no request" and yields `Ok(None)`.
    /// Supplying exactly one of them is a `RulesError::Request`.
    pub fn from_parts(scope: Option<&str>, id: Option<&str>) -> Result<Option<Self>> {
        let scope = scope.map(str::trim).filter(|s| !s.is_empty());
        let id = id.map(str::trim).filter(|s| !s.is_empty());
        match (scope, id) {
            (None, None) => Ok(None),
            (Some(scope), Some(id)) => Ok(Some(Self::new(scope.parse()?, id))),
            (Some(scope), None) => Err(RulesError::Request(format!(
                "scope '{}' was given without an id",
                scope
            ))),
            (None, Some(id)) => Err(RulesError::Request(format!(
                "id '{}' was given without a scope",
                id
            ))),
        }
    }
}

impl fmt::Display for RuleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

/// Applicability declaration of a rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppliesTo {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub projects: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub groups: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub techs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub languages: BTreeSet<String>,
}

impl AppliesTo {
    pub fn is_empty(&self) -> bool {
        RuleScope::ALL.iter().all(|scope| self.get(*scope).is_empty())
    }

    pub fn get(&self, scope: RuleScope) -> &BTreeSet<String> {
        match scope {
            RuleScope::Project => &self.projects,
            RuleScope::Group => &self.groups,
            RuleScope::Tech => &self.techs,
            RuleScope::Language => &self.languages,
        }
    }

    pub fn get_mut(&mut self, scope: RuleScope) -> &mut BTreeSet<String> {
        match scope {
            RuleScope::Project => &mut self.projects,
            RuleScope::Group => &mut self.groups,
            RuleScope::Tech => &mut self.techs,
            RuleScope::Language => &mut self.languages,
        }
    }

    /// Shorthand for a declaration with a single entry.
    pub fn single(scope: RuleScope, id: impl Into<String>) -> Self {
        let mut applies_to = Self::default();
        applies_to.get_mut(scope).insert(id.into());
        applies_to
    }
}

/// A parsed rule file. Immutable once loaded.
///
/// Built only through [`RuleDocument::new`] and the frontmatter parser, which
/// both enforce a non-empty `appliesTo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    /// Path relative to the rules directory, `/`-separated.
    pub path: String,
    pub applies_to: AppliesTo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Markdown body without the frontmatter block.
    pub content: String,
}

impl RuleDocument {
    /// Build a document directly, enforcing the non-empty `appliesTo` invariant.
    pub fn new(
        path: impl Into<String>,
        applies_to: AppliesTo,
        content: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        if applies_to.is_empty() {
            return Err(RulesError::document(
                path,
                "'appliesTo' must include at least one non-empty scope list",
            ));
        }
        Ok(Self {
            path,
            applies_to,
            tags: Vec::new(),
            description: None,
            content: content.into(),
        })
    }
}

/// The ordered rules resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub request: RuleRequest,
    pub rules: Vec<RuleDocument>,
}

// --- Configuration ---

pub const RULES_DIR_ENV: &str = "RULEKEEPER_RULES_DIR";
pub const MANIFEST_ENV: &str = "RULEKEEPER_MANIFEST";
pub const MANIFEST_FILE: &str = "manifest.yml";

/// Where rule documents and the manifest live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesConfig {
    pub rules_dir: PathBuf,
    pub manifest_path: PathBuf,
}

impl RulesConfig {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        let rules_dir = rules_dir.into();
        let manifest_path = rules_dir.join(MANIFEST_FILE);
        Self {
            rules_dir,
            manifest_path,
        }
    }

    /// Resolve from `RULEKEEPER_RULES_DIR`, then `./rules`, then `~/.rulekeeper/rules`.
    /// `RULEKEEPER_MANIFEST` overrides the manifest location.
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(
            std::env::var(RULES_DIR_ENV).ok(),
            std::env::var(MANIFEST_ENV).ok(),
            &cwd,
        )
    }

    fn resolve(rules_dir: Option<String>, manifest: Option<String>, cwd: &Path) -> Self {
        let rules_dir = match rules_dir.filter(|s| !s.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None if cwd.join("rules").is_dir() => cwd.join("rules"),
            None => default_rules_dir(),
        };
        let mut config = Self::new(rules_dir);
        if let Some(manifest) = manifest.filter(|s| !s.trim().is_empty()) {
            config.manifest_path = PathBuf::from(manifest);
        }
        config
    }
}

/// The per-user rules directory (~/.rulekeeper/rules).
pub fn default_rules_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rulekeeper")
        .join("rules")
}
