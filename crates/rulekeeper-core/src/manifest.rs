//! The rules manifest: which groups, techs and languages each project
//! belongs to, which techs depend on which, and the groups every request
//! pulls in.
//!
//! ```yaml
//! techs:
//!   react:
//!     dependsOn: [typescript]
//! projects:
//!   org/svc:
//!     groups: [backend]
//!     techs: [react]
//! defaults:
//!   alwaysGroups: [global]
//! ```

use crate::{Result, RuleScope, RulesError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLanguage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTech {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tech ids (expanded further) or language ids (terminal).
    #[serde(default, deserialize_with = "list", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "list", skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, deserialize_with = "list", skip_serializing_if = "Vec::is_empty")]
    pub techs: Vec<String>,
    #[serde(default, deserialize_with = "list", skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDefaults {
    #[serde(default, deserialize_with = "list", skip_serializing_if = "Vec::is_empty")]
    pub always_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "version", skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, deserialize_with = "entries")]
    pub languages: BTreeMap<String, ManifestLanguage>,
    #[serde(default, deserialize_with = "entries")]
    pub techs: BTreeMap<String, ManifestTech>,
    #[serde(default, deserialize_with = "entries")]
    pub groups: BTreeMap<String, ManifestGroup>,
    #[serde(default, deserialize_with = "entries")]
    pub projects: BTreeMap<String, ManifestProject>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub defaults: ManifestDefaults,
}

impl Manifest {
    /// Parse manifest YAML. A document that is valid YAML but not shaped like
    /// a manifest degrades to an empty manifest; a YAML syntax error is
    /// corruption and fails the load. `path` is only used for diagnostics.
    pub fn parse(raw: &str, path: &Path) -> Result<Manifest> {
        let value = decode_yaml(raw, path)?;
        match Self::from_value(value, path) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid rules manifest");
                Ok(Manifest::default())
            }
        }
    }

    /// Like [`Manifest::parse`] but reports a `RulesError::Configuration`
    /// for a misshapen manifest instead of recovering.
    pub fn parse_strict(raw: &str, path: &Path) -> Result<Manifest> {
        Self::from_value(decode_yaml(raw, path)?, path)
    }

    fn from_value(value: serde_yaml::Value, path: &Path) -> Result<Manifest> {
        let invalid = |message: String| RulesError::Configuration {
            path: path.to_path_buf(),
            message,
        };
        match value {
            serde_yaml::Value::Null => Ok(Manifest::default()),
            serde_yaml::Value::Mapping(_) => {
                serde_yaml::from_value(value).map_err(|e| invalid(e.to_string()))
            }
            _ => Err(invalid("top level must be a mapping".to_string())),
        }
    }

    /// Identifiers declared for `scope`, ascending.
    pub fn ids(&self, scope: RuleScope) -> Vec<String> {
        match scope {
            RuleScope::Project => self.projects.keys().cloned().collect(),
            RuleScope::Group => self.groups.keys().cloned().collect(),
            RuleScope::Tech => self.techs.keys().cloned().collect(),
            RuleScope::Language => self.languages.keys().cloned().collect(),
        }
    }

    pub fn always_groups(&self) -> &[String] {
        &self.defaults.always_groups
    }

    pub fn is_tech(&self, id: &str) -> bool {
        self.techs.contains_key(id)
    }
}

/// Read the manifest at `path`. A missing file is an empty manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Manifest::parse(&raw, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no rules manifest, using an empty one");
            Ok(Manifest::default())
        }
        Err(e) => Err(RulesError::io(path, e)),
    }
}

fn decode_yaml(raw: &str, path: &Path) -> Result<serde_yaml::Value> {
    serde_yaml::from_str(raw).map_err(|e| {
        RulesError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to load rules manifest: {}", e),
            ),
        )
    })
}

// --- Lenient field decoding ---

// `typescript:` with no body is a valid entry, so map values may be null.
fn entries<'de, D, T>(deserializer: D) -> std::result::Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw: Option<BTreeMap<String, Option<T>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(id, entry)| (id, entry.unwrap_or_default()))
        .collect())
}

fn list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn version<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "\
version: 1
languages:
  typescript:
    description: TS
  rust:
techs:
  react:
    dependsOn:
      - typescript
groups:
  global:
    description: Always
projects:
  buerokratt/Service-Module:
    groups:
      - global
defaults:
  alwaysGroups:
    - global
";

    fn parse(raw: &str) -> Manifest {
        Manifest::parse(raw, Path::new("manifest.yml")).unwrap()
    }

    #[test]
    fn parses_every_category() {
        let manifest = parse(FULL);
        assert_eq!(manifest.version, Some(1));
        assert_eq!(
            manifest.languages["typescript"].description.as_deref(),
            Some("TS")
        );
        assert_eq!(manifest.languages["rust"], ManifestLanguage::default());
        assert_eq!(manifest.techs["react"].depends_on, vec!["typescript"]);
        assert_eq!(manifest.groups["global"].description.as_deref(), Some("Always"));
        assert_eq!(
            manifest.projects["buerokratt/Service-Module"].groups,
            vec!["global"]
        );
        assert_eq!(manifest.always_groups(), ["global".to_string()]);
        assert!(manifest.is_tech("react"));
        assert!(!manifest.is_tech("typescript"));
    }

    #[test]
    fn missing_categories_default_to_empty() {
        let manifest = parse("techs:\n  react: {}\n");
        assert!(manifest.projects.is_empty());
        assert!(manifest.groups.is_empty());
        assert!(manifest.always_groups().is_empty());
        assert_eq!(manifest.ids(RuleScope::Tech), vec!["react"]);
    }

    #[test]
    fn non_mapping_document_degrades_to_empty() {
        assert_eq!(parse("just-a-string"), Manifest::default());
        assert_eq!(parse("- a\n- b\n"), Manifest::default());
        assert_eq!(parse(""), Manifest::default());
        assert_eq!(parse("techs: [react, vue]\n"), Manifest::default());
    }

    #[test]
    fn yaml_syntax_error_fails_the_load() {
        let raw = "defaults:\n  alwaysGroups: [global\ngroups:\n  global: {}\n";
        for result in [
            Manifest::parse(raw, Path::new("rules/manifest.yml")),
            Manifest::parse_strict(raw, Path::new("rules/manifest.yml")),
        ] {
            match result.unwrap_err() {
                RulesError::Io { path, source } => {
                    assert_eq!(path, Path::new("rules/manifest.yml"));
                    assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
                    assert!(source.to_string().contains("failed to load rules manifest"));
                }
                other => panic!("expected io error, got {:?}", other),
            }
        }
    }

    #[test]
    fn corrupt_file_on_disk_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.yml");
        std::fs::write(&path, "projects:\n  svc: {groups: [a\n").unwrap();
        assert!(matches!(
            load_manifest(&path).unwrap_err(),
            RulesError::Io { .. }
        ));
    }

    #[test]
    fn strict_parse_reports_configuration_error() {
        let err = Manifest::parse_strict("just-a-string", Path::new("rules/manifest.yml"))
            .unwrap_err();
        match err {
            RulesError::Configuration { path, .. } => {
                assert_eq!(path, Path::new("rules/manifest.yml"))
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn ids_are_sorted() {
        let manifest = parse("projects:\n  zeta: {}\n  alpha: {}\n  mid: {}\n");
        assert_eq!(manifest.ids(RuleScope::Project), vec!["alpha", "mid", "zeta"]);
        assert!(manifest.ids(RuleScope::Language).is_empty());
    }

    #[test]
    fn missing_file_is_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = load_manifest(&dir.path().join("manifest.yml")).unwrap();
        assert_eq!(manifest, Manifest::default());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.yml");
        std::fs::write(&path, FULL).unwrap();
        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.ids(RuleScope::Project), vec!["buerokratt/Service-Module"]);
    }
}
