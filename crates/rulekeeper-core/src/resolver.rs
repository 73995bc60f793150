//! Expands a single request into every project, group, tech and language it
//! reaches through the manifest.

use crate::{Manifest, RuleRequest, RuleScope};
use std::collections::BTreeSet;

/// Closure of categories applicable to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedScopes {
    pub projects: BTreeSet<String>,
    pub groups: BTreeSet<String>,
    pub techs: BTreeSet<String>,
    pub languages: BTreeSet<String>,
}

impl ResolvedScopes {
    pub fn get(&self, scope: RuleScope) -> &BTreeSet<String> {
        match scope {
            RuleScope::Project => &self.projects,
            RuleScope::Group => &self.groups,
            RuleScope::Tech => &self.techs,
            RuleScope::Language => &self.languages,
        }
    }

    pub fn len(&self) -> usize {
        RuleScope::ALL.iter().map(|s| self.get(*s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Follow a tech and its `dependsOn` entries. Entries that name a known
    /// tech are expanded in turn; anything else is taken as a language.
    fn expand_tech(&mut self, manifest: &Manifest, tech: &str, seen: &mut BTreeSet<String>) {
        if !seen.insert(tech.to_string()) {
            return;
        }
        self.techs.insert(tech.to_string());

        let Some(entry) = manifest.techs.get(tech) else {
            return;
        };
        for dep in &entry.depends_on {
            if manifest.is_tech(dep) {
                self.expand_tech(manifest, dep, seen);
            } else {
                self.languages.insert(dep.clone());
            }
        }
    }
}

/// Compute the scopes reachable from `request`. Always includes the
/// manifest's `defaults.alwaysGroups`.
pub fn resolve_scopes(request: &RuleRequest, manifest: &Manifest) -> ResolvedScopes {
    let mut resolved = ResolvedScopes::default();
    let mut seen = BTreeSet::new();
    let id = request.id.as_str();

    match request.scope {
        RuleScope::Project => {
            resolved.projects.insert(id.to_string());
            if let Some(project) = manifest.projects.get(id) {
                resolved.groups.extend(project.groups.iter().cloned());
                for tech in &project.techs {
                    resolved.expand_tech(manifest, tech, &mut seen);
                }
                resolved.languages.extend(project.languages.iter().cloned());
            }
        }
        RuleScope::Group => {
            resolved.groups.insert(id.to_string());
        }
        RuleScope::Tech => resolved.expand_tech(manifest, id, &mut seen),
        RuleScope::Language => {
            resolved.languages.insert(id.to_string());
        }
    }

    resolved
        .groups
        .extend(manifest.always_groups().iter().cloned());
    resolved
}
