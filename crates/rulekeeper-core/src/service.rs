//! Request façade: load, resolve, match and merge for one `{scope, id}` pair.

use crate::search::search_rules;
use crate::{
    match_rules, merge_rules, resolve_scopes, Manifest, Result, RuleDocument, RuleRequest,
    RuleScope, RuleSet, RuleSource, RulesError, SearchHit, SearchQuery,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Resolve and match `request` against already loaded inputs.
pub fn rules_for_request(
    rules: &[RuleDocument],
    manifest: &Manifest,
    request: &RuleRequest,
) -> RuleSet {
    let resolved = resolve_scopes(request, manifest);
    let matched = match_rules(rules, &resolved, manifest.always_groups());
    tracing::debug!(
        %request,
        scopes = resolved.len(),
        matched = matched.len(),
        total = rules.len(),
        "resolved rule set"
    );
    RuleSet {
        request: request.clone(),
        rules: matched,
    }
}

/// Runs the whole pipeline against a [`RuleSource`], reloading on every call.
pub struct RuleService<S> {
    source: Arc<S>,
}

impl<S> Clone for RuleService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: RuleSource + 'static> RuleService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn rules_for(&self, request: &RuleRequest) -> Result<RuleSet> {
        let (manifest, rules) = self.load().await?;
        Ok(rules_for_request(&rules, &manifest, request))
    }

    pub async fn merged_rules(&self, request: &RuleRequest) -> Result<String> {
        let rule_set = self.rules_for(request).await?;
        Ok(merge_rules(&rule_set))
    }

    /// Manifest identifiers for `scope`, ascending. Unknown or empty
    /// categories give an empty list.
    pub async fn available_ids(&self, scope: RuleScope) -> Result<Vec<String>> {
        Ok(self.manifest().await?.ids(scope))
    }

    /// The manifest as currently on disk.
    pub async fn manifest(&self) -> Result<Manifest> {
        let source = Arc::clone(&self.source);
        join(tokio::task::spawn_blocking(move || source.load_manifest())).await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        if query.keyword.trim().is_empty() {
            return Err(RulesError::Request("search keyword is empty".to_string()));
        }
        let rules = match &query.request {
            Some(request) => self.rules_for(request).await?.rules,
            None => {
                let source = Arc::clone(&self.source);
                let mut rules =
                    join(tokio::task::spawn_blocking(move || source.load_rules())).await?;
                rules.sort_by(|a, b| a.path.cmp(&b.path));
                rules
            }
        };
        search_rules(&rules, &query.keyword)
    }

    /// Load manifest and rule documents side by side.
    async fn load(&self) -> Result<(Manifest, Vec<RuleDocument>)> {
        let manifest_source = Arc::clone(&self.source);
        let rules_source = Arc::clone(&self.source);
        let manifest = tokio::task::spawn_blocking(move || manifest_source.load_manifest());
        let rules = tokio::task::spawn_blocking(move || rules_source.load_rules());
        tokio::try_join!(join(manifest), join(rules))
    }
}

async fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle
        .await
        .map_err(|e| RulesError::Task(e.to_string()))?
}
