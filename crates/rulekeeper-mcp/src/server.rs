use rmcp::{
    handler::server::{
        router::{prompt::PromptRouter, tool::ToolRouter},
        wrapper::Parameters,
    },
    model::*,
    prompt, prompt_handler, prompt_router, schemars,
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use rulekeeper_core::{
    format_search_results, FsRuleSource, RuleRequest, RuleScope, RuleService, RulesConfig,
    RulesError, SearchQuery,
};
use serde::{Deserialize, Serialize};

const RULES_URI_PREFIX: &str = "rules://";
const RULES_URI_TEMPLATE: &str = "rules://{scope}/{id}";
const MARKDOWN_MIME: &str = "text/markdown";

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetRulesRequest {
    /// Scope of the request: "project", "group", "tech" or "language". Must be given together with `id`.
    pub scope: Option<String>,
    /// Identifier within the scope, e.g. "org/service" for a project or "react" for a tech. Must be given together with `scope`.
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListIdsRequest {
    /// Which manifest category to list: "project", "group", "tech" or "language"
    pub scope: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRulesRequest {
    /// Case-insensitive keyword matched against rule content, descriptions and tags
    pub keyword: String,
    /// Optional scope to restrict the search to ("project", "group", "tech" or "language"). Requires `id`.
    pub scope: Option<String>,
    /// Optional identifier within `scope`. Requires `scope`.
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DevelopmentRulesArgs {
    /// Scope of the request: "project", "group", "tech" or "language"
    pub scope: String,
    /// Identifier within the scope
    pub id: String,
}

// --- Server ---

#[derive(Clone)]
pub struct RulekeeperServer {
    rules: RuleService<FsRuleSource>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

#[tool_router]
impl RulekeeperServer {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            rules: RuleService::new(FsRuleSource::new(config)),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    #[tool(
        description = "Get the merged development rules for a project, group, tech or language. Resolves the project's groups, techs (with their tech and language dependencies) and the always-included groups, then returns every matching rule document as one markdown document, globally applicable rules first. Call list_ids to discover valid identifiers."
    )]
    async fn get_rules(
        &self,
        Parameters(req): Parameters<GetRulesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = match RuleRequest::from_parts(req.scope.as_deref(), req.id.as_deref()) {
            Ok(Some(request)) => request,
            Ok(None) => return Err(McpError::invalid_params(USAGE, None)),
            Err(e) => return tool_error(e),
        };
        match self.rules.merged_rules(&request).await {
            Ok(markdown) => Ok(CallToolResult::success(vec![Content::text(markdown)])),
            Err(e) => tool_error(e),
        }
    }

    #[tool(description = "List the identifiers declared in the rules manifest for one scope (project, group, tech or language)")]
    async fn list_ids(
        &self,
        Parameters(req): Parameters<ListIdsRequest>,
    ) -> Result<CallToolResult, McpError> {
        // An unknown category has no ids; it is not an error.
        let Ok(scope) = req.scope.parse::<RuleScope>() else {
            tracing::debug!(scope = %req.scope, "listing ids for unknown scope");
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "No ids defined for scope '{}'.",
                req.scope.trim()
            ))]));
        };
        match self.rules.available_ids(scope).await {
            Ok(ids) => Ok(CallToolResult::success(vec![Content::text(format_ids(
                scope, &ids,
            ))])),
            Err(e) => tool_error(e),
        }
    }

    #[tool(
        description = "Search rule documents for a keyword (case-insensitive) in their content, description and tags. Pass scope and id together to search only the rules that apply to that request."
    )]
    async fn search_rules(
        &self,
        Parameters(req): Parameters<SearchRulesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut query = SearchQuery::new(req.keyword.clone());
        match RuleRequest::from_parts(req.scope.as_deref(), req.id.as_deref()) {
            Ok(Some(request)) => query = query.within(request),
            Ok(None) => {}
            Err(e) => return tool_error(e),
        }
        match self.rules.search(&query).await {
            Ok(hits) => Ok(CallToolResult::success(vec![Content::text(
                format_search_results(req.keyword.trim(), &hits),
            )])),
            Err(e) => tool_error(e),
        }
    }
}

#[prompt_router]
impl RulekeeperServer {
    /// Development rules for one request, as a ready-to-use prompt
    #[prompt(name = "development-rules")]
    async fn development_rules(
        &self,
        Parameters(args): Parameters<DevelopmentRulesArgs>,
    ) -> Result<GetPromptResult, McpError> {
        let request = RuleRequest::from_parts(Some(&args.scope), Some(&args.id))
            .and_then(|request| {
                request.ok_or_else(|| RulesError::Request("scope and id are required".into()))
            })
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        let markdown = self.rules.merged_rules(&request).await.map_err(|e| {
            tracing::error!(%request, error = %e, "failed to build development rules prompt");
            McpError::internal_error(e.to_string(), None)
        })?;

        Ok(GetPromptResult {
            description: Some(format!("Development rules for {}", request)),
            messages: vec![PromptMessage::new_text(
                PromptMessageRole::User,
                format!(
                    "Here are the development rules for {}:\n\n{}",
                    request, markdown
                ),
            )],
        })
    }
}

impl RulekeeperServer {
    fn resource_templates() -> Vec<ResourceTemplate> {
        vec![RawResourceTemplate {
            uri_template: RULES_URI_TEMPLATE.to_string(),
            name: "rules".to_string(),
            title: Some("Development rules".to_string()),
            description: Some(
                "Merged development rules for a scope and id, e.g. rules://project/org/svc or rules://tech/react"
                    .to_string(),
            ),
            mime_type: Some(MARKDOWN_MIME.to_string()),
            icons: None,
        }
        .no_annotation()]
    }

    /// One concrete resource per always-included group.
    async fn always_group_resources(&self) -> Result<Vec<Resource>, McpError> {
        let manifest = self.rules.manifest().await.map_err(|e| {
            tracing::error!(error = %e, "failed to list rule resources");
            McpError::internal_error(e.to_string(), None)
        })?;
        Ok(manifest
            .always_groups()
            .iter()
            .map(|group| {
                let request = RuleRequest::new(RuleScope::Group, group.as_str());
                let mut resource = RawResource::new(rules_uri(&request), format!("{}-rules", group));
                resource.description = Some(format!("Rules that apply to every request ({})", request));
                resource.mime_type = Some(MARKDOWN_MIME.to_string());
                resource.no_annotation()
            })
            .collect())
    }

    async fn read_rules(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let request =
            parse_rules_uri(uri).map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let markdown = self.rules.merged_rules(&request).await.map_err(|e| {
            tracing::error!(%request, error = %e, "failed to read rules resource");
            McpError::internal_error(e.to_string(), None)
        })?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: uri.to_string(),
                mime_type: Some(MARKDOWN_MIME.to_string()),
                text: markdown,
                meta: None,
            }],
        })
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for RulekeeperServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(
            self.always_group_resources().await?,
        ))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult::with_all_items(
            Self::resource_templates(),
        ))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_rules(&request.uri).await
    }
}

// --- Helpers ---

/// Malformed requests are protocol errors; everything else is reported as a
/// failed tool call so the client sees the message.
fn tool_error(err: RulesError) -> Result<CallToolResult, McpError> {
    if err.is_request() {
        return Err(McpError::invalid_params(err.to_string(), None));
    }
    tracing::error!(error = %err, "rule pipeline failed");
    Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
}

fn rules_uri(request: &RuleRequest) -> String {
    format!("{}{}/{}", RULES_URI_PREFIX, request.scope, request.id)
}

/// `rules://project/org/svc` → `project:org/svc`. The id keeps any further `/`.
fn parse_rules_uri(uri: &str) -> Result<RuleRequest, RulesError> {
    let invalid = || {
        RulesError::Request(format!(
            "unsupported resource uri '{}' (expected {})",
            uri, RULES_URI_TEMPLATE
        ))
    };
    let rest = uri.strip_prefix(RULES_URI_PREFIX).ok_or_else(invalid)?;
    let (scope, id) = rest.split_once('/').ok_or_else(invalid)?;
    RuleRequest::from_parts(Some(scope), Some(id))?.ok_or_else(invalid)
}

fn format_ids(scope: RuleScope, ids: &[String]) -> String {
    if ids.is_empty() {
        return format!("No {} defined in the manifest.", scope.plural());
    }
    let mut out = format!("Available {}:", scope.plural());
    for id in ids {
        out.push_str("\n- ");
        out.push_str(id);
    }
    out
}

const USAGE: &str = "get_rules needs both `scope` and `id`.\n\
Scopes: project, group, tech, language.\n\
Use list_ids to see the identifiers declared for a scope.";

const INSTRUCTIONS: &str = r#"Rulekeeper serves development guidelines ("rules") for the code you are working on.

## Workflow
1. Work out what you are working on: a project (e.g. "org/service"), a tech (e.g. "react"), a language, or a group of rules.
2. If unsure of the identifier, call `list_ids` with that scope.
3. Call `get_rules` with `scope` and `id`. The result is one markdown document: rules that apply everywhere come first, then the rules specific to your request. Follow them while you work.
4. Use `search_rules` to find guidance on a specific topic, optionally limited to one scope and id.

The same merged documents are available as resources at `rules://<scope>/<id>` and through the `development-rules` prompt.

Rules are re-read on every call, so edits to rule files apply immediately. Call `get_rules` again after switching projects."#;
