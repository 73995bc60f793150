use crate::{Result, RuleDocument, RuleRequest, RulesError};

const EXCERPT_LIMIT: usize = 160;

/// Keyword search, optionally limited to the rules matched for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub request: Option<RuleRequest>,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            request: None,
        }
    }

    pub fn within(mut self, request: RuleRequest) -> Self {
        self.request = Some(request);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: String,
    pub description: Option<String>,
    /// First content line containing the keyword, if the hit came from content.
    pub excerpt: Option<String>,
}

/// Case-insensitive search over content, description and tags. `rules` keep
/// their order in the result.
pub fn search_rules(rules: &[RuleDocument], keyword: &str) -> Result<Vec<SearchHit>> {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return Err(RulesError::Request("search keyword is empty".to_string()));
    }

    let hits = rules
        .iter()
        .filter_map(|rule| {
            let excerpt = rule
                .content
                .lines()
                .find(|line| line.to_lowercase().contains(&needle))
                .map(shorten);
            let in_description = rule
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            let in_tags = rule
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle));

            (excerpt.is_some() || in_description || in_tags).then(|| SearchHit {
                path: rule.path.clone(),
                description: rule.description.clone(),
                excerpt,
            })
        })
        .collect();
    Ok(hits)
}

fn shorten(line: &str) -> String {
    let line = line.trim();
    if line.chars().count() <= EXCERPT_LIMIT {
        return line.to_string();
    }
    let cut: String = line.chars().take(EXCERPT_LIMIT).collect();
    format!("{}…", cut.trim_end())
}

/// Render hits the way the `search_rules` tool reports them.
pub fn format_search_results(keyword: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No rules found matching \"{}\".", keyword);
    }

    let mut out = format!("Found {} rule(s) matching \"{}\":\n", hits.len(), keyword);
    for hit in hits {
        out.push_str(&format!("\n- {}", hit.path));
        if let Some(description) = &hit.description {
            out.push_str(&format!(": {}", description));
        }
        if let Some(excerpt) = &hit.excerpt {
            out.push_str(&format!("\n  > {}", excerpt));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppliesTo, RuleScope};

    fn doc(path: &str, content: &str, description: Option<&str>) -> RuleDocument {
        let mut doc =
            RuleDocument::new(path, AppliesTo::single(RuleScope::Group, "global"), content)
                .unwrap();
        doc.description = description.map(str::to_string);
        doc
    }

    #[test]
    fn finds_keyword_in_content() {
        let rules = vec![
            doc("test1.md", "Intro\nThis is a test rule about SQL queries", Some("Test rule")),
            doc("test2.md", "This is about something else", None),
        ];
        let hits = search_rules(&rules, "sql").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "test1.md");
        assert_eq!(
            hits[0].excerpt.as_deref(),
            Some("This is a test rule about SQL queries")
        );

        let text = format_search_results("SQL", &hits);
        assert!(text.contains("Found 1 rule(s)"));
        assert!(text.contains("test1.md"));
        assert!(text.contains("SQL queries"));
    }

    #[test]
    fn finds_keyword_in_description_and_tags() {
        let mut tagged = doc("tagged.md", "Nothing here", None);
        tagged.tags = vec!["Security".to_string()];
        let rules = vec![
            doc("described.md", "Some content here", Some("This is about SQL queries")),
            tagged,
        ];

        let hits = search_rules(&rules, "SQL").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "described.md");
        assert!(hits[0].excerpt.is_none());

        let hits = search_rules(&rules, "security").unwrap();
        assert_eq!(hits[0].path, "tagged.md");
    }

    #[test]
    fn no_results_message_names_keyword() {
        let rules = vec![doc("a.md", "This is a test rule", None)];
        let hits = search_rules(&rules, "nonexistent").unwrap();
        let text = format_search_results("nonexistent", &hits);
        assert!(text.contains("No rules found"));
        assert!(text.contains("nonexistent"));
    }

    #[test]
    fn blank_keyword_is_rejected() {
        assert!(search_rules(&[], "   ").unwrap_err().is_request());
    }

    #[test]
    fn long_lines_are_shortened() {
        let line = format!("keyword {}", "x".repeat(400));
        let hits = search_rules(&[doc("long.md", &line, None)], "keyword").unwrap();
        let excerpt = hits[0].excerpt.as_deref().unwrap();
        assert!(excerpt.ends_with('…'));
        assert!(excerpt.chars().count() <= EXCERPT_LIMIT + 1);
    }
}
