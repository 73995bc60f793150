use crate::RuleSet;

pub const NO_RULES_PLACEHOLDER: &str = "_No rules found._";

const SEPARATOR: &str = "\n\n---\n\n";

/// Render a rule set as one markdown document.
///
/// ```text
/// # Rules (project:org/svc)
///
/// <first rule>
///
/// ---
///
/// <second rule>
/// ```
pub fn merge_rules(rule_set: &RuleSet) -> String {
    let header = format!("# Rules ({})", rule_set.request);
    if rule_set.rules.is_empty() {
        return format!("{}\n\n{}", header, NO_RULES_PLACEHOLDER);
    }

    let body = rule_set
        .rules
        .iter()
        .map(|rule| rule.content.trim())
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    format!("{}\n\n{}", header, body).trim().to_string()
}
