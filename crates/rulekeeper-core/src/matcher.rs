use crate::{ResolvedScopes, RuleDocument, RuleScope};
use std::cmp::Ordering;

/// A rule matches when any of its `appliesTo` lists overlaps the resolved set
/// for the same category.
pub fn applies(rule: &RuleDocument, resolved: &ResolvedScopes) -> bool {
    RuleScope::ALL.iter().any(|scope| {
        let declared = rule.applies_to.get(*scope);
        let wanted = resolved.get(*scope);
        !declared.is_disjoint(wanted)
    })
}

fn is_always(rule: &RuleDocument, always_groups: &[String]) -> bool {
    always_groups
        .iter()
        .any(|group| rule.applies_to.groups.contains(group))
}

/// Select the rules applicable to `resolved` and order them: rules belonging
/// to an always-included group first, then the rest, each part by path.
pub fn match_rules(
    rules: &[RuleDocument],
    resolved: &ResolvedScopes,
    always_groups: &[String],
) -> Vec<RuleDocument> {
    let mut matched: Vec<(bool, &RuleDocument)> = rules
        .iter()
        .filter(|rule| applies(rule, resolved))
        .map(|rule| (is_always(rule, always_groups), rule))
        .collect();

    matched.sort_by(|(a_always, a), (b_always, b)| match (a_always, b_always) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.path.cmp(&b.path),
    });

    matched.into_iter().map(|(_, rule)| rule.clone()).collect()
}
