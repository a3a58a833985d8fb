use crate::snapshot::{EngagementStrategy, EnvironmentalAssessment, Outcome, PlanSnapshot, Policy, PolicySet, Site};
use crate::types::{Passage, SourceTag};

/// Turn a plan snapshot (and optionally its policy set) into ordered passages.
///
/// Order follows the record schema: outcomes, environmental assessment,
/// engagement strategy, sites, then policies. Blank fields produce nothing.
pub fn build_passages(plan: &PlanSnapshot, policies: Option<&PolicySet>) -> Vec<Passage> {
    let mut passages = Vec::new();
    for outcome in &plan.outcomes {
        outcome_passages(outcome, &mut passages);
    }
    if let Some(sea) = &plan.environmental_assessment {
        assessment_passages(sea, &mut passages);
    }
    if let Some(engagement) = &plan.engagement_strategy {
        engagement_passages(engagement, &mut passages);
    }
    for site in &plan.sites {
        site_passages(site, &mut passages);
    }
    if let Some(set) = policies {
        for policy in &set.policies {
            policy_passages(policy, &mut passages);
        }
    }
    passages
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn join_present(items: &[String], sep: &str) -> Option<String> {
    let kept: Vec<&str> = items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if kept.is_empty() { None } else { Some(kept.join(sep)) }
}

fn outcome_passages(outcome: &Outcome, out: &mut Vec<Passage>) {
    if let Some(text) = present(&outcome.text) {
        out.push(Passage::new(format!("Outcome: {text}"), SourceTag::Outcome));
    }
}

fn assessment_passages(sea: &EnvironmentalAssessment, out: &mut Vec<Passage>) {
    let tag = SourceTag::EnvironmentalAssessment;
    if let Some(status) = present(&sea.scoping_status) {
        out.push(Passage::new(format!("SEA scoping status: {status}"), tag));
    }
    if let Some(note) = present(&sea.scoping_note) {
        out.push(Passage::new(format!("SEA scoping note: {note}"), tag));
    }
    if let Some(summary) = present(&sea.report_summary) {
        out.push(Passage::new(format!("Environmental report summary: {summary}"), tag));
    }
    if let Some(risks) = join_present(&sea.key_risks, "; ") {
        out.push(Passage::new(format!("SEA key risks: {risks}"), tag));
    }
    if let Some(mitigations) = join_present(&sea.mitigations, "; ") {
        out.push(Passage::new(format!("SEA mitigation measures: {mitigations}"), tag));
    }
}

fn engagement_passages(engagement: &EngagementStrategy, out: &mut Vec<Passage>) {
    let tag = SourceTag::EngagementStrategy;
    if let Some(has_strategy) = engagement.has_strategy {
        let answer = if has_strategy { "yes" } else { "no" };
        out.push(Passage::new(format!("Engagement strategy in place: {answer}"), tag));
    }
    if let Some(stakeholders) = join_present(&engagement.stakeholders, ", ") {
        out.push(Passage::new(format!("Engagement stakeholders: {stakeholders}"), tag));
    }
    if let Some(methods) = join_present(&engagement.methods, ", ") {
        out.push(Passage::new(format!("Engagement methods: {methods}"), tag));
    }
    if let Some(notes) = present(&engagement.notes) {
        out.push(Passage::new(format!("Engagement notes: {notes}"), tag));
    }
}

/// One passage per site: name, notes, then any assessment tags in parentheses.
fn site_passages(site: &Site, out: &mut Vec<Passage>) {
    let description = match (present(&site.name), present(&site.notes)) {
        (Some(name), Some(notes)) => Some(format!("Site {name}: {notes}")),
        (Some(name), None) => Some(format!("Site {name}")),
        (None, Some(notes)) => Some(format!("Site: {notes}")),
        (None, None) => None,
    };
    let tags: Vec<String> = [
        ("suitability", &site.suitability),
        ("availability", &site.availability),
        ("achievability", &site.achievability),
    ]
    .into_iter()
    .filter_map(|(label, value)| present(value).map(|v| format!("{label} {v}")))
    .collect();

    let text = match (description, tags.is_empty()) {
        (None, true) => return,
        (Some(description), true) => description,
        (description, false) => format!("{} ({})", description.as_deref().unwrap_or("Site"), tags.join("; ")),
    };
    out.push(Passage::new(text, SourceTag::Site));
}

fn policy_passages(policy: &Policy, out: &mut Vec<Passage>) {
    let heading: Vec<&str> = [present(&policy.reference), present(&policy.title)].into_iter().flatten().collect();
    let summary = present(&policy.summary);
    let text = match (heading.is_empty(), summary) {
        (true, None) => return,
        (false, None) => format!("Policy {}", heading.join(" ")),
        (true, Some(summary)) => format!("Policy: {summary}"),
        (false, Some(summary)) => format!("Policy {}: {summary}", heading.join(" ")),
    };
    out.push(Passage::new(text, SourceTag::Policy));
}
