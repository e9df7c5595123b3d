//! Recommendation and action-item generation from failing results.

use brand_core::config::ComplianceConfig;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::types::{
    ActionItem, ActionStatus, BrandRule, EffortTier, ImpactTier, Recommendation,
    RecommendationPriority, RuleCategory, ValidationResult, ValidationStatus,
};

fn priority_for(impact: ImpactTier) -> RecommendationPriority {
    match impact {
        ImpactTier::Critical => RecommendationPriority::Critical,
        ImpactTier::High => RecommendationPriority::High,
        ImpactTier::Medium => RecommendationPriority::Medium,
        ImpactTier::Low => RecommendationPriority::Low,
    }
}

fn effort_for(result: &ValidationResult) -> EffortTier {
    if result.auto_fix_available {
        return EffortTier::Low;
    }
    match result.category {
        RuleCategory::Logo | RuleCategory::Imagery | RuleCategory::Layout => EffortTier::High,
        _ => EffortTier::Medium,
    }
}

fn business_impact(impact: ImpactTier) -> &'static str {
    match impact {
        ImpactTier::Critical => "Off-brand output at this level risks legal exposure and campaign rejection",
        ImpactTier::High => "Visible inconsistency weakens campaign performance and brand recall",
        ImpactTier::Medium => "Accumulated drift erodes brand consistency across channels",
        ImpactTier::Low => "Minor polish issue with limited commercial impact",
    }
}

fn brand_impact(category: RuleCategory) -> &'static str {
    match category {
        RuleCategory::Color => "Color is the most recognisable brand signal",
        RuleCategory::Typography => "Typography carries the brand's voice in every text surface",
        RuleCategory::Spacing => "Consistent spacing keeps layouts recognisably on-brand",
        RuleCategory::Logo => "Unapproved logo usage dilutes the brand mark",
        RuleCategory::Imagery => "Imagery sets the emotional tone of the brand",
        RuleCategory::Tone => "Tone of voice shapes how customers perceive the brand",
        RuleCategory::Layout => "Layout grids keep experiences coherent across surfaces",
        RuleCategory::Accessibility => "Accessible design is part of the brand promise",
    }
}

fn user_impact(category: RuleCategory) -> &'static str {
    match category {
        RuleCategory::Accessibility => "Users with low vision may be unable to read the content",
        RuleCategory::Typography | RuleCategory::Spacing | RuleCategory::Layout => {
            "Readability and scanning suffer when structure is inconsistent"
        }
        _ => "Users may not recognise the content as coming from the brand",
    }
}

fn kpis(category: RuleCategory) -> Vec<String> {
    let mut kpis = vec![format!("{} compliance score", category.as_str())];
    match category {
        RuleCategory::Accessibility => kpis.push("WCAG AA pass rate".to_string()),
        RuleCategory::Tone => kpis.push("Copy approval rate".to_string()),
        _ => kpis.push("Assets passing on first review".to_string()),
    }
    kpis
}

/// Recommendations for the first `max_recommendations` failed or errored
/// results, in result order. Results of silent rules are passed over.
pub fn generate(
    results: &[ValidationResult],
    rules: &[BrandRule],
    config: &ComplianceConfig,
) -> Vec<Recommendation> {
    results
        .iter()
        .filter(|r| matches!(r.status, ValidationStatus::Fail | ValidationStatus::Error))
        .filter(|r| !crate::report::is_silenced(rules, &r.rule_id))
        .take(config.max_recommendations)
        .map(|result| {
            let impact = rules
                .iter()
                .find(|rule| rule.id == result.rule_id)
                .map(|rule| rule.business.impact)
                .unwrap_or_default();
            recommendation_for(result, impact)
        })
        .collect()
}

fn recommendation_for(result: &ValidationResult, impact: ImpactTier) -> Recommendation {
    let mut success_criteria = vec![format!(
        "'{}' passes on asset {}",
        result.rule_name,
        result.asset_id()
    )];
    if !result.expected_value.is_null() {
        success_criteria.push(format!(
            "Asset uses the brand value {}",
            crate::criteria::stringify(&result.expected_value)
        ));
    }

    Recommendation {
        id: Uuid::new_v4(),
        rule_id: result.rule_id.clone(),
        rule_name: result.rule_name.clone(),
        asset_id: result.asset_id().to_string(),
        category: result.category,
        priority: priority_for(impact),
        title: format!("Fix {} on {}", result.rule_name, result.asset_id()),
        description: result.message.clone(),
        business_impact: business_impact(impact).to_string(),
        brand_impact: brand_impact(result.category).to_string(),
        user_impact: user_impact(result.category).to_string(),
        implementation_effort: effort_for(result),
        success_criteria,
        kpis: kpis(result.category),
    }
}

/// One action item per recommendation, plus a sign-off item for rules that
/// require approval.
pub fn action_items(
    recommendations: &[Recommendation],
    rules: &[BrandRule],
    config: &ComplianceConfig,
) -> Vec<ActionItem> {
    let due_date = Utc::now() + Duration::days(config.action_item_due_days);
    let mut items = Vec::with_capacity(recommendations.len());

    for rec in recommendations {
        let rule = rules.iter().find(|r| r.id == rec.rule_id);
        let owner = rule.and_then(|r| r.business.stakeholders.first().cloned());
        let hours = match rec.implementation_effort {
            EffortTier::Low => 2,
            _ => 8,
        };

        items.push(ActionItem {
            id: Uuid::new_v4(),
            recommendation_id: rec.id,
            title: rec.title.clone(),
            description: rec.description.clone(),
            owner: owner.clone(),
            due_date,
            estimated_effort_hours: hours,
            acceptance_criteria: rec.success_criteria.clone(),
            status: ActionStatus::Open,
        });

        if rule.is_some_and(|r| r.business.requires_approval) {
            items.push(ActionItem {
                id: Uuid::new_v4(),
                recommendation_id: rec.id,
                title: format!("Approve fix for {}", rec.rule_name),
                description: format!(
                    "Changes to '{}' require stakeholder sign-off before release",
                    rec.rule_name
                ),
                owner,
                due_date,
                estimated_effort_hours: hours,
                acceptance_criteria: rec.success_criteria.clone(),
                status: ActionStatus::Open,
            });
        }
    }

    items
}
