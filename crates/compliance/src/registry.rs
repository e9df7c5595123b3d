//! Rule registry and applicability filtering.
//!
//! Rules are stored in an ordered, copy-on-write list: every mutation builds a
//! new list and swaps it in, so a validation pass holding a [`snapshot`]
//! never observes a half-applied update.
//!
//! [`snapshot`]: RuleRegistry::snapshot

use std::sync::Arc;

use brand_core::{BrandError, BrandResult, ValidationContext};
use parking_lot::RwLock;
use tracing::info;

use crate::criteria::compile_pattern;
use crate::defaults::default_rules;
use crate::types::{BrandRule, Criteria, RulePatch, ValidationOptions};

/// Owned, ordered set of validation rules keyed by rule id.
pub struct RuleRegistry {
    rules: RwLock<Arc<Vec<BrandRule>>>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Create a registry seeded with the built-in brand rule set.
    pub fn with_default_rules() -> Self {
        let registry = Self::new();
        for rule in default_rules() {
            // Built-in rules are well-formed and carry distinct ids.
            if let Err(e) = registry.add_rule(rule) {
                tracing::error!(error = %e, "built-in rule rejected");
            }
        }
        registry
    }

    /// Build a registry from externally supplied rules, rejecting the whole
    /// set if any rule is malformed or duplicated.
    pub fn from_rules(rules: Vec<BrandRule>) -> BrandResult<Self> {
        let registry = Self::new();
        for rule in rules {
            registry.add_rule(rule)?;
        }
        Ok(registry)
    }

    /// Consistent point-in-time view of every rule in registry order.
    pub fn snapshot(&self) -> Arc<Vec<BrandRule>> {
        self.rules.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<BrandRule> {
        self.rules.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Register a new rule. Fails on malformed definitions or a reused id.
    pub fn add_rule(&self, rule: BrandRule) -> BrandResult<()> {
        validate_rule(&rule)?;
        let mut guard = self.rules.write();
        if guard.iter().any(|r| r.id == rule.id) {
            return Err(BrandError::DuplicateRule(rule.id));
        }
        let mut next = (**guard).clone();
        info!(rule_id = %rule.id, category = rule.category.as_str(), "rule added");
        next.push(rule);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Merge `patch` into the stored rule, keeping its id and position.
    pub fn update_rule(&self, id: &str, patch: &RulePatch) -> BrandResult<BrandRule> {
        let mut guard = self.rules.write();
        let idx = guard
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| BrandError::RuleNotFound(id.to_string()))?;

        let updated = patch.apply(&guard[idx]);
        validate_rule(&updated)?;

        let mut next = (**guard).clone();
        next[idx] = updated.clone();
        *guard = Arc::new(next);
        info!(rule_id = %id, "rule updated");
        Ok(updated)
    }

    /// Remove a rule, returning the stored value.
    pub fn remove_rule(&self, id: &str) -> BrandResult<BrandRule> {
        let mut guard = self.rules.write();
        let idx = guard
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| BrandError::RuleNotFound(id.to_string()))?;

        let mut next = (**guard).clone();
        let removed = next.remove(idx);
        *guard = Arc::new(next);
        info!(rule_id = %id, "rule removed");
        Ok(removed)
    }

    /// Rules that apply to `context` after caller filters, highest priority
    /// first. Ties keep registry order.
    pub fn list_applicable(
        &self,
        context: &ValidationContext,
        options: &ValidationOptions,
    ) -> Vec<BrandRule> {
        filter_applicable(&self.snapshot(), context, options)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Applicability filter over an already-taken snapshot.
pub fn filter_applicable(
    rules: &[BrandRule],
    context: &ValidationContext,
    options: &ValidationOptions,
) -> Vec<BrandRule> {
    let mut selected: Vec<BrandRule> = rules
        .iter()
        .filter(|r| is_applicable(r, context))
        .filter(|r| options.include_rules.is_empty() || options.include_rules.contains(&r.id))
        .filter(|r| !options.exclude_rules.contains(&r.id))
        .filter(|r| {
            options.severity_filter.is_empty() || options.severity_filter.contains(&r.severity)
        })
        .filter(|r| options.categories.is_empty() || options.categories.contains(&r.category))
        .cloned()
        .collect();

    // Stable sort keeps registry order among equal priorities.
    selected.sort_by_key(|r| std::cmp::Reverse(r.priority));
    selected
}

/// Whether `rule` is relevant to `context`. Pure function of its inputs.
pub fn is_applicable(rule: &BrandRule, context: &ValidationContext) -> bool {
    let def = &rule.definition;

    if !def.applicable_contexts.is_empty() {
        let matches = def.applicable_contexts.iter().any(|c| {
            context.has_platform(c)
                || context.project_type.as_deref() == Some(c.as_str())
                || context.phase.as_deref() == Some(c.as_str())
        });
        if !matches {
            return false;
        }
    }

    let exempt = def.exemptions.iter().any(|e| {
        context.has_platform(e)
            || context.project_type.as_deref() == Some(e.as_str())
            || context.environment.as_deref() == Some(e.as_str())
    });

    !exempt
}

/// Structural checks run before a rule is admitted to the registry.
pub fn validate_rule(rule: &BrandRule) -> BrandResult<()> {
    if rule.id.trim().is_empty() {
        return Err(BrandError::invalid_rule("<empty>", "rule id must not be empty"));
    }
    let tolerance = rule.configuration.tolerance;
    if !(0.0..=100.0).contains(&tolerance) {
        return Err(BrandError::invalid_rule(
            &rule.id,
            format!("configuration.tolerance {tolerance} is outside 0-100"),
        ));
    }
    validate_criteria(&rule.id, &rule.criteria, false)
}

fn validate_criteria(rule_id: &str, criteria: &Criteria, is_fallback: bool) -> BrandResult<()> {
    match criteria {
        Criteria::ExactMatch { .. } => Ok(()),
        Criteria::Range { min, max, .. } => {
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(BrandError::invalid_rule(
                    rule_id,
                    format!("range criteria requires min < max (got {min}..{max})"),
                ));
            }
            Ok(())
        }
        Criteria::Pattern { regex, flags } => {
            if regex.is_empty() {
                return Err(BrandError::invalid_rule(rule_id, "pattern regex is empty"));
            }
            compile_pattern(regex, flags)
                .map(|_| ())
                .map_err(|e| BrandError::invalid_rule(rule_id, format!("invalid pattern: {e}")))
        }
        Criteria::Custom {
            validator_function, ..
        } => {
            if validator_function.trim().is_empty() {
                return Err(BrandError::invalid_rule(
                    rule_id,
                    "custom criteria requires validator_function",
                ));
            }
            Ok(())
        }
        Criteria::AiAnalysis {
            model,
            confidence_threshold,
            fallback_validation,
            ..
        } => {
            if is_fallback {
                return Err(BrandError::invalid_rule(
                    rule_id,
                    "fallback_validation cannot itself be ai-analysis",
                ));
            }
            if model.trim().is_empty() {
                return Err(BrandError::invalid_rule(rule_id, "ai-analysis requires a model"));
            }
            if !(0.0..=1.0).contains(confidence_threshold) {
                return Err(BrandError::invalid_rule(
                    rule_id,
                    "confidence_threshold must be within 0-1",
                ));
            }
            match fallback_validation {
                Some(fb) => validate_criteria(rule_id, fb, true),
                None => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BusinessMetadata, RuleCategory, RuleConfiguration, RuleDefinition, Severity,
    };

    fn rule(id: &str, priority: i32) -> BrandRule {
        BrandRule {
            id: id.to_string(),
            name: format!("Rule {id}"),
            category: RuleCategory::Color,
            severity: Severity::Warning,
            priority,
            definition: RuleDefinition {
                description: "test".into(),
                measurable: true,
                ..Default::default()
            },
            criteria: Criteria::ExactMatch {
                allowed_values: vec![],
                case_sensitive: false,
            },
            configuration: RuleConfiguration::default(),
            business: BusinessMetadata::default(),
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext {
            brand_id: "acme".into(),
            platforms: vec!["web".into(), "instagram".into()],
            project_type: Some("campaign".into()),
            phase: Some("review".into()),
            environment: Some("production".into()),
            user_id: None,
        }
    }

    #[test]
    fn test_add_update_remove() {
        let registry = RuleRegistry::new();
        registry.add_rule(rule("a", 1)).unwrap();
        assert!(matches!(
            registry.add_rule(rule("a", 2)),
            Err(BrandError::DuplicateRule(_))
        ));

        let updated = registry
            .update_rule(
                "a",
                &RulePatch {
                    priority: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(registry.get("a").unwrap().priority, 7);

        registry.remove_rule("a").unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.remove_rule("a"),
            Err(BrandError::RuleNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_unaffected_by_later_update() {
        let registry = RuleRegistry::new();
        registry.add_rule(rule("a", 1)).unwrap();
        let snapshot = registry.snapshot();

        registry
            .update_rule(
                "a",
                &RulePatch {
                    priority: Some(99),
                    ..Default::default()
                },
            )
            .unwrap();
        registry.remove_rule("a").unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].priority, 1);
    }

    #[test]
    fn test_update_rejects_malformed_patch() {
        let registry = RuleRegistry::new();
        registry.add_rule(rule("a", 1)).unwrap();
        let patch = RulePatch {
            criteria: Some(Criteria::Range {
                min: 10.0,
                max: 5.0,
                unit: None,
            }),
            ..Default::default()
        };
        let err = registry.update_rule("a", &patch).unwrap_err();
        assert!(err.to_string().contains("'a'"));
        // Stored rule unchanged.
        assert_eq!(registry.get("a").unwrap().criteria.kind(), "exact-match");
    }

    #[test]
    fn test_applicable_contexts_membership() {
        let mut r = rule("a", 1);
        r.definition.applicable_contexts = vec!["instagram".into()];
        assert!(is_applicable(&r, &ctx()));

        r.definition.applicable_contexts = vec!["review".into()];
        assert!(is_applicable(&r, &ctx()));

        r.definition.applicable_contexts = vec!["print".into()];
        assert!(!is_applicable(&r, &ctx()));
    }

    #[test]
    fn test_exemption_wins_over_context_match() {
        let mut r = rule("a", 1);
        r.definition.applicable_contexts = vec!["web".into()];
        r.definition.exemptions = vec!["production".into()];
        assert!(!is_applicable(&r, &ctx()));

        // Phase is not consulted for exemptions.
        r.definition.exemptions = vec!["review".into()];
        assert!(is_applicable(&r, &ctx()));
    }

    #[test]
    fn test_filters_and_priority_order() {
        let registry = RuleRegistry::new();
        registry.add_rule(rule("low", 1)).unwrap();
        registry.add_rule(rule("high", 9)).unwrap();
        registry.add_rule(rule("tie-first", 5)).unwrap();
        registry.add_rule(rule("tie-second", 5)).unwrap();
        let mut info = rule("info", 10);
        info.severity = Severity::Info;
        registry.add_rule(info).unwrap();

        let all = registry.list_applicable(&ctx(), &ValidationOptions::default());
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["info", "high", "tie-first", "tie-second", "low"]);

        let opts = ValidationOptions {
            exclude_rules: vec!["high".into()],
            severity_filter: vec![Severity::Warning],
            ..Default::default()
        };
        let ids: Vec<_> = registry
            .list_applicable(&ctx(), &opts)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["tie-first", "tie-second", "low"]);

        let opts = ValidationOptions {
            include_rules: vec!["low".into()],
            ..Default::default()
        };
        assert_eq!(registry.list_applicable(&ctx(), &opts).len(), 1);
    }

    #[test]
    fn test_validate_rule_rejections() {
        let mut r = rule("bad", 1);
        r.configuration.tolerance = 120.0;
        assert!(validate_rule(&r).is_err());

        let mut r = rule("bad-regex", 1);
        r.criteria = Criteria::Pattern {
            regex: "([a-z".into(),
            flags: String::new(),
        };
        assert!(validate_rule(&r).is_err());

        let mut r = rule("nested-ai", 1);
        r.criteria = Criteria::AiAnalysis {
            model: "vision".into(),
            prompt: "p".into(),
            confidence_threshold: 0.5,
            fallback_validation: Some(Box::new(Criteria::AiAnalysis {
                model: "other".into(),
                prompt: "p".into(),
                confidence_threshold: 0.5,
                fallback_validation: None,
            })),
        };
        let err = validate_rule(&r).unwrap_err();
        assert!(err.to_string().contains("nested-ai"));
    }

    #[test]
    fn test_default_rules_load() {
        let registry = RuleRegistry::with_default_rules();
        assert!(registry.len() >= 6);
    }
}
