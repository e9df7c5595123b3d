//! Built-in brand rule set loaded by [`RuleRegistry::with_default_rules`].
//!
//! [`RuleRegistry::with_default_rules`]: crate::registry::RuleRegistry::with_default_rules

use serde_json::json;

use crate::types::{
    BrandRule, BusinessMetadata, Criteria, EnforcementLevel, ImpactTier, ReportLevel,
    RuleCategory, RuleConfiguration, RuleDefinition, Severity,
};

fn definition(description: &str) -> RuleDefinition {
    RuleDefinition {
        description: description.to_string(),
        applicable_contexts: Vec::new(),
        exemptions: Vec::new(),
        measurable: true,
    }
}

fn configuration(tolerance: f64, auto_fix: bool) -> RuleConfiguration {
    RuleConfiguration {
        tolerance,
        auto_fix,
        report_level: ReportLevel::Detailed,
        enforcement_level: EnforcementLevel::Standard,
    }
}

fn business(impact: ImpactTier, stakeholders: &[&str], requires_approval: bool) -> BusinessMetadata {
    BusinessMetadata {
        impact,
        stakeholders: stakeholders.iter().map(|s| s.to_string()).collect(),
        requires_approval,
        version: "1.0.0".to_string(),
    }
}

/// Representative rules covering every criteria type.
pub fn default_rules() -> Vec<BrandRule> {
    vec![
        BrandRule {
            id: "primary-color".to_string(),
            name: "Primary brand color".to_string(),
            category: RuleCategory::Color,
            severity: Severity::Error,
            priority: 10,
            definition: definition("Dominant asset color must be the brand's primary color"),
            criteria: Criteria::ExactMatch {
                allowed_values: Vec::new(),
                case_sensitive: false,
            },
            configuration: configuration(100.0, true),
            business: business(ImpactTier::Critical, &["brand-team"], false),
        },
        BrandRule {
            id: "primary-typeface".to_string(),
            name: "Primary typeface".to_string(),
            category: RuleCategory::Typography,
            severity: Severity::Error,
            priority: 9,
            definition: definition("Headline and body copy must use the primary typeface"),
            criteria: Criteria::ExactMatch {
                allowed_values: Vec::new(),
                case_sensitive: false,
            },
            configuration: configuration(100.0, true),
            business: business(ImpactTier::High, &["brand-team", "design"], false),
        },
        BrandRule {
            id: "logo-variant".to_string(),
            name: "Approved logo variant".to_string(),
            category: RuleCategory::Logo,
            severity: Severity::Error,
            priority: 8,
            definition: definition("Only the approved logo lockups may be used"),
            criteria: Criteria::ExactMatch {
                allowed_values: vec![
                    "primary".to_string(),
                    "horizontal".to_string(),
                    "monochrome".to_string(),
                ],
                case_sensitive: false,
            },
            configuration: configuration(100.0, false),
            business: business(ImpactTier::Critical, &["brand-team", "legal"], true),
        },
        BrandRule {
            id: "text-contrast".to_string(),
            name: "Text contrast ratio".to_string(),
            category: RuleCategory::Accessibility,
            severity: Severity::Error,
            priority: 7,
            definition: definition("Foreground and background colors must meet WCAG AA contrast"),
            criteria: Criteria::Custom {
                validator_function: "contrast_ratio".to_string(),
                parameters: json!({ "min_ratio": 4.5 }),
            },
            configuration: configuration(100.0, false),
            business: business(ImpactTier::High, &["accessibility"], false),
        },
        BrandRule {
            id: "spacing-scale".to_string(),
            name: "Spacing on the brand scale".to_string(),
            category: RuleCategory::Spacing,
            severity: Severity::Warning,
            priority: 6,
            definition: definition("Padding should stay close to the brand base unit"),
            criteria: Criteria::Range {
                min: 0.0,
                max: 32.0,
                unit: Some("px".to_string()),
            },
            configuration: configuration(75.0, true),
            business: business(ImpactTier::Medium, &["design"], false),
        },
        BrandRule {
            id: "imagery-style".to_string(),
            name: "Imagery style".to_string(),
            category: RuleCategory::Imagery,
            severity: Severity::Warning,
            priority: 5,
            definition: definition("Photography must follow the brand imagery style"),
            criteria: Criteria::ExactMatch {
                allowed_values: Vec::new(),
                case_sensitive: false,
            },
            configuration: configuration(100.0, false),
            business: business(ImpactTier::Medium, &["creative"], false),
        },
        BrandRule {
            id: "tone-of-voice".to_string(),
            name: "Tone of voice".to_string(),
            category: RuleCategory::Tone,
            severity: Severity::Warning,
            priority: 4,
            definition: definition("Copy must read as professional, warm, and confident"),
            criteria: Criteria::AiAnalysis {
                model: "brand-voice".to_string(),
                prompt: "Rate how closely this copy matches the brand voice".to_string(),
                confidence_threshold: 0.7,
                fallback_validation: Some(Box::new(Criteria::ExactMatch {
                    allowed_values: vec![
                        "professional".to_string(),
                        "warm".to_string(),
                        "confident".to_string(),
                    ],
                    case_sensitive: false,
                })),
            },
            configuration: configuration(70.0, false),
            business: business(ImpactTier::Medium, &["copywriting"], false),
        },
        BrandRule {
            id: "layout-grid".to_string(),
            name: "Layout grid".to_string(),
            category: RuleCategory::Layout,
            severity: Severity::Info,
            priority: 3,
            definition: RuleDefinition {
                applicable_contexts: vec!["web".to_string()],
                ..definition("Web layouts must sit on a 4, 8, or 12 column grid")
            },
            criteria: Criteria::Pattern {
                regex: r"^(4|8|12)-column$".to_string(),
                flags: "i".to_string(),
            },
            configuration: configuration(100.0, false),
            business: business(ImpactTier::Low, &["design"], false),
        },
    ]
}
