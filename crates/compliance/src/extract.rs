//! Category accessors: read the actual value from an asset and the expected
//! value from the brand identity.

use brand_core::{Asset, BrandIdentity};
use serde_json::{json, Value};

use crate::types::{BrandRule, RuleCategory};

const COLOR_KEYS: &[&str] = &["color", "primaryColor", "backgroundColor"];
const TYPOGRAPHY_KEYS: &[&str] = &["fontFamily", "typography.family", "font"];
const SPACING_KEYS: &[&str] = &["spacing", "padding"];
const LOGO_KEYS: &[&str] = &["logo", "logoVariant"];
const IMAGERY_KEYS: &[&str] = &["imageStyle", "image"];

/// Property an automated correction writes for `category`, if any.
pub fn primary_field(category: RuleCategory) -> Option<&'static str> {
    match category {
        RuleCategory::Color => Some(COLOR_KEYS[0]),
        RuleCategory::Typography => Some(TYPOGRAPHY_KEYS[0]),
        RuleCategory::Spacing => Some(SPACING_KEYS[0]),
        _ => None,
    }
}

/// Value the rule inspects on `asset`; `Null` when absent.
pub fn actual_value(asset: &Asset, rule: &BrandRule) -> Value {
    let found = match rule.category {
        RuleCategory::Color => asset.first_property(COLOR_KEYS).or_else(|| {
            asset
                .property("colors")
                .and_then(|colors| colors.as_array())
                .and_then(|colors| colors.first())
        }),
        RuleCategory::Typography => asset.first_property(TYPOGRAPHY_KEYS),
        RuleCategory::Spacing => asset.first_property(SPACING_KEYS),
        RuleCategory::Logo => asset.first_property(LOGO_KEYS),
        RuleCategory::Imagery => asset.first_property(IMAGERY_KEYS),
        RuleCategory::Tone | RuleCategory::Layout | RuleCategory::Accessibility => {
            asset.properties.get(&rule.id).filter(|v| !v.is_null())
        }
    };
    found.cloned().unwrap_or(Value::Null)
}

/// Canonical brand value for the rule's category; `Null` when the brand
/// defines none.
pub fn expected_value(brand: &BrandIdentity, rule: &BrandRule) -> Value {
    match rule.category {
        RuleCategory::Color => brand
            .colors
            .primary
            .first()
            .map(|c| json!(c))
            .unwrap_or(Value::Null),
        RuleCategory::Typography => brand
            .typography
            .primary
            .as_ref()
            .map(|t| json!(t.family))
            .unwrap_or(Value::Null),
        RuleCategory::Spacing => brand.spacing.base_unit.map(|u| json!(u)).unwrap_or(Value::Null),
        RuleCategory::Logo => brand
            .logo
            .variants
            .first()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        RuleCategory::Imagery => brand
            .imagery
            .style
            .as_ref()
            .map(|s| json!(s))
            .unwrap_or(Value::Null),
        RuleCategory::Tone | RuleCategory::Layout | RuleCategory::Accessibility => Value::Null,
    }
}
