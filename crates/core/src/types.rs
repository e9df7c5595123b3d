use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of creative asset handed to the validator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    #[default]
    Image,
    Logo,
    Banner,
    SocialPost,
    Document,
    Video,
    Web,
}

/// A creative asset produced by a generation workflow.
///
/// Category-relevant values live in `properties` under well-known keys
/// (`color`, `fontFamily`, `spacing`, `logo`, `imageStyle`, ...). The
/// validator only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_type: AssetType,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Asset {
    pub fn new(id: impl Into<String>, asset_type: AssetType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            asset_type,
            properties: Map::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Read a property by key; dotted keys descend into nested objects.
    pub fn property(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.properties.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// First present property among `keys`.
    pub fn first_property(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.property(k))
    }
}

// ─── Brand identity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandColors {
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub accent: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Typeface {
    pub family: String,
    #[serde(default)]
    pub weights: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandTypography {
    pub primary: Option<Typeface>,
    pub secondary: Option<Typeface>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandLogo {
    #[serde(default)]
    pub variants: Vec<String>,
    pub min_width_px: Option<u32>,
    pub clear_space_px: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandSpacing {
    pub base_unit: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandImagery {
    pub style: Option<String>,
}

/// Canonical brand values the validator compares assets against.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandIdentity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub colors: BrandColors,
    #[serde(default)]
    pub typography: BrandTypography,
    #[serde(default)]
    pub logo: BrandLogo,
    #[serde(default)]
    pub spacing: BrandSpacing,
    #[serde(default)]
    pub imagery: BrandImagery,
}

// ─── Validation context ─────────────────────────────────────────────────

/// Where and why a validation pass runs. Drives rule applicability.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationContext {
    #[serde(default)]
    pub brand_id: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub project_type: Option<String>,
    pub phase: Option<String>,
    pub environment: Option<String>,
    pub user_id: Option<String>,
}

impl ValidationContext {
    pub fn for_brand(brand_id: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
            ..Default::default()
        }
    }

    pub fn has_platform(&self, value: &str) -> bool {
        self.platforms.iter().any(|p| p == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_property_lookup() {
        let asset = Asset::new("a1", AssetType::Banner)
            .with("typography", json!({"family": "Inter"}))
            .with("color", Value::Null);

        assert_eq!(asset.property("typography.family"), Some(&json!("Inter")));
        assert!(asset.property("color").is_none());
        assert!(asset.property("missing.key").is_none());
        assert_eq!(
            asset.first_property(&["color", "typography.family"]),
            Some(&json!("Inter"))
        );
    }

    #[test]
    fn test_context_platform_membership() {
        let mut ctx = ValidationContext::for_brand("acme");
        ctx.platforms = vec!["web".into(), "instagram".into()];
        assert!(ctx.has_platform("instagram"));
        assert!(!ctx.has_platform("print"));
    }

    #[test]
    fn test_brand_identity_deserializes_sparse_json() {
        let brand: BrandIdentity = serde_json::from_value(json!({
            "id": "acme",
            "colors": {"primary": ["#0052CC"]}
        }))
        .unwrap();
        assert_eq!(brand.colors.primary, vec!["#0052CC"]);
        assert!(brand.typography.primary.is_none());
    }
}
