//! Pluggable custom and AI validator backends, looked up by name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brand_core::{BrandError, BrandResult, ValidationContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Input handed to an AI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub model: String,
    pub prompt: String,
    pub actual: Value,
    pub expected: Value,
    pub context: ValidationContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiVerdict {
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub factors: Vec<String>,
}

#[async_trait]
pub trait AiValidator: Send + Sync {
    async fn validate(&self, request: AiRequest) -> BrandResult<AiVerdict>;
}

/// Input handed to a named custom validator function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRequest {
    pub actual: Value,
    pub expected: Value,
    pub parameters: Value,
    pub context: ValidationContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomVerdict {
    pub score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub details: Value,
}

#[async_trait]
pub trait CustomValidator: Send + Sync {
    async fn validate(&self, request: CustomRequest) -> BrandResult<CustomVerdict>;
}

/// Name → backend mapping, populated at construction time.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    ai: HashMap<String, Arc<dyn AiValidator>>,
    custom: HashMap<String, Arc<dyn CustomValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `contrast_ratio` and `hex_color_distance`.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_custom("contrast_ratio", Arc::new(ContrastRatioValidator))
            .with_custom("hex_color_distance", Arc::new(ColorDistanceValidator))
    }

    pub fn with_ai(mut self, name: impl Into<String>, validator: Arc<dyn AiValidator>) -> Self {
        self.ai.insert(name.into(), validator);
        self
    }

    pub fn with_custom(
        mut self,
        name: impl Into<String>,
        validator: Arc<dyn CustomValidator>,
    ) -> Self {
        self.custom.insert(name.into(), validator);
        self
    }

    pub fn ai(&self, name: &str) -> Option<Arc<dyn AiValidator>> {
        self.ai.get(name).cloned()
    }

    pub fn custom(&self, name: &str) -> Option<Arc<dyn CustomValidator>> {
        self.custom.get(name).cloned()
    }

    pub fn ai_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.ai.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn custom_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.custom.keys().cloned().collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Color helpers
// ---------------------------------------------------------------------------

/// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
pub fn parse_hex(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
    let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
    let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
    Some((r, g, b))
}

fn relative_luminance((r, g, b): (u8, u8, u8)) -> f64 {
    let channel = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}

/// WCAG contrast ratio between two colors, 1.0–21.0.
pub fn contrast_ratio(a: (u8, u8, u8), b: (u8, u8, u8)) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (light, dark) = if la > lb { (la, lb) } else { (lb, la) };
    (light + 0.05) / (dark + 0.05)
}

fn color_param(value: Option<&Value>, field: &str) -> BrandResult<(u8, u8, u8)> {
    let text = value
        .and_then(Value::as_str)
        .ok_or_else(|| BrandError::Evaluation(format!("missing {field} color")))?;
    parse_hex(text).ok_or_else(|| BrandError::Evaluation(format!("invalid {field} color '{text}'")))
}

/// Scores WCAG contrast between `foreground` and `background`.
///
/// The actual value is either an object `{foreground, background}` or a
/// foreground color string paired with `parameters.background`.
/// Parameter `min_ratio` defaults to 4.5 (AA body text).
pub struct ContrastRatioValidator;

#[async_trait]
impl CustomValidator for ContrastRatioValidator {
    async fn validate(&self, request: CustomRequest) -> BrandResult<CustomVerdict> {
        let min_ratio = request
            .parameters
            .get("min_ratio")
            .and_then(Value::as_f64)
            .unwrap_or(4.5);

        let (fg, bg) = match &request.actual {
            Value::Object(map) => (
                color_param(map.get("foreground"), "foreground")?,
                color_param(map.get("background"), "background")?,
            ),
            Value::String(_) => (
                color_param(Some(&request.actual), "foreground")?,
                color_param(request.parameters.get("background"), "background")?,
            ),
            other => {
                return Err(BrandError::Evaluation(format!(
                    "contrast_ratio cannot read colors from {other}"
                )))
            }
        };

        let ratio = contrast_ratio(fg, bg);
        let score = ((ratio / min_ratio) * 100.0).min(100.0).round();
        Ok(CustomVerdict {
            score,
            confidence: 1.0,
            details: json!({ "ratio": (ratio * 100.0).round() / 100.0, "min_ratio": min_ratio }),
        })
    }
}

/// Scores RGB distance between the actual and expected colors.
/// Parameter `max_distance` (default 60) is the distance that scores zero.
pub struct ColorDistanceValidator;

#[async_trait]
impl CustomValidator for ColorDistanceValidator {
    async fn validate(&self, request: CustomRequest) -> BrandResult<CustomVerdict> {
        let max_distance = request
            .parameters
            .get("max_distance")
            .and_then(Value::as_f64)
            .filter(|d| *d > 0.0)
            .unwrap_or(60.0);
        let actual = color_param(Some(&request.actual), "actual")?;
        let expected = color_param(Some(&request.expected), "expected")?;

        let distance = {
            let dr = actual.0 as f64 - expected.0 as f64;
            let dg = actual.1 as f64 - expected.1 as f64;
            let db = actual.2 as f64 - expected.2 as f64;
            (dr * dr + dg * dg + db * db).sqrt()
        };
        let score = (100.0 - distance / max_distance * 100.0).max(0.0).round();
        Ok(CustomVerdict {
            score,
            confidence: 1.0,
            details: json!({ "distance": distance.round(), "max_distance": max_distance }),
        })
    }
}
