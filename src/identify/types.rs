use crate::frame::strip_data_uri_prefix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of an identification request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentificationRequest {
    /// Raw base64 images, no data-URI envelope
    pub images: Vec<String>,
    pub health: String,
    pub similar_images: bool,
}

impl IdentificationRequest {
    /// Build a request for a single image; any data-URI prefix is stripped
    pub fn single(image: &str, health: &str, similar_images: bool) -> Self {
        Self {
            images: vec![strip_data_uri_prefix(image).to_string()],
            health: health.to_string(),
            similar_images,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentificationResponse {
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseResult {
    #[serde(default)]
    pub classification: Classification,

    #[serde(default)]
    pub is_plant: Option<Assessment>,

    #[serde(default)]
    pub is_healthy: Option<Assessment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// One ranked species guess
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Suggestion {
    pub name: String,
    /// Confidence in 0.0..=1.0
    pub probability: f64,
    #[serde(default)]
    pub similar_images: Vec<SimilarImage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimilarImage {
    pub url: String,
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// Binary verdict with its confidence (`is_plant`, `is_healthy`)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub binary: bool,
    pub probability: f64,
}

/// Parsed outcome of a successful identification
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentificationResult {
    pub suggestions: Vec<Suggestion>,
    pub is_plant: Option<Assessment>,
    pub is_healthy: Option<Assessment>,
}

impl IdentificationResult {
    /// First `limit` suggestions in service order, ready for display
    pub fn top(&self, limit: usize) -> Vec<SuggestionView> {
        self.suggestions
            .iter()
            .take(limit)
            .map(SuggestionView::from)
            .collect()
    }

    /// Health verdict line, present when the service assessed health
    pub fn health_summary(&self) -> Option<String> {
        self.is_healthy.map(|health| {
            if health.binary {
                format!("Looks healthy ({})", format_percentage(health.probability))
            } else {
                format!(
                    "Needs attention ({} healthy)",
                    format_percentage(health.probability)
                )
            }
        })
    }
}

impl From<IdentificationResponse> for IdentificationResult {
    fn from(response: IdentificationResponse) -> Self {
        Self {
            suggestions: response.result.classification.suggestions,
            is_plant: response.result.is_plant,
            is_healthy: response.result.is_healthy,
        }
    }
}

/// Display form of a suggestion
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionView {
    pub name: String,
    pub probability: f64,
    pub reference_image: Option<String>,
}

impl SuggestionView {
    /// Probability as a percentage with one decimal, e.g. `82.7%`
    pub fn confidence_label(&self) -> String {
        format_percentage(self.probability)
    }
}

impl From<&Suggestion> for SuggestionView {
    fn from(suggestion: &Suggestion) -> Self {
        Self {
            name: suggestion.name.clone(),
            probability: suggestion.probability,
            reference_image: suggestion
                .similar_images
                .first()
                .map(|image| image.url.clone()),
        }
    }
}

impl fmt::Display for SuggestionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.confidence_label())
    }
}

pub fn format_percentage(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}
