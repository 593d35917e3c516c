//! Plant identification through a remote classification service
//!
//! The controller only depends on [`ClassificationService`]; [`PlantIdClient`]
//! speaks the plant.id v3 JSON API.

mod client;
mod types;

pub use client::{ClassificationService, PlantIdClient};
pub use types::{
    Assessment, IdentificationRequest, IdentificationResponse, IdentificationResult,
    SimilarImage, Suggestion, SuggestionView,
};
