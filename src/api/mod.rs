//! Request and response shapes for exposing recommendations over a transport.
//!
//! The crate ships no HTTP server. [`handle`] and [`handle_json`] turn a
//! request into a status code and a JSON body, so a transport only has to
//! write them out.


use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::JobRecError;
use crate::pipeline::{Recommendation, RecommendationPipeline};

/// Incoming recommendation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub title: String,
    /// Refresh the corpus before ranking
    #[serde(default)]
    pub scrape_new: bool,
    /// Overrides the configured number of recommendations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationView {
    pub title: String,
    pub company: String,
    pub location: String,
    pub score: f64,
    pub url: String,
    pub skills: Vec<String>,
}

impl From<Recommendation> for RecommendationView {
    #[inline]
    fn from(recommendation: Recommendation) -> Self {
        let posting = recommendation.posting;
        Self {
            title: posting.title,
            company: posting.company,
            location: posting.location,
            score: round_score(recommendation.score),
            url: posting.url,
            skills: posting.skills.into_iter().collect(),
        }
    }
}

/// Round to four decimal places for display
#[inline]
pub fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<RecommendationView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A status code and the JSON body to send with it
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn error(status: u16, message: String) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }
}

impl JobRecError {
    /// HTTP status a transport should answer with for this error
    #[inline]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidQuery(_) => 400,
            Self::NoDataAvailable(_) => 502,
            _ => 500,
        }
    }
}

/// Run one recommendation request through the pipeline
#[inline]
pub async fn handle(pipeline: &RecommendationPipeline, request: &RecommendRequest) -> ApiResponse {
    match pipeline
        .recommend(&request.title, request.scrape_new, request.top_n)
        .await
    {
        Ok(recommendations) => {
            let response = RecommendResponse {
                recommendations: recommendations
                    .into_iter()
                    .map(RecommendationView::from)
                    .collect(),
            };
            match serde_json::to_value(&response) {
                Ok(body) => ApiResponse { status: 200, body },
                Err(e) => {
                    error!("Failed to serialize recommendations: {}", e);
                    ApiResponse::error(500, format!("failed to serialize response: {}", e))
                }
            }
        }
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!("Recommendation for '{}' failed: {}", request.title, e);
            } else {
                debug!("Rejected recommendation request: {}", e);
            }
            ApiResponse::error(status, e.to_string())
        }
    }
}

/// [`handle`] for a raw JSON request body; malformed bodies answer 400
#[inline]
pub async fn handle_json(pipeline: &RecommendationPipeline, body: &str) -> ApiResponse {
    match serde_json::from_str::<RecommendRequest>(body) {
        Ok(request) => handle(pipeline, &request).await,
        Err(e) => {
            debug!("Malformed request body: {}", e);
            ApiResponse::error(400, format!("malformed request: {}", e))
        }
    }
}
