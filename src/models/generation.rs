use super::request::AdapterConfig;
use serde::{Deserialize, Serialize};

/// Outcome of one generative call, after any retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub candidate_image_urls: Vec<String>,
    pub run_id: String,
    pub latency_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub attempts: u32,
}

impl GenerationResult {
    pub fn succeeded(urls: Vec<String>, run_id: String, latency_seconds: f64, attempts: u32) -> Self {
        Self {
            success: true,
            candidate_image_urls: urls,
            run_id,
            latency_seconds,
            error_message: None,
            attempts,
        }
    }

    pub fn failed(message: String, run_id: String, latency_seconds: f64, attempts: u32) -> Self {
        Self {
            success: false,
            candidate_image_urls: Vec::new(),
            run_id,
            latency_seconds,
            error_message: Some(message),
            attempts,
        }
    }
}

/// A reference image ready to be sent inline to the generative backend.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64 of the image bytes.
    pub data: String,
}

/// The body of one generative backend call.
#[derive(Debug, Clone)]
pub struct GenerateContentRequest {
    pub images: Vec<InlineImage>,
    /// The prompt as the user wrote it.
    pub prompt: String,
    /// JSON prompt descriptor for models that take structured text.
    pub prompt_text: String,
    /// Adapters at their generation-time scales. Ignored by backends without
    /// adapter support.
    pub adapters: Vec<AdapterConfig>,
    pub temperature: f32,
    pub candidate_count: u32,
}

/// Raw image bytes returned for one candidate.
#[derive(Debug, Clone)]
pub struct CandidateImage {
    pub candidate_index: usize,
    pub bytes: Vec<u8>,
}

/// Bytes plus whatever content type the transport reported.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
