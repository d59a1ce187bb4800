use super::{ensure_success, traits::GenerativeBackend};
use crate::{
    config::GeminiConfig,
    error::{BackendErrorCategory, PipelineError, Result},
    models::{CandidateImage, GenerateContentRequest},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

const SERVICE: &str = "gemini";

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    #[serde(default)]
    data: Option<String>,
}

impl GeminiBackend {
    pub fn new(client: Client, config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::ConfigError("Gemini API key is required".into()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
        })
    }

    fn build_payload(request: &GenerateContentRequest) -> Value {
        let mut parts: Vec<Value> = request
            .images
            .iter()
            .map(|image| {
                json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": request.prompt_text }));

        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "temperature": request.temperature,
                "candidateCount": request.candidate_count,
                "responseModalities": ["TEXT", "IMAGE"],
            }
        })
    }

    fn extract_images(response: GenerateContentResponse) -> Result<Vec<CandidateImage>> {
        let mut images = Vec::new();
        for (candidate_index, candidate) in response.candidates.into_iter().enumerate() {
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for part in parts {
                let Some(data) = part.inline_data.and_then(|d| d.data) else {
                    continue;
                };
                let bytes = STANDARD.decode(data.as_bytes()).map_err(|e| {
                    PipelineError::backend(
                        SERVICE,
                        BackendErrorCategory::Malformed,
                        format!("candidate {} is not valid base64: {}", candidate_index, e),
                    )
                })?;
                images.push(CandidateImage {
                    candidate_index,
                    bytes,
                });
            }
        }
        Ok(images)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<Vec<CandidateImage>> {
        let payload = Self::build_payload(&request);
        log::debug!(
            "Invoking {} with {} inline images",
            self.endpoint,
            request.images.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            PipelineError::backend(SERVICE, BackendErrorCategory::Malformed, e.to_string())
        })?;
        Self::extract_images(body)
    }
}
