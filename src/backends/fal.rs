use super::{
    ensure_success,
    traits::{GenerativeBackend, ImageFetcher, InpaintBackend},
};
use crate::{
    config::FalConfig,
    error::{BackendErrorCategory, PipelineError, Result},
    models::{CandidateImage, GenerateContentRequest, InpaintRequest, InpaintResponse},
};
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const SERVICE: &str = "fal inpainting";
const GENERATION_SERVICE: &str = "fal flux-lora";

const FLUX_GUIDANCE_SCALE: f32 = 3.5;
const FLUX_INFERENCE_STEPS: u32 = 28;
const FLUX_WIDTH: u32 = 800;
const FLUX_HEIGHT: u32 = 1200;

fn api_key(config: &FalConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .ok_or_else(|| PipelineError::ConfigError("FAL API key is required".into()))
}

/// Synchronous `fal.run` call to the flux-lora inpainting model.
#[derive(Clone)]
pub struct FalInpaintBackend {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl FalInpaintBackend {
    pub fn new(client: Client, config: &FalConfig) -> Result<Self> {
        Ok(Self {
            client,
            api_key: api_key(config)?,
            endpoint: config.inpainting_endpoint.clone(),
        })
    }
}

#[async_trait]
impl InpaintBackend for FalInpaintBackend {
    async fn inpaint(&self, request: InpaintRequest) -> Result<InpaintResponse> {
        log::debug!(
            "Submitting inpainting for {} with {} adapters",
            request.image_url,
            request.loras.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;

        response.json::<InpaintResponse>().await.map_err(|e| {
            PipelineError::backend(SERVICE, BackendErrorCategory::Malformed, e.to_string())
        })
    }
}

/// Text-to-image through `fal-ai/flux-lora` with the request's adapters.
/// The model answers with hosted URLs, which are downloaded so the caller can
/// store the bytes like any other candidate.
#[derive(Clone)]
pub struct FalFluxBackend {
    client: Client,
    fetcher: Arc<dyn ImageFetcher>,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Default, Deserialize)]
struct FluxResponse {
    #[serde(default)]
    images: Option<Vec<FluxImage>>,
}

#[derive(Debug, Deserialize)]
struct FluxImage {
    #[serde(default)]
    url: Option<String>,
}

impl FalFluxBackend {
    pub fn new(client: Client, fetcher: Arc<dyn ImageFetcher>, config: &FalConfig) -> Result<Self> {
        Ok(Self {
            client,
            fetcher,
            api_key: api_key(config)?,
            endpoint: config.generation_endpoint.clone(),
        })
    }

    fn build_payload(request: &GenerateContentRequest) -> Value {
        json!({
            "prompt": request.prompt,
            "loras": request.adapters,
            "guidance_scale": FLUX_GUIDANCE_SCALE,
            "image_size": { "width": FLUX_WIDTH, "height": FLUX_HEIGHT },
            "num_inference_steps": FLUX_INFERENCE_STEPS,
            "num_images": request.candidate_count,
        })
    }

    fn image_urls(response: FluxResponse) -> Vec<String> {
        response
            .images
            .unwrap_or_default()
            .into_iter()
            .filter_map(|image| image.url)
            .filter(|url| !url.trim().is_empty())
            .collect()
    }
}

#[async_trait]
impl GenerativeBackend for FalFluxBackend {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<Vec<CandidateImage>> {
        if !request.images.is_empty() {
            log::warn!(
                "flux-lora ignores {} reference images",
                request.images.len()
            );
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .json(&Self::build_payload(&request))
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest(GENERATION_SERVICE, e))?;
        let response = ensure_success(GENERATION_SERVICE, response).await?;
        let body: FluxResponse = response.json().await.map_err(|e| {
            PipelineError::backend(GENERATION_SERVICE, BackendErrorCategory::Malformed, e.to_string())
        })?;

        let mut candidates = Vec::new();
        for (candidate_index, url) in Self::image_urls(body).into_iter().enumerate() {
            let image = self.fetcher.fetch(&url).await?;
            candidates.push(CandidateImage {
                candidate_index,
                bytes: image.bytes,
            });
        }
        Ok(candidates)
    }
}
