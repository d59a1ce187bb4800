//! Plain JSON-over-HTTP services: face mask, binary mask, standardization
//! and paste-back.

use super::{
    post_json,
    traits::{CompositorService, MaskService, StandardizeService},
};
use crate::{
    config::ServiceEndpoints,
    error::{BackendErrorCategory, PipelineError, Result},
    models::{BinaryMaskResponse, FaceMaskResponse},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone)]
pub struct HttpMaskService {
    client: Client,
    face_mask_url: String,
    binary_mask_url: String,
}

impl HttpMaskService {
    pub fn new(client: Client, endpoints: &ServiceEndpoints) -> Self {
        Self {
            client,
            face_mask_url: endpoints.face_mask.clone(),
            binary_mask_url: endpoints.binary_mask.clone(),
        }
    }
}

#[async_trait]
impl MaskService for HttpMaskService {
    async fn generate_face_mask(&self, image_url: &str) -> Result<FaceMaskResponse> {
        post_json(
            &self.client,
            "face mask",
            &self.face_mask_url,
            &json!({ "image_url": image_url }),
        )
        .await
    }

    async fn derive_binary_mask(&self, cropped_image_url: &str) -> Result<BinaryMaskResponse> {
        post_json(
            &self.client,
            "binary mask",
            &self.binary_mask_url,
            &json!({ "url": cropped_image_url }),
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct StandardizeResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<StandardizeData>,
}

#[derive(Debug, Deserialize)]
struct StandardizeData {
    url: Option<String>,
}

/// Only a `"success"` status with a non-empty URL counts as standardized.
fn standardized_url(response: StandardizeResponse) -> Result<String> {
    match (response.status.as_str(), response.data.and_then(|d| d.url)) {
        ("success", Some(url)) if !url.trim().is_empty() => Ok(url),
        _ => Err(PipelineError::backend(
            "standardize",
            BackendErrorCategory::Malformed,
            format!(
                "Standardization failed: {}",
                response.message.as_deref().unwrap_or("Unknown error")
            ),
        )),
    }
}

#[derive(Clone)]
pub struct HttpStandardizeService {
    client: Client,
    endpoint: String,
}

impl HttpStandardizeService {
    pub fn new(client: Client, endpoints: &ServiceEndpoints) -> Self {
        Self {
            client,
            endpoint: endpoints.standardize.clone(),
        }
    }
}

#[async_trait]
impl StandardizeService for HttpStandardizeService {
    async fn standardize(&self, image_url: &str) -> Result<String> {
        let response: StandardizeResponse = post_json(
            &self.client,
            "standardize",
            &self.endpoint,
            &json!({ "image_url": image_url, "upload_to_s3": true }),
        )
        .await?;
        standardized_url(response)
    }
}

#[derive(Debug, Deserialize)]
struct PasteBackResponse {
    #[serde(default)]
    final_image_url: Option<String>,
}

fn final_image_url(response: PasteBackResponse) -> Result<String> {
    response
        .final_image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            PipelineError::backend(
                "paste-back",
                BackendErrorCategory::Malformed,
                "response carried no final_image_url",
            )
        })
}

#[derive(Clone)]
pub struct HttpCompositorService {
    client: Client,
    endpoint: String,
}

impl HttpCompositorService {
    pub fn new(client: Client, endpoints: &ServiceEndpoints) -> Self {
        Self {
            client,
            endpoint: endpoints.paste_back.clone(),
        }
    }
}

#[async_trait]
impl CompositorService for HttpCompositorService {
    async fn paste_back(
        &self,
        inpaint_url: &str,
        upscaled_url: &str,
        actual_mask_url: &str,
    ) -> Result<String> {
        let response: PasteBackResponse = post_json(
            &self.client,
            "paste-back",
            &self.endpoint,
            &json!({
                "inpaint_url": inpaint_url,
                "upscaled_url": upscaled_url,
                "actual_mask_url": actual_mask_url,
            }),
        )
        .await?;
        final_image_url(response)
    }
}
