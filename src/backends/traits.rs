use crate::{
    error::Result,
    models::{
        BinaryMaskResponse, CandidateImage, FaceMaskResponse, FetchedImage,
        GenerateContentRequest, InpaintRequest, InpaintResponse,
    },
};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

/// The generative image model. Errors carry a `BackendErrorCategory` so the
/// caller can decide whether to retry.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(&self, request: GenerateContentRequest)
        -> Result<Vec<CandidateImage>>;
}

#[async_trait]
pub trait StandardizeService: Send + Sync {
    async fn standardize(&self, image_url: &str) -> Result<String>;
}

#[async_trait]
pub trait MaskService: Send + Sync {
    async fn generate_face_mask(&self, image_url: &str) -> Result<FaceMaskResponse>;

    async fn derive_binary_mask(&self, cropped_image_url: &str) -> Result<BinaryMaskResponse>;
}

#[async_trait]
pub trait InpaintBackend: Send + Sync {
    async fn inpaint(&self, request: InpaintRequest) -> Result<InpaintResponse>;
}

#[async_trait]
pub trait CompositorService: Send + Sync {
    async fn paste_back(
        &self,
        inpaint_url: &str,
        upscaled_url: &str,
        actual_mask_url: &str,
    ) -> Result<String>;
}

/// Waits between generative retries.
#[async_trait]
pub trait RetryDelay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait]
impl RetryDelay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
