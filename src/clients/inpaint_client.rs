use crate::{
    backends::InpaintBackend,
    error::Result,
    models::{
        AdapterConfig, Dimensions, InpaintOutcome, InpaintRequest, InpaintSource, INPAINT_PROMPT,
    },
};
use std::sync::Arc;

#[derive(Clone)]
pub struct InpaintingClient {
    backend: Arc<dyn InpaintBackend>,
}

impl InpaintingClient {
    pub fn new(backend: Arc<dyn InpaintBackend>) -> Self {
        Self { backend }
    }

    /// Single blocking inpainting call. NSFW output and missing output both
    /// fall back to the original crop instead of failing.
    pub async fn inpaint(
        &self,
        cropped_image_url: &str,
        mask_url: &str,
        adapters: &[AdapterConfig],
        strength: f32,
        dimensions: Dimensions,
        seed: Option<u64>,
    ) -> Result<InpaintOutcome> {
        log::info!(
            "🖌️ Inpainting {} ({}x{}, strength {})",
            cropped_image_url,
            dimensions.width,
            dimensions.height,
            strength
        );

        let response = self
            .backend
            .inpaint(InpaintRequest {
                prompt: INPAINT_PROMPT.to_string(),
                image_url: cropped_image_url.to_string(),
                mask_url: mask_url.to_string(),
                loras: adapters.to_vec(),
                strength,
                image_size: dimensions,
                seed,
            })
            .await?;

        if response.has_nsfw_concepts.first().copied().unwrap_or(false) {
            log::warn!("NSFW content detected in inpainting result, using original crop");
            return Ok(InpaintOutcome {
                edited_image_url: cropped_image_url.to_string(),
                nsfw_flagged: true,
                source: InpaintSource::NsfwFallback,
            });
        }

        let edited = response
            .images
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .filter(|url| !url.trim().is_empty());

        Ok(match edited {
            Some(url) => InpaintOutcome {
                edited_image_url: url,
                nsfw_flagged: false,
                source: InpaintSource::Model,
            },
            None => {
                log::warn!("Inpainting result missing, using original crop");
                InpaintOutcome {
                    edited_image_url: cropped_image_url.to_string(),
                    nsfw_flagged: false,
                    source: InpaintSource::MissingOutputFallback,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InpaintResponse;
    use crate::test_support::FakeInpaintBackend;

    const DIMS: Dimensions = Dimensions {
        width: 512,
        height: 768,
    };

    fn adapters() -> Vec<AdapterConfig> {
        vec![
            AdapterConfig::new("https://m/character", 0.9),
            AdapterConfig::new("https://m/style", 0.4),
        ]
    }

    #[tokio::test]
    async fn model_output_is_used_and_request_is_complete() {
        let backend = Arc::new(FakeInpaintBackend::returning_image("https://fal/edited.png"));
        let client = InpaintingClient::new(backend.clone());

        let outcome = client
            .inpaint("https://s3/crop.png", "https://s3/mask.png", &adapters(), 0.8, DIMS, Some(7))
            .await
            .unwrap();

        assert_eq!(outcome.edited_image_url, "https://fal/edited.png");
        assert_eq!(outcome.source, InpaintSource::Model);
        let request = &backend.requests()[0];
        assert_eq!(request.prompt, INPAINT_PROMPT);
        assert_eq!(request.mask_url, "https://s3/mask.png");
        assert_eq!(request.loras, adapters());
        assert_eq!(request.image_size, DIMS);
        assert_eq!(request.seed, Some(7));
    }

    #[tokio::test]
    async fn nsfw_flag_substitutes_original_crop() {
        let backend = FakeInpaintBackend::returning_image("https://fal/edited.png").flagged_nsfw();
        let client = InpaintingClient::new(Arc::new(backend));

        let outcome = client
            .inpaint("https://s3/crop.png", "https://s3/mask.png", &adapters(), 0.8, DIMS, None)
            .await
            .unwrap();

        assert!(outcome.nsfw_flagged);
        assert_eq!(outcome.edited_image_url, "https://s3/crop.png");
        assert_eq!(outcome.source, InpaintSource::NsfwFallback);
    }

    #[tokio::test]
    async fn missing_output_is_a_soft_failure() {
        let backend = FakeInpaintBackend::returning(InpaintResponse::default());
        let client = InpaintingClient::new(Arc::new(backend));

        let outcome = client
            .inpaint("https://s3/crop.png", "https://s3/mask.png", &adapters(), 0.8, DIMS, None)
            .await
            .unwrap();

        assert!(!outcome.nsfw_flagged);
        assert_eq!(outcome.edited_image_url, "https://s3/crop.png");
        assert_eq!(outcome.source, InpaintSource::MissingOutputFallback);
    }

    #[tokio::test]
    async fn null_output_lists_fall_back_to_the_crop() {
        let response: InpaintResponse = serde_json::from_value(serde_json::json!({
            "images": null,
            "has_nsfw_concepts": null
        }))
        .unwrap();
        let client = InpaintingClient::new(Arc::new(FakeInpaintBackend::returning(response)));

        let outcome = client
            .inpaint("https://s3/crop.png", "https://s3/mask.png", &adapters(), 0.8, DIMS, None)
            .await
            .unwrap();

        assert_eq!(outcome.edited_image_url, "https://s3/crop.png");
        assert_eq!(outcome.source, InpaintSource::MissingOutputFallback);
    }
}
