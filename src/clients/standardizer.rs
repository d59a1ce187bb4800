use crate::backends::StandardizeService;
use futures::future::join_all;
use std::sync::Arc;

/// Normalizes generated images before masking. Never fails: any URL that
/// cannot be standardized is passed through unchanged.
#[derive(Clone)]
pub struct ImageStandardizer {
    service: Arc<dyn StandardizeService>,
}

impl ImageStandardizer {
    pub fn new(service: Arc<dyn StandardizeService>) -> Self {
        Self { service }
    }

    pub async fn standardize_one(&self, image_url: &str) -> String {
        log::info!("🔄 Standardizing image: {}", image_url);
        match self.service.standardize(image_url).await {
            Ok(url) => {
                log::info!("✅ Image standardized: {}", url);
                url
            }
            Err(e) => {
                log::warn!(
                    "Image standardization failed for {}, using original URL: {}",
                    image_url,
                    e
                );
                image_url.to_string()
            }
        }
    }

    /// Standardizes every URL concurrently, preserving length and order.
    pub async fn standardize_all(&self, image_urls: &[String]) -> Vec<String> {
        log::info!("🔄 Standardizing {} images in parallel", image_urls.len());

        let handles = image_urls.iter().cloned().map(|url| {
            let this = self.clone();
            tokio::spawn(async move { this.standardize_one(&url).await })
        });

        let mut standardized = Vec::with_capacity(image_urls.len());
        for joined in join_all(handles).await {
            match joined {
                Ok(url) => standardized.push(url),
                Err(e) => {
                    log::error!("Batch image standardization broke down: {}", e);
                    return image_urls.to_vec();
                }
            }
        }

        log::info!("✅ All images processed (standardized or original)");
        standardized
    }
}
