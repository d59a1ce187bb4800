use super::{ensure_success, traits::ImageFetcher};
use crate::{
    error::{PipelineError, Result},
    models::FetchedImage,
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest("image download", e))?;
        let response = ensure_success("image download", response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::from_reqwest("image download", e))?
            .to_vec();

        log::debug!(
            "Downloaded {} ({} bytes, content-type {:?})",
            url,
            bytes.len(),
            content_type
        );
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}
