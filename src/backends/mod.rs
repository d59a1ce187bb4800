pub mod fal;
pub mod fetcher;
pub mod gemini;
pub mod services;
pub mod traits;

pub use fal::{FalFluxBackend, FalInpaintBackend};
pub use fetcher::HttpImageFetcher;
pub use gemini::GeminiBackend;
pub use services::{HttpCompositorService, HttpMaskService, HttpStandardizeService};
pub use traits::{
    CompositorService, GenerativeBackend, ImageFetcher, InpaintBackend, MaskService, RetryDelay,
    StandardizeService, TokioDelay,
};

use crate::error::{BackendErrorCategory, PipelineError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Turns a non-2xx response into a categorized backend error.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), truncate(&body, 512))
    };
    Err(PipelineError::backend(
        service,
        BackendErrorCategory::classify(Some(status.as_u16()), &body),
        message,
    ))
}

/// POSTs a JSON body and decodes the JSON answer.
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    service: &'static str,
    url: &str,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| PipelineError::from_reqwest(service, e))?;

    let response = ensure_success(service, response).await?;
    response.json::<R>().await.map_err(|e| {
        PipelineError::backend(service, BackendErrorCategory::Malformed, e.to_string())
    })
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
