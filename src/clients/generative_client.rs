use crate::{
    backends::{GenerativeBackend, ImageFetcher, RetryDelay},
    config::RetryConfig,
    error::{BackendErrorCategory, PipelineError, Result},
    models::{AdapterConfig, FetchedImage, GenerateContentRequest, GenerationResult, InlineImage},
    storage::{candidate_key, ArtifactStore},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

const ARTIFACT_PREFIX: &str = "gemini-inference";
const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Picks the MIME type sent to the generative backend for a downloaded image.
///
/// The transport's content type wins unless it is the generic octet-stream, in
/// which case the URL extension decides. Anything unsupported becomes jpeg.
pub fn resolve_mime_type(content_type: Option<&str>, url: &str) -> String {
    let reported = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());

    let mime = match reported.as_deref() {
        None => "image/jpeg".to_string(),
        Some("application/octet-stream") => mime_from_extension(url).to_string(),
        Some("image/jpg") => "image/jpeg".to_string(),
        Some(other) => other.to_string(),
    };

    if SUPPORTED_MIME_TYPES.contains(&mime.as_str()) {
        mime
    } else {
        "image/jpeg".to_string()
    }
}

fn mime_from_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// JSON descriptor sent as the text part of every generative call.
pub fn prompt_descriptor(prompt: &str) -> Value {
    json!({
        "description": prompt,
        "task": "generate_image",
        "style": {
            "primary": "photorealistic",
            "rendering_quality": "high-resolution, 4k",
            "lighting": "studio"
        },
        "technical": {
            "camera_settings": {
                "depth_of_field": "shallow",
                "focal_length": "85mm",
                "aperture": "f/1.8"
            },
            "resolution": "professional quality, 8K HDR"
        },
        "materials": {
            "skin": "pores, natural imperfections",
            "fabric": "thread patterns, realistic drape"
        },
        "composition": {
            "perspective": "photography composition rules",
            "framing": "professional positioning"
        },
        "quality": {
            "include": "hyperrealistic, photographic quality, studio lighting, authentic textures",
            "avoid": "unrealistic proportions, oversaturated colors"
        }
    })
}

fn run_id(started_at: DateTime<Utc>, call_number: u32) -> String {
    let stamp = started_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "");
    format!("{}_call{}", stamp, call_number)
}

#[derive(Clone)]
pub struct GenerativeClient {
    backend: Arc<dyn GenerativeBackend>,
    fetcher: Arc<dyn ImageFetcher>,
    store: Arc<dyn ArtifactStore>,
    delay: Arc<dyn RetryDelay>,
    retry: RetryConfig,
}

impl GenerativeClient {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        fetcher: Arc<dyn ImageFetcher>,
        store: Arc<dyn ArtifactStore>,
        delay: Arc<dyn RetryDelay>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            backend,
            fetcher,
            store,
            delay,
            retry,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        reference_image_urls: &[String],
        temperature: f32,
    ) -> GenerationResult {
        self.generate_call(prompt, reference_image_urls, &[], temperature, 1)
            .await
    }

    /// One generative call with bounded retries on transient failures.
    pub async fn generate_call(
        &self,
        prompt: &str,
        reference_image_urls: &[String],
        adapters: &[AdapterConfig],
        temperature: f32,
        call_number: u32,
    ) -> GenerationResult {
        let started = Instant::now();
        let run_id = run_id(Utc::now(), call_number);
        let max_attempts = self.retry.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            log::info!(
                "🎨 Generative call {}{} for prompt: {}",
                call_number,
                if attempt > 1 {
                    format!(" (retry {})", attempt - 1)
                } else {
                    String::new()
                },
                prompt
            );

            let outcome = self
                .attempt(prompt, reference_image_urls, adapters, temperature, call_number)
                .await;
            let latency = started.elapsed().as_secs_f64();

            match outcome {
                Ok(urls) if urls.is_empty() => {
                    log::warn!("Generative call {} produced no candidates", call_number);
                    return GenerationResult::failed(
                        "No candidates were produced".to_string(),
                        run_id,
                        latency,
                        attempt,
                    );
                }
                Ok(urls) => {
                    log::info!(
                        "✅ Generative call {} completed in {:.2}s with {} candidates",
                        call_number,
                        latency,
                        urls.len()
                    );
                    return GenerationResult::succeeded(urls, run_id, latency, attempt);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    log::warn!(
                        "Generative call {} failed transiently ({}); retrying in {}s (attempt {}/{})",
                        call_number,
                        e,
                        self.retry.backoff.as_secs(),
                        attempt + 1,
                        max_attempts
                    );
                    self.delay.wait(self.retry.backoff).await;
                }
                Err(e) => {
                    log::error!(
                        "Generative call {} failed after {} attempt(s): {}",
                        call_number,
                        attempt,
                        e
                    );
                    return GenerationResult::failed(e.to_string(), run_id, latency, attempt);
                }
            }
        }
    }

    async fn attempt(
        &self,
        prompt: &str,
        reference_image_urls: &[String],
        adapters: &[AdapterConfig],
        temperature: f32,
        call_number: u32,
    ) -> Result<Vec<String>> {
        let images = try_join_all(
            reference_image_urls
                .iter()
                .enumerate()
                .map(|(index, url)| self.load_reference(index, url)),
        )
        .await?;

        let prompt_text = serde_json::to_string(&prompt_descriptor(prompt))
            .map_err(|e| PipelineError::SerializationError(e.to_string()))?;

        let candidates = self
            .backend
            .generate_content(GenerateContentRequest {
                images,
                prompt: prompt.to_string(),
                prompt_text,
                adapters: adapters.to_vec(),
                temperature,
                candidate_count: 1,
            })
            .await?;

        let mut urls = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let key = candidate_key(ARTIFACT_PREFIX, call_number, candidate.candidate_index);
            match self.store.upload(candidate.bytes, &key, "image/png").await {
                Ok(url) => {
                    log::info!("📤 Uploaded generated image: {}", url);
                    urls.push(url);
                }
                Err(e) => {
                    log::error!("Failed to upload generated image {}: {}", key, e);
                }
            }
        }
        Ok(urls)
    }

    async fn load_reference(&self, index: usize, url: &str) -> Result<InlineImage> {
        let FetchedImage {
            bytes,
            content_type,
        } = self.fetcher.fetch(url).await.map_err(|e| match e {
            // A broken reference will not heal by calling the model again.
            PipelineError::BackendError {
                service, message, ..
            } => PipelineError::backend(
                service,
                BackendErrorCategory::Transport,
                format!("Failed to download image {}: {}", index + 1, message),
            ),
            other => other,
        })?;

        let mime_type = resolve_mime_type(content_type.as_deref(), url);
        log::debug!("Image {} MIME type: {}", index + 1, mime_type);

        Ok(InlineImage {
            mime_type,
            data: STANDARD.encode(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        FakeFetcher, FakeStore, RecordingDelay, ScriptedGenerativeBackend,
    };
    use std::time::Duration;

    struct Harness {
        client: GenerativeClient,
        backend: Arc<ScriptedGenerativeBackend>,
        store: Arc<FakeStore>,
        delay: Arc<RecordingDelay>,
    }

    fn harness(backend: ScriptedGenerativeBackend, fetcher: FakeFetcher) -> Harness {
        let backend = Arc::new(backend);
        let store = Arc::new(FakeStore::default());
        let delay = Arc::new(RecordingDelay::default());
        let client = GenerativeClient::new(
            backend.clone(),
            Arc::new(fetcher),
            store.clone(),
            delay.clone(),
            RetryConfig::default(),
        );
        Harness {
            client,
            backend,
            store,
            delay,
        }
    }

    fn rate_limited() -> PipelineError {
        PipelineError::backend("gemini", BackendErrorCategory::RateLimited, "HTTP 429")
    }

    #[test]
    fn mime_type_prefers_transport_header() {
        assert_eq!(resolve_mime_type(Some("image/png"), "a.jpg"), "image/png");
        assert_eq!(
            resolve_mime_type(Some("image/webp; charset=binary"), "a"),
            "image/webp"
        );
        assert_eq!(resolve_mime_type(None, "a.png"), "image/jpeg");
    }

    #[test]
    fn octet_stream_falls_back_to_extension() {
        assert_eq!(
            resolve_mime_type(
                Some("application/octet-stream"),
                "https://cdn.example/face.webp"
            ),
            "image/webp"
        );
        assert_eq!(
            resolve_mime_type(
                Some("application/octet-stream"),
                "https://cdn.example/face.PNG?sig=abc"
            ),
            "image/png"
        );
        assert_eq!(
            resolve_mime_type(Some("application/octet-stream"), "https://cdn.example/raw"),
            "image/jpeg"
        );
    }

    #[test]
    fn unsupported_types_collapse_to_jpeg() {
        assert_eq!(resolve_mime_type(Some("image/gif"), "a.gif"), "image/jpeg");
        assert_eq!(resolve_mime_type(Some("text/html"), "a.png"), "image/jpeg");
        assert_eq!(resolve_mime_type(Some("image/heic"), "a"), "image/heic");
    }

    #[test]
    fn run_id_strips_separators() {
        let started = DateTime::parse_from_rfc3339("2025-03-04T05:06:07.089Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(run_id(started, 2), "2025-03-04T050607089Z_call2");
    }

    #[tokio::test]
    async fn webp_served_as_octet_stream_is_sent_as_webp() {
        let url = "https://cdn.example/ref.webp";
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Ok(1)]),
            FakeFetcher::default().with_image(url, b"webp", Some("application/octet-stream")),
        );

        let result = h.client.generate("portrait", &[url.to_string()], 1.0).await;

        assert!(result.success);
        let requests = h.backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].images[0].mime_type, "image/webp");
        assert_eq!(requests[0].images[0].data, STANDARD.encode(b"webp"));
        assert_eq!(requests[0].candidate_count, 1);
        let descriptor: Value = serde_json::from_str(&requests[0].prompt_text).unwrap();
        assert_eq!(descriptor["description"], "portrait");
    }

    #[tokio::test]
    async fn two_rate_limits_then_success_retries_twice() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Err(rate_limited()), Err(rate_limited()), Ok(1)]),
            FakeFetcher::default(),
        );

        let result = h.client.generate("portrait", &[], 0.5).await;

        assert!(result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.candidate_image_urls.len(), 1);
        assert_eq!(h.backend.requests().len(), 3);
        assert_eq!(h.delay.waits(), vec![Duration::from_secs(5); 2]);
    }

    #[tokio::test]
    async fn three_rate_limits_fail_after_two_retries() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![
                Err(rate_limited()),
                Err(rate_limited()),
                Err(rate_limited()),
            ]),
            FakeFetcher::default(),
        );

        let result = h.client.generate("portrait", &[], 0.5).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(h.backend.requests().len(), 3);
        assert_eq!(h.delay.waits().len(), 2);
        assert!(result.error_message.unwrap().contains("429"));
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Err(PipelineError::backend(
                "gemini",
                BackendErrorCategory::Rejected,
                "HTTP 400: invalid argument",
            ))]),
            FakeFetcher::default(),
        );

        let result = h.client.generate("portrait", &[], 1.0).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert!(h.delay.waits().is_empty());
    }

    #[tokio::test]
    async fn failed_uploads_drop_only_that_candidate() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Ok(2)]),
            FakeFetcher::default(),
        );
        h.store.fail_keys_containing("cand0");

        let result = h.client.generate_call("portrait", &[], &[], 1.0, 4).await;

        assert!(result.success);
        assert_eq!(result.candidate_image_urls.len(), 1);
        assert!(result.candidate_image_urls[0].contains("-call4-cand1.png"));
        assert!(result.run_id.ends_with("_call4"));
    }

    #[tokio::test]
    async fn no_candidates_is_a_failure() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Ok(0)]),
            FakeFetcher::default(),
        );

        let result = h.client.generate("portrait", &[], 1.0).await;

        assert!(!result.success);
        assert!(result.candidate_image_urls.is_empty());
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn download_failure_is_reported() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Ok(1)]),
            FakeFetcher::default(),
        );

        let result = h
            .client
            .generate("portrait", &["https://missing.example/a.png".to_string()], 1.0)
            .await;

        assert!(!result.success);
        assert!(result
            .error_message
            .unwrap()
            .contains("Failed to download image 1"));
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn rate_limited_reference_host_is_not_retried() {
        let url = "https://busy.example/a.png";
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Ok(1)]),
            FakeFetcher::default().failing_with(url, BackendErrorCategory::RateLimited),
        );

        let result = h.client.generate("portrait", &[url.to_string()], 1.0).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert!(h.delay.waits().is_empty());
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn adapters_reach_the_backend_with_the_raw_prompt() {
        let h = harness(
            ScriptedGenerativeBackend::new(vec![Ok(1)]),
            FakeFetcher::default(),
        );
        let adapters = vec![AdapterConfig::new("https://m/char", 0.3)];

        let result = h
            .client
            .generate_call("a knight", &[], &adapters, 1.0, 1)
            .await;

        assert!(result.success);
        let request = &h.backend.requests()[0];
        assert_eq!(request.prompt, "a knight");
        assert_eq!(request.adapters, adapters);
        assert!(request.prompt_text.contains("\"description\":\"a knight\""));
    }
}
