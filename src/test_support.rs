//! In-memory doubles for every external service, shared by the unit tests.

use crate::{
    backends::{
        CompositorService, GenerativeBackend, ImageFetcher, InpaintBackend, MaskService,
        RetryDelay, StandardizeService,
    },
    clients::{
        CompositorClient, GenerativeClient, ImageStandardizer, InpaintingClient,
        MaskPipelineClient, ServiceClients,
    },
    config::RetryConfig,
    error::{BackendErrorCategory, PipelineError, Result},
    models::{
        BinaryMaskResponse, CandidateImage, FaceMaskResponse, FetchedImage,
        GenerateContentRequest, InpaintImage, InpaintRequest, InpaintResponse, RawDimensions,
    },
    storage::ArtifactStore,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn rejected(service: &'static str, message: impl Into<String>) -> PipelineError {
    PipelineError::backend(service, BackendErrorCategory::Rejected, message)
}

#[derive(Default)]
pub struct FakeStore {
    uploads: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn fail_keys_containing(&self, pattern: &str) {
        self.failing.lock().unwrap().push(pattern.to_string());
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn upload(&self, _bytes: Vec<u8>, key: &str, _content_type: &str) -> Result<String> {
        if self.failing.lock().unwrap().iter().any(|p| key.contains(p)) {
            return Err(PipelineError::StorageError(format!("upload of {} refused", key)));
        }
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(format!("https://store.test/{}", key))
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    images: HashMap<String, FetchedImage>,
    failures: HashMap<String, BackendErrorCategory>,
}

impl FakeFetcher {
    pub fn with_image(mut self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Self {
        self.images.insert(
            url.to_string(),
            FetchedImage {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    pub fn failing_with(mut self, url: &str, category: BackendErrorCategory) -> Self {
        self.failures.insert(url.to_string(), category);
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        if let Some(category) = self.failures.get(url) {
            return Err(PipelineError::backend(
                "image download",
                *category,
                format!("{} from image host", category),
            ));
        }
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| rejected("image download", "HTTP 404"))
    }
}

/// Replays a fixed script of outcomes; `Ok(n)` yields `n` candidate images.
#[derive(Default)]
pub struct ScriptedGenerativeBackend {
    script: Mutex<VecDeque<Result<usize>>>,
    requests: Mutex<Vec<GenerateContentRequest>>,
}

impl ScriptedGenerativeBackend {
    pub fn new(script: Vec<Result<usize>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerateContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedGenerativeBackend {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<Vec<CandidateImage>> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(rejected("gemini", "script exhausted")));

        next.map(|count| {
            (0..count)
                .map(|candidate_index| CandidateImage {
                    candidate_index,
                    bytes: b"png".to_vec(),
                })
                .collect()
        })
    }
}

#[derive(Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryDelay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Appends `?standardized` to every URL unless told to fail or panic on it.
#[derive(Default)]
pub struct FakeStandardizeService {
    failing: HashSet<String>,
    panicking: HashSet<String>,
}

impl FakeStandardizeService {
    pub fn failing_for(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn panicking_for(mut self, url: &str) -> Self {
        self.panicking.insert(url.to_string());
        self
    }
}

#[async_trait]
impl StandardizeService for FakeStandardizeService {
    async fn standardize(&self, image_url: &str) -> Result<String> {
        if self.panicking.contains(image_url) {
            panic!("standardization worker crashed on {}", image_url);
        }
        if self.failing.contains(image_url) {
            return Err(rejected("standardize", "HTTP 500"));
        }
        Ok(format!("{}?standardized", image_url))
    }
}

/// Derives every mask URL from its input so results stay traceable.
pub struct FakeMaskService {
    dimensions: RawDimensions,
    failing_face: HashSet<String>,
    failing_binary: HashSet<String>,
    face_inputs: Mutex<Vec<String>>,
    binary_inputs: Mutex<Vec<String>>,
}

impl Default for FakeMaskService {
    fn default() -> Self {
        Self {
            dimensions: RawDimensions {
                width: 512,
                height: 768,
            },
            failing_face: HashSet::new(),
            failing_binary: HashSet::new(),
            face_inputs: Mutex::new(Vec::new()),
            binary_inputs: Mutex::new(Vec::new()),
        }
    }
}

impl FakeMaskService {
    pub fn with_dimensions(mut self, width: i64, height: i64) -> Self {
        self.dimensions = RawDimensions { width, height };
        self
    }

    /// Fails face-mask calls for any URL containing `pattern`.
    pub fn failing_face_for(mut self, pattern: &str) -> Self {
        self.failing_face.insert(pattern.to_string());
        self
    }

    pub fn failing_binary_for(mut self, cropped_url: &str) -> Self {
        self.failing_binary.insert(cropped_url.to_string());
        self
    }

    pub fn face_mask_inputs(&self) -> Vec<String> {
        self.face_inputs.lock().unwrap().clone()
    }

    pub fn binary_mask_inputs(&self) -> Vec<String> {
        self.binary_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaskService for FakeMaskService {
    async fn generate_face_mask(&self, image_url: &str) -> Result<FaceMaskResponse> {
        self.face_inputs.lock().unwrap().push(image_url.to_string());
        if self.failing_face.iter().any(|p| image_url.contains(p.as_str())) {
            return Err(rejected("face mask", "no face detected"));
        }
        Ok(FaceMaskResponse {
            upscaled_image_s3_url: format!("{}#upscaled", image_url),
            cropped_image_s3_url: format!("{}#crop", image_url),
            cropped_image_mask_s3_url: format!("{}#cropmask", image_url),
            actual_mask_s3_url: format!("{}#fullmask", image_url),
            cropped_image_mask_dims: self.dimensions,
        })
    }

    async fn derive_binary_mask(&self, cropped_image_url: &str) -> Result<BinaryMaskResponse> {
        self.binary_inputs
            .lock()
            .unwrap()
            .push(cropped_image_url.to_string());
        if self.failing_binary.contains(cropped_image_url) {
            return Err(rejected("binary mask", "HTTP 422"));
        }
        Ok(BinaryMaskResponse {
            image_url: format!("{}#binary", cropped_image_url),
        })
    }
}

/// Without a fixed response, echoes `{image_url}#edited` for each request.
#[derive(Default)]
pub struct FakeInpaintBackend {
    response: Option<InpaintResponse>,
    nsfw: bool,
    failing: HashSet<String>,
    requests: Mutex<Vec<InpaintRequest>>,
}

impl FakeInpaintBackend {
    pub fn returning_image(url: &str) -> Self {
        Self::returning(InpaintResponse {
            images: vec![InpaintImage {
                url: Some(url.to_string()),
                width: None,
                height: None,
            }],
            has_nsfw_concepts: vec![false],
            seed: None,
        })
    }

    pub fn returning(response: InpaintResponse) -> Self {
        Self {
            response: Some(response),
            ..Default::default()
        }
    }

    pub fn flagged_nsfw(mut self) -> Self {
        self.nsfw = true;
        self
    }

    pub fn failing_for(mut self, cropped_url: &str) -> Self {
        self.failing.insert(cropped_url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<InpaintRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InpaintBackend for FakeInpaintBackend {
    async fn inpaint(&self, request: InpaintRequest) -> Result<InpaintResponse> {
        let image_url = request.image_url.clone();
        self.requests.lock().unwrap().push(request);
        if self.failing.contains(&image_url) {
            return Err(PipelineError::backend(
                "fal inpainting",
                BackendErrorCategory::ServerError,
                "HTTP 500",
            ));
        }

        let mut response = self.response.clone().unwrap_or_else(|| InpaintResponse {
            images: vec![InpaintImage {
                url: Some(format!("{}#edited", image_url)),
                width: None,
                height: None,
            }],
            has_nsfw_concepts: vec![false],
            seed: None,
        });
        if self.nsfw {
            response.has_nsfw_concepts = vec![true];
        }
        Ok(response)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteBackCall {
    pub inpaint_url: String,
    pub upscaled_url: String,
    pub actual_mask_url: String,
}

#[derive(Default)]
pub struct FakeCompositor {
    failing: HashSet<String>,
    calls: Mutex<Vec<PasteBackCall>>,
}

impl FakeCompositor {
    pub fn failing_for(mut self, upscaled_url: &str) -> Self {
        self.failing.insert(upscaled_url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PasteBackCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompositorService for FakeCompositor {
    async fn paste_back(
        &self,
        inpaint_url: &str,
        upscaled_url: &str,
        actual_mask_url: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(PasteBackCall {
            inpaint_url: inpaint_url.to_string(),
            upscaled_url: upscaled_url.to_string(),
            actual_mask_url: actual_mask_url.to_string(),
        });
        if self.failing.contains(upscaled_url) {
            return Err(rejected("paste-back", "HTTP 400"));
        }
        Ok(format!("{}#final", upscaled_url))
    }
}

/// A full set of doubles; override fields with struct update syntax.
pub struct FakeServices {
    pub generative: Arc<ScriptedGenerativeBackend>,
    pub fetcher: Arc<FakeFetcher>,
    pub store: Arc<FakeStore>,
    pub delay: Arc<RecordingDelay>,
    pub standardize: Arc<FakeStandardizeService>,
    pub masks: Arc<FakeMaskService>,
    pub inpaint: Arc<FakeInpaintBackend>,
    pub compositor: Arc<FakeCompositor>,
}

impl Default for FakeServices {
    fn default() -> Self {
        Self {
            generative: Arc::new(ScriptedGenerativeBackend::default()),
            fetcher: Arc::new(FakeFetcher::default()),
            store: Arc::new(FakeStore::default()),
            delay: Arc::new(RecordingDelay::default()),
            standardize: Arc::new(FakeStandardizeService::default()),
            masks: Arc::new(FakeMaskService::default()),
            inpaint: Arc::new(FakeInpaintBackend::default()),
            compositor: Arc::new(FakeCompositor::default()),
        }
    }
}

impl FakeServices {
    pub fn clients(&self) -> ServiceClients {
        ServiceClients::new(
            GenerativeClient::new(
                self.generative.clone(),
                self.fetcher.clone(),
                self.store.clone(),
                self.delay.clone(),
                RetryConfig::default(),
            ),
            ImageStandardizer::new(self.standardize.clone()),
            MaskPipelineClient::new(self.masks.clone()),
            InpaintingClient::new(self.inpaint.clone()),
            CompositorClient::new(self.compositor.clone()),
        )
    }

    /// True when no stage of the pipeline was ever reached.
    pub fn untouched(&self) -> bool {
        self.generative.requests().is_empty()
            && self.store.uploaded_keys().is_empty()
            && self.masks.face_mask_inputs().is_empty()
            && self.inpaint.requests().is_empty()
            && self.compositor.calls().is_empty()
    }
}
