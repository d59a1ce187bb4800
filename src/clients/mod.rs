pub mod compositor_client;
pub mod generative_client;
pub mod inpaint_client;
pub mod mask_client;
pub mod standardizer;

use crate::{
    backends::{
        build_http_client, FalFluxBackend, FalInpaintBackend, GeminiBackend, GenerativeBackend,
        HttpCompositorService, HttpImageFetcher, HttpMaskService, HttpStandardizeService,
        TokioDelay,
    },
    config::{Config, GenerativeProvider},
    error::Result,
    storage::S3ArtifactStore,
};
use std::sync::Arc;

pub use compositor_client::CompositorClient;
pub use generative_client::GenerativeClient;
pub use inpaint_client::InpaintingClient;
pub use mask_client::MaskPipelineClient;
pub use standardizer::ImageStandardizer;

/// The five service adapters the coordinator drives.
#[derive(Clone)]
pub struct ServiceClients {
    generative: GenerativeClient,
    standardizer: ImageStandardizer,
    masks: MaskPipelineClient,
    inpainting: InpaintingClient,
    compositor: CompositorClient,
}

impl ServiceClients {
    pub fn new(
        generative: GenerativeClient,
        standardizer: ImageStandardizer,
        masks: MaskPipelineClient,
        inpainting: InpaintingClient,
        compositor: CompositorClient,
    ) -> Self {
        Self {
            generative,
            standardizer,
            masks,
            inpainting,
            compositor,
        }
    }

    /// Wires the live HTTP and S3 backends from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = build_http_client(config.request_timeout())?;
        let store = Arc::new(S3ArtifactStore::new(config.s3.clone()).await?);

        let fetcher = Arc::new(HttpImageFetcher::new(http.clone()));
        let backend: Arc<dyn GenerativeBackend> = match config.fal.generator {
            GenerativeProvider::Gemini => {
                Arc::new(GeminiBackend::new(http.clone(), &config.gemini)?)
            }
            GenerativeProvider::FalFlux => Arc::new(FalFluxBackend::new(
                http.clone(),
                fetcher.clone(),
                &config.fal,
            )?),
        };
        log::info!("🎨 Prompt-mode generator: {}", config.fal.generator.as_str());

        let generative = GenerativeClient::new(
            backend,
            fetcher,
            store,
            Arc::new(TokioDelay),
            config.retry.clone(),
        );

        Ok(Self {
            generative,
            standardizer: ImageStandardizer::new(Arc::new(HttpStandardizeService::new(
                http.clone(),
                &config.endpoints,
            ))),
            masks: MaskPipelineClient::new(Arc::new(HttpMaskService::new(
                http.clone(),
                &config.endpoints,
            ))),
            inpainting: InpaintingClient::new(Arc::new(FalInpaintBackend::new(
                http.clone(),
                &config.fal,
            )?)),
            compositor: CompositorClient::new(Arc::new(HttpCompositorService::new(
                http,
                &config.endpoints,
            ))),
        })
    }

    pub fn generative(&self) -> &GenerativeClient {
        &self.generative
    }

    pub fn standardizer(&self) -> &ImageStandardizer {
        &self.standardizer
    }

    pub fn masks(&self) -> &MaskPipelineClient {
        &self.masks
    }

    pub fn inpainting(&self) -> &InpaintingClient {
        &self.inpainting
    }

    pub fn compositor(&self) -> &CompositorClient {
        &self.compositor
    }
}
