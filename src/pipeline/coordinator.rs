use crate::{
    clients::ServiceClients,
    config::Config,
    error::{PipelineError, Result},
    logger,
    models::{
        AdapterConfig, GenerationResult, ItemOutcome, ItemStage, PipelineInput, PipelineReport,
        PipelineRequest, PipelineState,
    },
};
use futures::future::join_all;
use std::time::Instant;
use uuid::Uuid;

/// Sequences generation, standardization and the per-image
/// mask → inpaint → paste-back chain for one request at a time.
#[derive(Clone)]
pub struct PipelineCoordinator {
    clients: ServiceClients,
}

struct RunState {
    request_id: String,
    states: Vec<PipelineState>,
}

impl RunState {
    fn new() -> Self {
        let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        log::info!("[req:{}] 📥 {:?}", request_id, PipelineState::Received);
        Self {
            request_id,
            states: vec![PipelineState::Received],
        }
    }

    fn enter(&mut self, state: PipelineState) {
        log::info!("[req:{}] ➡️  {:?}", self.request_id, state);
        self.states.push(state);
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        log::error!("[req:{}] {:?}: {}", self.request_id, PipelineState::Failed, err);
        self.states.push(PipelineState::Failed);
        err
    }
}

struct Sources {
    urls: Vec<String>,
    input_images: usize,
    generations: Vec<GenerationResult>,
    generated_images: usize,
    generation_latency_seconds: Option<f64>,
}

impl PipelineCoordinator {
    pub fn new(clients: ServiceClients) -> Self {
        Self { clients }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(ServiceClients::from_config(config).await?))
    }

    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineReport> {
        let mut run = RunState::new();
        let _timer = logger::timer(format!("pipeline request {}", run.request_id));

        if let Err(e) = request.validate() {
            return Err(run.fail(e));
        }

        let sources = match &request.input {
            PipelineInput::Prompt {
                prompt,
                reference_image_urls,
                image_count,
                temperature,
            } => {
                self.generate_sources(
                    &mut run,
                    prompt,
                    reference_image_urls,
                    &request.generation_adapters(),
                    *image_count,
                    *temperature,
                )
                .await?
            }
            PipelineInput::DirectImage { image_url } => Sources {
                urls: vec![image_url.clone()],
                input_images: 1,
                generations: Vec::new(),
                generated_images: 0,
                generation_latency_seconds: None,
            },
        };

        run.enter(PipelineState::PerItemProcessing);
        let items = join_all(
            sources
                .urls
                .iter()
                .map(|url| self.process_item(url, &request.adapters, request.inpaint_strength, request.seed)),
        )
        .await;

        for (index, item) in items.iter().enumerate() {
            if let ItemOutcome::Failed {
                source_image_url,
                stage,
                error,
            } = item
            {
                log::error!(
                    "[req:{}] ❌ Image {}/{} ({}) dropped at {} stage: {}",
                    run.request_id,
                    index + 1,
                    items.len(),
                    source_image_url,
                    stage,
                    error
                );
            }
        }

        let report = PipelineReport {
            request_id: run.request_id.clone(),
            input_images: sources.input_images,
            generations: sources.generations,
            generated_images: sources.generated_images,
            items,
            states: Vec::new(),
            generation_latency_seconds: sources.generation_latency_seconds,
        };

        if report.processed_images() == 0 {
            return Err(run.fail(PipelineError::NoImagesProcessed));
        }

        run.enter(PipelineState::Aggregated);
        log::info!(
            "[req:{}] 🎉 Workflow completed: {} input, {} generated, {} processed, {} dropped",
            run.request_id,
            report.input_images,
            report.generated_images,
            report.processed_images(),
            report.failed_images()
        );

        Ok(PipelineReport {
            states: run.states,
            ..report
        })
    }

    async fn generate_sources(
        &self,
        run: &mut RunState,
        prompt: &str,
        reference_image_urls: &[String],
        adapters: &[AdapterConfig],
        image_count: u32,
        temperature: f32,
    ) -> Result<Sources> {
        run.enter(PipelineState::Generating);
        let started = Instant::now();

        let generative = self.clients.generative();
        let generations = join_all((1..=image_count).map(|call_number| {
            generative.generate_call(
                prompt,
                reference_image_urls,
                adapters,
                temperature,
                call_number,
            )
        }))
        .await;
        let latency = started.elapsed().as_secs_f64();

        let generated: Vec<String> = generations
            .iter()
            .flat_map(|g| g.candidate_image_urls.iter().cloned())
            .collect();

        if generated.is_empty() {
            let reasons: Vec<String> = generations
                .iter()
                .filter_map(|g| g.error_message.clone())
                .collect();
            let reason = if reasons.is_empty() {
                "No images generated".to_string()
            } else {
                reasons.join("; ")
            };
            return Err(run.fail(PipelineError::NoImagesGenerated(reason)));
        }

        let failed_calls = generations.iter().filter(|g| !g.success).count();
        if failed_calls > 0 {
            log::warn!(
                "[req:{}] {} of {} generative calls failed; continuing with {} images",
                run.request_id,
                failed_calls,
                generations.len(),
                generated.len()
            );
        }

        run.enter(PipelineState::Standardizing);
        let urls = self.clients.standardizer().standardize_all(&generated).await;

        Ok(Sources {
            urls,
            input_images: reference_image_urls.len(),
            generated_images: generated.len(),
            generations,
            generation_latency_seconds: Some(latency),
        })
    }

    /// Runs one image through mask → inpaint → paste-back. Any error ends the
    /// chain for this image only.
    async fn process_item(
        &self,
        source_image_url: &str,
        adapters: &[AdapterConfig],
        strength: f32,
        seed: Option<u64>,
    ) -> ItemOutcome {
        let failed = |stage: ItemStage, err: PipelineError| ItemOutcome::Failed {
            source_image_url: source_image_url.to_string(),
            stage,
            error: err.to_string(),
        };

        let masks = match self.clients.masks().build_mask(source_image_url).await {
            Ok(bundle) => bundle,
            Err(e) => return failed(ItemStage::Mask, e),
        };

        let inpainted = match self
            .clients
            .inpainting()
            .inpaint(
                &masks.cropped_image_url,
                &masks.binary_mask_url,
                adapters,
                strength,
                masks.cropped_dimensions,
                seed,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return failed(ItemStage::Inpaint, e),
        };

        match self
            .clients
            .compositor()
            .paste_back(
                &inpainted.edited_image_url,
                &masks.upscaled_image_url,
                &masks.full_frame_mask_url,
            )
            .await
        {
            Ok(final_image_url) => ItemOutcome::Completed {
                source_image_url: source_image_url.to_string(),
                final_image_url,
                nsfw_flagged: inpainted.nsfw_flagged,
            },
            Err(e) => failed(ItemStage::PasteBack, e),
        }
    }
}
