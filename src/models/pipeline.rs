use super::generation::GenerationResult;
use serde::Serialize;
use std::fmt;

/// Lifecycle of one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Received,
    Generating,
    Standardizing,
    PerItemProcessing,
    Aggregated,
    Responded,
    Failed,
}

/// The stage of a per-image chain that produced an item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Mask,
    Inpaint,
    PasteBack,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Mask => "mask",
            ItemStage::Inpaint => "inpaint",
            ItemStage::PasteBack => "paste-back",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Completed {
        source_image_url: String,
        final_image_url: String,
        nsfw_flagged: bool,
    },
    Failed {
        source_image_url: String,
        stage: ItemStage,
        error: String,
    },
}

impl ItemOutcome {
    pub fn final_image_url(&self) -> Option<&str> {
        match self {
            ItemOutcome::Completed {
                final_image_url, ..
            } => Some(final_image_url),
            ItemOutcome::Failed { .. } => None,
        }
    }
}

/// Everything a successful run produced, including the items that were dropped.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub request_id: String,
    pub input_images: usize,
    pub generations: Vec<GenerationResult>,
    pub generated_images: usize,
    pub items: Vec<ItemOutcome>,
    pub states: Vec<PipelineState>,
    pub generation_latency_seconds: Option<f64>,
}

impl PipelineReport {
    pub fn final_image_urls(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.final_image_url().map(str::to_string))
            .collect()
    }

    pub fn processed_images(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ItemOutcome::Completed { .. }))
            .count()
    }

    pub fn failed_images(&self) -> usize {
        self.items.len() - self.processed_images()
    }

    pub fn run_ids(&self) -> Vec<String> {
        self.generations.iter().map(|g| g.run_id.clone()).collect()
    }

    /// Builds the success body and records the final state transition.
    pub fn respond(&mut self) -> PipelineResponse {
        self.states.push(PipelineState::Responded);
        PipelineResponse::from(&*self)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generative_run_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generative_latency: Option<f64>,
    pub input_images: usize,
    pub generated_images: usize,
    pub processed_images: usize,
    pub failed_images: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub success: bool,
    pub image_urls: Vec<String>,
    pub metadata: PipelineMetadata,
}

impl From<&PipelineReport> for PipelineResponse {
    fn from(report: &PipelineReport) -> Self {
        PipelineResponse {
            success: true,
            image_urls: report.final_image_urls(),
            metadata: PipelineMetadata {
                generative_run_ids: report.run_ids(),
                generative_latency: report.generation_latency_seconds,
                input_images: report.input_images,
                generated_images: report.generated_images,
                processed_images: report.processed_images(),
                failed_images: report.failed_images(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details,
        }
    }
}
