use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// A LoRA-style adapter applied by the generative and inpainting models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(rename = "path")]
    pub model_path: String,
    /// Scale applied at inpainting time.
    #[serde(rename = "scale")]
    pub blend_scale: f32,
    /// Scale applied at generation time when it differs from `blend_scale`.
    #[serde(rename = "generationScale", default, skip_serializing)]
    pub generation_scale: Option<f32>,
}

impl AdapterConfig {
    pub fn new(model_path: impl Into<String>, blend_scale: f32) -> Self {
        Self {
            model_path: model_path.into(),
            blend_scale,
            generation_scale: None,
        }
    }

    pub fn with_generation_scale(mut self, scale: f32) -> Self {
        self.generation_scale = Some(scale);
        self
    }

    /// The same adapter as the generative model should see it.
    pub fn for_generation(&self) -> Self {
        Self::new(
            self.model_path.clone(),
            self.generation_scale.unwrap_or(self.blend_scale),
        )
    }

    pub fn has_path(&self) -> bool {
        !self.model_path.trim().is_empty()
    }
}

/// The two ways a pipeline run can be started.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineInput {
    /// Generate `image_count` images from a prompt and reference images, then
    /// standardize them before editing.
    Prompt {
        prompt: String,
        reference_image_urls: Vec<String>,
        image_count: u32,
        temperature: f32,
    },
    /// Edit one existing image directly.
    DirectImage { image_url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub input: PipelineInput,
    /// Character adapter first, optional style adapter second.
    pub adapters: Vec<AdapterConfig>,
    pub inpaint_strength: f32,
    pub seed: Option<u64>,
}

impl PipelineRequest {
    pub fn prompt(
        prompt: impl Into<String>,
        reference_image_urls: Vec<String>,
        character: AdapterConfig,
    ) -> Self {
        Self {
            input: PipelineInput::Prompt {
                prompt: prompt.into(),
                reference_image_urls,
                image_count: 1,
                temperature: 1.0,
            },
            adapters: vec![character],
            inpaint_strength: 0.85,
            seed: None,
        }
    }

    pub fn direct_image(image_url: impl Into<String>, character: AdapterConfig) -> Self {
        Self {
            input: PipelineInput::DirectImage {
                image_url: image_url.into(),
            },
            adapters: vec![character],
            inpaint_strength: 0.85,
            seed: None,
        }
    }

    /// Appends the style adapter; an empty path means "no style" and is ignored.
    pub fn with_style(mut self, style: AdapterConfig) -> Self {
        if style.has_path() {
            self.adapters.truncate(1);
            self.adapters.push(style);
        }
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.inpaint_strength = strength;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_image_count(mut self, count: u32) -> Self {
        if let PipelineInput::Prompt { image_count, .. } = &mut self.input {
            *image_count = count;
        }
        self
    }

    pub fn with_temperature(mut self, value: f32) -> Self {
        if let PipelineInput::Prompt { temperature, .. } = &mut self.input {
            *temperature = value;
        }
        self
    }

    pub fn generation_adapters(&self) -> Vec<AdapterConfig> {
        self.adapters.iter().map(AdapterConfig::for_generation).collect()
    }

    /// Rejects requests that must never reach a backend.
    pub fn validate(&self) -> Result<()> {
        let character = self.adapters.first().ok_or_else(|| {
            PipelineError::ValidationError("a character adapter is required".into())
        })?;
        if !character.has_path() {
            return Err(PipelineError::ValidationError(
                "character adapter model path must not be empty".into(),
            ));
        }
        if self.adapters.len() > 2 {
            return Err(PipelineError::ValidationError(format!(
                "at most 2 adapters are supported, got {}",
                self.adapters.len()
            )));
        }
        for adapter in &self.adapters {
            check_unit_range("adapter blend scale", adapter.blend_scale)?;
            if let Some(scale) = adapter.generation_scale {
                check_unit_range("adapter generation scale", scale)?;
            }
        }
        check_unit_range("inpaint strength", self.inpaint_strength)?;

        match &self.input {
            PipelineInput::Prompt {
                prompt,
                image_count,
                temperature,
                ..
            } => {
                if prompt.trim().is_empty() {
                    return Err(PipelineError::ValidationError(
                        "prompt must not be empty".into(),
                    ));
                }
                if *image_count == 0 {
                    return Err(PipelineError::ValidationError(
                        "image count must be at least 1".into(),
                    ));
                }
                if !(0.0..=2.0).contains(temperature) {
                    return Err(PipelineError::ValidationError(format!(
                        "temperature must be within [0, 2], got {}",
                        temperature
                    )));
                }
            }
            PipelineInput::DirectImage { image_url } => {
                if image_url.trim().is_empty() {
                    return Err(PipelineError::ValidationError(
                        "image url must not be empty".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_unit_range(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::ValidationError(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}
