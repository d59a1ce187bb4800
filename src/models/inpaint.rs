use super::mask::Dimensions;
use super::request::AdapterConfig;
use serde::{Deserialize, Deserializer, Serialize};

pub const INPAINT_PROMPT: &str = "UNST, a person standing against a background";

#[derive(Debug, Clone, Serialize)]
pub struct InpaintRequest {
    pub prompt: String,
    pub image_url: String,
    pub mask_url: String,
    pub loras: Vec<AdapterConfig>,
    pub strength: f32,
    pub image_size: Dimensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// fal sometimes sends `null` where a list is expected.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InpaintResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<InpaintImage>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub has_nsfw_concepts: Vec<bool>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InpaintImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Where the image handed to paste-back came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InpaintSource {
    Model,
    NsfwFallback,
    MissingOutputFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InpaintOutcome {
    pub edited_image_url: String,
    pub nsfw_flagged: bool,
    pub source: InpaintSource,
}
