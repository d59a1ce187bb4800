use crate::{
    backends::MaskService,
    error::{BackendErrorCategory, PipelineError, Result},
    models::{Dimensions, MaskBundle, RawDimensions},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct MaskPipelineClient {
    service: Arc<dyn MaskService>,
}

fn require_url(field: &str, url: String) -> Result<String> {
    if url.trim().is_empty() {
        Err(PipelineError::backend(
            "face mask",
            BackendErrorCategory::Malformed,
            format!("{} is empty", field),
        ))
    } else {
        Ok(url)
    }
}

fn checked_dimensions(raw: RawDimensions) -> Result<Dimensions> {
    match (u32::try_from(raw.width), u32::try_from(raw.height)) {
        (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok(Dimensions { width, height }),
        _ => Err(PipelineError::backend(
            "face mask",
            BackendErrorCategory::Malformed,
            format!("invalid crop dimensions {}x{}", raw.width, raw.height),
        )),
    }
}

impl MaskPipelineClient {
    pub fn new(service: Arc<dyn MaskService>) -> Self {
        Self { service }
    }

    /// Face mask first, then the binary mask of the cropped face. Either
    /// failure aborts this image only.
    pub async fn build_mask(&self, image_url: &str) -> Result<MaskBundle> {
        log::info!("🎭 Generating face mask for {}", image_url);
        let face = self.service.generate_face_mask(image_url).await?;

        let cropped_dimensions = checked_dimensions(face.cropped_image_mask_dims)?;
        let cropped_image_url = require_url("cropped_image_s3_url", face.cropped_image_s3_url)?;
        let upscaled_image_url =
            require_url("upscaled_image_s3_url", face.upscaled_image_s3_url)?;
        let full_frame_mask_url = require_url("actual_mask_s3_url", face.actual_mask_s3_url)?;

        log::info!("🔳 Deriving binary mask from {}", cropped_image_url);
        let binary = self.service.derive_binary_mask(&cropped_image_url).await?;
        let binary_mask_url = require_url("image_url", binary.image_url)?;

        Ok(MaskBundle {
            upscaled_image_url,
            cropped_image_url,
            cropped_mask_url: face.cropped_image_mask_s3_url,
            full_frame_mask_url,
            binary_mask_url,
            cropped_dimensions,
        })
    }
}
