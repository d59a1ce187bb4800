use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Everything the inpaint and paste-back stages need for one source image.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskBundle {
    pub upscaled_image_url: String,
    pub cropped_image_url: String,
    pub cropped_mask_url: String,
    pub full_frame_mask_url: String,
    /// Foreground/background mask derived from the cropped region.
    pub binary_mask_url: String,
    pub cropped_dimensions: Dimensions,
}

/// Wire shape of the face-mask service response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMaskResponse {
    pub upscaled_image_s3_url: String,
    pub cropped_image_s3_url: String,
    pub cropped_image_mask_s3_url: String,
    pub actual_mask_s3_url: String,
    pub cropped_image_mask_dims: RawDimensions,
}

/// Dimensions as the mask service reports them, before validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawDimensions {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryMaskResponse {
    pub image_url: String,
}
