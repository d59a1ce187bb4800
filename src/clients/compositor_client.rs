use crate::{backends::CompositorService, error::Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct CompositorClient {
    service: Arc<dyn CompositorService>,
}

impl CompositorClient {
    pub fn new(service: Arc<dyn CompositorService>) -> Self {
        Self { service }
    }

    pub async fn paste_back(
        &self,
        edited_image_url: &str,
        upscaled_image_url: &str,
        full_frame_mask_url: &str,
    ) -> Result<String> {
        log::info!("🔄 Pasting {} back into {}", edited_image_url, upscaled_image_url);
        let final_url = self
            .service
            .paste_back(edited_image_url, upscaled_image_url, full_frame_mask_url)
            .await?;
        log::info!("🖼️ Final image: {}", final_url);
        Ok(final_url)
    }
}
