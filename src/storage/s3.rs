use crate::{
    config::S3Config,
    error::{PipelineError, Result},
    storage::traits::ArtifactStore,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    types::ObjectCannedAcl,
    Client,
};

#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3ArtifactStore {
    pub async fn new(config: S3Config) -> Result<Self> {
        let bucket = config
            .bucket
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| PipelineError::ConfigError("S3 bucket name is required".into()))?;
        let region = config.region_or_default();

        let loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()));
        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&config.access_key, &config.secret_key)
        {
            loader
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "lorapaint-artifacts",
                ))
                .load()
                .await
        } else {
            loader.load().await
        };

        Ok(Self {
            client: Client::new(&aws_config),
            bucket,
            region,
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| {
                log::error!("S3 upload of {} failed: {:?}", key, e);
                PipelineError::StorageError(format!("Failed to upload {} to S3: {}", key, e))
            })?;

        log::debug!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, key);
        Ok(self.public_url(key))
    }
}
