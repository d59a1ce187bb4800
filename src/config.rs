use crate::error::{PipelineError, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_MASK_ENDPOINT: &str = "http://18.206.182.174/generate-mask/";
pub const DEFAULT_BINARY_MASK_ENDPOINT: &str = "http://52.206.97.181:8000/mask/from-url";
pub const DEFAULT_PASTE_BACK_ENDPOINT: &str = "http://18.206.182.174/paste-back/";
pub const DEFAULT_STANDARDIZE_ENDPOINT: &str = "http://35.175.150.131:6001/standardize";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_FAL_INPAINTING_ENDPOINT: &str = "https://fal.run/fal-ai/flux-lora/inpainting";
pub const DEFAULT_FAL_GENERATION_ENDPOINT: &str = "https://fal.run/fal-ai/flux-lora";

/// Which model produces images in prompt mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerativeProvider {
    /// Gemini image generation from a prompt and reference images.
    #[default]
    Gemini,
    /// fal flux-lora text-to-image with the request's adapters applied.
    FalFlux,
}

impl GenerativeProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(GenerativeProvider::Gemini),
            "fal" | "fal-flux" | "flux" => Some(GenerativeProvider::FalFlux),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerativeProvider::Gemini => "gemini",
            GenerativeProvider::FalFlux => "fal-flux",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct FalConfig {
    pub api_key: Option<String>,
    pub inpainting_endpoint: String,
    pub generation_endpoint: String,
    pub generator: GenerativeProvider,
}

#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Fixed per-deployment endpoints of the mask, standardization and
/// paste-back services.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub face_mask: String,
    pub binary_mask: String,
    pub paste_back: String,
    pub standardize: String,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub request_timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub fal: FalConfig,
    pub s3: S3Config,
    pub endpoints: ServiceEndpoints,
    pub retry: RetryConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_KEY").ok().filter(|k| !k.is_empty());
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        GeminiConfig {
            api_key,
            model,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for FalConfig {
    fn default() -> Self {
        FalConfig {
            api_key: None,
            inpainting_endpoint: DEFAULT_FAL_INPAINTING_ENDPOINT.to_string(),
            generation_endpoint: DEFAULT_FAL_GENERATION_ENDPOINT.to_string(),
            generator: GenerativeProvider::default(),
        }
    }
}

impl FalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let generator = match env::var("GENERATIVE_PROVIDER") {
            Ok(name) => GenerativeProvider::parse(&name).unwrap_or_else(|| {
                log::warn!("Unknown GENERATIVE_PROVIDER '{}', using gemini", name);
                GenerativeProvider::Gemini
            }),
            Err(_) => GenerativeProvider::Gemini,
        };

        FalConfig {
            api_key: env::var("FAL_KEY").ok().filter(|k| !k.is_empty()),
            generator,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.inpainting_endpoint = endpoint.into();
        self
    }

    pub fn with_generation_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.generation_endpoint = endpoint.into();
        self
    }

    /// Routes prompt-mode generation through fal flux-lora instead of Gemini.
    pub fn with_generator(mut self, generator: GenerativeProvider) -> Self {
        self.generator = generator;
        self
    }
}

impl S3Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        S3Config {
            bucket: env::var("S3_BUCKET_NAME").ok(),
            region: env::var("AWS_REGION").ok(),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn region_or_default(&self) -> String {
        self.region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string())
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        ServiceEndpoints {
            face_mask: DEFAULT_MASK_ENDPOINT.to_string(),
            binary_mask: DEFAULT_BINARY_MASK_ENDPOINT.to_string(),
            paste_back: DEFAULT_PASTE_BACK_ENDPOINT.to_string(),
            standardize: DEFAULT_STANDARDIZE_ENDPOINT.to_string(),
        }
    }
}

impl ServiceEndpoints {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        ServiceEndpoints {
            face_mask: env::var("MASK_ENDPOINT").unwrap_or(defaults.face_mask),
            binary_mask: env::var("BINARY_MASK_ENDPOINT").unwrap_or(defaults.binary_mask),
            paste_back: env::var("PASTE_BACK_ENDPOINT").unwrap_or(defaults.paste_back),
            standardize: env::var("STANDARDIZE_ENDPOINT").unwrap_or(defaults.standardize),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 2,
            backoff: Duration::from_secs(5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            request_timeout_secs: 800,
            gemini: GeminiConfig::default(),
            fal: FalConfig::default(),
            s3: S3Config::default(),
            endpoints: ServiceEndpoints::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());

        Config {
            host,
            port,
            gemini: GeminiConfig::from_env(),
            fal: FalConfig::from_env(),
            s3: S3Config::from_env(),
            endpoints: ServiceEndpoints::from_env(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_fal(mut self, config: FalConfig) -> Self {
        self.fal = config;
        self
    }

    pub fn with_s3(mut self, config: S3Config) -> Self {
        self.s3 = config;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ServiceEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.retry = RetryConfig {
            max_retries,
            backoff,
        };
        self
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(8080)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks that every credential the live backends need is present.
    pub fn validate(&self) -> Result<()> {
        if self.fal.generator == GenerativeProvider::Gemini && self.gemini.api_key.is_none() {
            return Err(PipelineError::ConfigError("GEMINI_KEY is required".into()));
        }
        if self.fal.api_key.is_none() {
            return Err(PipelineError::ConfigError("FAL_KEY is required".into()));
        }
        if self.s3.bucket.as_deref().map_or(true, str::is_empty) {
            return Err(PipelineError::ConfigError(
                "S3_BUCKET_NAME is required".into(),
            ));
        }
        Ok(())
    }
}
