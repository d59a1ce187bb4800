//! HTTP surface: `POST /api/inference` and `GET /health`.

use crate::{
    error::PipelineError,
    models::{AdapterConfig, ErrorResponse, PipelineRequest},
    pipeline::PipelineCoordinator,
};
use actix_web::{
    error::{InternalError, JsonPayloadError},
    get, post, web, HttpRequest, HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};

const DEFAULT_INPAINT_STRENGTH: f32 = 0.85;

/// Wire shape of an inference request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceBody {
    pub prompt: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub reference_image_urls: Vec<String>,
    pub character_lora: AdapterConfig,
    pub style_lora: Option<AdapterConfig>,
    pub inpaint_strength: Option<f32>,
    pub image_count: Option<u32>,
    pub temperature: Option<f32>,
    pub seed: Option<u64>,
}

impl InferenceBody {
    pub fn into_request(self) -> Result<PipelineRequest, PipelineError> {
        let prompt = self.prompt.filter(|p| !p.trim().is_empty());
        let image_url = self.image_url.filter(|u| !u.trim().is_empty());

        let mut request = match (prompt, image_url) {
            (Some(prompt), None) => {
                let mut request =
                    PipelineRequest::prompt(prompt, self.reference_image_urls, self.character_lora);
                if let Some(count) = self.image_count {
                    request = request.with_image_count(count);
                }
                if let Some(temperature) = self.temperature {
                    request = request.with_temperature(temperature);
                }
                request
            }
            (None, Some(image_url)) => PipelineRequest::direct_image(image_url, self.character_lora),
            (Some(_), Some(_)) => {
                return Err(PipelineError::ValidationError(
                    "Provide either prompt or imageUrl, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(PipelineError::ValidationError(
                    "Either prompt or imageUrl is required".to_string(),
                ))
            }
        };

        if let Some(style) = self.style_lora {
            request = request.with_style(style);
        }
        request = request.with_strength(self.inpaint_strength.unwrap_or(DEFAULT_INPAINT_STRENGTH));
        if let Some(seed) = self.seed {
            request = request.with_seed(seed);
        }
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn failure_details(err: &PipelineError) -> Option<String> {
    match err {
        PipelineError::NoImagesGenerated(_) => {
            Some("generation stage produced no usable images".to_string())
        }
        PipelineError::NoImagesProcessed => {
            Some("every image failed during mask, inpaint or paste-back".to_string())
        }
        PipelineError::BackendError {
            service, category, ..
        } => Some(format!("{} backend failed ({})", service, category)),
        PipelineError::ConfigError(_) => Some("service is misconfigured".to_string()),
        _ => None,
    }
}

fn error_response(err: PipelineError) -> HttpResponse {
    match err {
        PipelineError::ValidationError(message) => {
            log::warn!("🚫 Rejected inference request: {}", message);
            HttpResponse::BadRequest().json(ErrorResponse::new(message, None))
        }
        other => {
            log::error!("❌ Inference failed: {}", other);
            let details = failure_details(&other);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::new(other.to_string(), details))
        }
    }
}

/// Answers undecodable bodies with the same JSON shape as other rejections.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = err.to_string();
    log::warn!("🚫 Undecodable inference request: {}", message);
    let response = HttpResponse::BadRequest()
        .json(ErrorResponse::new("Invalid request body", Some(message)));
    InternalError::from_response(err, response).into()
}

#[post("/api/inference")]
async fn inference(
    coordinator: web::Data<PipelineCoordinator>,
    body: web::Json<InferenceBody>,
) -> impl Responder {
    let request = match body.into_inner().into_request() {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    match coordinator.run(request).await {
        Ok(mut report) => HttpResponse::Ok().json(report.respond()),
        Err(e) => error_response(e),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Registers the routes; the caller provides `web::Data<PipelineCoordinator>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(inference)
        .service(health);
}
