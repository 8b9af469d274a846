//! OpenAPI document for the HTTP surface, served at `/api-docs/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api::{self, models};
use crate::auth::API_KEY_HEADER;

struct ApiKeySecurityAddon;

impl Modify for ApiKeySecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "ApiKeyAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    API_KEY_HEADER,
                    "Shared secret configured as `api_key`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::render::render_svg,
        api::handlers::health::healthz,
    ),
    components(schemas(
        models::render::RenderRequest,
        models::render::RenderResponse,
        models::health::HealthResponse,
        crate::dimensions::TargetSize,
        crate::errors::ErrorResponse,
    )),
    modifiers(&ApiKeySecurityAddon),
    tags(
        (name = "render", description = "SVG to PNG rendering"),
        (name = "health", description = "Liveness"),
    ),
    info(
        title = "svgrender",
        description = "Renders remote SVG documents to PNG and returns time-limited links to the result.",
    )
)]
pub struct ApiDoc;
