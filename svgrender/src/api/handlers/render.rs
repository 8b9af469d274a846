use axum::{Json, body::Bytes, extract::State};
use url::Url;

use crate::{
    AppState,
    api::models::render::{RenderRequest, RenderResponse},
    auth::ApiKeyAuth,
    errors::{Error, ErrorResponse, Result},
};

const INVALID_URL: &str = "svg_url must be a valid HTTP(S) URL.";

/// Extract an absolute http(s) URL with a host from a raw request body.
///
/// Any body that is not a JSON object with such a string under `svg_url` is rejected with the same
/// message.
fn parse_svg_url(body: &[u8]) -> Result<Url> {
    let invalid = || Error::BadRequest {
        message: INVALID_URL.to_string(),
    };

    let request: RenderRequest = serde_json::from_slice(body).map_err(|_| invalid())?;
    let raw = request.svg_url.as_str().ok_or_else(invalid)?;
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|host| !host.is_empty()) => Ok(url),
        _ => Err(invalid()),
    }
}

#[utoipa::path(
    post,
    path = "/render",
    tag = "render",
    summary = "Render an SVG",
    description = "Download the SVG at `svg_url`, rasterize it to PNG at a size within the configured bounds, \
upload it and return a time-limited link. Stale renders are pruned as a side effect.",
    request_body = RenderRequest,
    responses(
        (status = 200, description = "Rendered and uploaded", body = RenderResponse),
        (status = 400, description = "Invalid URL, or the document could not be downloaded or parsed", body = ErrorResponse),
        (status = 401, description = "Missing or incorrect API key", body = ErrorResponse),
        (status = 500, description = "Rasterization or storage failure", body = ErrorResponse),
    ),
    security(("ApiKeyAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn render_svg(State(state): State<AppState>, _auth: ApiKeyAuth, body: Bytes) -> Result<Json<RenderResponse>> {
    let url = parse_svg_url(&body)?;
    let outcome = state.renderer.render(&url).await?;
    Ok(Json(outcome.into()))
}
