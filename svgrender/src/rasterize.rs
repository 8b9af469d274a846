//! SVG rasterization.
//!
//! The [`Rasterizer`] trait is the seam between the render pipeline and the engine that turns
//! document bytes into PNG bytes. [`ResvgRasterizer`] is the production implementation.

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, ImageHrefResolver};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("Failed to parse SVG: {0}")]
    Parse(String),

    #[error("Cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// Renders a document at an exact pixel size. Implementations are CPU-bound and synchronous;
/// callers run them on the blocking pool.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, document: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RasterizeError>;
}

pub struct ResvgRasterizer {
    options: usvg::Options<'static>,
}

impl ResvgRasterizer {
    /// Build a rasterizer with the system fonts loaded. Font discovery is slow, so do this once.
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        // documents come from arbitrary URLs: only inline `data:` images are allowed, never
        // local files or further network fetches
        options.image_href_resolver = ImageHrefResolver {
            resolve_data: ImageHrefResolver::default_data_resolver(),
            resolve_string: Box::new(|_, _| None),
        };
        Self { options }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, document: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RasterizeError> {
        let tree = usvg::Tree::from_data(document, &self.options).map_err(|e| RasterizeError::Parse(e.to_string()))?;

        let mut pixmap = Pixmap::new(width, height).ok_or(RasterizeError::Canvas { width, height })?;

        // stretch the document's own size onto the target canvas; the target already has the
        // document's aspect ratio unless the size was unknown
        let size = tree.size();
        let transform = Transform::from_scale(width as f32 / size.width(), height as f32 / size.height());
        debug!(width, height, "Rendering SVG to pixmap");
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap.encode_png().map_err(|e| RasterizeError::Encode(e.to_string()))
    }
}
