//! Intrinsic size detection for SVG documents.
//!
//! The size comes from the root element's `width`/`height` attributes (see [`units`] for the
//! length syntax). Whichever of the two is missing or unusable is taken from the third/fourth
//! component of `viewBox`. Anything still unknown stays `0`, which [`scale`] handles by falling
//! back to a square canvas.

use std::collections::HashMap;

use resvg::usvg;
use thiserror::Error;

pub mod scale;
pub mod units;

pub use scale::{Bounds, TargetSize, resolve_target_size};
pub use units::parse_length;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Document-declared size in pixels. `0` means unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntrinsicSize {
    pub width: f64,
    pub height: f64,
}

/// Errors raised while reading a fetched document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("SVG document could not be parsed: {0}")]
    Malformed(String),
}

/// Anything that can look up root element attributes by name.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl AttributeSource for roxmltree::Node<'_, '_> {
    fn attribute(&self, name: &str) -> Option<&str> {
        roxmltree::Node::attribute(self, name)
    }
}

impl AttributeSource for HashMap<&str, &str> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).copied()
    }
}

/// Resolve the intrinsic size from the root element's attributes. Never fails.
pub fn resolve_intrinsic_size(root: &impl AttributeSource) -> IntrinsicSize {
    let mut width = root.attribute("width").map(parse_length).unwrap_or(0.0);
    let mut height = root.attribute("height").map(parse_length).unwrap_or(0.0);

    if let Some(view_box) = root.attribute("viewBox") {
        let components: Vec<&str> = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .collect();

        // a malformed viewBox is ignored entirely
        if let [_, _, box_width, box_height] = components[..] {
            if width <= 0.0 {
                width = parse_length(box_width);
            }
            if height <= 0.0 {
                height = parse_length(box_height);
            }
        }
    }

    IntrinsicSize { width, height }
}

/// Parse `document` as XML and resolve the intrinsic size of its root element.
///
/// Gzip-compressed documents (`.svgz`) are inflated first. DOCTYPE declarations are accepted the
/// same way the rasterizer accepts them; roxmltree still rejects recursive entities and caps
/// entity expansion.
pub fn intrinsic_size_of(document: &[u8]) -> Result<IntrinsicSize, DocumentError> {
    let inflated;
    let document = if document.starts_with(&GZIP_MAGIC) {
        inflated = usvg::decompress_svgz(document).map_err(|e| DocumentError::Malformed(e.to_string()))?;
        &inflated[..]
    } else {
        document
    };

    let text = std::str::from_utf8(document).map_err(|e| DocumentError::Malformed(e.to_string()))?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let parsed =
        roxmltree::Document::parse_with_options(text, options).map_err(|e| DocumentError::Malformed(e.to_string()))?;

    Ok(resolve_intrinsic_size(&parsed.root_element()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_explicit_size_wins_over_view_box() {
        let root = attrs(&[("width", "300"), ("height", "150"), ("viewBox", "0 0 600 300")]);
        assert_eq!(
            resolve_intrinsic_size(&root),
            IntrinsicSize {
                width: 300.0,
                height: 150.0
            }
        );
    }

    #[test]
    fn test_view_box_fallback() {
        let root = attrs(&[("viewBox", "0 0 200 100")]);
        assert_eq!(
            resolve_intrinsic_size(&root),
            IntrinsicSize {
                width: 200.0,
                height: 100.0
            }
        );
    }

    #[test]
    fn test_view_box_with_commas_and_extra_whitespace() {
        let root = attrs(&[("viewBox", "  0,0 , 24\t36  ")]);
        assert_eq!(
            resolve_intrinsic_size(&root),
            IntrinsicSize {
                width: 24.0,
                height: 36.0
            }
        );
    }

    #[test]
    fn test_view_box_fills_only_missing_axis() {
        let root = attrs(&[("width", "2in"), ("viewBox", "0 0 10 40")]);
        assert_eq!(
            resolve_intrinsic_size(&root),
            IntrinsicSize {
                width: 192.0,
                height: 40.0
            }
        );

        let root = attrs(&[("width", "50%"), ("height", "80"), ("viewBox", "0 0 10 40")]);
        assert_eq!(
            resolve_intrinsic_size(&root),
            IntrinsicSize {
                width: 10.0,
                height: 80.0
            }
        );
    }

    #[test]
    fn test_short_view_box_is_ignored() {
        let root = attrs(&[("viewBox", "0 0 200")]);
        assert_eq!(resolve_intrinsic_size(&root), IntrinsicSize::default());

        let root = attrs(&[("height", "10"), ("viewBox", "0 0 200 100 5")]);
        assert_eq!(
            resolve_intrinsic_size(&root),
            IntrinsicSize {
                width: 0.0,
                height: 10.0
            }
        );
    }

    #[test]
    fn test_no_size_information() {
        assert_eq!(resolve_intrinsic_size(&attrs(&[])), IntrinsicSize::default());
    }

    #[test]
    fn test_intrinsic_size_of_document() {
        let svg = br#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="10pt" viewBox="0 0 40 30">
  <rect width="40" height="30" fill="red"/>
</svg>"#;
        let size = intrinsic_size_of(svg).unwrap();
        assert!((size.width - 40.0 / 3.0).abs() < 1e-9);
        assert_eq!(size.height, 30.0);
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(matches!(intrinsic_size_of(b"<svg"), Err(DocumentError::Malformed(_))));
        assert!(matches!(intrinsic_size_of(b"\xff\xfe<svg/>"), Err(DocumentError::Malformed(_))));
        assert!(matches!(intrinsic_size_of(b"not xml at all"), Err(DocumentError::Malformed(_))));
    }

    #[test]
    fn test_doctype_declaration_is_accepted() {
        let svg = br#"<?xml version="1.0" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"/>"#;
        assert_eq!(
            intrinsic_size_of(svg).unwrap(),
            IntrinsicSize {
                width: 100.0,
                height: 50.0
            }
        );

        let svg = br#"<!DOCTYPE svg [<!ENTITY label "ok">]>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 32"><text>&label;</text></svg>"#;
        assert_eq!(
            intrinsic_size_of(svg).unwrap(),
            IntrinsicSize {
                width: 64.0,
                height: 32.0
            }
        );
    }

    #[test]
    fn test_recursive_entities_are_rejected() {
        let svg = br#"<!DOCTYPE svg [<!ENTITY a "&b;"><!ENTITY b "&a;">]>
<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">&a;</svg>"#;
        assert!(matches!(intrinsic_size_of(svg), Err(DocumentError::Malformed(_))));
    }

    // gzip of `<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>`
    const SVGZ: &[u8] = &[
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x03, 0xb3, 0x29, 0x2e, 0x4b, 0x57, 0xa8, 0xc8, 0xcd,
        0xc9, 0x2b, 0xb6, 0x55, 0xca, 0x28, 0x29, 0x29, 0xb0, 0xd2, 0xd7, 0x2f, 0x2f, 0x2f, 0xd7, 0x2b, 0x37, 0xd6,
        0xcb, 0x2f, 0x4a, 0xd7, 0x37, 0x32, 0x30, 0x30, 0xd0, 0x07, 0xaa, 0x50, 0x52, 0x28, 0xcf, 0x4c, 0x29, 0xc9,
        0xb0, 0x55, 0x32, 0x34, 0x50, 0x52, 0xc8, 0x48, 0xcd, 0x4c, 0xcf, 0x28, 0x01, 0xb3, 0xf5, 0xed, 0x00, 0xb8,
        0xf1, 0x6a, 0x2e, 0x40, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_gzipped_document_is_inflated() {
        assert_eq!(
            intrinsic_size_of(SVGZ).unwrap(),
            IntrinsicSize {
                width: 10.0,
                height: 10.0
            }
        );
    }

    #[test]
    fn test_truncated_gzip_is_malformed() {
        assert!(matches!(intrinsic_size_of(&SVGZ[..20]), Err(DocumentError::Malformed(_))));
    }
}
