//! Artifact encoders.

use certforge_common::config::PageSize;
use certforge_common::error::{CertforgeError, CertforgeResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use serde::{Deserialize, Serialize};

use crate::surface::RasterCapture;

/// Output format of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Fixed-size page with the capture embedded.
    Pdf,
    /// The raw capture.
    Png,
    /// Substituted vector markup.
    Svg,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Png => "png",
            ArtifactKind::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "application/pdf",
            ArtifactKind::Png => "image/png",
            ArtifactKind::Svg => "image/svg+xml",
        }
    }

    /// Whether producing this kind needs a raster capture.
    pub fn needs_capture(self) -> bool {
        !matches!(self, ArtifactKind::Svg)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(ArtifactKind::Pdf),
            "png" => Some(ArtifactKind::Png),
            "svg" => Some(ArtifactKind::Svg),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Placement of an image on a page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `width`x`height` to fit inside `page`, centred, aspect preserved.
pub fn fit_to_page(width: u32, height: u32, page: PageSize) -> Placement {
    let page_w = page.width_pt as f32;
    let page_h = page.height_pt as f32;
    if width == 0 || height == 0 {
        return Placement {
            x: 0.0,
            y: 0.0,
            width: page_w,
            height: page_h,
        };
    }
    let scale = (page_w / width as f32).min(page_h / height as f32);
    let draw_w = width as f32 * scale;
    let draw_h = height as f32 * scale;
    Placement {
        x: (page_w - draw_w) / 2.0,
        y: (page_h - draw_h) / 2.0,
        width: draw_w,
        height: draw_h,
    }
}

/// Embed a capture in a single-page PDF of the given size.
pub fn encode_pdf(capture: &RasterCapture, page: PageSize) -> CertforgeResult<Vec<u8>> {
    let rgb = image::load_from_memory_with_format(&capture.png, image::ImageFormat::Png)
        .map_err(|e| CertforgeError::encode(format!("Failed to decode capture: {e}")))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let placement = fit_to_page(width, height, page);

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content
        .encode()
        .map_err(|e| CertforgeError::encode(format!("Failed to encode page content: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (page.width_pt as i64).into(),
            (page.height_pt as i64).into(),
        ],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| CertforgeError::encode(format!("Failed to write PDF: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(width: u32, height: u32) -> RasterCapture {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        RasterCapture { width, height, png }
    }

    #[test]
    fn test_extension_and_parse() {
        assert_eq!(ArtifactKind::Pdf.extension(), "pdf");
        assert_eq!(ArtifactKind::parse(" PNG "), Some(ArtifactKind::Png));
        assert_eq!(ArtifactKind::parse("gif"), None);
        assert!(!ArtifactKind::Svg.needs_capture());
    }

    #[test]
    fn test_fit_to_page_centres() {
        // 1600x1000 on 842x595 is width-limited.
        let placement = fit_to_page(1600, 1000, PageSize::A4_LANDSCAPE);
        assert!((placement.width - 842.0).abs() < 1e-3);
        assert!((placement.height - 526.25).abs() < 1e-2);
        assert!(placement.x.abs() < 1e-3);
        assert!((placement.y * 2.0 + placement.height - 595.0).abs() < 1e-2);

        // A tall capture is height-limited.
        let placement = fit_to_page(500, 1000, PageSize::A4_LANDSCAPE);
        assert!((placement.height - 595.0).abs() < 1e-3);
        assert!((placement.x * 2.0 + placement.width - 842.0).abs() < 1e-2);

        // A landscape capture on a portrait page is width-limited at 595pt.
        let placement = fit_to_page(1600, 1000, PageSize::A4_PORTRAIT);
        assert!((placement.width - 595.0).abs() < 1e-3);
        assert!((placement.y * 2.0 + placement.height - 842.0).abs() < 1e-2);
    }

    #[test]
    fn test_encode_pdf_produces_single_page() {
        let bytes = encode_pdf(&capture(16, 10), PageSize::A4_LANDSCAPE).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_encode_pdf_rejects_garbage() {
        let bad = RasterCapture {
            width: 1,
            height: 1,
            png: b"not a png".to_vec(),
        };
        assert!(matches!(
            encode_pdf(&bad, PageSize::A4_LANDSCAPE),
            Err(CertforgeError::Encode { .. })
        ));
    }
}
