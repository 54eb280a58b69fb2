//! Loading image files for placement on the canvas.

use std::io::Cursor;
use std::path::Path;

use certforge_common::error::{CertforgeError, CertforgeResult};
use certforge_template_model::{ImageAsset, ImageFormat};
use resvg::usvg;

/// Read an image file into an embeddable asset.
///
/// SVG files are embedded as-is. Raster files are normalised to PNG so the
/// embedded data always matches its declared format.
pub fn load_image_asset(path: impl AsRef<Path>) -> CertforgeResult<ImageAsset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CertforgeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);

    if is_svg(path, &bytes) {
        image_asset_from_svg(&bytes, file_name)
    } else {
        image_asset_from_raster(&bytes, file_name)
    }
}

/// Build an asset from SVG bytes, sized by the document's intrinsic size.
pub fn image_asset_from_svg(bytes: &[u8], file_name: Option<String>) -> CertforgeResult<ImageAsset> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| CertforgeError::template(format!("Invalid SVG image: {e}")))?;
    let size = tree.size();
    Ok(ImageAsset::from_bytes(
        bytes,
        file_name,
        ImageFormat::Svg,
        f64::from(size.width()),
        f64::from(size.height()),
    ))
}

/// Build an asset from PNG or JPEG bytes.
pub fn image_asset_from_raster(
    bytes: &[u8],
    file_name: Option<String>,
) -> CertforgeResult<ImageAsset> {
    let format = image::guess_format(bytes)
        .map_err(|e| CertforgeError::template(format!("Unrecognised image: {e}")))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CertforgeError::template(format!("Failed to decode image: {e}")))?;
    let (width, height) = (decoded.width(), decoded.height());

    let png = if format == image::ImageFormat::Png {
        bytes.to_vec()
    } else {
        let mut png = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| CertforgeError::encode(format!("Failed to convert image: {e}")))?;
        png
    };

    Ok(ImageAsset::from_bytes(
        &png,
        file_name,
        ImageFormat::Png,
        f64::from(width),
        f64::from(height),
    ))
}

fn is_svg(path: &Path, bytes: &[u8]) -> bool {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    by_extension || String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).contains("<svg")
}
