//! First-page extraction using lopdf and pdf-extract.
//!
//! Scanned documents carry the page as one (or a few) image XObjects. The
//! largest image on the first page is taken as the page raster and scaled so
//! that its width matches the page's MediaBox at the configured resolution;
//! header regions are defined in pixels at that resolution.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{RasterizedPage, Rasterizer, Result};
use crate::error::PdfError;

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer for scanned PDFs.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    dpi: u32,
}

impl PdfRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Rasterize a document held in memory.
    pub fn rasterize_bytes(&self, data: &[u8]) -> Result<RasterizedPage> {
        let (doc, raw) = load(data)?;

        let pages = doc.get_pages();
        let (_, &page_id) = pages.iter().next().ok_or(PdfError::NoPages)?;

        let image = largest_page_image(&doc, page_id).map(|img| {
            match page_width_points(&doc, page_id) {
                Some(width_pt) => self.normalize(img, width_pt),
                None => img,
            }
        });

        let embedded_text = match extract_text(&raw) {
            Ok(text) => Some(text).filter(|t| !t.trim().is_empty()),
            Err(e) => {
                debug!("No text layer: {}", e);
                None
            }
        };

        if image.is_none() && embedded_text.is_none() {
            return Err(PdfError::Unreadable(
                "no page image and no text layer".to_string(),
            ));
        }

        debug!(
            "First page: image={:?}, text={} chars",
            image.as_ref().map(|i| (i.width(), i.height())),
            embedded_text.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        Ok(RasterizedPage {
            image,
            embedded_text,
        })
    }

    /// Scale the page image to the configured resolution.
    fn normalize(&self, img: DynamicImage, width_pt: f32) -> DynamicImage {
        if width_pt <= 0.0 {
            return img;
        }
        let target_width = (width_pt / POINTS_PER_INCH * self.dpi as f32).round() as u32;
        if target_width == 0 || target_width == img.width() {
            return img;
        }
        let scale = target_width as f32 / img.width() as f32;
        let target_height = ((img.height() as f32 * scale).round() as u32).max(1);
        trace!(
            "Scaling page {}x{} -> {}x{}",
            img.width(),
            img.height(),
            target_width,
            target_height
        );
        img.resize_exact(target_width, target_height, FilterType::Triangle)
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Rasterizer for PdfRasterizer {
    fn rasterize(&self, path: &Path) -> Result<RasterizedPage> {
        let data = std::fs::read(path)?;
        self.rasterize_bytes(&data)
    }
}

/// Parse the document, decrypting empty-password PDFs.
///
/// Returns the document and the bytes pdf-extract should read.
fn load(data: &[u8]) -> Result<(Document, Vec<u8>)> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
        return Ok((doc, decrypted));
    }

    Ok((doc, data.to_vec()))
}

/// Text layer of the document.
///
/// pdf-extract panics on some malformed fonts; that is treated like any
/// other extraction failure.
fn extract_text(raw: &[u8]) -> Result<String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(raw)));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(PdfError::TextExtraction(e.to_string())),
        Err(_) => Err(PdfError::TextExtraction("extractor panicked".to_string())),
    }
}

/// The largest decodable image placed on a page.
fn largest_page_image(doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
    let resources = inherited_attribute(doc, page_id, b"Resources")?;
    let Object::Dictionary(resources) = resources else {
        return None;
    };
    let xobjects = resources.get(b"XObject").ok()?;
    let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
        return None;
    };

    xobjects
        .iter()
        .filter_map(|(_, obj)| doc.dereference(obj).ok())
        .filter_map(|(_, obj)| decode_image(doc, obj))
        .max_by_key(|img| img.width() as u64 * img.height() as u64)
}

/// Width of the page's MediaBox in points.
fn page_width_points(doc: &Document, page_id: ObjectId) -> Option<f32> {
    let Object::Array(media_box) = inherited_attribute(doc, page_id, b"MediaBox")? else {
        return None;
    };
    let values: Vec<f32> = media_box
        .iter()
        .filter_map(|o| doc.dereference(o).ok().and_then(|(_, o)| number(o)))
        .collect();
    match values.as_slice() {
        [x0, _, x1, _] => Some((x1 - x0).abs()),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Look up a page attribute, following the `Parent` chain for inheritable
/// entries.
fn inherited_attribute(doc: &Document, node_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(node_id);
    // Guard against cyclic page trees.
    for _ in 0..32 {
        let id = current?;
        let Ok(Object::Dictionary(dict)) = doc.get_object(id) else {
            return None;
        };
        if let Ok(value) = dict.get(key) {
            return doc.dereference(value).ok().map(|(_, o)| o.clone());
        }
        current = parent_of(dict);
    }
    None
}

fn parent_of(dict: &Dictionary) -> Option<ObjectId> {
    match dict.get(b"Parent") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    }
}

/// Decode an image XObject (JPEG or raw 8-bit gray/RGB/CMYK).
fn decode_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("Image XObject {}x{}", width, height);

    let filter = dict.get(b"Filter").ok().and_then(|f| match f {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
        _ => None,
    });

    match filter {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Unsupported image filter {:?}", filter.map(String::from_utf8_lossy));
            return None;
        }
        _ => {}
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.clone()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
            Object::Reference(r) => doc
                .get_object(*r)
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(<[u8]>::to_vec),
            _ => None,
        })
        .unwrap_or_else(|| b"DeviceRGB".to_vec());

    raw_image(&data, width, height, &color_space)
}

fn raw_image(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;
    match color_space {
        b"DeviceGray" | b"G" | b"CalGray" => {
            let buf = data.get(..pixels)?.to_vec();
            GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" | b"RGB" | b"CalRGB" => {
            let buf = data.get(..pixels * 3)?.to_vec();
            RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8)
        }
        b"DeviceCMYK" | b"CMYK" => {
            let cmyk = data.get(..pixels * 4)?;
            let rgb: Vec<u8> = cmyk
                .chunks_exact(4)
                .flat_map(|p| {
                    let k = 255 - p[3] as u16;
                    [p[0], p[1], p[2]].map(|c| ((255 - c as u16) * k / 255) as u8)
                })
                .collect();
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        other => {
            trace!("Unsupported color space {}", String::from_utf8_lossy(other));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// One-page PDF whose page is a gray image of the given size, placed on a
    /// MediaBox `media_width` points wide.
    fn scanned_pdf(img_width: u32, img_height: u32, media_width: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let pixels: Vec<u8> = (0..img_width * img_height).map(|i| (i % 251) as u8).collect();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => img_width as i64,
                "Height" => img_height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        ));
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"q 72 0 0 72 0 0 cm /Im1 Do Q".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), media_width.into(), 72.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_scanned_page_is_normalised_to_dpi() {
        // One inch wide page at 100 dpi -> 100 px.
        let pdf = scanned_pdf(50, 60, 72);
        let page = PdfRasterizer::new(100).rasterize_bytes(&pdf).unwrap();
        let image = page.image.unwrap();
        assert_eq!((image.width(), image.height()), (100, 120));
    }

    #[test]
    fn test_matching_resolution_is_untouched() {
        let pdf = scanned_pdf(200, 100, 72);
        let page = PdfRasterizer::new(200).rasterize_bytes(&pdf).unwrap();
        assert_eq!(page.image.unwrap().width(), 200);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let result = PdfRasterizer::default().rasterize_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_rasterize_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, scanned_pdf(30, 30, 72)).unwrap();
        let page = PdfRasterizer::new(30).rasterize(&path).unwrap();
        assert!(page.image.is_some());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = PdfRasterizer::default().rasterize(Path::new("/nonexistent/scan.pdf"));
        assert!(matches!(result, Err(PdfError::Io(_))));
    }

    #[test]
    fn test_text_extraction_failure_is_reported() {
        let result = extract_text(b"%PDF-1.5 truncated");
        assert!(matches!(result, Err(PdfError::TextExtraction(_))));
    }

    #[test]
    fn test_cmyk_conversion() {
        let img = raw_image(&[0, 0, 0, 0, 0, 0, 0, 255], 2, 1, b"DeviceCMYK").unwrap();
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
