//! Poster artifact preparation: fetch the referenced image, validate it,
//! bound its size and re-encode for the channel post.

use crate::errors::BotError;
use std::io::Cursor;

const MIN_IMAGE_BYTES: usize = 512; // catch tiny placeholders
const MIN_DIMENSION: u32 = 32; // reject tracking pixels and tiny favicons
const MAX_DIMENSION: u32 = 1280;
const JPEG_QUALITY: u8 = 85;

/// Substituted poster source for the generic-link flow when neither catalog
/// yields an image.
pub const PLACEHOLDER_POSTER_URL: &str =
    "https://dummyimage.com/1920x1080/000/fff&text=No+Image";

/// Produce the rendered poster artifact for a poster reference.
/// Any failure is an error; the caller decides whether its flow aborts.
pub fn render(http: &reqwest::blocking::Client, poster_url: &str) -> Result<Vec<u8>, BotError> {
    let bytes = fetch_bytes(http, poster_url)?;

    if !validate_image(&bytes) {
        return Err(BotError::Render(format!(
            "bytes from {poster_url} are not a usable image"
        )));
    }

    reencode(&bytes)
}

fn fetch_bytes(http: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, BotError> {
    let response = http.get(url).send()?;

    if !response.status().is_success() {
        return Err(BotError::Render(format!(
            "poster request for {url} returned {}",
            response.status()
        )));
    }

    Ok(response.bytes()?.to_vec())
}

/// Returns true if the bytes represent a valid, usable image:
/// non-trivial size, known magic bytes, not HTML, decodes, and meets the
/// minimum resolution.
pub fn validate_image(bytes: &[u8]) -> bool {
    if bytes.len() < MIN_IMAGE_BYTES {
        return false;
    }

    if !has_valid_magic_bytes(bytes) {
        return false;
    }

    if is_html_content(bytes) {
        return false;
    }

    match image::load_from_memory(bytes) {
        Ok(img) => img.width() > MIN_DIMENSION && img.height() > MIN_DIMENSION,
        Err(_) => false,
    }
}

fn has_valid_magic_bytes(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }

    // PNG: \x89PNG
    if bytes[0..4] == [0x89, 0x50, 0x4E, 0x47] {
        return true;
    }

    // JPEG: \xFF\xD8\xFF
    if bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return true;
    }

    // GIF: GIF8
    if bytes[0..4] == *b"GIF8" {
        return true;
    }

    // WebP: RIFF....WEBP
    if bytes.len() >= 12 && bytes[0..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        return true;
    }

    // BMP: BM
    if bytes[0..2] == *b"BM" {
        return true;
    }

    false
}

fn is_html_content(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head).to_lowercase();
    head.contains("<html") || head.contains("<!doctype")
}

/// Bound the long edge and re-encode as JPEG.
fn reencode(bytes: &[u8]) -> Result<Vec<u8>, BotError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| BotError::Render(format!("failed to decode poster: {e}")))?;

    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.resize(
            MAX_DIMENSION,
            MAX_DIMENSION,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BotError::Render(format!("failed to encode poster: {e}")))?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        // gradient fill keeps the encoded size above the placeholder cutoff
        let buf = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let img = image::DynamicImage::ImageRgb8(buf);
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(!validate_image(b""));
        assert!(!validate_image(b"tiny"));
        assert!(!validate_image(&vec![0u8; 4096]));
    }

    #[test]
    fn test_validate_rejects_html() {
        let mut fake = b"\x89PNG<!doctype html><html>".to_vec();
        fake.resize(MIN_IMAGE_BYTES + 1, b' ');
        assert!(!validate_image(&fake));
    }

    #[test]
    fn test_validate_rejects_tiny_dimensions() {
        assert!(!validate_image(&png_bytes(8, 8)));
    }

    #[test]
    fn test_validate_accepts_real_image() {
        assert!(validate_image(&png_bytes(200, 300)));
    }

    #[test]
    fn test_reencode_bounds_dimensions() {
        let out = reencode(&png_bytes(4000, 2000)).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert!(img.width() <= MAX_DIMENSION && img.height() <= MAX_DIMENSION);
        // JPEG magic
        assert_eq!(&out[0..3], &[0xFF, 0xD8, 0xFF]);
    }
}
