//! Image sniffing and transcoding.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};

use fragments_core::MediaType;

use crate::error::ConvertError;

/// Brands that mark an ISO-BMFF file as AVIF.
const AVIF_BRANDS: [&[u8; 4]; 2] = [b"avif", b"avis"];

/// Generic HEIF image/sequence brands. Files carrying these as the major
/// brand are AVIF when an AVIF brand appears among the compatible brands.
const HEIF_BRANDS: [&[u8; 4]; 2] = [b"mif1", b"msf1"];

/// Result of sniffing an ISO-BMFF `ftyp` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Avif,
    /// HEIF without an AVIF brand (e.g. HEIC).
    Heif,
}

fn sniff_ftyp(data: &[u8]) -> Option<Container> {
    if data.len() < 16 || &data[4..8] != b"ftyp" {
        return None;
    }
    let declared = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let end = declared.clamp(16, data.len());
    let major = &data[8..12];
    // Bytes 12..16 hold the minor version.
    let mut compatible = data[16..end].chunks_exact(4);

    if AVIF_BRANDS.iter().any(|b| major == b.as_slice()) {
        return Some(Container::Avif);
    }
    if HEIF_BRANDS.iter().any(|b| major == b.as_slice())
        && compatible.any(|c| AVIF_BRANDS.iter().any(|b| c == b.as_slice()))
    {
        return Some(Container::Avif);
    }
    Some(Container::Heif)
}

/// Detect the image type of `data` from its header.
///
/// A HEIF container that lists an AVIF brand is reported as AVIF. Returns
/// `None` for anything that is not one of the supported image types.
pub fn sniff(data: &[u8]) -> Option<MediaType> {
    match sniff_ftyp(data) {
        Some(Container::Avif) => return Some(MediaType::ImageAvif),
        Some(Container::Heif) => return None,
        None => {}
    }
    match image::guess_format(data).ok()? {
        ImageFormat::Png => Some(MediaType::ImagePng),
        ImageFormat::Jpeg => Some(MediaType::ImageJpeg),
        ImageFormat::WebP => Some(MediaType::ImageWebp),
        ImageFormat::Gif => Some(MediaType::ImageGif),
        ImageFormat::Avif => Some(MediaType::ImageAvif),
        _ => None,
    }
}

/// A human-readable name for whatever `data` looks like, for error messages.
pub(crate) fn describe(data: &[u8]) -> Option<String> {
    if let Some(t) = sniff(data) {
        return Some(t.to_string());
    }
    if sniff_ftyp(data) == Some(Container::Heif) {
        return Some("image/heif".to_owned());
    }
    image::guess_format(data)
        .ok()
        .map(|f| f.to_mime_type().to_owned())
}

fn image_format(media: MediaType) -> Option<ImageFormat> {
    match media {
        MediaType::ImagePng => Some(ImageFormat::Png),
        MediaType::ImageJpeg => Some(ImageFormat::Jpeg),
        MediaType::ImageWebp => Some(ImageFormat::WebP),
        MediaType::ImageGif => Some(ImageFormat::Gif),
        MediaType::ImageAvif => Some(ImageFormat::Avif),
        _ => None,
    }
}

/// Returns `true` if this build can decode `media`.
pub fn can_decode(media: MediaType) -> bool {
    media != MediaType::ImageAvif || cfg!(feature = "avif-decode")
}

/// Walk an AVIF container and require a primary image item with coded data.
///
/// Pure container parsing, so it runs whether or not this build can decode
/// AV1.
pub(crate) fn check_avif_container(data: &[u8]) -> Result<(), String> {
    let context = mp4parse::read_avif(&mut Cursor::new(data), mp4parse::ParseStrictness::Normal)
        .map_err(|e| e.to_string())?;
    match context.primary_item_coded_data() {
        Some(coded) if !coded.is_empty() => Ok(()),
        _ => Err("no primary image item".to_owned()),
    }
}

/// Read the pixel dimensions from the header of `data`, decoded as `media`.
pub(crate) fn dimensions(data: &[u8], media: MediaType) -> Result<(u32, u32), String> {
    let format = image_format(media).ok_or_else(|| format!("{media} is not an image type"))?;
    ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map_err(|e| e.to_string())
}

/// Decode `data` and re-encode it as `target`.
///
/// JPEG output drops the alpha channel; WebP output is lossless.
pub fn transcode(data: &[u8], target: MediaType) -> Result<Bytes, ConvertError> {
    let source = sniff(data)
        .ok_or_else(|| ConvertError::Failed("unrecognized image data".to_owned()))?;
    if !can_decode(source) {
        return Err(ConvertError::Failed(format!(
            "decoding {source} is not enabled in this build"
        )));
    }
    let (Some(source_format), Some(target_format)) = (image_format(source), image_format(target))
    else {
        return Err(ConvertError::Unsupported {
            from: source,
            to: target,
        });
    };

    let img = image::load_from_memory_with_format(data, source_format)
        .map_err(|e| ConvertError::Failed(format!("failed to decode {source}: {e}")))?;

    let img = match target {
        MediaType::ImageJpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, target_format)
        .map_err(|e| ConvertError::Failed(format!("failed to encode {target}: {e}")))?;

    tracing::debug!(
        from = %source,
        to = %target,
        width = img.width(),
        height = img.height(),
        "image transcoded"
    );
    Ok(Bytes::from(buf.into_inner()))
}
