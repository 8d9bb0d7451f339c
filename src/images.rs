use std::collections::HashSet;
use std::io::{Cursor, Read};

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::error::ExtractError;

/// Colour model of an embedded image, labelled the way image libraries name pixel modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Gray,
    Bilevel,
    Cmyk,
    Indexed,
    Other(String),
}

impl ColorMode {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Rgb => "RGB",
            Self::Gray => "L",
            Self::Bilevel => "1",
            Self::Cmyk => "CMYK",
            Self::Indexed => "P",
            Self::Other(label) => label,
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Rgb | Self::Indexed => "color",
            Self::Gray => "grayscale",
            other => other.label(),
        }
    }
}

/// An image XObject found on a page.
#[derive(Debug, Clone)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    pub mode: ColorMode,
    /// File extension of `data`: `jpeg`, `jpx`, `jb2` or `png`.
    pub format: &'static str,
    /// Encoded image bytes, when the stream could be turned into a standalone file.
    pub data: Option<Vec<u8>>,
}

impl PdfImage {
    pub fn decode(&self) -> Result<DynamicImage, ExtractError> {
        let data = self.data.as_deref().ok_or_else(|| {
            ExtractError::InvalidImage(format!("{} stream cannot be decoded", self.format))
        })?;
        Ok(image::load_from_memory(data)?)
    }
}

fn maybe_deref<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn maybe_get_obj<'a>(
    document: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().map(|object| maybe_deref(document, object))
}

fn maybe_get_u32(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    maybe_get_obj(document, dict, key)
        .and_then(|object| object.as_i64().ok())
        .and_then(|value| u32::try_from(value).ok())
}

fn filter_names(document: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match maybe_get_obj(document, dict, b"Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| maybe_deref(document, item).as_name().ok())
            .map(<[u8]>::to_vec)
            .collect(),
        _ => Vec::new(),
    }
}

fn color_mode_from_space(document: &Document, space: &Object) -> ColorMode {
    match maybe_deref(document, space) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"CalRGB" => ColorMode::Rgb,
            b"DeviceGray" | b"CalGray" => ColorMode::Gray,
            b"DeviceCMYK" => ColorMode::Cmyk,
            b"Indexed" => ColorMode::Indexed,
            other => ColorMode::Other(String::from_utf8_lossy(other).into_owned()),
        },
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|item| maybe_deref(document, item).as_name().ok());
            match family {
                Some(b"ICCBased") => {
                    let components = items
                        .get(1)
                        .map(|stream| maybe_deref(document, stream))
                        .and_then(|stream| stream.as_stream().ok())
                        .and_then(|stream| maybe_get_u32(document, &stream.dict, b"N"));
                    match components {
                        Some(1) => ColorMode::Gray,
                        Some(4) => ColorMode::Cmyk,
                        _ => ColorMode::Rgb,
                    }
                }
                Some(b"Indexed") => ColorMode::Indexed,
                Some(b"Lab") => ColorMode::Other("LAB".to_string()),
                Some(_) => color_mode_from_space(document, &items[0]),
                None => ColorMode::Other("unknown".to_string()),
            }
        }
        _ => ColorMode::Other("unknown".to_string()),
    }
}

fn image_color_mode(document: &Document, dict: &Dictionary, bits_per_component: u32) -> ColorMode {
    let is_mask = maybe_get_obj(document, dict, b"ImageMask")
        .and_then(|object| object.as_bool().ok())
        .unwrap_or(false);
    if is_mask {
        return ColorMode::Bilevel;
    }

    let mode = maybe_get_obj(document, dict, b"ColorSpace")
        .map_or(ColorMode::Gray, |space| color_mode_from_space(document, space));
    if mode == ColorMode::Gray && bits_per_component == 1 {
        ColorMode::Bilevel
    } else {
        mode
    }
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|pixel| {
            let black = 255 - u16::from(pixel[3]);
            pixel[..3].iter().map(move |&ink| {
                // Both factors are <= 255, so the quotient fits in a byte.
                u8::try_from((255 - u16::from(ink)) * black / 255).unwrap_or(u8::MAX)
            })
        })
        .collect()
}

fn raw_samples_to_image(
    width: u32,
    height: u32,
    mode: &ColorMode,
    samples: Vec<u8>,
) -> Option<DynamicImage> {
    match mode {
        ColorMode::Gray => {
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        ColorMode::Rgb => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        ColorMode::Cmyk => {
            RgbImage::from_raw(width, height, cmyk_to_rgb(&samples)).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Undoes `passes` chained FlateDecode filters.
///
/// lopdf refuses to decompress image XObjects, so the zlib layers are
/// inflated here.
fn inflate(data: &[u8], passes: usize) -> Result<Vec<u8>, ExtractError> {
    let mut samples = data.to_vec();
    for _ in 0..passes {
        let mut inflated = Vec::new();
        ZlibDecoder::new(samples.as_slice()).read_to_end(&mut inflated)?;
        samples = inflated;
    }
    Ok(samples)
}

fn read_image_stream(document: &Document, stream: &Stream) -> Result<PdfImage, ExtractError> {
    let dict = &stream.dict;
    let width = maybe_get_u32(document, dict, b"Width")
        .ok_or_else(|| ExtractError::InvalidImage("missing /Width".to_string()))?;
    let height = maybe_get_u32(document, dict, b"Height")
        .ok_or_else(|| ExtractError::InvalidImage("missing /Height".to_string()))?;
    let bits_per_component = maybe_get_u32(document, dict, b"BitsPerComponent").unwrap_or(8);
    let mode = image_color_mode(document, dict, bits_per_component);
    let filters = filter_names(document, dict);

    let has_filter = |name: &[u8]| filters.iter().any(|filter| filter == name);
    if has_filter(b"DCTDecode") {
        let data = (filters.len() == 1).then(|| stream.content.clone());
        return Ok(PdfImage {
            width,
            height,
            mode,
            format: "jpeg",
            data,
        });
    }
    if has_filter(b"JPXDecode") || has_filter(b"JBIG2Decode") {
        return Ok(PdfImage {
            width,
            height,
            mode,
            format: if has_filter(b"JPXDecode") { "jpx" } else { "jb2" },
            data: None,
        });
    }

    let samples = if filters.is_empty() {
        Some(stream.content.clone())
    } else if filters.iter().all(|filter| filter == b"FlateDecode") {
        match inflate(&stream.content, filters.len()) {
            Ok(samples) => Some(samples),
            Err(error) => {
                warn!("cannot inflate {width}x{height} image stream: {error}");
                None
            }
        }
    } else {
        debug!("unsupported image filter chain for {width}x{height} image");
        None
    };
    let data = match samples
        .filter(|_| bits_per_component == 8)
        .and_then(|samples| raw_samples_to_image(width, height, &mode, samples))
    {
        Some(decoded) => Some(encode_png(&decoded)?),
        None => None,
    };

    Ok(PdfImage {
        width,
        height,
        mode,
        format: "png",
        data,
    })
}

fn collect_images(
    document: &Document,
    resources: &Dictionary,
    seen: &mut HashSet<ObjectId>,
    images: &mut Vec<Result<PdfImage, ExtractError>>,
) {
    let Some(xobjects) = maybe_get_obj(document, resources, b"XObject")
        .and_then(|object| object.as_dict().ok())
    else {
        return;
    };

    for (name, entry) in xobjects.iter() {
        if let Object::Reference(id) = entry {
            if !seen.insert(*id) {
                continue;
            }
        }

        let Ok(stream) = maybe_deref(document, entry).as_stream() else {
            debug!(
                "XObject /{} is not a stream",
                String::from_utf8_lossy(name)
            );
            continue;
        };

        match maybe_get_obj(document, &stream.dict, b"Subtype").and_then(|s| s.as_name().ok()) {
            Some(b"Image") => images.push(read_image_stream(document, stream)),
            Some(b"Form") => {
                if let Some(form_resources) = maybe_get_obj(document, &stream.dict, b"Resources")
                    .and_then(|object| object.as_dict().ok())
                {
                    collect_images(document, form_resources, seen, images);
                }
            }
            _ => {}
        }
    }
}

/// Lists the images a page draws, including those nested in form XObjects.
///
/// Images referenced more than once on the same page are reported once.
pub(crate) fn page_images(
    document: &Document,
    page_id: ObjectId,
) -> Vec<Result<PdfImage, ExtractError>> {
    let (own_resources, inherited) = document.get_page_resources(page_id);

    let mut seen = HashSet::new();
    let mut images = Vec::new();
    if let Some(resources) = own_resources {
        collect_images(document, resources, &mut seen, &mut images);
    }
    for resources_id in inherited {
        if let Ok(resources) = document.get_dictionary(resources_id) {
            collect_images(document, resources, &mut seen, &mut images);
        }
    }
    images
}

/// Human-readable summary of an image's size, colour and shape.
#[must_use]
pub fn describe_image(image: &PdfImage, image_number: usize) -> String {
    let (width, height) = (image.width, image.height);

    let aspect_ratio = if height > 0 {
        f64::from(width) / f64::from(height)
    } else {
        1.0
    };
    let orientation = if aspect_ratio > 1.5 {
        "wide/landscape"
    } else if aspect_ratio < 0.67 {
        "tall/portrait"
    } else {
        "square-ish"
    };

    let pixels = u64::from(width) * u64::from(height);
    let size_category = if pixels < 10_000 {
        "small"
    } else if pixels < 100_000 {
        "medium"
    } else {
        "large"
    };

    format!(
        "Image {image_number}: A {size_category} {} {orientation} image \
         ({width}x{height} pixels, {} format)",
        image.mode.description(),
        image.format.to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use lopdf::{Document, Stream, dictionary};

    use super::{ColorMode, PdfImage, cmyk_to_rgb, describe_image, inflate, read_image_stream};

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("in-memory write");
        encoder.finish().expect("in-memory finish")
    }

    fn image(width: u32, height: u32, mode: ColorMode, format: &'static str) -> PdfImage {
        PdfImage {
            width,
            height,
            mode,
            format,
            data: None,
        }
    }

    #[test]
    fn describes_size_colour_and_orientation() {
        assert_eq!(
            describe_image(&image(640, 200, ColorMode::Rgb, "jpeg"), 1),
            "Image 1: A large color wide/landscape image (640x200 pixels, JPEG format)"
        );
        assert_eq!(
            describe_image(&image(50, 100, ColorMode::Gray, "png"), 2),
            "Image 2: A small grayscale tall/portrait image (50x100 pixels, PNG format)"
        );
        assert_eq!(
            describe_image(&image(200, 200, ColorMode::Cmyk, "png"), 3),
            "Image 3: A medium CMYK square-ish image (200x200 pixels, PNG format)"
        );
    }

    #[test]
    fn zero_height_is_treated_as_square() {
        let description = describe_image(&image(10, 0, ColorMode::Indexed, "png"), 4);
        assert!(description.contains("small color square-ish"));
    }

    #[test]
    fn undecodable_images_report_an_error() {
        assert!(image(10, 10, ColorMode::Rgb, "jpx").decode().is_err());
    }

    #[test]
    fn converts_cmyk_samples() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0, 255, 0, 0, 0]), vec![255, 255, 255, 0, 255, 255]);
    }

    #[test]
    fn decodes_flate_compressed_image_streams() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            zlib(&[0, 40, 80, 120, 160, 200]),
        );

        let image = read_image_stream(&Document::with_version("1.5"), &stream)
            .expect("image dictionary is complete");
        assert_eq!(image.format, "png");
        let decoded = image.decode().expect("inflated samples decode");
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.to_luma8().into_raw(), vec![0, 40, 80, 120, 160, 200]);
    }

    #[test]
    fn corrupt_flate_data_leaves_image_undecodable() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            b"not zlib".to_vec(),
        );

        let image = read_image_stream(&Document::with_version("1.5"), &stream)
            .expect("dictionary is still readable");
        assert!(image.data.is_none());
        assert!(inflate(b"not zlib", 1).is_err());
    }

    #[test]
    fn chained_flate_filters_inflate_twice() {
        let twice = zlib(&zlib(b"abc"));
        assert_eq!(inflate(&twice, 2).expect("valid zlib"), b"abc".to_vec());
    }
}
