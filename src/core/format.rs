//! core::format
//!
//! Export formats and transcoding.
//!
//! # Design
//!
//! An export is written in the payload's own format unless a format is
//! requested. A requested format that differs from the payload's is
//! produced by decoding the image and encoding it again; the re-encoded
//! file does not carry the model's embedded metadata.
//!
//! # Example
//!
//! ```
//! use pollen::core::format::{transcode, ExportFormat};
//! use pollen::core::record::Payload;
//!
//! // Already JPEG: the bytes pass through untouched.
//! let payload = Payload::jpeg(vec![0xFFu8, 0xD8, 0xFF, 0xD9]);
//! let same = transcode(&payload, ExportFormat::Jpeg).unwrap();
//! assert_eq!(same, payload);
//! ```

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use super::record::Payload;

/// Errors converting a payload to another format.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("cannot read image for conversion to {format}: {message}")]
    Decode {
        /// Requested format.
        format: ExportFormat,
        /// Decoder error.
        message: String,
    },

    #[error("cannot encode image as {format}: {message}")]
    Encode {
        /// Requested format.
        format: ExportFormat,
        /// Encoder error.
        message: String,
    },
}

/// File formats an image can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ExportFormat {
    /// JPEG
    Jpeg,
    /// PNG
    Png,
}

impl ExportFormat {
    /// MIME type of the format.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Png => "image/png",
        }
    }

    /// File extension of the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Png => "png",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::Png => ImageFormat::Png,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Convert a payload to `format`.
///
/// A payload already in `format` is returned as is, embedded metadata
/// included.
///
/// # Errors
///
/// - [`TranscodeError::Decode`] if the bytes are not a readable image
/// - [`TranscodeError::Encode`] if the encoder fails
pub fn transcode(payload: &Payload, format: ExportFormat) -> Result<Payload, TranscodeError> {
    if payload.extension() == format.extension() {
        return Ok(payload.clone());
    }

    let decoded = image::load_from_memory(payload.bytes()).map_err(|e| {
        tracing::debug!(error = %e, content_type = payload.content_type(), "image decode failed");
        TranscodeError::Decode {
            format,
            message: e.to_string(),
        }
    })?;

    // JPEG has no alpha channel.
    let decoded = match format {
        ExportFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        ExportFormat::Png => decoded,
    };

    let mut bytes = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut bytes), format.image_format())
        .map_err(|e| TranscodeError::Encode {
            format,
            message: e.to_string(),
        })?;

    tracing::debug!(
        from = payload.content_type(),
        to = format.content_type(),
        bytes = bytes.len(),
        "image transcoded"
    );
    Ok(Payload::new(bytes, format.content_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn encoded(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .expect("encode fixture");
        bytes
    }

    fn small_jpeg() -> Payload {
        let image = RgbImage::from_pixel(4, 3, Rgb([200, 40, 10]));
        Payload::jpeg(encoded(DynamicImage::ImageRgb8(image), ImageFormat::Jpeg))
    }

    #[test]
    fn jpeg_to_png() {
        let png = transcode(&small_jpeg(), ExportFormat::Png).expect("transcode");
        assert_eq!(png.content_type(), "image/png");
        assert_eq!(png.extension(), "png");

        let decoded = image::load_from_memory_with_format(png.bytes(), ImageFormat::Png)
            .expect("valid png");
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn png_with_alpha_to_jpeg() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128]));
        let payload = Payload::new(
            encoded(DynamicImage::ImageRgba8(image), ImageFormat::Png),
            "image/png",
        );

        let jpeg = transcode(&payload, ExportFormat::Jpeg).expect("transcode");
        assert_eq!(jpeg.content_type(), "image/jpeg");
        let decoded = image::load_from_memory_with_format(jpeg.bytes(), ImageFormat::Jpeg)
            .expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }

    #[test]
    fn same_format_passes_through() {
        // Not a decodable image; must not be touched.
        let payload = Payload::new(vec![1u8, 2, 3], "image/png");
        assert_eq!(transcode(&payload, ExportFormat::Png).unwrap(), payload);
    }

    #[test]
    fn unreadable_bytes_fail_to_decode() {
        let payload = Payload::jpeg(vec![1u8, 2, 3]);
        let err = transcode(&payload, ExportFormat::Png).unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::Decode {
                format: ExportFormat::Png,
                ..
            }
        ));
        assert!(err.to_string().contains("png"));
    }
}
