//! Image file extension allow-list.

use core::fmt;
use core::str::FromStr;

/// Raised when an uploaded file's extension is not on the allow-list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid file type. Allowed: PNG, JPG, JPEG, GIF, WEBP")]
pub struct UnsupportedExtension;

/// An allowed product image extension.
///
/// Matching is case-insensitive; the canonical form is lower-case and is what
/// goes into object keys (`products/{id}.{ext}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageExtension {
    Png,
    Jpg,
    Jpeg,
    Gif,
    Webp,
}

impl ImageExtension {
    /// Every allowed extension.
    pub const ALL: [Self; 5] = [Self::Png, Self::Jpg, Self::Jpeg, Self::Gif, Self::Webp];

    /// Extract and validate the extension from an uploaded file name.
    ///
    /// Only the text after the last `.` counts, so `shirt.final.PNG` is a PNG
    /// and `png` (no dot) is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedExtension`] if the name has no extension or the
    /// extension is not allowed.
    pub fn from_file_name(file_name: &str) -> Result<Self, UnsupportedExtension> {
        let (_, ext) = file_name
            .trim()
            .rsplit_once('.')
            .ok_or(UnsupportedExtension)?;
        ext.parse()
    }

    /// Canonical lower-case extension.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    /// MIME type to store alongside the object.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

impl FromStr for ImageExtension {
    type Err = UnsupportedExtension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str() == lower)
            .ok_or(UnsupportedExtension)
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
