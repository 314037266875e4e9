//! Media type knowledge: which base types are accepted, how file extensions
//! map onto them, and which representations each type can be converted into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FragmentError;

/// A supported base media type (a MIME type without parameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MediaType {
    TextPlain,
    TextMarkdown,
    TextHtml,
    TextCsv,
    ApplicationJson,
    ApplicationYaml,
    ImagePng,
    ImageJpeg,
    ImageWebp,
    ImageGif,
    ImageAvif,
}

const IMAGES: &[MediaType] = &[
    MediaType::ImagePng,
    MediaType::ImageJpeg,
    MediaType::ImageWebp,
    MediaType::ImageGif,
    MediaType::ImageAvif,
];

impl MediaType {
    /// Every supported media type, in declaration order.
    pub const ALL: [MediaType; 11] = [
        Self::TextPlain,
        Self::TextMarkdown,
        Self::TextHtml,
        Self::TextCsv,
        Self::ApplicationJson,
        Self::ApplicationYaml,
        Self::ImagePng,
        Self::ImageJpeg,
        Self::ImageWebp,
        Self::ImageGif,
        Self::ImageAvif,
    ];

    /// Return the MIME string for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextPlain => "text/plain",
            Self::TextMarkdown => "text/markdown",
            Self::TextHtml => "text/html",
            Self::TextCsv => "text/csv",
            Self::ApplicationJson => "application/json",
            Self::ApplicationYaml => "application/yaml",
            Self::ImagePng => "image/png",
            Self::ImageJpeg => "image/jpeg",
            Self::ImageWebp => "image/webp",
            Self::ImageGif => "image/gif",
            Self::ImageAvif => "image/avif",
        }
    }

    /// Parse a Content-Type value, ignoring any parameters such as `charset`.
    ///
    /// Returns `None` when the base type is not one we store.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let base = base_type(value);
        Self::ALL.into_iter().find(|t| t.as_str() == base)
    }

    /// Look up the media type a file extension refers to. The leading dot is
    /// optional and matching is case-insensitive.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::TextPlain),
            "md" => Some(Self::TextMarkdown),
            "html" => Some(Self::TextHtml),
            "csv" => Some(Self::TextCsv),
            "json" => Some(Self::ApplicationJson),
            "yaml" | "yml" => Some(Self::ApplicationYaml),
            "png" => Some(Self::ImagePng),
            "jpg" | "jpeg" => Some(Self::ImageJpeg),
            "webp" => Some(Self::ImageWebp),
            "gif" => Some(Self::ImageGif),
            "avif" => Some(Self::ImageAvif),
            _ => None,
        }
    }

    /// The canonical file extension (without the dot).
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TextPlain => "txt",
            Self::TextMarkdown => "md",
            Self::TextHtml => "html",
            Self::TextCsv => "csv",
            Self::ApplicationJson => "json",
            Self::ApplicationYaml => "yaml",
            Self::ImagePng => "png",
            Self::ImageJpeg => "jpg",
            Self::ImageWebp => "webp",
            Self::ImageGif => "gif",
            Self::ImageAvif => "avif",
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.as_str().starts_with("text/")
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        IMAGES.contains(self)
    }

    /// The ordered set of types this type can be converted into, identity
    /// included.
    #[must_use]
    pub fn reachable(&self) -> &'static [MediaType] {
        match self {
            Self::TextPlain => &[Self::TextPlain],
            Self::TextMarkdown => &[Self::TextMarkdown, Self::TextHtml, Self::TextPlain],
            Self::TextHtml => &[Self::TextHtml, Self::TextPlain],
            Self::TextCsv => &[Self::TextCsv, Self::TextPlain, Self::ApplicationJson],
            Self::ApplicationJson => &[
                Self::ApplicationJson,
                Self::ApplicationYaml,
                Self::TextPlain,
            ],
            Self::ApplicationYaml => &[Self::ApplicationYaml, Self::TextPlain],
            Self::ImagePng | Self::ImageJpeg | Self::ImageWebp | Self::ImageGif | Self::ImageAvif => {
                IMAGES
            }
        }
    }

    #[must_use]
    pub fn can_convert_to(&self, target: MediaType) -> bool {
        self.reachable().contains(&target)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            FragmentError::Validation(format!(
                "type must be a supported type and got {}",
                base_type(s)
            ))
        })
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        value.as_str().to_owned()
    }
}

impl TryFrom<String> for MediaType {
    type Error = FragmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Strip parameters from a Content-Type value and normalize its case:
/// `"Text/HTML; charset=utf-8"` becomes `"text/html"`.
#[must_use]
pub fn base_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Outcome of checking a requested representation against a source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiation {
    /// The request names the source type itself; return the stored bytes.
    Passthrough,
    /// The request names a different, reachable type.
    Convert(MediaType),
}

/// Resolve a requested extension against a source type.
///
/// An unknown extension and an unreachable target both fail with
/// [`FragmentError::UnsupportedConversion`].
pub fn negotiate(source: MediaType, extension: &str) -> Result<Negotiation, FragmentError> {
    let Some(target) = MediaType::from_extension(extension) else {
        return Err(FragmentError::UnsupportedConversion {
            from: source.to_string(),
            to: format!(".{}", extension.trim_start_matches('.')),
        });
    };

    if target == source {
        Ok(Negotiation::Passthrough)
    } else if source.can_convert_to(target) {
        Ok(Negotiation::Convert(target))
    } else {
        Err(FragmentError::UnsupportedConversion {
            from: source.to_string(),
            to: target.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_parameters() {
        assert_eq!(
            MediaType::parse("text/plain; charset=utf-8"),
            Some(MediaType::TextPlain)
        );
        assert_eq!(MediaType::parse("Text/HTML"), Some(MediaType::TextHtml));
        assert_eq!(MediaType::parse("application/msword"), None);
    }

    #[test]
    fn every_type_converts_to_itself() {
        for t in MediaType::ALL {
            assert!(t.can_convert_to(t), "{t} should reach itself");
        }
    }

    #[test]
    fn csv_reachable_set() {
        assert_eq!(
            MediaType::TextCsv.reachable(),
            &[
                MediaType::TextCsv,
                MediaType::TextPlain,
                MediaType::ApplicationJson
            ]
        );
    }

    #[test]
    fn images_reach_every_image() {
        for source in IMAGES {
            for target in IMAGES {
                assert!(source.can_convert_to(*target));
            }
            assert!(!source.can_convert_to(MediaType::TextPlain));
        }
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(MediaType::from_extension(".md"), Some(MediaType::TextMarkdown));
        assert_eq!(MediaType::from_extension("YML"), Some(MediaType::ApplicationYaml));
        assert_eq!(MediaType::from_extension("jpeg"), Some(MediaType::ImageJpeg));
        assert_eq!(MediaType::from_extension(".exe"), None);
    }

    #[test]
    fn negotiate_identity_is_passthrough() {
        assert_eq!(
            negotiate(MediaType::TextMarkdown, ".md").unwrap(),
            Negotiation::Passthrough
        );
    }

    #[test]
    fn negotiate_reachable_target() {
        assert_eq!(
            negotiate(MediaType::TextMarkdown, ".html").unwrap(),
            Negotiation::Convert(MediaType::TextHtml)
        );
        assert_eq!(
            negotiate(MediaType::ApplicationJson, "yml").unwrap(),
            Negotiation::Convert(MediaType::ApplicationYaml)
        );
    }

    #[test]
    fn negotiate_rejects_unreachable_and_unknown() {
        let err = negotiate(MediaType::TextCsv, ".png").unwrap_err();
        assert!(matches!(
            err,
            FragmentError::UnsupportedConversion { ref from, ref to }
                if from == "text/csv" && to == "image/png"
        ));

        let err = negotiate(MediaType::TextPlain, ".exe").unwrap_err();
        assert!(matches!(
            err,
            FragmentError::UnsupportedConversion { ref to, .. } if to == ".exe"
        ));
    }

    #[test]
    fn serde_uses_mime_string() {
        let json = serde_json::to_string(&MediaType::ImageWebp).unwrap();
        assert_eq!(json, "\"image/webp\"");
        let back: MediaType = serde_json::from_str("\"text/csv\"").unwrap();
        assert_eq!(back, MediaType::TextCsv);
        assert!(serde_json::from_str::<MediaType>("\"audio/ogg\"").is_err());
    }
}
