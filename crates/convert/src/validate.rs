use fragments_core::{MediaType, base_type};

use crate::error::ValidationError;
use crate::raster;

/// Check that `data` is really what `declared` says it is.
///
/// JSON and YAML must parse. Images must sniff as the declared format and
/// decode; AVIF must also carry a complete container with a primary image.
/// Plain text and every other type pass unchecked.
pub fn validate(data: &[u8], declared: &str) -> Result<(), ValidationError> {
    let base = base_type(declared);
    match base.as_str() {
        "application/json" => serde_json::from_slice::<serde_json::Value>(data)
            .map(drop)
            .map_err(|e| ValidationError::InvalidJson(e.to_string())),
        "application/yaml" | "application/yml" => {
            serde_yaml_ng::from_slice::<serde_yaml_ng::Value>(data)
                .map(drop)
                .map_err(|e| ValidationError::InvalidYaml(e.to_string()))
        }
        _ => match MediaType::parse(&base) {
            Some(media) if media.is_image() => validate_image(data, media),
            _ => Ok(()),
        },
    }
}

fn validate_image(data: &[u8], declared: MediaType) -> Result<(), ValidationError> {
    if raster::sniff(data) != Some(declared) {
        return Err(ValidationError::ImageMismatch {
            declared,
            detected: raster::describe(data),
        });
    }
    if declared == MediaType::ImageAvif {
        raster::check_avif_container(data)
            .map_err(|reason| ValidationError::UndecodableImage { declared, reason })?;
    }
    if raster::can_decode(declared) {
        raster::dimensions(data, declared)
            .map_err(|reason| ValidationError::UndecodableImage { declared, reason })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::ImageFormat;

    use super::*;
    use crate::raster::tests::{ftyp, sample};

    #[test]
    fn json_must_parse() {
        assert!(validate(br#"{"a":1}"#, "application/json").is_ok());
        assert!(validate(b"[1, 2, 3]", "application/json; charset=utf-8").is_ok());
        assert!(matches!(
            validate(b"{not json", "application/json"),
            Err(ValidationError::InvalidJson(_))
        ));
    }

    #[test]
    fn yaml_and_yml_alias_must_parse() {
        assert!(validate(b"a: 1\nb: [x, y]\n", "application/yaml").is_ok());
        assert!(validate(b"a: 1\n", "application/yml").is_ok());
        assert!(matches!(
            validate(b"a: [unclosed", "application/yaml"),
            Err(ValidationError::InvalidYaml(_))
        ));
    }

    #[test]
    fn plain_text_always_passes() {
        assert!(validate(b"\xff\xfe anything", "text/plain").is_ok());
    }

    #[test]
    fn other_types_pass_through() {
        assert!(validate(b"# whatever", "text/markdown").is_ok());
        assert!(validate(b"not really csv\"", "text/csv").is_ok());
    }

    #[test]
    fn image_must_match_declared_format() {
        let png = sample(ImageFormat::Png);
        assert!(validate(&png, "image/png").is_ok());

        let err = validate(&png, "image/jpeg").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ImageMismatch {
                declared: MediaType::ImageJpeg,
                detected: Some(ref d)
            } if d == "image/png"
        ));

        assert!(matches!(
            validate(b"hello", "image/gif"),
            Err(ValidationError::ImageMismatch { detected: None, .. })
        ));
    }

    #[test]
    fn truncated_image_is_rejected() {
        let png = sample(ImageFormat::Png);
        assert!(matches!(
            validate(&png[..12], "image/png"),
            Err(ValidationError::UndecodableImage { .. })
        ));
    }

    #[test]
    fn avif_must_be_a_complete_image() {
        assert!(validate(&sample(ImageFormat::Avif), "image/avif").is_ok());

        for header_only in [ftyp(b"avif", &[b"mif1"]), ftyp(b"mif1", &[b"miaf", b"avif"])] {
            assert!(matches!(
                validate(&header_only, "image/avif"),
                Err(ValidationError::UndecodableImage {
                    declared: MediaType::ImageAvif,
                    ..
                })
            ));
        }
        assert!(matches!(
            validate(&ftyp(b"heic", &[b"mif1"]), "image/avif"),
            Err(ValidationError::ImageMismatch { .. })
        ));
    }
}
