use bytes::Bytes;
use pulldown_cmark::{Options, Parser, html};

use fragments_core::MediaType;

use crate::error::ConvertError;
use crate::raster;

/// Convert `data` from `source` into `target`.
///
/// The pair is checked against the reachability table before any codec runs.
/// Identity conversions hand back the original buffer untouched.
pub fn convert(data: &Bytes, source: MediaType, target: MediaType) -> Result<Bytes, ConvertError> {
    if !source.can_convert_to(target) {
        return Err(ConvertError::Unsupported {
            from: source,
            to: target,
        });
    }
    if source == target {
        return Ok(data.clone());
    }

    tracing::debug!(from = %source, to = %target, size = data.len(), "converting");
    match (source, target) {
        (_, MediaType::TextPlain) => Ok(plain_text(data)),
        (MediaType::TextMarkdown, MediaType::TextHtml) => Ok(markdown_to_html(data)),
        (MediaType::TextCsv, MediaType::ApplicationJson) => csv_to_json(data),
        (MediaType::ApplicationJson, MediaType::ApplicationYaml) => json_to_yaml(data),
        (from, to) if from.is_image() && to.is_image() => raster::transcode(data, to),
        (from, to) => Err(ConvertError::Unsupported { from, to }),
    }
}

/// UTF-8 text of the original bytes. Valid input is returned verbatim;
/// invalid sequences are replaced.
fn plain_text(data: &Bytes) -> Bytes {
    match String::from_utf8_lossy(data) {
        std::borrow::Cow::Borrowed(_) => data.clone(),
        std::borrow::Cow::Owned(text) => Bytes::from(text),
    }
}

fn markdown_to_html(data: &[u8]) -> Bytes {
    let source = String::from_utf8_lossy(data);
    let parser = Parser::new_ext(
        &source,
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
    );
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    Bytes::from(out)
}

/// Rows as objects keyed by the header row. Values stay strings.
fn csv_to_json(data: &[u8]) -> Result<Bytes, ConvertError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ConvertError::Failed(format!("invalid CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ConvertError::Failed(format!("invalid CSV: {e}")))?;
        let row: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_owned(), serde_json::Value::String(v.to_owned())))
            .collect();
        rows.push(serde_json::Value::Object(row));
    }

    serde_json::to_vec(&rows)
        .map(Bytes::from)
        .map_err(|e| ConvertError::Failed(e.to_string()))
}

fn json_to_yaml(data: &[u8]) -> Result<Bytes, ConvertError> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| ConvertError::Failed(format!("invalid JSON: {e}")))?;
    serde_yaml_ng::to_string(&value)
        .map(Bytes::from)
        .map_err(|e| ConvertError::Failed(e.to_string()))
}
