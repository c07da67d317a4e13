//! crates/notebase_core/src/extract.rs
//!
//! Parses the JSON export produced by the Kindle highlight extraction tool.
//! The wire shape is owned by that tool, so parsing is lenient about optional
//! fields but strict about the book key.

use serde::Deserialize;

/// Raised when bytes cannot be turned into a [`RawExtractBook`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Malformed extract: {0}")]
    Malformed(String),
}

/// The book-level record of an extract, as produced by the export tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawExtractBook {
    pub asin: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub highlights: Vec<RawExtractHighlight>,
}

impl RawExtractBook {
    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtractHighlight {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub location: Option<RawLocation>,
    /// `null` on the wire becomes an empty string.
    #[serde(default, deserialize_with = "null_as_default")]
    pub note: String,
    /// Informational only.
    #[serde(default)]
    pub is_note_only: bool,
}

impl RawExtractHighlight {
    /// The deep-link URL when present, otherwise the numeric offset.
    pub fn resolved_location(&self) -> String {
        match &self.location {
            Some(RawLocation { url: Some(url), .. }) if !url.is_empty() => url.clone(),
            Some(RawLocation {
                value: Some(value), ..
            }) => value.to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub value: Option<i64>,
}

/// Reads `null` as the type's empty value, the way a missing field is read.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses raw extract bytes. Never panics; every failure is [`ExtractError::Malformed`].
pub fn parse(bytes: &[u8]) -> Result<RawExtractBook, ExtractError> {
    let raw: RawExtractBook =
        serde_json::from_slice(bytes).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    if raw.asin.trim().is_empty() {
        return Err(ExtractError::Malformed(
            "extract has an empty asin".to_string(),
        ));
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "asin": "B004XCFJ3E",
        "title": "Some random book on kindle",
        "authors": "Some random author",
        "highlights": [
            {
                "text": "Lorem ipsum dolor sit amet",
                "isNoteOnly": false,
                "location": {
                    "url": "kindle://book?action=open&asin=B004XCFJ3E&location=307",
                    "value": 307
                },
                "note": "This is a note"
            },
            {
                "text": "consectetur adipiscing elit",
                "isNoteOnly": false,
                "location": { "url": null, "value": 742 },
                "note": null
            }
        ]
    }"#;

    #[test]
    fn parses_the_export_shape() {
        let raw = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(raw.asin, "B004XCFJ3E");
        assert_eq!(raw.authors, "Some random author");
        assert_eq!(raw.highlight_count(), 2);
        assert_eq!(raw.highlights[0].note, "This is a note");
        assert_eq!(
            raw.highlights[0].resolved_location(),
            "kindle://book?action=open&asin=B004XCFJ3E&location=307"
        );
    }

    #[test]
    fn null_note_becomes_empty_and_location_falls_back_to_value() {
        let raw = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(raw.highlights[1].note, "");
        assert_eq!(raw.highlights[1].resolved_location(), "742");
    }

    #[test]
    fn missing_optional_fields_are_tolerated() {
        let raw = parse(br#"{"asin":"B001","highlights":[{"text":"x"}]}"#).unwrap();
        assert_eq!(raw.title, "");
        assert!(!raw.highlights[0].is_note_only);
        assert_eq!(raw.highlights[0].resolved_location(), "");

        let raw = parse(br#"{"asin":"B001","title":"T"}"#).unwrap();
        assert!(raw.highlights.is_empty());
    }

    #[test]
    fn null_fields_read_as_empty() {
        let raw = parse(br#"{"asin":"B001","title":null,"authors":null,"highlights":[{"text":null,"location":null,"note":null}]}"#).unwrap();
        assert_eq!(raw.title, "");
        assert_eq!(raw.authors, "");
        assert_eq!(raw.highlight_count(), 1);
        assert_eq!(raw.highlights[0].text, "");
        assert_eq!(raw.highlights[0].resolved_location(), "");

        let raw = parse(br#"{"asin":"B001","title":"T","highlights":null}"#).unwrap();
        assert!(raw.highlights.is_empty());

        assert!(parse(br#"{"asin":null,"highlights":[]}"#).is_err());
    }

    #[test]
    fn rejects_invalid_json_and_incompatible_shapes() {
        assert!(matches!(parse(b"not json"), Err(ExtractError::Malformed(_))));
        assert!(matches!(parse(b""), Err(ExtractError::Malformed(_))));
        assert!(matches!(
            parse(br#"{"asin":"B001","highlights":"nope"}"#),
            Err(ExtractError::Malformed(_))
        ));
        assert!(matches!(parse(br#"[1,2,3]"#), Err(ExtractError::Malformed(_))));
    }

    #[test]
    fn rejects_a_missing_or_blank_asin() {
        assert!(parse(br#"{"title":"T","highlights":[]}"#).is_err());
        assert!(parse(br#"{"asin":"  ","highlights":[]}"#).is_err());
    }
}
