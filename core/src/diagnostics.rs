//! Decoding of legacy diagnostics embedded in custom carol text.
//!
//! Older submissions stored a JSON array of diagnostic messages inside the
//! free-text column, after a sentinel marker:
//!
//! ```text
//! O Holy Night
//! __ERRORS__:["Carol \"Joy to the World\" has already been selected"]
//! ```
//!
//! New submissions carry diagnostics in their own field. This module only
//! reads the old encoding; nothing writes it any more.

/// Marker separating display text from the serialized diagnostics payload.
pub const LEGACY_SENTINEL: &str = "__ERRORS__:";

/// Custom text split into its display part and embedded diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedCustomText {
    /// Human-readable substitute name, if any
    pub text: Option<String>,
    /// Diagnostics recovered from the payload
    pub diagnostics: Vec<String>,
}

/// Splits a stored custom-text field.
///
/// Text after the sentinel is parsed as a JSON array of strings. If the
/// payload does not parse, the whole field is treated as plain text.
#[must_use]
pub fn decode_custom_text(raw: Option<&str>) -> DecodedCustomText {
    let Some(raw) = raw else {
        return DecodedCustomText::default();
    };

    let Some(pos) = raw.find(LEGACY_SENTINEL) else {
        return DecodedCustomText {
            text: non_empty(raw),
            diagnostics: Vec::new(),
        };
    };

    let payload = &raw[pos + LEGACY_SENTINEL.len()..];
    match serde_json::from_str::<Vec<String>>(payload.trim()) {
        Ok(diagnostics) => DecodedCustomText {
            text: non_empty(raw[..pos].trim_end_matches(['\n', '\r'])),
            diagnostics,
        },
        Err(error) => {
            tracing::debug!(%error, "Legacy diagnostics payload did not parse, keeping text as-is");
            DecodedCustomText {
                text: non_empty(raw),
                diagnostics: Vec::new(),
            }
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let decoded = decode_custom_text(Some("O Holy Night"));
        assert_eq!(decoded.text.as_deref(), Some("O Holy Night"));
        assert!(decoded.diagnostics.is_empty());
    }

    #[test]
    fn test_text_with_payload_is_split() {
        let decoded = decode_custom_text(Some("O Holy Night\n__ERRORS__:[\"first\",\"second\"]"));
        assert_eq!(decoded.text.as_deref(), Some("O Holy Night"));
        assert_eq!(decoded.diagnostics, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_payload_only() {
        let decoded = decode_custom_text(Some("__ERRORS__:[\"only\"]"));
        assert_eq!(decoded.text, None);
        assert_eq!(decoded.diagnostics, vec!["only".to_string()]);
    }

    #[test]
    fn test_malformed_payload_falls_back_to_plain_text() {
        let raw = "Carol\n__ERRORS__:{not json";
        let decoded = decode_custom_text(Some(raw));
        assert_eq!(decoded.text.as_deref(), Some(raw));
        assert!(decoded.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_and_empty() {
        assert_eq!(decode_custom_text(None), DecodedCustomText::default());
        assert_eq!(decode_custom_text(Some("")), DecodedCustomText::default());
    }
}
