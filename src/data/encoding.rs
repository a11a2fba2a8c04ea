//! Text Decoding Module
//! Ordered decode attempts over raw instrument bytes, first success wins.

use encoding_rs::Encoding;
use std::path::Path;

/// Text produced by one successful decode attempt.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub encoding: &'static str,
    pub text: String,
}

/// Read a whole instrument file. Files are small, so no streaming.
pub fn read_bytes(path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

/// Decode `bytes` with each label in priority order, yielding only the
/// attempts that decode cleanly. Unknown labels are skipped.
pub fn decode_attempts<'a>(
    bytes: &'a [u8],
    labels: &'a [String],
) -> impl Iterator<Item = DecodedText> + 'a {
    labels.iter().filter_map(move |label| {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            tracing::debug!(label = %label, "unknown encoding label");
            return None;
        };
        match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            Some(text) => Some(DecodedText {
                encoding: encoding.name(),
                text: text.trim_start_matches('\u{feff}').to_string(),
            }),
            None => {
                tracing::debug!(encoding = encoding.name(), "decode attempt failed");
                None
            }
        }
    })
}

/// First clean decode, if any.
pub fn decode_first(bytes: &[u8], labels: &[String]) -> Option<DecodedText> {
    decode_attempts(bytes, labels).next()
}
