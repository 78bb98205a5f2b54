//! Incremental base64 encoding of the document byte stream.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encodes byte chunks as they arrive, emitting text for every complete
/// 3-byte group and carrying the remainder to the next chunk. The output is
/// identical to a one-shot encode of the concatenated input.
#[derive(Default)]
pub struct Base64StreamEncoder {
    carry: Vec<u8>,
    encoded: String,
}

impl Base64StreamEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.carry.extend_from_slice(chunk);
        let whole = self.carry.len() - self.carry.len() % 3;
        if whole > 0 {
            self.encoded.push_str(&STANDARD.encode(&self.carry[..whole]));
            self.carry.drain(..whole);
        }
    }

    /// Flush the trailing partial group (with padding) and return the text.
    pub fn finish(mut self) -> String {
        if !self.carry.is_empty() {
            self.encoded.push_str(&STANDARD.encode(&self.carry));
        }
        self.encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_encode_matches_one_shot() {
        let data: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();

        for chunk_size in [1, 2, 3, 7, 64, 4096] {
            let mut encoder = Base64StreamEncoder::new();
            for chunk in data.chunks(chunk_size) {
                encoder.push(chunk);
            }
            assert_eq!(encoder.finish(), STANDARD.encode(&data), "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn empty_input_encodes_to_empty_text() {
        assert_eq!(Base64StreamEncoder::new().finish(), "");
    }

    #[test]
    fn padding_only_appears_at_the_end() {
        let mut encoder = Base64StreamEncoder::new();
        encoder.push(b"ab");
        encoder.push(b"cd");
        let out = encoder.finish();
        assert_eq!(out, STANDARD.encode(b"abcd"));
        assert!(out.ends_with('='));
        assert!(!out[..out.len() - 2].contains('='));
    }
}
