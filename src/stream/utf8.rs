//! Stateful UTF-8 decoding across fragment boundaries

/// Longest possible UTF-8 sequence
const MAX_SEQUENCE_LEN: usize = 4;

/// Decodes a byte stream into text, holding back an incomplete trailing
/// sequence until the next fragment arrives.
///
/// Invalid sequences are replaced with U+FFFD instead of failing.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a fragment, appending complete characters to `out`
    pub fn decode_into(&mut self, fragment: &[u8], out: &mut String) {
        self.pending.extend_from_slice(fragment);
        let input = std::mem::take(&mut self.pending);
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = tail.get(bad..).unwrap_or_default();
                        }
                        None => {
                            // Incomplete sequence at the end; keep it for later
                            debug_assert!(tail.len() < MAX_SEQUENCE_LEN);
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}
