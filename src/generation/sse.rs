// Minimal server-sent events decoder for streamed chat completions.
//
// Network chunks can end anywhere, including in the middle of a line or a
// multi-byte character, so bytes are buffered until a newline arrives.
// Only `data:` fields are surfaced; comments, `event:` and `id:` lines are
// skipped. Each `data:` line is treated as one payload, which is how the
// completion APIs frame their events.

/// Incremental SSE `data:` line extractor.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete `data:` payload.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let value = line.strip_prefix("data:")?;
    // A single leading space is part of the field separator
    let value = value.strip_prefix(' ').unwrap_or(value);
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_events() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"con").is_empty());
        assert_eq!(decoder.feed(b"tent\":\"x\"}\n"), vec!["{\"content\":\"x\"}"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: héllo\n".as_bytes();
        // Split inside the two-byte 'é'
        let (first, second) = bytes.split_at(8);
        assert!(decoder.feed(first).is_empty());
        assert_eq!(decoder.feed(second), vec!["héllo"]);
    }

    #[test]
    fn test_crlf_and_non_data_lines() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b": keep-alive\r\nevent: message\r\ndata:x\r\n\r\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some("[DONE]".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
