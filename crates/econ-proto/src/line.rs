//! Line-based codec for tokio.
//!
//! Econ servers terminate every log line with `\n` (sometimes `\r\n`) and
//! pad some writes with NUL bytes. The decoder yields clean lines without
//! terminators; the encoder appends a single `\n`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::MAX_LINE_LEN;

/// Line-based codec that handles newline-terminated console lines.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// Create a new codec with custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn clean(raw: &[u8]) -> Result<String> {
        let bytes: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|b| *b != 0 && *b != b'\r' && *b != b'\n')
            .collect();
        String::from_utf8(bytes).map_err(|e| ProtocolError::InvalidUtf8 {
            byte_pos: e.utf8_error().valid_up_to(),
        })
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        // Look for newline starting from where we left off
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            Ok(Some(Self::clean(&line)?))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // The password prompt is not always newline-terminated.
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split_to(src.len());
        self.next_index = 0;
        Ok(Some(Self::clean(&rest)?))
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> Result<()> {
        if msg.contains(['\n', '\r']) {
            return Err(ProtocolError::EmbeddedNewline);
        }
        dst.reserve(msg.len() + 1);
        dst.extend_from_slice(msg.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("[server]: hello\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some("[server]: hello".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("[server]: hel");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"lo\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("[server]: hello".to_string())
        );
    }

    #[test]
    fn test_decode_strips_nul_padding() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\0\0Enter password:\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("Enter password:".to_string())
        );
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = LineCodec::with_max_len(10);
        let mut buf = BytesMut::from("this is way too long\n");

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    }

    #[test]
    fn test_decode_eof_flushes_unterminated_prompt() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("Enter password:");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some("Enter password:".to_string())
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode("ban 1.2.3.4 5 VPN".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"ban 1.2.3.4 5 VPN\n");
    }

    #[test]
    fn test_encode_rejects_newline() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        let result = codec.encode("ban 1.2.3.4 5 x\nshutdown".to_string(), &mut buf);
        assert!(matches!(result, Err(ProtocolError::EmbeddedNewline)));
        assert!(buf.is_empty());
    }
}
