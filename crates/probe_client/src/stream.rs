//! Decoder for the incremental stream payload.
//!
//! The endpoint answers with a bracketed list of `[timestamp, temperature]`
//! pairs, for example:
//!
//! ```text
//! [[2024-01-01 10:00:00, 70.0], [2024-01-01 10:01:00, 71.0]]
//! [2024-01-01 10:00:00, 70.0], [2024-01-01 10:01:00, 71.0]
//! [['2024-01-01 10:00:00 -08:00', 70.0]]
//! ```
//!
//! The outer brackets are optional, timestamps may be bare or quoted, and the
//! comma between pairs is optional.

use common::config::DecodeMode;
use common::{Error, Result, Sample};
use tracing::warn;

/// Decode a payload, surfacing any grammar violation as `Error::Decode`.
pub fn decode_stream(payload: &str) -> Result<Vec<Sample>> {
    Parser::new(payload).payload()
}

/// Decode a payload according to `mode`.
///
/// In lenient mode a payload that does not follow the grammar yields no
/// samples instead of an error.
pub fn decode_stream_with(payload: &str, mode: DecodeMode) -> Result<Vec<Sample>> {
    match (decode_stream(payload), mode) {
        (Ok(samples), _) => Ok(samples),
        (Err(e), DecodeMode::Lenient) => {
            warn!("Ignoring undecodable stream payload ({} bytes): {}", payload.len(), e);
            Ok(Vec::new())
        }
        (Err(e), DecodeMode::Strict) => Err(e),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn payload(mut self) -> Result<Vec<Sample>> {
        self.skip_ws();
        if self.at_end() {
            return Ok(Vec::new());
        }

        let outer = self.starts_outer_list();
        if outer {
            self.expect(b'[')?;
        }

        let mut samples = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None if outer => return Err(self.error("unterminated list, expected ']'")),
                None => break,
                Some(b']') if outer => {
                    self.pos += 1;
                    break;
                }
                Some(b'[') => samples.push(self.pair()?),
                Some(_) => return Err(self.error("expected '['")),
            }
            self.skip_ws();
            if self.peek() == Some(b',') {
                self.pos += 1;
            }
        }

        self.skip_ws();
        if !self.at_end() {
            return Err(self.error("trailing characters after list"));
        }
        Ok(samples)
    }

    /// `[[` or `[]` opens an outer list; `[x` is the first bare pair.
    fn starts_outer_list(&self) -> bool {
        if self.peek() != Some(b'[') {
            return false;
        }
        let rest = self.src[self.pos + 1..].trim_start();
        rest.starts_with('[') || rest.starts_with(']')
    }

    fn pair(&mut self) -> Result<Sample> {
        self.expect(b'[')?;
        self.skip_ws();
        let key = self.key()?;
        self.skip_ws();
        self.expect(b',')?;
        self.skip_ws();
        let temperature = self.number()?;
        self.skip_ws();
        self.expect(b']')?;
        Ok(Sample::new(key, temperature))
    }

    fn key(&mut self) -> Result<String> {
        let start = self.pos;
        let raw = match self.quoted()? {
            Some(text) => text,
            None => self.take_until(|b| matches!(b, b',' | b'[' | b']')).trim(),
        };
        if raw.is_empty() {
            self.pos = start;
            return Err(self.error("empty timestamp"));
        }
        Ok(raw.to_string())
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        let raw = match self.quoted()? {
            Some(text) => text.trim(),
            None => self.take_until(|b| b == b']' || b == b',' || b.is_ascii_whitespace()),
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => {
                self.pos = start;
                Err(self.error(&format!("invalid temperature {raw:?}")))
            }
        }
    }

    /// Consume a `'...'` or `"..."` literal if one starts here.
    fn quoted(&mut self) -> Result<Option<&'a str>> {
        let Some(quote @ (b'"' | b'\'')) = self.peek() else {
            return Ok(None);
        };
        let open = self.pos;
        self.pos += 1;
        let text = self.take_until(|b| b == quote);
        if self.at_end() {
            self.pos = open;
            return Err(self.error("unterminated quoted string"));
        }
        self.pos += 1;
        Ok(Some(text))
    }

    fn take_until(&mut self, stop: impl Fn(u8) -> bool) -> &'a str {
        let src: &'a str = self.src;
        let start = self.pos;
        let bytes = src.as_bytes();
        while self.pos < bytes.len() && !stop(bytes[self.pos]) {
            self.pos += 1;
        }
        &src[start..self.pos]
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn skip_ws(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn error(&self, message: &str) -> Error {
        Error::Decode {
            offset: self.pos,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(samples: &[Sample]) -> Vec<&str> {
        samples.iter().map(|s| s.key.as_str()).collect()
    }

    #[test]
    fn test_decode_bare_pairs() {
        let samples =
            decode_stream("[2024-01-01 10:00:00, 70.0], [2024-01-01 10:01:00, 71.0]").unwrap();
        assert_eq!(keys(&samples), vec!["2024-01-01 10:00:00", "2024-01-01 10:01:00"]);
        assert!((samples[0].temperature - 70.0).abs() < 1e-9);
        assert!((samples[1].temperature - 71.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_outer_list_and_quotes() {
        let samples = decode_stream(
            "[['2024-01-01 10:00:00 -08:00', 70.5],\n [\"2024-01-01 10:01:00 -08:00\", \"71\"]]",
        )
        .unwrap();
        assert_eq!(
            keys(&samples),
            vec!["2024-01-01 10:00:00 -08:00", "2024-01-01 10:01:00 -08:00"]
        );
        assert!((samples[1].temperature - 71.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_empty_payloads() {
        assert!(decode_stream("").unwrap().is_empty());
        assert!(decode_stream("  \n").unwrap().is_empty());
        assert!(decode_stream("[]").unwrap().is_empty());
        assert!(decode_stream("[ ]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_keeps_duplicates_for_merge_to_drop() {
        let samples = decode_stream("[[a, 1], [a, 2]]").unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_decode_negative_and_pair_without_separator() {
        let samples = decode_stream("[[t1, -3.5][t2, 1e1]]").unwrap();
        assert_eq!(keys(&samples), vec!["t1", "t2"]);
        assert!((samples[0].temperature + 3.5).abs() < 1e-9);
        assert!((samples[1].temperature - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_strict_rejects_malformed() {
        for bad in [
            "<html>oops</html>",
            "[[2024-01-01 10:00:00, warm]]",
            "[[2024-01-01 10:00:00 70.0]]",
            "[[, 70.0]]",
            "[[t, 70.0]",
            "[[t, 70.0]] extra",
            "[['t, 70.0]]",
            "[[t, NaN]]",
        ] {
            let result = decode_stream(bad);
            assert!(
                matches!(result, Err(Error::Decode { .. })),
                "expected decode error for {bad:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_error_reports_offset() {
        match decode_stream("[[t, 1], [u, x]]") {
            Err(Error::Decode { offset, .. }) => assert_eq!(offset, 13),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lenient_mode_degrades_to_empty() {
        let samples = decode_stream_with("not a list", DecodeMode::Lenient).unwrap();
        assert!(samples.is_empty());

        let samples = decode_stream_with("[[t, 1]]", DecodeMode::Lenient).unwrap();
        assert_eq!(samples.len(), 1);

        assert!(decode_stream_with("not a list", DecodeMode::Strict).is_err());
    }
}
