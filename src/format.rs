//! Formats raw keys for log fields and error messages.

use std::fmt;

use itertools::Itertools as _;

/// Raw key bytes rendered as an escaped ASCII string.
pub struct Raw<'a>(&'a [u8]);

impl<'a> Raw<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Raw(bytes)
    }

    /// Formats raw bytes as escaped ASCII strings.
    pub fn bytes(bytes: &[u8]) -> String {
        let escaped = bytes
            .iter()
            .copied()
            .flat_map(std::ascii::escape_default)
            .collect_vec();
        format!("\"{}\"", String::from_utf8_lossy(&escaped))
    }
}

impl fmt::Display for Raw<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Raw::bytes(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_key() {
        assert_eq!(Raw::bytes(b"hello"), "\"hello\"");
    }

    #[test]
    fn test_escaped_key() {
        assert_eq!(Raw::bytes(b"a\nb\x00\xff"), "\"a\\nb\\x00\\xff\"");
        assert_eq!(Raw::new(b"\"q\"").to_string(), "\"\\\"q\\\"\"");
    }
}
