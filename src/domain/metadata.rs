//! Metadata header carried in front of the streamed payload.
//!
//! The server prefixes the body with a single UTF-8 line of the form
//! `<file name>|<total payload length>\n`; everything after the newline is
//! raw file data.

pub const HEADER_TERMINATOR: u8 = b'\n';
pub const HEADER_SEPARATOR: char = '|';

/// Longest header line accepted before giving up on finding the terminator.
pub const MAX_HEADER_LEN: usize = 8 * 1024;

/// Used when the server sends an empty name.
pub const DEFAULT_FILE_NAME: &str = "download";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub file_name: String,
    /// `None` when the size field is missing or not a number.
    pub total_bytes: Option<u64>,
}

impl StreamMetadata {
    /// Parses the header text, without its terminator.
    pub fn parse(line: &str) -> Self {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (name, size) = match line.split_once(HEADER_SEPARATOR) {
            Some((name, size)) => (name, Some(size)),
            None => (line, None),
        };

        let file_name = if name.trim().is_empty() {
            DEFAULT_FILE_NAME.to_string()
        } else {
            name.to_string()
        };

        Self {
            file_name,
            total_bytes: size.and_then(parse_leading_digits),
        }
    }
}

/// Splits `buf` at the first header terminator.
///
/// Returns the header bytes (terminator excluded) and the payload that follows
/// it, or `None` if no terminator has arrived yet.
pub fn split_header(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let idx = buf.iter().position(|&b| b == HEADER_TERMINATOR)?;
    Some((&buf[..idx], &buf[idx + 1..]))
}

// Lenient: "  42 bytes" parses as 42, "abc" does not parse.
fn parse_leading_digits(field: &str) -> Option<u64> {
    let field = field.trim_start();
    let end = field
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(field.len());
    field[..end].parse().ok()
}
