//! Encoding utilities for drag-drop content
//!
//! Native drag payloads are 8-bit: text arrives as UTF-8 (occasionally as
//! UTF-16 from foreign toolkits), link lists arrive as `text/uri-list`.
//! These helpers turn such payloads into application text.

/// Decode 8-bit drag text with encoding detection
/// Handles UTF-8 (with or without BOM), UTF-16 LE/BE, and falls back to lossy UTF-8.
/// The payload ends at its first NUL terminator.
pub fn decode_text(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }

    // UTF-16 with BOM
    if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xFE {
        if let Some(text) = decode_utf16(&data[2..], u16::from_le_bytes) {
            return text;
        }
    }
    if data.len() >= 2 && data[0] == 0xFE && data[1] == 0xFF {
        if let Some(text) = decode_utf16(&data[2..], u16::from_be_bytes) {
            return text;
        }
    }

    // UTF-16 LE without BOM (ASCII characters with NUL high bytes)
    if looks_like_utf16_le(data) {
        if let Some(text) = decode_utf16(data, u16::from_le_bytes) {
            return text;
        }
    }

    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let data = &data[..end];
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    String::from_utf8_lossy(data).into_owned()
}

/// Check if data looks like UTF-16 LE (ASCII characters have 0x00 as second byte)
fn looks_like_utf16_le(data: &[u8]) -> bool {
    if data.len() < 4 || data.len() % 2 != 0 {
        return false;
    }
    let mut null_count = 0;
    let mut check_count = 0;
    for chunk in data.chunks_exact(2).take(10) {
        check_count += 1;
        if chunk[1] == 0 && chunk[0] != 0 && chunk[0] < 128 {
            null_count += 1;
        }
    }
    check_count > 0 && null_count > check_count / 2
}

fn decode_utf16(data: &[u8], from_bytes: fn([u8; 2]) -> u16) -> Option<String> {
    if data.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| from_bytes([chunk[0], chunk[1]]))
        .take_while(|&c| c != 0)
        .collect();
    String::from_utf16(&units).ok()
}

/// Convert CRLF and lone CR line endings to LF
pub fn normalize_line_breaks(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// The non-empty entries of `text/uri-list` data, in order
///
/// Leading whitespace is skipped; an entry ends at CR, LF or NUL.
fn uri_list_entries(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split(|&b| b == b'\n').filter_map(|line| {
        let start = line
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(line.len());
        let line = &line[start..];
        let end = line
            .iter()
            .position(|&b| b == b'\r' || b == 0)
            .unwrap_or(line.len());
        let entry = &line[..end];
        (!entry.is_empty()).then_some(entry)
    })
}

/// Count the URIs in `text/uri-list` data
pub fn count_uri_list_items(data: &[u8]) -> usize {
    uri_list_entries(data).count()
}

/// Extract entry `index` from `text/uri-list` data
///
/// When the list has no such entry the whole payload is returned.
pub fn uri_list_item(data: &[u8], index: usize) -> String {
    match uri_list_entries(data).nth(index) {
        Some(entry) => String::from_utf8_lossy(entry).into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"hello"), "hello");
        assert_eq!(decode_text(b"\xEF\xBB\xBFbom"), "bom");
        assert_eq!(decode_text(b"cut\0tail"), "cut");
        assert_eq!(decode_text(b"h\0i\0!\0?\0"), "hi!?");
        assert_eq!(decode_text(b"\xFF\xFEo\0k\0"), "ok");
        assert_eq!(decode_text(b"\xFE\xFF\0o\0k"), "ok");
        assert_eq!(decode_text(b""), "");
    }

    #[test]
    fn test_normalize_line_breaks() {
        assert_eq!(normalize_line_breaks("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_line_breaks("plain"), "plain");
    }

    #[test]
    fn test_uri_list_items() {
        let list = b"file:///tmp/a\r\nfile:///tmp/b\r\n";
        assert_eq!(count_uri_list_items(list), 2);
        assert_eq!(uri_list_item(list, 0), "file:///tmp/a");
        assert_eq!(uri_list_item(list, 1), "file:///tmp/b");
    }

    #[test]
    fn test_uri_list_skips_blank_lines_and_indent() {
        let list = b"\r\n  http://a.example/\n\n\thttp://b.example/\r\n";
        assert_eq!(count_uri_list_items(list), 2);
        assert_eq!(uri_list_item(list, 1), "http://b.example/");
    }

    #[test]
    fn test_uri_list_missing_item_returns_everything() {
        let list = b"http://a.example/\r\n";
        assert_eq!(uri_list_item(list, 3), "http://a.example/\r\n");
        assert_eq!(count_uri_list_items(b""), 0);
    }
}
