//! Read position and carry-over for one tailing session

/// Record separator written by the game client
pub const RECORD_SEPARATOR: &[u8] = b"\r\n";

/// What a length check found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Same length as the cursor
    Unchanged,
    /// This many new bytes are available
    Grown(u64),
    /// File is now shorter than the cursor
    Shrunk { from: u64, to: u64 },
}

/// Byte offset into the file plus the undecoded tail of the last read that
/// did not end in a record separator.
///
/// Each step is a pure function of the state and the new bytes, so the
/// splitting rules can be exercised without a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCursor {
    offset: u64,
    carry: Vec<u8>,
    /// Longest fragment kept while waiting for a separator
    line_limit: usize,
    dropped_bytes: u64,
}

impl TailCursor {
    /// Start at `offset` with nothing carried over and no fragment limit
    pub fn new(offset: u64) -> Self {
        Self::with_line_limit(offset, usize::MAX)
    }

    /// Start at `offset`, discarding any unterminated fragment that grows
    /// past `line_limit` bytes
    pub fn with_line_limit(offset: u64, line_limit: usize) -> Self {
        Self {
            offset,
            carry: Vec::new(),
            line_limit: line_limit.max(1),
            dropped_bytes: 0,
        }
    }

    /// Total bytes thrown away because a fragment exceeded the line limit
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes waiting for a record separator
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    /// Compare the file's current length with the cursor
    pub fn observe(&self, len: u64) -> Growth {
        if len > self.offset {
            Growth::Grown(len - self.offset)
        } else if len < self.offset {
            Growth::Shrunk {
                from: self.offset,
                to: len,
            }
        } else {
            Growth::Unchanged
        }
    }

    /// Jump to `offset` and forget the carry-over.
    ///
    /// Used after truncation: the old fragment belongs to content that no
    /// longer exists.
    pub fn reset(&mut self, offset: u64) {
        self.offset = offset;
        self.carry.clear();
    }

    /// Consume bytes read at the current offset.
    ///
    /// Advances the offset by `bytes.len()` and returns every line completed
    /// by them, in file order, without separators. Lines are decoded only
    /// once whole, so a multi-byte character or a separator split across
    /// reads is reassembled first. Invalid UTF-8 is replaced, not fatal.
    ///
    /// A fragment longer than the line limit is discarded; whatever of that
    /// line arrives later surfaces as a headless line the parser rejects.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.offset += bytes.len() as u64;

        // a separator may straddle the old carry and the new bytes
        let search_from = self.carry.len().saturating_sub(RECORD_SEPARATOR.len() - 1);
        self.carry.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut pos = search_from;

        while let Some(found) = find_separator(&self.carry[pos..]) {
            let line_end = pos + found;
            lines.push(String::from_utf8_lossy(&self.carry[line_start..line_end]).into_owned());
            line_start = line_end + RECORD_SEPARATOR.len();
            pos = line_start;
        }

        self.carry.drain(..line_start);
        if self.carry.len() > self.line_limit {
            self.dropped_bytes += self.carry.len() as u64;
            self.carry.clear();
        }
        lines
    }
}

impl Default for TailCursor {
    fn default() -> Self {
        Self::new(0)
    }
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(RECORD_SEPARATOR.len())
        .position(|window| window == RECORD_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe() {
        let cursor = TailCursor::new(10);
        assert_eq!(cursor.observe(10), Growth::Unchanged);
        assert_eq!(cursor.observe(15), Growth::Grown(5));
        assert_eq!(cursor.observe(3), Growth::Shrunk { from: 10, to: 3 });
    }

    #[test]
    fn test_feed_complete_lines() {
        let mut cursor = TailCursor::new(0);
        let lines = cursor.feed(b"one\r\ntwo\r\n");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(cursor.offset(), 10);
        assert!(cursor.pending().is_empty());
    }

    #[test]
    fn test_feed_carries_partial_line() {
        let mut cursor = TailCursor::new(100);
        assert_eq!(cursor.feed(b"one\r\ntw"), vec!["one"]);
        assert_eq!(cursor.pending(), b"tw");
        assert_eq!(cursor.feed(b"o\r\n"), vec!["two"]);
        assert!(cursor.pending().is_empty());
        assert_eq!(cursor.offset(), 110);
    }

    #[test]
    fn test_feed_separator_split_across_reads() {
        let mut cursor = TailCursor::new(0);
        assert!(cursor.feed(b"one\r").is_empty());
        assert_eq!(cursor.feed(b"\ntwo\r"), vec!["one"]);
        assert_eq!(cursor.feed(b"\n"), vec!["two"]);
    }

    #[test]
    fn test_feed_multibyte_split_across_reads() {
        let text = "héllo ✓\r\n".as_bytes();
        // split inside the two-byte 'é' and inside the three-byte '✓'
        let mut cursor = TailCursor::new(0);
        let mut lines = Vec::new();
        lines.extend(cursor.feed(&text[..2]));
        lines.extend(cursor.feed(&text[2..8]));
        lines.extend(cursor.feed(&text[8..]));
        assert_eq!(lines, vec!["héllo ✓"]);
    }

    #[test]
    fn test_feed_one_byte_at_a_time() {
        let text = "a€\r\nb\r\n\r\nc".as_bytes();
        let mut cursor = TailCursor::new(0);
        let lines: Vec<String> = text.iter().flat_map(|b| cursor.feed(&[*b])).collect();
        assert_eq!(lines, vec!["a€", "b", ""]);
        assert_eq!(cursor.pending(), b"c");
    }

    #[test]
    fn test_bare_newline_is_not_a_separator() {
        let mut cursor = TailCursor::new(0);
        assert!(cursor.feed(b"one\ntwo\n").is_empty());
        assert_eq!(cursor.pending(), b"one\ntwo\n");
    }

    #[test]
    fn test_reset_clears_carry() {
        let mut cursor = TailCursor::new(0);
        cursor.feed(b"partial");
        cursor.reset(3);
        assert_eq!(cursor.offset(), 3);
        assert!(cursor.pending().is_empty());
    }

    #[test]
    fn test_oversized_fragment_is_dropped() {
        let mut cursor = TailCursor::with_line_limit(0, 8);
        assert!(cursor.feed(b"one\ntwo\n").is_empty());
        assert!(cursor.pending().is_empty());
        assert_eq!(cursor.dropped_bytes(), 8);
        assert_eq!(cursor.offset(), 8);

        // complete lines are never limited, only the leftover fragment
        let lines = cursor.feed(b"a much longer complete line\r\nshort");
        assert_eq!(lines, vec!["a much longer complete line"]);
        assert_eq!(cursor.pending(), b"short");
        assert_eq!(cursor.dropped_bytes(), 8);
    }

    #[test]
    fn test_fragment_at_limit_is_kept() {
        let mut cursor = TailCursor::with_line_limit(0, 5);
        cursor.feed(b"12345");
        assert_eq!(cursor.pending(), b"12345");
        cursor.feed(b"6");
        assert!(cursor.pending().is_empty());
        assert_eq!(cursor.dropped_bytes(), 6);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut cursor = TailCursor::new(0);
        let lines = cursor.feed(b"ok\xff\r\n");
        assert_eq!(lines, vec!["ok\u{FFFD}"]);
    }
}
