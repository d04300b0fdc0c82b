//! Client.txt line grammar
//!
//! A line looks like
//!
//! ```text
//! 2023/01/01 12:00:00 123456789 abc [INFO Client 1234] #<Tag> Name: message
//! ^ timestamp (19 chars)               first ']' ^ ^ marker (two chars later)
//! ```
//!
//! The marker character picks the sub-grammar:
//!
//! | marker | grammar |
//! |---|---|
//! | `#` `%` `$` `&` | public chat (global / party / trade / guild) |
//! | `@` | whisper, `From ` or `To ` |
//! | `:` | status notices (areas, level-ups, AFK/DND, deaths) |
//! | anything else | connection lifecycle sentences, matched from the marker on |
//!
//! Parsing is pure and total: anything that does not fit yields `None`.

mod chat;
mod status;

use crate::event::LogEvent;
use chrono::NaiveDateTime;
use std::io::Read;
use std::path::Path;

use crate::tailer::TailCursor;

/// Length of the `YYYY/MM/DD HH:MM:SS` prefix
pub const TIMESTAMP_LEN: usize = 19;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Parse one line (without its record separator).
///
/// Returns `None` when the line is not recognized. A recognized line always
/// produces an event with every field filled in.
pub fn parse_line(line: &str) -> Option<LogEvent> {
    let timestamp = parse_timestamp(line)?;

    let bracket = line.find(']')?;
    if bracket < TIMESTAMP_LEN {
        return None;
    }

    let body = line.get(bracket + 2..)?;
    let marker = body.chars().next()?;
    let rest = &body[marker.len_utf8()..];

    match marker {
        '#' | '%' | '$' | '&' => chat::parse_public(rest, marker, timestamp),
        '@' => chat::parse_whisper(rest, timestamp),
        ':' => status::parse_notice(skip_space(rest), timestamp),
        _ => status::parse_connection(body, timestamp),
    }
}

/// Leading `YYYY/MM/DD HH:MM:SS` of a line
pub fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    let head = line.get(..TIMESTAMP_LEN)?;
    NaiveDateTime::parse_from_str(head, TIMESTAMP_FORMAT).ok()
}

/// Parse a complete log from a reader.
///
/// Uses the same `\r\n` splitting as the live tailer; a trailing fragment
/// with no separator is ignored, as the tailer would still be waiting on it.
pub fn parse_reader<R: Read>(mut reader: R) -> std::io::Result<Vec<LogEvent>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut cursor = TailCursor::new(0);
    Ok(cursor
        .feed(&bytes)
        .iter()
        .filter_map(|line| parse_line(line))
        .collect())
}

/// Parse every complete line of an existing file
pub fn parse_file(path: impl AsRef<Path>) -> std::io::Result<Vec<LogEvent>> {
    let file = std::fs::File::open(path)?;
    parse_reader(std::io::BufReader::new(file))
}

/// Drop a single space separating the marker from its payload
fn skip_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}
