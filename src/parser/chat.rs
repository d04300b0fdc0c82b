//! Public chat and whisper lines: `[<Tag> ]Name: message`

use super::skip_space;
use crate::event::{ChatChannel, LogEvent, WhisperDirection};
use chrono::NaiveDateTime;

/// Speaker fields shared by chat and whisper lines
#[derive(Debug, PartialEq)]
struct Speech<'a> {
    guild_tag: &'a str,
    name: &'a str,
    message: &'a str,
}

/// Split `<Tag> Name: message` or `Name: message`.
///
/// The message is everything after the first `": "`, untouched; it may
/// contain further colons or angle brackets.
fn split_speech(text: &str) -> Option<Speech<'_>> {
    let (guild_tag, rest) = match text.strip_prefix('<') {
        Some(tagged) => {
            let (tag, after) = tagged.split_once('>')?;
            (tag, skip_space(after))
        }
        None => ("", text),
    };

    let (name, message) = rest.split_once(": ")?;
    if name.is_empty() {
        return None;
    }

    Some(Speech {
        guild_tag,
        name,
        message,
    })
}

pub(super) fn parse_public(text: &str, marker: char, timestamp: NaiveDateTime) -> Option<LogEvent> {
    let speech = split_speech(skip_space(text))?;
    Some(LogEvent::PublicChatMessage {
        timestamp,
        speaker_name: speech.name.to_string(),
        guild_tag: speech.guild_tag.to_string(),
        message: speech.message.to_string(),
        channel: ChatChannel::from_marker(marker),
    })
}

pub(super) fn parse_whisper(text: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    let text = skip_space(text);
    let (direction, rest) = if let Some(rest) = text.strip_prefix("From ") {
        (WhisperDirection::Incoming, rest)
    } else if let Some(rest) = text.strip_prefix("To ") {
        (WhisperDirection::Outgoing, rest)
    } else {
        return None;
    };

    let speech = split_speech(rest)?;
    Some(LogEvent::WhisperMessage {
        timestamp,
        speaker_name: speech.name.to_string(),
        guild_tag: speech.guild_tag.to_string(),
        message: speech.message.to_string(),
        direction,
    })
}
