//! Typed events produced from Client.txt lines

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public chat channel, selected by the marker character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    /// `#`
    Global,
    /// `$`
    Trade,
    /// `%`
    Party,
    /// `&`
    Guild,
    Unknown,
}

impl ChatChannel {
    pub fn from_marker(marker: char) -> Self {
        match marker {
            '#' => ChatChannel::Global,
            '$' => ChatChannel::Trade,
            '%' => ChatChannel::Party,
            '&' => ChatChannel::Guild,
            _ => ChatChannel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatChannel::Global => "global",
            ChatChannel::Trade => "trade",
            ChatChannel::Party => "party",
            ChatChannel::Guild => "guild",
            ChatChannel::Unknown => "unknown",
        }
    }
}

/// Whisper direction relative to the local player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhisperDirection {
    /// `@From ...`
    Incoming,
    /// `@To ...`
    Outgoing,
}

/// One recognized log line.
///
/// Every variant carries the line's leading timestamp. Values are only
/// constructed with every field populated; a line that cannot fill all of
/// them is not recognized at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum LogEvent {
    PublicChatMessage {
        timestamp: NaiveDateTime,
        speaker_name: String,
        /// Empty when the speaker has no guild tag
        guild_tag: String,
        message: String,
        channel: ChatChannel,
    },
    WhisperMessage {
        timestamp: NaiveDateTime,
        speaker_name: String,
        /// Empty when the speaker has no guild tag
        guild_tag: String,
        message: String,
        direction: WhisperDirection,
    },
    YouEnteredArea {
        timestamp: NaiveDateTime,
        area_name: String,
        is_hideout: bool,
    },
    OtherJoinedArea {
        timestamp: NaiveDateTime,
        character_name: String,
    },
    OtherLeftArea {
        timestamp: NaiveDateTime,
        character_name: String,
    },
    SlainMessage {
        timestamp: NaiveDateTime,
        character_name: String,
    },
    IsNowLevel {
        timestamp: NaiveDateTime,
        character_name: String,
        level: u32,
    },
    ConnectingToLoginServer {
        timestamp: NaiveDateTime,
        address: String,
        port: u16,
    },
    ConnectedToLoginServer {
        timestamp: NaiveDateTime,
        address: String,
        elapsed_ms: u32,
    },
    ConnectingToInstance {
        timestamp: NaiveDateTime,
        address: String,
        port: u16,
    },
    ConnectedToInstance {
        timestamp: NaiveDateTime,
        elapsed_ms: u32,
    },
    AfkModeOn {
        timestamp: NaiveDateTime,
        auto_reply_message: String,
    },
    AfkModeOff {
        timestamp: NaiveDateTime,
    },
    DndModeOn {
        timestamp: NaiveDateTime,
        auto_reply_message: String,
    },
    DndModeOff {
        timestamp: NaiveDateTime,
    },
}

impl LogEvent {
    /// Timestamp of the line this event was parsed from
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            LogEvent::PublicChatMessage { timestamp, .. }
            | LogEvent::WhisperMessage { timestamp, .. }
            | LogEvent::YouEnteredArea { timestamp, .. }
            | LogEvent::OtherJoinedArea { timestamp, .. }
            | LogEvent::OtherLeftArea { timestamp, .. }
            | LogEvent::SlainMessage { timestamp, .. }
            | LogEvent::IsNowLevel { timestamp, .. }
            | LogEvent::ConnectingToLoginServer { timestamp, .. }
            | LogEvent::ConnectedToLoginServer { timestamp, .. }
            | LogEvent::ConnectingToInstance { timestamp, .. }
            | LogEvent::ConnectedToInstance { timestamp, .. }
            | LogEvent::AfkModeOn { timestamp, .. }
            | LogEvent::AfkModeOff { timestamp }
            | LogEvent::DndModeOn { timestamp, .. }
            | LogEvent::DndModeOff { timestamp } => *timestamp,
        }
    }

    /// Stable snake_case name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::PublicChatMessage { .. } => "public_chat_message",
            LogEvent::WhisperMessage { .. } => "whisper_message",
            LogEvent::YouEnteredArea { .. } => "you_entered_area",
            LogEvent::OtherJoinedArea { .. } => "other_joined_area",
            LogEvent::OtherLeftArea { .. } => "other_left_area",
            LogEvent::SlainMessage { .. } => "slain_message",
            LogEvent::IsNowLevel { .. } => "is_now_level",
            LogEvent::ConnectingToLoginServer { .. } => "connecting_to_login_server",
            LogEvent::ConnectedToLoginServer { .. } => "connected_to_login_server",
            LogEvent::ConnectingToInstance { .. } => "connecting_to_instance",
            LogEvent::ConnectedToInstance { .. } => "connected_to_instance",
            LogEvent::AfkModeOn { .. } => "afk_mode_on",
            LogEvent::AfkModeOff { .. } => "afk_mode_off",
            LogEvent::DndModeOn { .. } => "dnd_mode_on",
            LogEvent::DndModeOff { .. } => "dnd_mode_off",
        }
    }

    /// Public chat or whisper
    pub fn is_chat(&self) -> bool {
        matches!(
            self,
            LogEvent::PublicChatMessage { .. } | LogEvent::WhisperMessage { .. }
        )
    }

    /// Speaker of a chat or whisper line
    pub fn speaker(&self) -> Option<&str> {
        match self {
            LogEvent::PublicChatMessage { speaker_name, .. }
            | LogEvent::WhisperMessage { speaker_name, .. } => Some(speaker_name),
            _ => None,
        }
    }
}

fn write_chat(
    f: &mut fmt::Formatter<'_>,
    timestamp: &NaiveDateTime,
    name: &str,
    tag: &str,
    message: &str,
) -> fmt::Result {
    if tag.is_empty() {
        write!(f, "[{}] {}: {}", timestamp, name, message)
    } else {
        write!(f, "[{}] {} <{}>: {}", timestamp, name, tag, message)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::PublicChatMessage {
                timestamp,
                speaker_name,
                guild_tag,
                message,
                channel,
            } => {
                write!(f, "({}) ", channel.as_str())?;
                write_chat(f, timestamp, speaker_name, guild_tag, message)
            }
            LogEvent::WhisperMessage {
                timestamp,
                speaker_name,
                guild_tag,
                message,
                direction,
            } => {
                let arrow = match direction {
                    WhisperDirection::Incoming => "from",
                    WhisperDirection::Outgoing => "to",
                };
                write!(f, "(whisper {}) ", arrow)?;
                write_chat(f, timestamp, speaker_name, guild_tag, message)
            }
            LogEvent::YouEnteredArea {
                timestamp,
                area_name,
                is_hideout,
            } => {
                if *is_hideout {
                    write!(f, "[{}] Entered {} (hideout)", timestamp, area_name)
                } else {
                    write!(f, "[{}] Entered {}", timestamp, area_name)
                }
            }
            LogEvent::OtherJoinedArea {
                timestamp,
                character_name,
            } => write!(f, "[{}] {} joined the area", timestamp, character_name),
            LogEvent::OtherLeftArea {
                timestamp,
                character_name,
            } => write!(f, "[{}] {} left the area", timestamp, character_name),
            LogEvent::SlainMessage {
                timestamp,
                character_name,
            } => write!(f, "[{}] {} has been slain", timestamp, character_name),
            LogEvent::IsNowLevel {
                timestamp,
                character_name,
                level,
            } => write!(f, "[{}] {} is now level {}", timestamp, character_name, level),
            LogEvent::ConnectingToLoginServer {
                timestamp,
                address,
                port,
            } => write!(f, "[{}] Connecting to login server {}:{}", timestamp, address, port),
            LogEvent::ConnectedToLoginServer {
                timestamp,
                address,
                elapsed_ms,
            } => write!(
                f,
                "[{}] Connected to login server {} in {}ms",
                timestamp, address, elapsed_ms
            ),
            LogEvent::ConnectingToInstance {
                timestamp,
                address,
                port,
            } => write!(f, "[{}] Connecting to instance {}:{}", timestamp, address, port),
            LogEvent::ConnectedToInstance {
                timestamp,
                elapsed_ms,
            } => write!(f, "[{}] Connected to instance in {}ms", timestamp, elapsed_ms),
            LogEvent::AfkModeOn {
                timestamp,
                auto_reply_message,
            } => write!(f, "[{}] AFK on: {}", timestamp, auto_reply_message),
            LogEvent::AfkModeOff { timestamp } => write!(f, "[{}] AFK off", timestamp),
            LogEvent::DndModeOn {
                timestamp,
                auto_reply_message,
            } => write!(f, "[{}] DND on: {}", timestamp, auto_reply_message),
            LogEvent::DndModeOff { timestamp } => write!(f, "[{}] DND off", timestamp),
        }
    }
}
