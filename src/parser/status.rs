//! Status notices (`:` marker) and connection lifecycle sentences.
//!
//! Both are ordered tables of `(pattern, extractor)` rules. The first rule
//! whose literal matches decides the outcome: if its extractor fails the
//! whole line is rejected, later rules are not tried.

use crate::event::LogEvent;
use chrono::NaiveDateTime;

/// How a rule's literal is matched, and what the extractor receives
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Extractor gets the text after the prefix
    Prefix(&'static str),
    /// Extractor gets the text before the suffix
    Suffix(&'static str),
    /// Extractor gets the whole text
    Contains(&'static str),
}

impl Pattern {
    fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        match *self {
            Pattern::Prefix(literal) => text.strip_prefix(literal),
            Pattern::Suffix(literal) => text.strip_suffix(literal),
            Pattern::Contains(literal) => text.contains(literal).then_some(text),
        }
    }
}

type Extractor = fn(&str, NaiveDateTime) -> Option<LogEvent>;

struct Rule {
    pattern: Pattern,
    extract: Extractor,
}

const fn rule(pattern: Pattern, extract: Extractor) -> Rule {
    Rule { pattern, extract }
}

const NOTICE_RULES: &[Rule] = &[
    rule(Pattern::Prefix("You have entered "), entered_area),
    rule(Pattern::Suffix(" has joined the area."), joined_area),
    rule(Pattern::Suffix(" has left the area."), left_area),
    rule(Pattern::Suffix(" has been slain."), slain),
    rule(Pattern::Prefix("AFK mode is now ON. Autoreply "), afk_on),
    rule(Pattern::Prefix("AFK mode is now OFF"), afk_off),
    rule(Pattern::Prefix("DND mode is now ON. Autoreply "), dnd_on),
    rule(Pattern::Prefix("DND mode is now OFF"), dnd_off),
    rule(Pattern::Contains(LEVEL_MARKER), level_up),
];

const CONNECTION_RULES: &[Rule] = &[
    rule(Pattern::Prefix("Async connecting to "), connecting_to_login),
    rule(Pattern::Prefix("Connecting to instance server at "), connecting_to_instance),
    rule(Pattern::Prefix("Connect time to instance server was "), connected_to_instance),
    rule(Pattern::Prefix("Connected to "), connected_to_login),
];

const LEVEL_MARKER: &str = " is now level ";

fn apply(rules: &[Rule], text: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    rules.iter().find_map(|rule| {
        rule.pattern
            .strip(text)
            .map(|payload| (rule.extract)(payload, timestamp))
    })?
}

/// Text after `: `
pub(super) fn parse_notice(text: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    apply(NOTICE_RULES, text, timestamp)
}

/// Text starting at the marker character
pub(super) fn parse_connection(text: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    apply(CONNECTION_RULES, text, timestamp)
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}

/// `host:port`, split on the last colon
fn split_address(text: &str) -> Option<(&str, u16)> {
    let (host, port) = text.rsplit_once(':')?;
    Some((non_empty(host)?, port.parse().ok()?))
}

/// `47ms` or `47ms.`
fn parse_millis(text: &str) -> Option<u32> {
    let text = text.strip_suffix('.').unwrap_or(text);
    text.strip_suffix("ms")?.parse().ok()
}

/// Drop one pair of enclosing double quotes
fn unquote(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

fn entered_area(area: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    let is_hideout = area.ends_with("Hideout.");
    let area_name = area.strip_suffix('.').unwrap_or(area);
    Some(LogEvent::YouEnteredArea {
        timestamp,
        area_name: non_empty(area_name)?.to_string(),
        is_hideout,
    })
}

fn joined_area(name: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::OtherJoinedArea {
        timestamp,
        character_name: non_empty(name)?.to_string(),
    })
}

fn left_area(name: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::OtherLeftArea {
        timestamp,
        character_name: non_empty(name)?.to_string(),
    })
}

fn slain(name: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::SlainMessage {
        timestamp,
        character_name: non_empty(name)?.to_string(),
    })
}

fn afk_on(reply: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::AfkModeOn {
        timestamp,
        auto_reply_message: unquote(reply).to_string(),
    })
}

fn afk_off(_: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::AfkModeOff { timestamp })
}

fn dnd_on(reply: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::DndModeOn {
        timestamp,
        auto_reply_message: unquote(reply).to_string(),
    })
}

fn dnd_off(_: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::DndModeOff { timestamp })
}

/// `Name (Class) is now level 42`
///
/// The name stops right before the last `(` ahead of the level marker, so
/// a trailing class annotation is not taken as part of it. The line must
/// carry a `(` somewhere.
fn level_up(text: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    if !text.contains('(') {
        return None;
    }

    let (head, tail) = text.split_once(LEVEL_MARKER)?;
    let name = match head.rfind('(') {
        Some(paren) => {
            let name = &head[..paren];
            name.strip_suffix(' ').unwrap_or(name)
        }
        None => head,
    };
    let level = tail.split(' ').next()?.parse().ok()?;

    Some(LogEvent::IsNowLevel {
        timestamp,
        character_name: non_empty(name)?.to_string(),
        level,
    })
}

fn connecting_to_login(address: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    let (address, port) = split_address(address)?;
    Some(LogEvent::ConnectingToLoginServer {
        timestamp,
        address: address.to_string(),
        port,
    })
}

fn connecting_to_instance(address: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    let (address, port) = split_address(address)?;
    Some(LogEvent::ConnectingToInstance {
        timestamp,
        address: address.to_string(),
        port,
    })
}

fn connected_to_instance(elapsed: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    Some(LogEvent::ConnectedToInstance {
        timestamp,
        elapsed_ms: parse_millis(elapsed)?,
    })
}

/// `lon01.login.pathofexile.com in 47ms.`
fn connected_to_login(text: &str, timestamp: NaiveDateTime) -> Option<LogEvent> {
    let (address, tail) = text.split_once(' ')?;
    let elapsed = tail.rsplit(' ').next()?;
    Some(LogEvent::ConnectedToLoginServer {
        timestamp,
        address: non_empty(address)?.to_string(),
        elapsed_ms: parse_millis(elapsed)?,
    })
}
