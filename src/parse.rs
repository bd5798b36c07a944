//! Parsers for Minecraft server diagnostic replies.
//!
//! The server answers RCON commands with human-readable sentences rather than
//! a structured payload, so extraction anchors on its fixed diagnostic
//! phrasing. Every pattern and its expected payload shape lives behind exactly
//! one named function here; a server-side format change breaks a single
//! parser and its tests instead of a scatter of inline regexes.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const PLAYER_LIST_PATTERN: &str = r"players online: (.*)";
const ENTITY_DATA_PATTERN: &str = r"has the following entity data: (.*)";

static PLAYER_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLAYER_LIST_PATTERN).expect("player list pattern"));
static ENTITY_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ENTITY_DATA_PATTERN).expect("entity data pattern"));

/// Errors produced when a reply does not carry the expected phrasing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The reply did not contain the expected diagnostic phrase at all.
    #[error("reply {reply:?} did not match `{pattern}`")]
    NoMatch {
        pattern: &'static str,
        reply: String,
    },

    /// The captured payload was not shaped as expected.
    #[error("malformed payload {payload:?}: {reason}")]
    Malformed {
        payload: String,
        reason: &'static str,
    },
}

/// Whether a raw reply signals a live server. Content does not matter, only
/// that the server said anything at all.
pub fn parse_liveness(reply: &str) -> bool {
    !reply.is_empty()
}

/// Extract the usernames from a `list` reply.
///
/// The capture after `players online: ` may legitimately be empty (nobody is
/// connected); that yields an empty list, not an error. Order is the server's
/// listed order.
pub fn parse_player_list(reply: &str) -> Result<Vec<String>, ParseError> {
    let caps = PLAYER_LIST.captures(reply).ok_or_else(|| ParseError::NoMatch {
        pattern: PLAYER_LIST_PATTERN,
        reply: reply.to_string(),
    })?;

    let listed: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
    if listed.is_empty() {
        return Ok(Vec::new());
    }

    Ok(listed.split(',').map(str::to_owned).collect())
}

/// Extract the `[x, y, z]` triple from a `data get entity ... Pos` reply.
///
/// Coordinates arrive as double literals (`"1.0d"`); the trailing type suffix
/// is stripped. Anything other than exactly three bracketed components is a
/// [`ParseError`], which fails the calling collector for this scrape instead
/// of panicking the process.
pub fn parse_position(reply: &str) -> Result<[String; 3], ParseError> {
    let payload = entity_payload(reply)?;

    let inner = payload
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::Malformed {
            payload: payload.to_string(),
            reason: "expected a bracketed coordinate triple",
        })?;

    let coords: Vec<String> = inner
        .split(',')
        .map(|c| c.trim().trim_end_matches('d').to_owned())
        .collect();

    coords.try_into().map_err(|parts: Vec<String>| ParseError::Malformed {
        payload: format!("[{}]", parts.join(",")),
        reason: "expected exactly three coordinates",
    })
}

/// Extract the dimension name from a `data get entity ... Dimension` reply.
///
/// The payload is a quoted namespaced identifier (`"minecraft:overworld"`);
/// only the segment after the colon is returned.
pub fn parse_dimension(reply: &str) -> Result<String, ParseError> {
    let payload = entity_payload(reply)?;
    let unquoted = payload.trim().trim_matches('"');

    let (_, name) = unquoted.split_once(':').ok_or_else(|| ParseError::Malformed {
        payload: payload.to_string(),
        reason: "expected a namespaced identifier",
    })?;

    Ok(name.to_owned())
}

/// Extract the experience level from a `data get entity ... XpLevel` reply.
///
/// Returned verbatim as the server printed it; it is only ever used as a
/// label value.
pub fn parse_experience(reply: &str) -> Result<String, ParseError> {
    Ok(entity_payload(reply)?.trim().to_owned())
}

fn entity_payload(reply: &str) -> Result<&str, ParseError> {
    ENTITY_DATA
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ParseError::NoMatch {
            pattern: ENTITY_DATA_PATTERN,
            reply: reply.to_string(),
        })
}
