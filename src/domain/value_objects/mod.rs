use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DispatchError;

static PERMALINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"discord(?:app)?\.com/channels/(\d+|@me)/(\d+)/(\d+)")
        .expect("permalink pattern is valid")
});

/// Snowflake id of a user reachable by direct message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub u64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecipientId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(RecipientId)
    }
}

/// Points at an existing message whose payload is copied into a blast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReference {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
}

impl MessageReference {
    /// Accepts a message permalink, or a bare message id together with the
    /// channel it lives in.
    pub fn parse(link_or_id: &str, channel_id: Option<&str>) -> Result<Self, DispatchError> {
        let input = link_or_id.trim();
        let malformed =
            || DispatchError::InvocationMalformed("Invalid message link or ID format.".to_string());

        if input.contains("/channels/") {
            let captures = PERMALINK.captures(input).ok_or_else(malformed)?;
            let guild_id = match &captures[1] {
                "@me" => None,
                raw => Some(raw.parse::<u64>().map_err(|_| malformed())?),
            };
            return Ok(Self {
                guild_id,
                channel_id: captures[2].parse().map_err(|_| malformed())?,
                message_id: captures[3].parse().map_err(|_| malformed())?,
            });
        }

        let message_id = input.parse::<u64>().map_err(|_| malformed())?;
        let channel_id = channel_id
            .ok_or_else(|| {
                DispatchError::InvocationMalformed(
                    "A channel id is required when only a message ID is given.".to_string(),
                )
            })?
            .trim()
            .parse::<u64>()
            .map_err(|_| malformed())?;

        Ok(Self {
            guild_id: None,
            channel_id,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_permalink() {
        let reference = MessageReference::parse(
            "https://discord.com/channels/111/222/333",
            None,
        )
        .unwrap();
        assert_eq!(
            reference,
            MessageReference {
                guild_id: Some(111),
                channel_id: 222,
                message_id: 333,
            }
        );
    }

    #[test]
    fn bare_id_needs_channel() {
        let err = MessageReference::parse("333", None).unwrap_err();
        assert!(matches!(err, DispatchError::InvocationMalformed(_)));

        let reference = MessageReference::parse(" 333 ", Some("222")).unwrap();
        assert_eq!(reference.channel_id, 222);
        assert_eq!(reference.message_id, 333);
        assert_eq!(reference.guild_id, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(MessageReference::parse("not-a-message", Some("1")).is_err());
        assert!(MessageReference::parse("https://discord.com/channels/1/2", None).is_err());
    }
}
